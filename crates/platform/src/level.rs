//! Ordered SIMD capability levels.
//!
//! A [`CapabilityLevel`] is the collapsed answer to "how wide a vector unit can
//! this process use?". The set is closed and small, with a strictly increasing
//! `u8` encoding so levels compare with `<`/`>` and index per-level tables.
//!
//! | Level | Encoding | Register width | Name |
//! |-------|----------|----------------|------|
//! | [`Scalar`](CapabilityLevel::Scalar) | 0 | none | `Scalar` |
//! | [`Sse2`](CapabilityLevel::Sse2) | 1 | 128-bit | `SSE2` |
//! | [`Sse42`](CapabilityLevel::Sse42) | 2 | 128-bit | `SSE4.2` |
//! | [`Avx`](CapabilityLevel::Avx) | 3 | 256-bit | `AVX` |
//! | [`Avx2`](CapabilityLevel::Avx2) | 4 | 256-bit | `AVX2` |
//! | [`Avx512F`](CapabilityLevel::Avx512F) | 5 | 512-bit | `AVX-512F` |

use core::{fmt, str::FromStr};

use crate::error::{InvalidLevel, ParseLevelError};

/// Capability level of the current process, lowest to highest.
///
/// # Ordering
///
/// Levels implement `Ord` with wider levels being "greater", so
/// `level >= CapabilityLevel::Avx2` reads as "256-bit integer SIMD is usable".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CapabilityLevel {
  /// No usable vector extension.
  #[default]
  Scalar = 0,
  /// 128-bit SSE2.
  Sse2 = 1,
  /// 128-bit SSE4.2.
  Sse42 = 2,
  /// 256-bit AVX (float only).
  Avx = 3,
  /// 256-bit AVX2.
  Avx2 = 4,
  /// 512-bit AVX-512 Foundation.
  Avx512F = 5,
}

impl CapabilityLevel {
  /// Number of levels.
  pub const COUNT: usize = 6;

  /// Every level, lowest first.
  pub const ALL: [Self; Self::COUNT] = [
    Self::Scalar,
    Self::Sse2,
    Self::Sse42,
    Self::Avx,
    Self::Avx2,
    Self::Avx512F,
  ];

  /// Widest level.
  pub const MAX: Self = Self::Avx512F;

  /// Convert from the numeric encoding, `None` for anything outside `0..=5`.
  #[inline]
  #[must_use]
  pub const fn from_u8(raw: u8) -> Option<Self> {
    match raw {
      0 => Some(Self::Scalar),
      1 => Some(Self::Sse2),
      2 => Some(Self::Sse42),
      3 => Some(Self::Avx),
      4 => Some(Self::Avx2),
      5 => Some(Self::Avx512F),
      _ => None,
    }
  }

  /// Numeric encoding.
  #[inline]
  #[must_use]
  pub const fn as_u8(self) -> u8 {
    self as u8
  }

  /// Position in [`CapabilityLevel::ALL`]; valid for table indexing.
  #[inline]
  #[must_use]
  pub const fn as_index(self) -> usize {
    self as usize
  }

  /// Human-readable name.
  #[inline]
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Scalar => "Scalar",
      Self::Sse2 => "SSE2",
      Self::Sse42 => "SSE4.2",
      Self::Avx => "AVX",
      Self::Avx2 => "AVX2",
      Self::Avx512F => "AVX-512F",
    }
  }

  /// Width of the vector registers this level operates on, in bits.
  ///
  /// `0` for [`CapabilityLevel::Scalar`].
  #[inline]
  #[must_use]
  pub const fn vector_bits(self) -> u32 {
    match self {
      Self::Scalar => 0,
      Self::Sse2 | Self::Sse42 => 128,
      Self::Avx | Self::Avx2 => 256,
      Self::Avx512F => 512,
    }
  }

  /// Number of `f32` lanes per register (`1` for scalar).
  #[inline]
  #[must_use]
  pub const fn f32_lanes(self) -> usize {
    match self.vector_bits() {
      0 => 1,
      bits => (bits / 32) as usize,
    }
  }

  /// The narrower of two levels.
  #[inline]
  #[must_use]
  pub const fn min_const(self, other: Self) -> Self {
    if self.as_u8() <= other.as_u8() { self } else { other }
  }
}

/// Human-readable name for a raw level encoding.
///
/// Total: values outside the defined range map to `"Unknown"`.
#[inline]
#[must_use]
pub const fn level_name(raw: u8) -> &'static str {
  match CapabilityLevel::from_u8(raw) {
    Some(level) => level.name(),
    None => "Unknown",
  }
}

impl fmt::Display for CapabilityLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl TryFrom<u8> for CapabilityLevel {
  type Error = InvalidLevel;

  #[inline]
  fn try_from(raw: u8) -> Result<Self, Self::Error> {
    Self::from_u8(raw).ok_or(InvalidLevel(raw))
  }
}

impl From<CapabilityLevel> for u8 {
  #[inline]
  fn from(level: CapabilityLevel) -> Self {
    level.as_u8()
  }
}

impl FromStr for CapabilityLevel {
  type Err = ParseLevelError;

  /// Parse a level name, case-insensitively.
  ///
  /// Accepts the display names plus the common spellings without
  /// punctuation (`sse42`, `avx512`, `avx512f`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    const NAMES: [(&str, CapabilityLevel); 11] = [
      ("scalar", CapabilityLevel::Scalar),
      ("none", CapabilityLevel::Scalar),
      ("sse2", CapabilityLevel::Sse2),
      ("sse4.2", CapabilityLevel::Sse42),
      ("sse42", CapabilityLevel::Sse42),
      ("avx", CapabilityLevel::Avx),
      ("avx2", CapabilityLevel::Avx2),
      ("avx-512f", CapabilityLevel::Avx512F),
      ("avx512f", CapabilityLevel::Avx512F),
      ("avx512", CapabilityLevel::Avx512F),
      ("avx-512", CapabilityLevel::Avx512F),
    ];
    NAMES
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(s))
      .map(|&(_, level)| level)
      .ok_or(ParseLevelError)
  }
}

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::string::ToString;

  use super::*;

  #[test]
  fn encoding_is_strictly_increasing() {
    for pair in CapabilityLevel::ALL.windows(2) {
      if let [lo, hi] = pair {
        assert!(lo < hi, "{lo} must order below {hi}");
        assert_eq!(lo.as_u8() + 1, hi.as_u8());
      }
    }
  }

  #[test]
  fn index_matches_position_in_all() {
    for (i, level) in CapabilityLevel::ALL.iter().enumerate() {
      assert_eq!(level.as_index(), i);
    }
    assert_eq!(CapabilityLevel::ALL.len(), CapabilityLevel::COUNT);
    assert_eq!(CapabilityLevel::MAX, CapabilityLevel::ALL[CapabilityLevel::COUNT - 1]);
  }

  #[test]
  fn from_u8_round_trips_defined_range() {
    for level in CapabilityLevel::ALL {
      assert_eq!(CapabilityLevel::from_u8(level.as_u8()), Some(level));
      assert_eq!(CapabilityLevel::try_from(level.as_u8()), Ok(level));
    }
    assert_eq!(CapabilityLevel::from_u8(6), None);
    assert_eq!(CapabilityLevel::try_from(0xFF), Err(InvalidLevel(0xFF)));
  }

  #[test]
  fn level_name_is_total() {
    assert_eq!(level_name(0), "Scalar");
    assert_eq!(level_name(1), "SSE2");
    assert_eq!(level_name(2), "SSE4.2");
    assert_eq!(level_name(3), "AVX");
    assert_eq!(level_name(4), "AVX2");
    assert_eq!(level_name(5), "AVX-512F");
    for raw in 6..=u8::MAX {
      assert_eq!(level_name(raw), "Unknown");
    }
  }

  #[test]
  fn display_uses_name() {
    assert_eq!(CapabilityLevel::Avx512F.to_string(), "AVX-512F");
    assert_eq!(CapabilityLevel::Sse42.to_string(), "SSE4.2");
  }

  #[test]
  fn parse_accepts_names_and_aliases() {
    for level in CapabilityLevel::ALL {
      assert_eq!(level.name().parse::<CapabilityLevel>(), Ok(level));
    }
    assert_eq!("sse42".parse(), Ok(CapabilityLevel::Sse42));
    assert_eq!("AVX512".parse(), Ok(CapabilityLevel::Avx512F));
    assert_eq!(" avx2 ".parse(), Ok(CapabilityLevel::Avx2));
    assert_eq!("neon".parse::<CapabilityLevel>(), Err(ParseLevelError));
  }

  #[test]
  fn widths_and_lanes() {
    assert_eq!(CapabilityLevel::Scalar.f32_lanes(), 1);
    assert_eq!(CapabilityLevel::Sse2.f32_lanes(), 4);
    assert_eq!(CapabilityLevel::Avx2.f32_lanes(), 8);
    assert_eq!(CapabilityLevel::Avx512F.f32_lanes(), 16);
    assert_eq!(CapabilityLevel::Avx.vector_bits(), 256);
  }

  #[test]
  fn min_const_picks_narrower() {
    assert_eq!(
      CapabilityLevel::Avx2.min_const(CapabilityLevel::Sse2),
      CapabilityLevel::Sse2
    );
    assert_eq!(
      CapabilityLevel::Scalar.min_const(CapabilityLevel::Avx512F),
      CapabilityLevel::Scalar
    );
  }
}
