//! Raw feature bits and their collapse into a [`CapabilityLevel`].
//!
//! # OS gating
//!
//! CPUID reports what the silicon implements, not what the OS preserves across
//! context switches. The 256-bit levels additionally need OSXSAVE and XCR0
//! bits 1-2 (XMM + YMM state); AVX-512F also needs XCR0 bits 5-7 (opmask,
//! ZMM_Hi256, Hi16_ZMM). A CPU bit without its OS bit degrades to the next
//! narrower level.

use core::{
  fmt,
  ops::{BitAnd, BitOr, BitOrAssign},
};

use crate::{
  level::CapabilityLevel,
  probe::{FeatureProbe, HostProbe},
};

/// CPUID and XCR0 bit positions.
pub(crate) mod cpuid_bits {
  pub const LEAF1_EDX_SSE2: u32 = 1 << 26;
  pub const LEAF1_ECX_SSE42: u32 = 1 << 20;
  pub const LEAF1_ECX_OSXSAVE: u32 = 1 << 27;
  pub const LEAF1_ECX_AVX: u32 = 1 << 28;
  pub const LEAF7_EBX_AVX2: u32 = 1 << 5;
  pub const LEAF7_EBX_AVX512F: u32 = 1 << 16;

  /// XMM + YMM state.
  pub const XCR0_YMM_MASK: u64 = 0x6;
  /// Opmask + ZMM_Hi256 + Hi16_ZMM state.
  pub const XCR0_ZMM_MASK: u64 = 0xE0;
}

// ─────────────────────────────────────────────────────────────────────────────
// RawFeatureBits
// ─────────────────────────────────────────────────────────────────────────────

/// Flags read from one probe sequence.
///
/// A small bitset in the style of a capability mask: combine with `|`, test
/// with [`has`](Self::has). Only the flags that influence classification are
/// tracked.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawFeatureBits(u16);

impl RawFeatureBits {
  /// No flags.
  pub const NONE: Self = Self(0);

  /// The probe responded (leaf 0 reported at least leaf 1).
  pub const CPUID: Self = Self(1 << 0);
  pub const SSE2: Self = Self(1 << 1);
  pub const SSE42: Self = Self(1 << 2);
  pub const AVX: Self = Self(1 << 3);
  pub const AVX2: Self = Self(1 << 4);
  pub const AVX512F: Self = Self(1 << 5);
  /// OS enabled XSAVE/XGETBV.
  pub const OSXSAVE: Self = Self(1 << 6);
  /// OS preserves XMM + YMM state.
  pub const XCR0_YMM: Self = Self(1 << 7);
  /// OS preserves opmask + upper ZMM state.
  pub const XCR0_ZMM: Self = Self(1 << 8);

  /// Every defined flag.
  pub const ALL: Self = Self((1 << Self::FLAG_COUNT) - 1);

  /// Number of defined flags.
  pub const FLAG_COUNT: u32 = 9;

  const NAMES: [(Self, &'static str); Self::FLAG_COUNT as usize] = [
    (Self::CPUID, "cpuid"),
    (Self::SSE2, "sse2"),
    (Self::SSE42, "sse4.2"),
    (Self::AVX, "avx"),
    (Self::AVX2, "avx2"),
    (Self::AVX512F, "avx512f"),
    (Self::OSXSAVE, "osxsave"),
    (Self::XCR0_YMM, "xcr0.ymm"),
    (Self::XCR0_ZMM, "xcr0.zmm"),
  ];

  /// Build from raw bits, dropping undefined positions.
  #[inline]
  #[must_use]
  pub const fn from_raw(raw: u16) -> Self {
    Self(raw & Self::ALL.0)
  }

  #[inline]
  #[must_use]
  pub const fn raw(self) -> u16 {
    self.0
  }

  /// True if every flag in `other` is set.
  #[inline]
  #[must_use]
  pub const fn has(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  #[inline]
  #[must_use]
  pub const fn difference(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }

  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  #[inline]
  #[must_use]
  pub const fn count(self) -> u32 {
    self.0.count_ones()
  }

  /// True if every flag of `self` is also in `other`.
  #[inline]
  #[must_use]
  pub const fn is_subset_of(self, other: Self) -> bool {
    other.has(self)
  }

  /// Names of the set flags, in bit order.
  pub fn names(self) -> impl Iterator<Item = &'static str> {
    Self::NAMES
      .into_iter()
      .filter(move |(flag, _)| self.has(*flag))
      .map(|(_, name)| name)
  }

  /// Run one probe sequence.
  ///
  /// Leaf 7 is only queried when leaf 0 reports it, and XCR0 only when the
  /// OS has enabled XSAVE.
  pub fn read<P: FeatureProbe + ?Sized>(probe: &P) -> Self {
    use cpuid_bits::*;

    let max_leaf = probe.cpuid(0, 0).eax;
    if max_leaf == 0 {
      return Self::NONE;
    }

    let mut bits = Self::CPUID;

    let leaf1 = probe.cpuid(1, 0);
    if leaf1.edx & LEAF1_EDX_SSE2 != 0 {
      bits |= Self::SSE2;
    }
    if leaf1.ecx & LEAF1_ECX_SSE42 != 0 {
      bits |= Self::SSE42;
    }
    if leaf1.ecx & LEAF1_ECX_AVX != 0 {
      bits |= Self::AVX;
    }
    if leaf1.ecx & LEAF1_ECX_OSXSAVE != 0 {
      bits |= Self::OSXSAVE;
      let xcr0 = probe.xgetbv(0);
      if xcr0 & XCR0_YMM_MASK == XCR0_YMM_MASK {
        bits |= Self::XCR0_YMM;
      }
      if xcr0 & XCR0_ZMM_MASK == XCR0_ZMM_MASK {
        bits |= Self::XCR0_ZMM;
      }
    }

    if max_leaf >= 7 {
      let leaf7 = probe.cpuid(7, 0);
      if leaf7.ebx & LEAF7_EBX_AVX2 != 0 {
        bits |= Self::AVX2;
      }
      if leaf7.ebx & LEAF7_EBX_AVX512F != 0 {
        bits |= Self::AVX512F;
      }
    }

    bits
  }
}

impl BitOr for RawFeatureBits {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self {
    self.union(rhs)
  }
}

impl BitOrAssign for RawFeatureBits {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

impl BitAnd for RawFeatureBits {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self {
    self.intersection(rhs)
  }
}

impl fmt::Display for RawFeatureBits {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return f.write_str("(none)");
    }
    for (i, name) in self.names().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      f.write_str(name)?;
    }
    Ok(())
  }
}

impl fmt::Debug for RawFeatureBits {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "RawFeatureBits({self})")
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Collapse raw flags into the widest level they allow.
///
/// Widest first, first match wins:
///
/// | Level | Requires |
/// |-------|----------|
/// | `Avx512F` | AVX, AVX-512F, OS YMM and OS ZMM state |
/// | `Avx2` | AVX, AVX2, OS YMM state |
/// | `Avx` | AVX, OS YMM state |
/// | `Sse42` | SSE4.2 |
/// | `Sse2` | SSE2 |
///
/// OS state counts only when OSXSAVE is set. The result is monotone in the
/// flags: setting more never lowers it.
#[must_use]
pub const fn classify_bits(bits: RawFeatureBits) -> CapabilityLevel {
  type B = RawFeatureBits;

  if !bits.has(B::CPUID) {
    return CapabilityLevel::Scalar;
  }

  let os_ymm = bits.has(B::OSXSAVE.union(B::XCR0_YMM));
  let os_zmm = os_ymm && bits.has(B::XCR0_ZMM);
  let avx = bits.has(B::AVX);

  if avx && os_zmm && bits.has(B::AVX512F) {
    CapabilityLevel::Avx512F
  } else if avx && os_ymm && bits.has(B::AVX2) {
    CapabilityLevel::Avx2
  } else if avx && os_ymm {
    CapabilityLevel::Avx
  } else if bits.has(B::SSE42) {
    CapabilityLevel::Sse42
  } else if bits.has(B::SSE2) {
    CapabilityLevel::Sse2
  } else {
    CapabilityLevel::Scalar
  }
}

/// Classify using an injected probe. Not memoized.
#[inline]
#[must_use]
pub fn classify_with<P: FeatureProbe + ?Sized>(probe: &P) -> CapabilityLevel {
  classify_bits(RawFeatureBits::read(probe))
}

/// Classify the host processor. Not memoized; see
/// [`detect_cached`](crate::detect_cached).
#[inline]
#[must_use]
pub fn classify() -> CapabilityLevel {
  classify_with(&HostProbe)
}

/// Raw flags of the host processor.
#[inline]
#[must_use]
pub fn host_bits() -> RawFeatureBits {
  RawFeatureBits::read(&HostProbe)
}

#[cfg(test)]
mod tests {
  extern crate std;

  use std::string::ToString;

  use super::*;
  use crate::probe::{CountingProbe, SimulatedProbe};

  type B = RawFeatureBits;

  /// Every combination of the nine defined flags.
  fn all_combinations() -> impl Iterator<Item = RawFeatureBits> {
    (0..(1u16 << B::FLAG_COUNT)).map(B::from_raw)
  }

  fn os_ymm(bits: B) -> bool {
    bits.has(B::OSXSAVE | B::XCR0_YMM)
  }

  #[test]
  fn never_selects_level_without_os_state() {
    for bits in all_combinations() {
      let level = classify_bits(bits);
      if level >= CapabilityLevel::Avx {
        assert!(os_ymm(bits), "{bits} -> {level} without YMM state");
        assert!(bits.has(B::AVX), "{bits} -> {level} without AVX");
      }
      if level == CapabilityLevel::Avx512F {
        assert!(bits.has(B::XCR0_ZMM), "{bits} -> {level} without ZMM state");
        assert!(bits.has(B::AVX512F));
      }
      if level == CapabilityLevel::Avx2 {
        assert!(bits.has(B::AVX2));
      }
      if !bits.has(B::CPUID) {
        assert_eq!(level, CapabilityLevel::Scalar);
      }
    }
  }

  #[test]
  fn monotone_over_all_pairs() {
    for lo in all_combinations() {
      for hi in all_combinations() {
        if lo.is_subset_of(hi) {
          assert!(
            classify_bits(lo) <= classify_bits(hi),
            "{lo} -> {} but superset {hi} -> {}",
            classify_bits(lo),
            classify_bits(hi)
          );
        }
      }
    }
  }

  #[test]
  fn full_cpu_with_xmm_only_os_state_is_sse42() {
    use cpuid_bits::*;

    let probe = SimulatedProbe::unsupported()
      .with_max_leaf(7)
      .with_leaf1_edx(LEAF1_EDX_SSE2)
      .with_leaf1_ecx(LEAF1_ECX_SSE42 | LEAF1_ECX_AVX | LEAF1_ECX_OSXSAVE)
      .with_leaf7_ebx(LEAF7_EBX_AVX2 | LEAF7_EBX_AVX512F)
      .with_xcr0(0x3);
    assert_eq!(classify_with(&probe), CapabilityLevel::Sse42);
  }

  #[test]
  fn zmm_state_without_ymm_state_is_not_avx512() {
    let bits = B::CPUID | B::SSE2 | B::SSE42 | B::AVX | B::AVX512F | B::OSXSAVE | B::XCR0_ZMM;
    assert_eq!(classify_bits(bits), CapabilityLevel::Sse42);
  }

  #[test]
  fn xcr0_without_osxsave_is_ignored() {
    let bits = B::CPUID | B::SSE2 | B::AVX | B::AVX2 | B::XCR0_YMM;
    assert_eq!(classify_bits(bits), CapabilityLevel::Sse2);
  }

  #[test]
  fn unsupported_probe_is_scalar() {
    let probe = CountingProbe::new(SimulatedProbe::unsupported());
    assert_eq!(classify_with(&probe), CapabilityLevel::Scalar);
    assert_eq!(probe.cpuid_calls(), 1, "only leaf 0 is asked");
    assert_eq!(probe.xgetbv_calls(), 0);
  }

  #[test]
  fn xgetbv_skipped_without_osxsave() {
    let probe = CountingProbe::new(
      SimulatedProbe::unsupported()
        .with_max_leaf(7)
        .with_leaf1_ecx(cpuid_bits::LEAF1_ECX_AVX)
        .with_xcr0(0xE7),
    );
    assert_eq!(classify_with(&probe), CapabilityLevel::Scalar);
    assert_eq!(probe.xgetbv_calls(), 0);
  }

  #[test]
  fn leaf7_skipped_when_not_reported() {
    let probe = CountingProbe::new(
      SimulatedProbe::unsupported()
        .with_max_leaf(1)
        .with_leaf1_edx(cpuid_bits::LEAF1_EDX_SSE2)
        .with_leaf7_ebx(cpuid_bits::LEAF7_EBX_AVX2),
    );
    let bits = RawFeatureBits::read(&probe);
    assert!(!bits.has(B::AVX2));
    assert_eq!(probe.cpuid_calls(), 2);
  }

  #[test]
  fn each_level_reachable() {
    let cases = [
      (B::NONE, CapabilityLevel::Scalar),
      (B::CPUID, CapabilityLevel::Scalar),
      (B::CPUID | B::SSE2, CapabilityLevel::Sse2),
      (B::CPUID | B::SSE2 | B::SSE42, CapabilityLevel::Sse42),
      (B::CPUID | B::AVX | B::OSXSAVE | B::XCR0_YMM, CapabilityLevel::Avx),
      (B::CPUID | B::AVX | B::AVX2 | B::OSXSAVE | B::XCR0_YMM, CapabilityLevel::Avx2),
      (B::ALL, CapabilityLevel::Avx512F),
    ];
    for (bits, expected) in cases {
      assert_eq!(classify_bits(bits), expected, "{bits}");
    }
  }

  #[test]
  fn host_classification_is_stable() {
    assert_eq!(classify(), classify());
    assert_eq!(classify(), classify_bits(host_bits()));
  }

  #[test]
  #[cfg(all(target_arch = "x86_64", not(miri)))]
  fn x86_64_host_is_at_least_sse2() {
    assert!(classify() >= CapabilityLevel::Sse2);
  }

  #[test]
  fn display_lists_flag_names() {
    assert_eq!(B::NONE.to_string(), "(none)");
    assert_eq!((B::CPUID | B::SSE2 | B::XCR0_ZMM).to_string(), "cpuid sse2 xcr0.zmm");
  }

  #[test]
  fn bitset_ops() {
    let a = B::SSE2 | B::AVX;
    assert!(a.has(B::SSE2));
    assert!(!a.has(B::SSE2 | B::AVX2));
    assert_eq!(a.count(), 2);
    assert_eq!(a.difference(B::SSE2), B::AVX);
    assert_eq!(a & B::AVX, B::AVX);
    assert!(B::NONE.is_empty());
    assert_eq!(B::from_raw(u16::MAX), B::ALL);
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Property-Based Tests (proptest)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(test, not(miri)))]
mod proptests {
  use proptest::prelude::*;

  use super::*;
  use crate::probe::SimulatedProbe;

  type B = RawFeatureBits;

  proptest! {
    /// Setting more flags never lowers the level.
    #[test]
    fn adding_flags_never_lowers_level(a in any::<u16>(), b in any::<u16>()) {
      let base = B::from_raw(a);
      let more = base | B::from_raw(b);
      prop_assert!(classify_bits(base) <= classify_bits(more));
    }

    /// Clearing flags never raises the level.
    #[test]
    fn removing_flags_never_raises_level(a in any::<u16>(), b in any::<u16>()) {
      let base = B::from_raw(a);
      let fewer = base.difference(B::from_raw(b));
      prop_assert!(classify_bits(fewer) <= classify_bits(base));
    }

    #[test]
    fn probe_round_trip_classifies_like_bits(raw in any::<u16>()) {
      let bits = B::from_raw(raw);
      let probe = SimulatedProbe::from_bits(bits);
      let read = RawFeatureBits::read(&probe);
      prop_assert_eq!(classify_with(&probe), classify_bits(read));
      // OS flags hidden behind a missing OSXSAVE read back absent, never invented.
      prop_assert!(read.is_subset_of(bits));
      prop_assert!(classify_bits(read) <= classify_bits(bits));
    }
  }
}
