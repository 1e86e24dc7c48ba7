//! Runtime vector capability detection for vecdispatch.
//!
//! This crate answers one question, once per process: which vector extension
//! may this code use? The answer is a [`CapabilityLevel`], an ordered enum
//! from [`Scalar`](CapabilityLevel::Scalar) to
//! [`Avx512F`](CapabilityLevel::Avx512F).
//!
//! # Layers
//!
//! - [`probe`]: raw CPUID / XGETBV queries behind the [`FeatureProbe`] trait.
//! - [`mod@classify`]: collapses raw bits into a level, gating wide registers on
//!   OS support. Pure, not memoized.
//! - [`detect_cached`]: lock-free process-wide memoization.
//!
//! ```
//! let level = platform::detect_cached();
//! assert_eq!(level, platform::detect_cached());
//! println!("running at {level}");
//! ```
//!
//! # Miri
//!
//! Under Miri every probe answers zero and detection yields `Scalar`.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

// ─────────────────────────────────────────────────────────────────────────────
// Core modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod classify;
mod detect;
mod error;
mod level;
pub mod probe;

#[cfg(feature = "std")]
mod config;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

use core::fmt;

pub use classify::{RawFeatureBits, classify, classify_bits, classify_with};
#[cfg(feature = "std")]
pub use config::{Config, MAX_LEVEL_ENV};
pub use detect::{
  LevelCache, cached_level, clear_override, detect_cached, has_override, set_override, try_set_override,
};
#[cfg(feature = "std")]
pub use error::ConfigError;
pub use error::{InvalidLevel, OverrideError, ParseLevelError};
pub use level::{CapabilityLevel, level_name};
pub use probe::{CpuidResult, FeatureProbe, HostProbe};

/// Target architecture family, as far as detection is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Arch {
  X86_64,
  X86,
  /// No CPUID; always `Scalar`.
  Other,
}

impl Arch {
  /// Architecture of this build.
  #[must_use]
  pub const fn current() -> Self {
    if cfg!(target_arch = "x86_64") {
      Self::X86_64
    } else if cfg!(target_arch = "x86") {
      Self::X86
    } else {
      Self::Other
    }
  }

  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::X86 => "x86",
      Self::Other => "other",
    }
  }
}

/// Snapshot of detection state, for logs and bug reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Description {
  pub arch: Arch,
  /// Level in effect for this process.
  pub level: CapabilityLevel,
  /// Flags the host reports right now.
  pub raw: RawFeatureBits,
  /// Whether an override capped the level.
  pub overridden: bool,
}

impl fmt::Display for Description {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} level={} raw=[{}]", self.arch.name(), self.level, self.raw)?;
    if self.overridden {
      f.write_str(" (override)")?;
    }
    Ok(())
  }
}

/// Describe the detection state of this process.
///
/// Publishes the level if nothing has yet.
#[must_use]
pub fn describe() -> Description {
  Description {
    arch: Arch::current(),
    level: detect_cached(),
    raw: classify::host_bits(),
    overridden: has_override(),
  }
}
