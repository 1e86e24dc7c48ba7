//! Runtime SIMD capability detection and once-per-process dispatch.
//!
//! ```
//! use vecdispatch::CapabilityLevel;
//!
//! let level = vecdispatch::detect_cached();
//! assert_eq!(level, vecdispatch::detect_cached());
//! println!("running at {level} ({})", vecdispatch::level_name(level.as_u8()));
//! assert!(level <= CapabilityLevel::MAX);
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | Yes | Environment configuration, trap via `abort` on non-x86 targets |
//! | `ops` | No | Elementwise `f32` kernels (`vector_add`, `vector_mul`, `vector_sub`) |
//! | `tracing` | No | `tracing` events when bindings publish or a ceiling applies |
//!
//! ## Writing a dispatched operation
//!
//! ```
//! use vecdispatch::backend::{CapabilityLevel, Dispatcher, Variant, VariantTable};
//!
//! type CountFn = fn(&[u8]) -> usize;
//!
//! fn count_portable(data: &[u8]) -> usize {
//!   data.len()
//! }
//!
//! static PORTABLE: Variant<CountFn> = Variant::new("portable", CapabilityLevel::Scalar, count_portable as CountFn);
//!
//! fn select(_: CapabilityLevel) -> Option<&'static Variant<CountFn>> {
//!   Some(&PORTABLE)
//! }
//!
//! static TABLE: VariantTable<CountFn> = VariantTable::new("count", &PORTABLE, select);
//! static COUNT: Dispatcher<CountFn> = Dispatcher::new(&TABLE);
//!
//! assert_eq!((COUNT.get().func)(b"abc"), 3);
//! ```
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// Detection
// =============================================================================

pub use backend;
pub use backend::safe_resolver;
#[cfg(feature = "std")]
pub use platform::{Config, ConfigError, MAX_LEVEL_ENV};
pub use platform::{
  CapabilityLevel, Description, OverrideError, ParseLevelError, cached_level, classify, clear_override, describe,
  detect_cached, has_override, level_name, set_override, try_set_override,
};
pub use platform;

// =============================================================================
// Kernels
// =============================================================================

#[cfg(feature = "ops")]
pub use vecops::{DispatchInfo, LengthMismatch, add_f32, mul_f32, sub_f32};
#[cfg(feature = "ops")]
pub use vecops;

// =============================================================================
// Feature groups
// =============================================================================

#[cfg(not(feature = "ops"))]
const FEATURES: &[&str] = &["core"];

#[cfg(feature = "ops")]
const FEATURES: &[&str] = &["core", "vector_add", "vector_mul", "vector_sub"];

/// Feature groups compiled into this build, sorted after `"core"`.
#[inline]
#[must_use]
pub const fn features() -> &'static [&'static str] {
  FEATURES
}

/// Bind every compiled operation now and return the level in effect.
///
/// Without `ops` this only runs detection.
pub fn init() -> CapabilityLevel {
  #[cfg(feature = "ops")]
  {
    vecops::init()
  }
  #[cfg(not(feature = "ops"))]
  {
    detect_cached()
  }
}
