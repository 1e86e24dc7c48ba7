//! Elementwise `f32` vector kernels, bound once per process to the widest
//! SIMD level the host supports.
//!
//! | Entry point | Operation |
//! |-------------|-----------|
//! | [`add_f32`] | `out[i] = a[i] + b[i]` |
//! | [`sub_f32`] | `out[i] = a[i] - b[i]` |
//! | [`mul_f32`] | `out[i] = a[i] * b[i]` |
//!
//! Each entry point is backed by a static binding that resolves on first call
//! (or in [`init`]) through `platform::detect_cached`. After that a call is
//! one atomic load and one indirect call. Results are identical at every
//! level: the SIMD kernels perform the same IEEE-754 single operation per
//! element as the portable fallback.
//!
//! # Example
//!
//! ```rust
//! let a = [1.0f32, 2.0, 3.0];
//! let b = [4.0f32, 5.0, 6.0];
//! let mut out = [0.0f32; 3];
//!
//! vecops::add_f32(&a, &b, &mut out).unwrap();
//! assert_eq!(out, [5.0, 7.0, 9.0]);
//!
//! assert!(vecops::mul_f32(&a, &b[..2], &mut out).is_err());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod dispatch;
mod error;
mod introspect;
mod portable;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;

pub use dispatch::{ADD, FAMILIES, Family, MUL, SUB};
pub use error::LengthMismatch;
pub use introspect::DispatchInfo;
pub use platform::CapabilityLevel;

/// `out[i] = a[i] + b[i]`.
///
/// # Errors
///
/// [`LengthMismatch`] unless all three slices have the same length; `out` is
/// left untouched.
#[inline]
pub fn add_f32(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), LengthMismatch> {
  LengthMismatch::check(a.len(), b.len(), out.len())?;
  (dispatch::add::BINDING.get().func)(a, b, out);
  Ok(())
}

/// `out[i] = a[i] - b[i]`.
///
/// # Errors
///
/// [`LengthMismatch`] unless all three slices have the same length.
#[inline]
pub fn sub_f32(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), LengthMismatch> {
  LengthMismatch::check(a.len(), b.len(), out.len())?;
  (dispatch::sub::BINDING.get().func)(a, b, out);
  Ok(())
}

/// `out[i] = a[i] * b[i]`.
///
/// # Errors
///
/// [`LengthMismatch`] unless all three slices have the same length.
#[inline]
pub fn mul_f32(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), LengthMismatch> {
  LengthMismatch::check(a.len(), b.len(), out.len())?;
  (dispatch::mul::BINDING.get().func)(a, b, out);
  Ok(())
}

/// Bind every entry point now instead of on first call.
///
/// Idempotent. Returns the level the bindings resolved against.
pub fn init() -> CapabilityLevel {
  for family in FAMILIES {
    family.init();
  }
  platform::detect_cached()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entry_points_compute() {
    let a = [1.0f32, 2.0, 3.0, 4.0, 5.0];
    let b = [2.0f32; 5];
    let mut out = [0.0f32; 5];

    add_f32(&a, &b, &mut out).unwrap();
    assert_eq!(out, [3.0, 4.0, 5.0, 6.0, 7.0]);
    sub_f32(&a, &b, &mut out).unwrap();
    assert_eq!(out, [-1.0, 0.0, 1.0, 2.0, 3.0]);
    mul_f32(&a, &b, &mut out).unwrap();
    assert_eq!(out, [2.0, 4.0, 6.0, 8.0, 10.0]);
  }

  #[test]
  fn mismatch_leaves_output_untouched() {
    let mut out = [9.0f32; 3];
    assert_eq!(
      add_f32(&[1.0; 3], &[1.0; 2], &mut out),
      Err(LengthMismatch { lhs: 3, rhs: 2, out: 3 })
    );
    assert_eq!(out, [9.0; 3]);
  }

  #[test]
  fn init_resolves_every_binding() {
    let level = init();
    assert_eq!(level, platform::detect_cached());
    for family in FAMILIES {
      assert_eq!(family.state(), backend::BindingState::Resolved);
      assert_eq!(family.kernel_name(), family.kernel_for(level));
    }
    assert_eq!(init(), level);
  }
}
