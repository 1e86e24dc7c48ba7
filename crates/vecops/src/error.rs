//! Argument validation errors.

use thiserror::Error;

/// Operand and output slices of an elementwise call differ in length.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("slice length mismatch: lhs={lhs}, rhs={rhs}, out={out}")]
pub struct LengthMismatch {
  pub lhs: usize,
  pub rhs: usize,
  pub out: usize,
}

impl LengthMismatch {
  /// `Ok` when all three lengths agree.
  #[inline]
  pub(crate) const fn check(lhs: usize, rhs: usize, out: usize) -> Result<(), Self> {
    if lhs == rhs && rhs == out {
      Ok(())
    } else {
      Err(Self { lhs, rhs, out })
    }
  }
}
