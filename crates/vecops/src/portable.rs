//! Portable kernels; the scalar fallback of every family.
//!
//! Each kernel writes `out[i] = a[i] op b[i]` for every index present in all
//! three slices and leaves the rest of `out` untouched.

/// Signature shared by every elementwise binary kernel.
pub type BinaryF32Fn = fn(&[f32], &[f32], &mut [f32]);

#[inline]
pub(crate) fn add(a: &[f32], b: &[f32], out: &mut [f32]) {
  for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
    *o = x + y;
  }
}

#[inline]
pub(crate) fn sub(a: &[f32], b: &[f32], out: &mut [f32]) {
  for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
    *o = x - y;
  }
}

#[inline]
pub(crate) fn mul(a: &[f32], b: &[f32], out: &mut [f32]) {
  for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
    *o = x * y;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elementwise_results() {
    let a = [1.0f32, 2.0, 3.0, -4.0];
    let b = [0.5f32, -2.0, 3.0, 4.0];
    let mut out = [0.0f32; 4];

    add(&a, &b, &mut out);
    assert_eq!(out, [1.5, 0.0, 6.0, 0.0]);
    sub(&a, &b, &mut out);
    assert_eq!(out, [0.5, 4.0, 0.0, -8.0]);
    mul(&a, &b, &mut out);
    assert_eq!(out, [0.5, -4.0, 9.0, -16.0]);
  }

  #[test]
  fn shortest_slice_bounds_the_write() {
    let mut out = [9.0f32; 4];
    add(&[1.0, 1.0], &[1.0, 1.0, 1.0], &mut out);
    assert_eq!(out, [2.0, 2.0, 9.0, 9.0]);
  }

  #[test]
  fn empty_inputs_are_a_no_op() {
    let mut out: [f32; 0] = [];
    mul(&[], &[], &mut out);
  }
}
