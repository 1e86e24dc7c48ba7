//! x86 / x86_64 SIMD kernels.
//!
//! One kernel per operation and level: SSE2 and SSE4.2 process 4 lanes, AVX
//! and AVX2 8 lanes, AVX-512F 16 lanes, with a scalar tail for the remainder.
//! Loads and stores are unaligned.
//!
//! Safety:
//! - This file is allowed to use `unsafe` for ISA-specific intrinsics.
//! - All unsafe is contained within this module.
//! - The safe `*_runtime` wrappers are crate-private and only referenced from
//!   variant tables, which never hand out a kernel above the detected level.

#![allow(unsafe_code)]

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// Define an unchecked `#[target_feature]` kernel and its runtime wrapper.
macro_rules! simd_binary {
  (
    $(#[$meta:meta])*
    $runtime:ident / $unchecked:ident:
      feature = $feature:literal,
      lanes = $lanes:literal,
      load = $load:ident,
      store = $store:ident,
      op = $op:ident,
      tail = $tail:tt $(,)?
  ) => {
    /// # Safety
    ///
    #[doc = concat!("Caller must ensure the CPU supports `", $feature, "`.")]
    #[target_feature(enable = $feature)]
    unsafe fn $unchecked(a: &[f32], b: &[f32], out: &mut [f32]) {
      let n = out.len().min(a.len()).min(b.len());
      let body = n - n % $lanes;

      let a_ptr = a.as_ptr();
      let b_ptr = b.as_ptr();
      let out_ptr = out.as_mut_ptr();

      let mut i = 0;
      while i < body {
        // SAFETY: `i + lanes <= body <= n`, in bounds for all three slices.
        unsafe {
          let va = $load(a_ptr.add(i));
          let vb = $load(b_ptr.add(i));
          $store(out_ptr.add(i), $op(va, vb));
        }
        i += $lanes;
      }

      for ((o, &x), &y) in out.iter_mut().zip(a).zip(b).skip(body) {
        *o = x $tail y;
      }
    }

    $(#[$meta])*
    #[inline]
    pub(crate) fn $runtime(a: &[f32], b: &[f32], out: &mut [f32]) {
      // SAFETY: only reachable through a variant whose level implies the
      // feature, selected at or below the detected level.
      unsafe { $unchecked(a, b, out) }
    }
  };
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE2 (128-bit)
// ─────────────────────────────────────────────────────────────────────────────

simd_binary! {
  add_sse2_runtime / add_sse2_unchecked:
    feature = "sse2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_add_ps, tail = +,
}
simd_binary! {
  sub_sse2_runtime / sub_sse2_unchecked:
    feature = "sse2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_sub_ps, tail = -,
}
simd_binary! {
  mul_sse2_runtime / mul_sse2_unchecked:
    feature = "sse2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_mul_ps, tail = *,
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE4.2 (128-bit)
// ─────────────────────────────────────────────────────────────────────────────

simd_binary! {
  add_sse42_runtime / add_sse42_unchecked:
    feature = "sse4.2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_add_ps, tail = +,
}
simd_binary! {
  sub_sse42_runtime / sub_sse42_unchecked:
    feature = "sse4.2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_sub_ps, tail = -,
}
simd_binary! {
  mul_sse42_runtime / mul_sse42_unchecked:
    feature = "sse4.2", lanes = 4, load = _mm_loadu_ps, store = _mm_storeu_ps, op = _mm_mul_ps, tail = *,
}

// ─────────────────────────────────────────────────────────────────────────────
// AVX / AVX2 (256-bit)
// ─────────────────────────────────────────────────────────────────────────────

simd_binary! {
  add_avx_runtime / add_avx_unchecked:
    feature = "avx", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_add_ps, tail = +,
}
simd_binary! {
  sub_avx_runtime / sub_avx_unchecked:
    feature = "avx", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_sub_ps, tail = -,
}
simd_binary! {
  mul_avx_runtime / mul_avx_unchecked:
    feature = "avx", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_mul_ps, tail = *,
}

simd_binary! {
  add_avx2_runtime / add_avx2_unchecked:
    feature = "avx2", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_add_ps, tail = +,
}
simd_binary! {
  sub_avx2_runtime / sub_avx2_unchecked:
    feature = "avx2", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_sub_ps, tail = -,
}
simd_binary! {
  mul_avx2_runtime / mul_avx2_unchecked:
    feature = "avx2", lanes = 8, load = _mm256_loadu_ps, store = _mm256_storeu_ps, op = _mm256_mul_ps, tail = *,
}

// ─────────────────────────────────────────────────────────────────────────────
// AVX-512F (512-bit)
// ─────────────────────────────────────────────────────────────────────────────

simd_binary! {
  add_avx512f_runtime / add_avx512f_unchecked:
    feature = "avx512f", lanes = 16, load = _mm512_loadu_ps, store = _mm512_storeu_ps, op = _mm512_add_ps, tail = +,
}
simd_binary! {
  sub_avx512f_runtime / sub_avx512f_unchecked:
    feature = "avx512f", lanes = 16, load = _mm512_loadu_ps, store = _mm512_storeu_ps, op = _mm512_sub_ps, tail = -,
}
simd_binary! {
  mul_avx512f_runtime / mul_avx512f_unchecked:
    feature = "avx512f", lanes = 16, load = _mm512_loadu_ps, store = _mm512_storeu_ps, op = _mm512_mul_ps, tail = *,
}
