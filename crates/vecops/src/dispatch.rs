//! Variant tables and process-wide bindings for each kernel family.
//!
//! | Level | Kernel name |
//! |-------|-------------|
//! | `Scalar` | `portable` |
//! | `SSE2` | `x86/sse2` |
//! | `SSE4.2` | `x86/sse4.2` |
//! | `AVX` | `x86/avx` |
//! | `AVX2` | `x86/avx2` |
//! | `AVX-512F` | `x86/avx512f` |
//!
//! On targets without x86 kernels every level maps to `portable`.

use backend::{CapabilityLevel, Dispatcher, Variant, VariantTable};

use crate::portable::BinaryF32Fn;

/// Build the variant statics, selection `match`, table and binding of one
/// family. Kernel paths must be absolute (`crate::...`).
macro_rules! variant_family {
  (
    $family:ident = $operation:literal {
      portable: $portable:path,
      sse2: $sse2:path,
      sse42: $sse42:path,
      avx: $avx:path,
      avx2: $avx2:path,
      avx512f: $avx512f:path $(,)?
    }
  ) => {
    pub(crate) mod $family {
      use super::*;

      pub(crate) static PORTABLE: Variant<BinaryF32Fn> =
        Variant::new("portable", CapabilityLevel::Scalar, $portable as BinaryF32Fn);

      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      mod x86 {
        use super::*;

        pub(super) static SSE2: Variant<BinaryF32Fn> =
          Variant::new("x86/sse2", CapabilityLevel::Sse2, $sse2 as BinaryF32Fn);
        pub(super) static SSE42: Variant<BinaryF32Fn> =
          Variant::new("x86/sse4.2", CapabilityLevel::Sse42, $sse42 as BinaryF32Fn);
        pub(super) static AVX: Variant<BinaryF32Fn> =
          Variant::new("x86/avx", CapabilityLevel::Avx, $avx as BinaryF32Fn);
        pub(super) static AVX2: Variant<BinaryF32Fn> =
          Variant::new("x86/avx2", CapabilityLevel::Avx2, $avx2 as BinaryF32Fn);
        pub(super) static AVX512F: Variant<BinaryF32Fn> =
          Variant::new("x86/avx512f", CapabilityLevel::Avx512F, $avx512f as BinaryF32Fn);
      }

      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      fn select(level: CapabilityLevel) -> Option<&'static Variant<BinaryF32Fn>> {
        Some(match level {
          CapabilityLevel::Scalar => &PORTABLE,
          CapabilityLevel::Sse2 => &x86::SSE2,
          CapabilityLevel::Sse42 => &x86::SSE42,
          CapabilityLevel::Avx => &x86::AVX,
          CapabilityLevel::Avx2 => &x86::AVX2,
          CapabilityLevel::Avx512F => &x86::AVX512F,
        })
      }

      #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
      fn select(level: CapabilityLevel) -> Option<&'static Variant<BinaryF32Fn>> {
        match level {
          CapabilityLevel::Scalar
          | CapabilityLevel::Sse2
          | CapabilityLevel::Sse42
          | CapabilityLevel::Avx
          | CapabilityLevel::Avx2
          | CapabilityLevel::Avx512F => Some(&PORTABLE),
        }
      }

      /// Every variant compiled for this target, lowest level first.
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      pub(crate) static VARIANTS: [&Variant<BinaryF32Fn>; 6] =
        [&PORTABLE, &x86::SSE2, &x86::SSE42, &x86::AVX, &x86::AVX2, &x86::AVX512F];

      #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
      pub(crate) static VARIANTS: [&Variant<BinaryF32Fn>; 1] = [&PORTABLE];

      pub(crate) static TABLE: VariantTable<BinaryF32Fn> = VariantTable::new($operation, &PORTABLE, select);

      pub(crate) static BINDING: Dispatcher<BinaryF32Fn> = Dispatcher::new(&TABLE);
    }
  };
}

variant_family! {
  add = "vector_add" {
    portable: crate::portable::add,
    sse2: crate::x86::add_sse2_runtime,
    sse42: crate::x86::add_sse42_runtime,
    avx: crate::x86::add_avx_runtime,
    avx2: crate::x86::add_avx2_runtime,
    avx512f: crate::x86::add_avx512f_runtime,
  }
}

variant_family! {
  sub = "vector_sub" {
    portable: crate::portable::sub,
    sse2: crate::x86::sub_sse2_runtime,
    sse42: crate::x86::sub_sse42_runtime,
    avx: crate::x86::sub_avx_runtime,
    avx2: crate::x86::sub_avx2_runtime,
    avx512f: crate::x86::sub_avx512f_runtime,
  }
}

variant_family! {
  mul = "vector_mul" {
    portable: crate::portable::mul,
    sse2: crate::x86::mul_sse2_runtime,
    sse42: crate::x86::mul_sse42_runtime,
    avx: crate::x86::mul_avx_runtime,
    avx2: crate::x86::mul_avx2_runtime,
    avx512f: crate::x86::mul_avx512f_runtime,
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public family handles
// ─────────────────────────────────────────────────────────────────────────────

/// A kernel family: one operation, one binding.
///
/// Exposes names and levels only; kernels are reached through the checked
/// entry points ([`add_f32`](crate::add_f32) and friends).
#[derive(Clone, Copy)]
pub struct Family {
  table: &'static VariantTable<BinaryF32Fn>,
  binding: &'static Dispatcher<BinaryF32Fn>,
  variants: &'static [&'static Variant<BinaryF32Fn>],
}

impl Family {
  /// Operation name, e.g. `"vector_add"`.
  #[inline]
  #[must_use]
  pub fn operation(&self) -> &'static str {
    self.table.operation()
  }

  /// Kernel bound for this process, resolving on first use.
  #[inline]
  pub fn kernel_name(&self) -> &'static str {
    self.binding.kernel_name()
  }

  /// Kernel the family would bind at `level`.
  #[inline]
  pub fn kernel_for(&self, level: CapabilityLevel) -> &'static str {
    self.table.resolve(level).name
  }

  /// Binding lifecycle.
  #[inline]
  #[must_use]
  pub fn state(&self) -> backend::BindingState {
    self.binding.state()
  }

  /// Resolve the binding now.
  #[inline]
  pub fn init(&self) -> &'static str {
    self.binding.init().name
  }

  /// `(name, required level)` of every kernel compiled for this target.
  pub fn kernels(&self) -> impl Iterator<Item = (&'static str, CapabilityLevel)> {
    self.variants.iter().map(|v| (v.name, v.level))
  }

  pub(crate) const fn table(&self) -> &'static VariantTable<BinaryF32Fn> {
    self.table
  }

  pub(crate) const fn binding(&self) -> &'static Dispatcher<BinaryF32Fn> {
    self.binding
  }

  pub(crate) const fn variants(&self) -> &'static [&'static Variant<BinaryF32Fn>] {
    self.variants
  }
}

impl core::fmt::Debug for Family {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Family")
      .field("operation", &self.operation())
      .field("binding", self.binding)
      .finish_non_exhaustive()
  }
}

pub static ADD: Family = Family {
  table: &add::TABLE,
  binding: &add::BINDING,
  variants: &add::VARIANTS,
};

pub static SUB: Family = Family {
  table: &sub::TABLE,
  binding: &sub::BINDING,
  variants: &sub::VARIANTS,
};

pub static MUL: Family = Family {
  table: &mul::TABLE,
  binding: &mul::BINDING,
  variants: &mul::VARIANTS,
};

/// Every family, in feature-list order.
pub static FAMILIES: [&Family; 3] = [&ADD, &MUL, &SUB];


// ─────────────────────────────────────────────────────────────────────────────
// Property-Based Tests (proptest)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(test, not(miri)))]
mod proptests {
  extern crate std;

  use std::vec::Vec;

  use proptest::prelude::*;

  use super::*;

  /// Two equal-length vectors of finite values; lengths cover every tail size.
  fn operands() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (0usize..160).prop_flat_map(|n| {
      (
        prop::collection::vec(-1.0e6f32..1.0e6, n),
        prop::collection::vec(-1.0e6f32..1.0e6, n),
      )
    })
  }

  proptest! {
    /// Every kernel runnable on this host matches the portable kernel bit for bit.
    #[test]
    fn runnable_kernels_match_portable((a, b) in operands()) {
      let host = platform::detect_cached();
      for family in FAMILIES {
        let mut expected = std::vec![0.0f32; a.len()];
        (family.table().scalar().func)(&a, &b, &mut expected);

        for variant in family.variants().iter().filter(|v| v.runs_at(host)) {
          let mut got = std::vec![f32::NAN; a.len()];
          (variant.func)(&a, &b, &mut got);
          let got_bits: Vec<u32> = got.iter().map(|x| x.to_bits()).collect();
          let expected_bits: Vec<u32> = expected.iter().map(|x| x.to_bits()).collect();
          prop_assert_eq!(got_bits, expected_bits, "{} {}", family.operation(), variant.name);
        }
      }
    }

    /// Kernels never write past the shortest operand.
    #[test]
    fn runnable_kernels_respect_shortest_slice(
      (a, b) in operands(),
      extra in 0usize..20,
    ) {
      let host = platform::detect_cached();
      for family in FAMILIES {
        for variant in family.variants().iter().filter(|v| v.runs_at(host)) {
          let mut out = std::vec![7.5f32; a.len() + extra];
          (variant.func)(&a, &b, &mut out);
          prop_assert!(out[a.len()..].iter().all(|&x| x == 7.5), "{}", variant.name);
        }
      }
    }
  }
}
