//! Interchangeable implementations of one operation.
//!
//! A [`VariantTable`] lists, for one operation, which [`Variant`] serves each
//! [`CapabilityLevel`]. The selection function is an exhaustive `match`, so a
//! level added to the enum fails to compile until every table covers it.
//!
//! ```ignore
//! static SCALAR: Variant<AddFn> = Variant::new("portable", CapabilityLevel::Scalar, add_scalar);
//! static AVX2: Variant<AddFn> = Variant::new("x86/avx2", CapabilityLevel::Avx2, add_avx2);
//!
//! fn select(level: CapabilityLevel) -> Option<&'static Variant<AddFn>> {
//!   match level {
//!     CapabilityLevel::Avx2 | CapabilityLevel::Avx512F => Some(&AVX2),
//!     _ => Some(&SCALAR),
//!   }
//! }
//!
//! static ADD: VariantTable<AddFn> = VariantTable::new("vector_add", &SCALAR, select);
//! ```

use core::fmt;

use platform::CapabilityLevel;

use crate::resolver;

/// One implementation of an operation.
#[derive(Clone, Copy)]
pub struct Variant<F> {
  /// Diagnostic name, e.g. `"x86/avx2"`.
  pub name: &'static str,
  /// Lowest level this implementation may run at.
  pub level: CapabilityLevel,
  pub func: F,
}

impl<F> Variant<F> {
  #[inline]
  #[must_use]
  pub const fn new(name: &'static str, level: CapabilityLevel, func: F) -> Self {
    Self { name, level, func }
  }

  /// True if this implementation may run on a host at `host`.
  #[inline]
  #[must_use]
  pub const fn runs_at(&self, host: CapabilityLevel) -> bool {
    self.level.as_u8() <= host.as_u8()
  }
}

impl<F> fmt::Debug for Variant<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Variant")
      .field("name", &self.name)
      .field("level", &self.level)
      .finish_non_exhaustive()
  }
}

/// Level → implementation mapping for one operation.
pub struct VariantTable<F: 'static> {
  operation: &'static str,
  scalar: &'static Variant<F>,
  select: fn(CapabilityLevel) -> Option<&'static Variant<F>>,
}

impl<F: 'static> VariantTable<F> {
  /// Build a table.
  ///
  /// `scalar` is the designated fallback and must require
  /// [`CapabilityLevel::Scalar`]; `select` maps every level to the variant to
  /// use there.
  #[must_use]
  pub const fn new(
    operation: &'static str,
    scalar: &'static Variant<F>,
    select: fn(CapabilityLevel) -> Option<&'static Variant<F>>,
  ) -> Self {
    Self {
      operation,
      scalar,
      select,
    }
  }

  /// Operation name, e.g. `"vector_add"`.
  #[inline]
  #[must_use]
  pub const fn operation(&self) -> &'static str {
    self.operation
  }

  /// The scalar fallback.
  #[inline]
  #[must_use]
  pub const fn scalar(&self) -> &'static Variant<F> {
    self.scalar
  }

  /// Variant for `level`, or `None` if the table has no usable entry.
  ///
  /// An entry requiring a wider level than `level` counts as unusable.
  #[inline]
  #[must_use]
  pub fn lookup(&self, level: CapabilityLevel) -> Option<&'static Variant<F>> {
    (self.select)(level).filter(|v| v.runs_at(level))
  }

  /// Variant for `level`; traps if the table has none.
  #[inline]
  pub fn resolve(&self, level: CapabilityLevel) -> &'static Variant<F> {
    resolver::checked(self.lookup(level))
  }

  /// True if every level resolves and the fallback is scalar.
  #[must_use]
  pub fn is_complete(&self) -> bool {
    self.scalar.level == CapabilityLevel::Scalar
      && CapabilityLevel::ALL.iter().all(|&level| self.lookup(level).is_some())
  }

  /// `(level, variant)` for every level, lowest first.
  pub fn entries(&self) -> impl Iterator<Item = (CapabilityLevel, Option<&'static Variant<F>>)> + '_ {
    CapabilityLevel::ALL.into_iter().map(|level| (level, self.lookup(level)))
  }
}

impl<F: 'static> fmt::Debug for VariantTable<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("VariantTable")
      .field("operation", &self.operation)
      .field("scalar", &self.scalar.name)
      .finish_non_exhaustive()
  }
}
