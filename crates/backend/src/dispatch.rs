//! Process-wide bindings from an operation to its chosen variant.
//!
//! A [`Dispatcher`] lives in a `static` next to the operation's public entry
//! point. The first call resolves: it asks the level source (normally
//! [`platform::detect_cached`]), looks the level up in the operation's
//! [`VariantTable`], runs the result through the trap-on-null check and
//! publishes the variant with one compare-and-swap. Every later call is one
//! acquire load plus the indirect call.
//!
//! # Usage
//!
//! ```ignore
//! static ADD: Dispatcher<AddFn> = Dispatcher::new(&ADD_TABLE);
//!
//! pub fn add(a: &[f32], b: &[f32], out: &mut [f32]) {
//!   (ADD.get().func)(a, b, out)
//! }
//! ```
//!
//! Racing first callers may each resolve; the first publish wins and the rest
//! adopt it. No locks, no spinning, no allocation.

use core::{
  fmt, ptr,
  sync::atomic::{AtomicPtr, AtomicU8, Ordering},
};

use platform::CapabilityLevel;

use crate::{
  resolver,
  variant::{Variant, VariantTable},
};

const UNRESOLVED: u8 = 0;
const RESOLVING: u8 = 1;
const RESOLVED: u8 = 2;

/// Lifecycle of a binding.
///
/// A resolution that finds nothing never reaches a state: the process traps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingState {
  /// No caller has needed the binding yet.
  Unresolved,
  /// At least one caller is resolving.
  Resolving,
  /// Published; terminal.
  Resolved,
}

/// Lazily resolved, write-once binding for one operation.
pub struct Dispatcher<F: 'static> {
  slot: AtomicPtr<Variant<F>>,
  phase: AtomicU8,
  table: &'static VariantTable<F>,
  level_source: fn() -> CapabilityLevel,
}

impl<F: 'static> Dispatcher<F> {
  /// Binding that resolves against the process-wide detected level.
  #[must_use]
  pub const fn new(table: &'static VariantTable<F>) -> Self {
    Self::with_level_source(table, platform::detect_cached)
  }

  /// Binding that resolves against `level_source` instead of host detection.
  #[must_use]
  pub const fn with_level_source(table: &'static VariantTable<F>, level_source: fn() -> CapabilityLevel) -> Self {
    Self {
      slot: AtomicPtr::new(ptr::null_mut()),
      phase: AtomicU8::new(UNRESOLVED),
      table,
      level_source,
    }
  }

  /// The bound variant, resolving on first use.
  #[inline]
  pub fn get(&self) -> &'static Variant<F> {
    let bound = self.slot.load(Ordering::Acquire);
    if bound.is_null() {
      return self.resolve_slow();
    }
    Self::deref(bound)
  }

  /// Resolve now instead of on first call.
  #[inline]
  pub fn init(&self) -> &'static Variant<F> {
    self.get()
  }

  /// Name of the bound variant, resolving on first use.
  #[inline]
  pub fn kernel_name(&self) -> &'static str {
    self.get().name
  }

  /// The bound variant, if already resolved. Never resolves.
  #[inline]
  #[must_use]
  pub fn peek(&self) -> Option<&'static Variant<F>> {
    let bound = self.slot.load(Ordering::Acquire);
    if bound.is_null() { None } else { Some(Self::deref(bound)) }
  }

  #[must_use]
  pub fn state(&self) -> BindingState {
    if !self.slot.load(Ordering::Acquire).is_null() {
      return BindingState::Resolved;
    }
    match self.phase.load(Ordering::Acquire) {
      RESOLVING => BindingState::Resolving,
      _ => BindingState::Unresolved,
    }
  }

  /// The table this binding resolves from.
  #[inline]
  #[must_use]
  pub const fn table(&self) -> &'static VariantTable<F> {
    self.table
  }

  #[cold]
  #[inline(never)]
  fn resolve_slow(&self) -> &'static Variant<F> {
    let _ = self
      .phase
      .compare_exchange(UNRESOLVED, RESOLVING, Ordering::AcqRel, Ordering::Acquire);

    let level = (self.level_source)();
    let chosen: &'static Variant<F> = self.table.resolve(level);
    let chosen_ptr = ptr::from_ref(chosen).cast_mut();

    match self
      .slot
      .compare_exchange(ptr::null_mut(), chosen_ptr, Ordering::AcqRel, Ordering::Acquire)
    {
      Ok(_) => {
        self.phase.store(RESOLVED, Ordering::Release);
        #[cfg(feature = "tracing")]
        tracing::debug!(
          operation = self.table.operation(),
          level = level.name(),
          kernel = chosen.name,
          "dispatch bound"
        );
        chosen
      }
      Err(winner) => Self::deref(winner),
    }
  }

  #[inline(always)]
  #[allow(unsafe_code)]
  fn deref(bound: *mut Variant<F>) -> &'static Variant<F> {
    let bound = resolver::checked_ptr(bound.cast_const());
    // SAFETY: the slot only ever holds null or a pointer taken from a
    // `&'static Variant<F>` in `resolve_slow`; null is excluded above.
    unsafe { bound.as_ref() }
  }
}

impl<F: 'static> fmt::Debug for Dispatcher<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dispatcher")
      .field("operation", &self.table.operation())
      .field("state", &self.state())
      .field("kernel", &self.peek().map(|v| v.name))
      .finish()
  }
}
