//! Process-wide memoized detection.
//!
//! # Caching
//!
//! One `AtomicU8` holds the published level, starting at a sentinel outside
//! the level encoding. The first callers classify (possibly several in
//! parallel), then race a single compare-and-swap; every caller returns
//! whatever the cell holds afterwards. There are no locks, no spinning and no
//! allocation, so detection is usable from any context and in any
//! initialization order.
//!
//! # Overrides
//!
//! A ceiling can be forced before first use with [`try_set_override`]. The
//! published level is the lower of the override and what the probe reports,
//! so an override never enables instructions the host lacks. Once a level is
//! published the cell never changes and overrides are rejected.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::{
  classify::classify_with,
  error::OverrideError,
  level::CapabilityLevel,
  probe::{FeatureProbe, HostProbe},
};

/// Cell value before a level is published.
const UNSET: u8 = 0xFF;

// ─────────────────────────────────────────────────────────────────────────────
// LevelCache
// ─────────────────────────────────────────────────────────────────────────────

/// Write-once cache of a capability level.
///
/// `const`-constructible so it can live in a `static`. The process-wide
/// instance behind [`detect_cached`] is one of these; tests build their own.
#[derive(Debug)]
pub struct LevelCache {
  cell: AtomicU8,
  forced: AtomicU8,
}

impl Default for LevelCache {
  fn default() -> Self {
    Self::new()
  }
}

impl LevelCache {
  #[must_use]
  pub const fn new() -> Self {
    Self {
      cell: AtomicU8::new(UNSET),
      forced: AtomicU8::new(UNSET),
    }
  }

  /// Published level, if any. Never probes.
  #[inline]
  #[must_use]
  pub fn get(&self) -> Option<CapabilityLevel> {
    CapabilityLevel::from_u8(self.cell.load(Ordering::Acquire))
  }

  /// Published level, classifying with `probe` on first use.
  ///
  /// Concurrent first callers may each run the probe; all of them return the
  /// single value that won the publish.
  #[inline]
  pub fn get_or_classify<P: FeatureProbe + ?Sized>(&self, probe: &P) -> CapabilityLevel {
    match self.get() {
      Some(level) => level,
      None => self.publish_slow(probe),
    }
  }

  #[cold]
  #[inline(never)]
  fn publish_slow<P: FeatureProbe + ?Sized>(&self, probe: &P) -> CapabilityLevel {
    let detected = classify_with(probe);
    let computed = match CapabilityLevel::from_u8(self.forced.load(Ordering::Acquire)) {
      Some(forced) => detected.min(forced),
      None => detected,
    };
    self.publish(computed)
  }

  /// Publish `level` unless another value already won; returns the winner.
  fn publish(&self, level: CapabilityLevel) -> CapabilityLevel {
    match self
      .cell
      .compare_exchange(UNSET, level.as_u8(), Ordering::AcqRel, Ordering::Acquire)
    {
      Ok(_) => level,
      // The cell only ever holds UNSET or a valid level, and it is not UNSET here.
      Err(current) => CapabilityLevel::from_u8(current).unwrap_or(level),
    }
  }

  /// Cap the level that first use will publish.
  ///
  /// # Errors
  ///
  /// [`OverrideError::AlreadyInitialized`] once a level is published.
  pub fn try_set_override(&self, level: CapabilityLevel) -> Result<(), OverrideError> {
    if self.get().is_some() {
      return Err(OverrideError::AlreadyInitialized);
    }
    self.forced.store(level.as_u8(), Ordering::Release);
    Ok(())
  }

  /// Drop a pending override. No effect on an already published level.
  pub fn clear_override(&self) {
    self.forced.store(UNSET, Ordering::Release);
  }

  /// True if an override is pending or was applied.
  #[must_use]
  pub fn has_override(&self) -> bool {
    self.forced.load(Ordering::Acquire) != UNSET
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide cache
// ─────────────────────────────────────────────────────────────────────────────

static DETECTED: LevelCache = LevelCache::new();

/// Capability level of this process, memoized.
///
/// Thread-safe and idempotent: every call in the process returns the same
/// value. The first call probes the CPU; later calls are one atomic load.
#[inline]
#[must_use]
pub fn detect_cached() -> CapabilityLevel {
  DETECTED.get_or_classify(&HostProbe)
}

/// Level already published by [`detect_cached`], without probing.
#[inline]
#[must_use]
pub fn cached_level() -> Option<CapabilityLevel> {
  DETECTED.get()
}

/// Cap the process-wide level.
///
/// Contract: pre-init only. Once [`detect_cached`] has published, this returns
/// [`OverrideError::AlreadyInitialized`].
#[cold]
pub fn try_set_override(level: CapabilityLevel) -> Result<(), OverrideError> {
  DETECTED.try_set_override(level)
}

/// Cap the process-wide level.
///
/// # Panics
///
/// If detection has already published a level.
#[cold]
pub fn set_override(level: CapabilityLevel) {
  if let Err(err) = try_set_override(level) {
    panic!("platform::set_override failed: {err}");
  }
}

/// Drop a pending process-wide override.
#[cold]
pub fn clear_override() {
  DETECTED.clear_override();
}

/// True if a process-wide override is pending or was applied.
#[inline]
#[must_use]
pub fn has_override() -> bool {
  DETECTED.has_override()
}
