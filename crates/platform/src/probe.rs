//! Raw hardware queries: CPUID and XGETBV.
//!
//! Nothing here interprets the answers. [`crate::classify`] turns them into a
//! [`CapabilityLevel`](crate::CapabilityLevel).
//!
//! On targets without CPUID (and under Miri) every query answers zero, which
//! the classifier reads as "no vector extensions".

/// Register file returned by a CPUID query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuidResult {
  pub eax: u32,
  pub ebx: u32,
  pub ecx: u32,
  pub edx: u32,
}

impl CpuidResult {
  /// All registers zero; the answer of an unsupported probe.
  pub const ZERO: Self = Self {
    eax: 0,
    ebx: 0,
    ecx: 0,
    edx: 0,
  };
}

/// Source of raw processor answers.
///
/// The classifier is written against this trait so tests can script the
/// hardware. [`HostProbe`] asks the real CPU.
pub trait FeatureProbe {
  /// Query CPUID `leaf`/`subleaf`.
  fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult;

  /// Read extended control register `index`.
  ///
  /// Callers only ask after observing OSXSAVE in leaf 1.
  fn xgetbv(&self, index: u32) -> u64;
}

impl<P: FeatureProbe + ?Sized> FeatureProbe for &P {
  #[inline]
  fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
    (**self).cpuid(leaf, subleaf)
  }

  #[inline]
  fn xgetbv(&self, index: u32) -> u64 {
    (**self).xgetbv(index)
  }
}

/// The processor this code runs on.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostProbe;

impl FeatureProbe for HostProbe {
  #[inline]
  fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
    query_processor_features(leaf, subleaf)
  }

  #[inline]
  fn xgetbv(&self, index: u32) -> u64 {
    query_extended_control_register(index)
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host queries
// ─────────────────────────────────────────────────────────────────────────────

/// OSXSAVE: leaf 1 ECX bit 27.
const OSXSAVE_BIT: u32 = 1 << 27;

/// Execute CPUID for `leaf`/`subleaf`.
///
/// Returns [`CpuidResult::ZERO`] when the instruction is unavailable: non-x86
/// targets, 32-bit parts without CPUID, and Miri.
#[inline]
#[must_use]
pub fn query_processor_features(leaf: u32, subleaf: u32) -> CpuidResult {
  #[cfg(all(target_arch = "x86_64", not(miri)))]
  {
    let r = core::arch::x86_64::__cpuid_count(leaf, subleaf);
    CpuidResult {
      eax: r.eax,
      ebx: r.ebx,
      ecx: r.ecx,
      edx: r.edx,
    }
  }

  #[cfg(all(target_arch = "x86", not(miri)))]
  {
    use core::arch::x86::{__cpuid_count, has_cpuid};

    if !has_cpuid() {
      return CpuidResult::ZERO;
    }
    let r = __cpuid_count(leaf, subleaf);
    CpuidResult {
      eax: r.eax,
      ebx: r.ebx,
      ecx: r.ecx,
      edx: r.edx,
    }
  }

  #[cfg(any(not(any(target_arch = "x86", target_arch = "x86_64")), miri))]
  {
    let _ = (leaf, subleaf);
    CpuidResult::ZERO
  }
}

/// Read XCR0-style extended control register `index`.
///
/// Returns 0 unless the OS has enabled XSAVE (OSXSAVE set); XGETBV faults
/// otherwise.
#[inline]
#[must_use]
pub fn query_extended_control_register(index: u32) -> u64 {
  if query_processor_features(0, 0).eax < 1 {
    return 0;
  }
  if query_processor_features(1, 0).ecx & OSXSAVE_BIT == 0 {
    return 0;
  }
  xgetbv_unchecked(index)
}

#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), not(miri)))]
#[allow(unsafe_code)]
#[inline]
fn xgetbv_unchecked(index: u32) -> u64 {
  #[cfg(target_arch = "x86")]
  use core::arch::x86::_xgetbv;
  #[cfg(target_arch = "x86_64")]
  use core::arch::x86_64::_xgetbv;

  // SAFETY: only reached after OSXSAVE was observed, so XGETBV is enabled.
  unsafe { _xgetbv(index) }
}

#[cfg(any(not(any(target_arch = "x86", target_arch = "x86_64")), miri))]
#[inline]
fn xgetbv_unchecked(index: u32) -> u64 {
  let _ = index;
  0
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe doubles
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "testing"))]
pub use testing::{CountingProbe, SimulatedProbe};

#[cfg(any(test, feature = "testing"))]
mod testing {
  use core::sync::atomic::{AtomicUsize, Ordering};

  use super::{CpuidResult, FeatureProbe};
  use crate::classify::{RawFeatureBits, cpuid_bits};

  /// Scripted answers for leaves 0, 1 and 7 plus XCR0.
  ///
  /// Any other leaf answers zero. Build with [`SimulatedProbe::unsupported`]
  /// and the `with_*` methods, or derive one from feature bits with
  /// [`SimulatedProbe::from_bits`].
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
  pub struct SimulatedProbe {
    max_leaf: u32,
    leaf1_ecx: u32,
    leaf1_edx: u32,
    leaf7_ebx: u32,
    xcr0: u64,
  }

  impl SimulatedProbe {
    /// A machine whose CPUID reports nothing, as on non-x86 targets.
    #[must_use]
    pub const fn unsupported() -> Self {
      Self {
        max_leaf: 0,
        leaf1_ecx: 0,
        leaf1_edx: 0,
        leaf7_ebx: 0,
        xcr0: 0,
      }
    }

    /// Highest standard leaf reported by leaf 0.
    #[must_use]
    pub const fn with_max_leaf(mut self, max_leaf: u32) -> Self {
      self.max_leaf = max_leaf;
      self
    }

    /// Set leaf 1 ECX bits.
    #[must_use]
    pub const fn with_leaf1_ecx(mut self, bits: u32) -> Self {
      self.leaf1_ecx |= bits;
      self
    }

    /// Set leaf 1 EDX bits.
    #[must_use]
    pub const fn with_leaf1_edx(mut self, bits: u32) -> Self {
      self.leaf1_edx |= bits;
      self
    }

    /// Set leaf 7 subleaf 0 EBX bits.
    #[must_use]
    pub const fn with_leaf7_ebx(mut self, bits: u32) -> Self {
      self.leaf7_ebx |= bits;
      self
    }

    /// XCR0 value returned by XGETBV(0).
    #[must_use]
    pub const fn with_xcr0(mut self, xcr0: u64) -> Self {
      self.xcr0 = xcr0;
      self
    }

    /// A probe whose answers read back as `bits`.
    ///
    /// OS-state flags are only observable through OSXSAVE, so `XCR0_*` bits
    /// without `OSXSAVE` read back as absent.
    #[must_use]
    pub const fn from_bits(bits: RawFeatureBits) -> Self {
      if !bits.has(RawFeatureBits::CPUID) {
        return Self::unsupported();
      }
      let mut ecx = 0;
      let mut edx = 0;
      let mut ebx7 = 0;
      let mut xcr0 = 0;
      if bits.has(RawFeatureBits::SSE2) {
        edx |= cpuid_bits::LEAF1_EDX_SSE2;
      }
      if bits.has(RawFeatureBits::SSE42) {
        ecx |= cpuid_bits::LEAF1_ECX_SSE42;
      }
      if bits.has(RawFeatureBits::OSXSAVE) {
        ecx |= cpuid_bits::LEAF1_ECX_OSXSAVE;
      }
      if bits.has(RawFeatureBits::AVX) {
        ecx |= cpuid_bits::LEAF1_ECX_AVX;
      }
      if bits.has(RawFeatureBits::AVX2) {
        ebx7 |= cpuid_bits::LEAF7_EBX_AVX2;
      }
      if bits.has(RawFeatureBits::AVX512F) {
        ebx7 |= cpuid_bits::LEAF7_EBX_AVX512F;
      }
      if bits.has(RawFeatureBits::XCR0_YMM) {
        xcr0 |= cpuid_bits::XCR0_YMM_MASK;
      }
      if bits.has(RawFeatureBits::XCR0_ZMM) {
        xcr0 |= cpuid_bits::XCR0_ZMM_MASK;
      }
      Self {
        max_leaf: 7,
        leaf1_ecx: ecx,
        leaf1_edx: edx,
        leaf7_ebx: ebx7,
        xcr0,
      }
    }
  }

  impl FeatureProbe for SimulatedProbe {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
      if leaf > self.max_leaf {
        return CpuidResult::ZERO;
      }
      match (leaf, subleaf) {
        (0, _) => CpuidResult {
          eax: self.max_leaf,
          ..CpuidResult::ZERO
        },
        (1, _) => CpuidResult {
          ecx: self.leaf1_ecx,
          edx: self.leaf1_edx,
          ..CpuidResult::ZERO
        },
        (7, 0) => CpuidResult {
          ebx: self.leaf7_ebx,
          ..CpuidResult::ZERO
        },
        _ => CpuidResult::ZERO,
      }
    }

    fn xgetbv(&self, index: u32) -> u64 {
      if index == 0 { self.xcr0 } else { 0 }
    }
  }

  /// Wraps a probe and counts how often it is asked.
  ///
  /// A "sequence" is one full read of the feature leaves, counted at the
  /// leaf 0 query that starts every classification.
  #[derive(Debug, Default)]
  pub struct CountingProbe<P> {
    inner: P,
    sequences: AtomicUsize,
    cpuid_calls: AtomicUsize,
    xgetbv_calls: AtomicUsize,
  }

  impl<P> CountingProbe<P> {
    #[must_use]
    pub const fn new(inner: P) -> Self {
      Self {
        inner,
        sequences: AtomicUsize::new(0),
        cpuid_calls: AtomicUsize::new(0),
        xgetbv_calls: AtomicUsize::new(0),
      }
    }

    /// Number of probe sequences started.
    #[must_use]
    pub fn sequences(&self) -> usize {
      self.sequences.load(Ordering::Relaxed)
    }

    /// Total CPUID queries.
    #[must_use]
    pub fn cpuid_calls(&self) -> usize {
      self.cpuid_calls.load(Ordering::Relaxed)
    }

    /// Total XGETBV queries.
    #[must_use]
    pub fn xgetbv_calls(&self) -> usize {
      self.xgetbv_calls.load(Ordering::Relaxed)
    }

    /// The wrapped probe.
    #[must_use]
    pub const fn inner(&self) -> &P {
      &self.inner
    }
  }

  impl<P: FeatureProbe> FeatureProbe for CountingProbe<P> {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> CpuidResult {
      if leaf == 0 {
        self.sequences.fetch_add(1, Ordering::Relaxed);
      }
      self.cpuid_calls.fetch_add(1, Ordering::Relaxed);
      self.inner.cpuid(leaf, subleaf)
    }

    fn xgetbv(&self, index: u32) -> u64 {
      self.xgetbv_calls.fetch_add(1, Ordering::Relaxed);
      self.inner.xgetbv(index)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_probe_matches_free_functions() {
    let probe = HostProbe;
    assert_eq!(probe.cpuid(0, 0), query_processor_features(0, 0));
    assert_eq!(probe.cpuid(1, 0), query_processor_features(1, 0));
    assert_eq!(probe.xgetbv(0), query_extended_control_register(0));
  }

  #[test]
  #[cfg(any(miri, not(any(target_arch = "x86", target_arch = "x86_64"))))]
  fn unsupported_targets_answer_zero() {
    assert_eq!(query_processor_features(0, 0), CpuidResult::ZERO);
    assert_eq!(query_processor_features(7, 0), CpuidResult::ZERO);
    assert_eq!(query_extended_control_register(0), 0);
  }

  #[test]
  #[cfg(all(target_arch = "x86_64", not(miri)))]
  fn x86_64_reports_leaf_one_and_sse2() {
    // SSE2 is architectural on x86_64.
    assert!(query_processor_features(0, 0).eax >= 1);
    assert_ne!(query_processor_features(1, 0).edx & (1 << 26), 0);
  }

  #[test]
  #[cfg(all(target_arch = "x86_64", not(miri)))]
  fn xcr0_always_carries_x87_state_when_readable() {
    let xcr0 = query_extended_control_register(0);
    if query_processor_features(1, 0).ecx & OSXSAVE_BIT != 0 {
      assert_eq!(xcr0 & 1, 1, "XCR0 bit 0 (x87) is architecturally fixed");
    } else {
      assert_eq!(xcr0, 0);
    }
  }

  #[test]
  fn simulated_probe_answers_only_scripted_leaves() {
    let probe = SimulatedProbe::unsupported()
      .with_max_leaf(1)
      .with_leaf1_edx(1 << 26)
      .with_leaf7_ebx(1 << 5)
      .with_xcr0(0x7);
    assert_eq!(probe.cpuid(0, 0).eax, 1);
    assert_eq!(probe.cpuid(1, 0).edx, 1 << 26);
    // Leaf 7 is above the reported maximum.
    assert_eq!(probe.cpuid(7, 0), CpuidResult::ZERO);
    assert_eq!(probe.xgetbv(0), 0x7);
    assert_eq!(probe.xgetbv(1), 0);
  }

  #[test]
  fn counting_probe_counts_sequences_and_queries() {
    let probe = CountingProbe::new(SimulatedProbe::unsupported().with_max_leaf(7));
    let _ = probe.cpuid(0, 0);
    let _ = probe.cpuid(1, 0);
    let _ = probe.cpuid(7, 0);
    let _ = probe.xgetbv(0);
    assert_eq!(probe.sequences(), 1);
    assert_eq!(probe.cpuid_calls(), 3);
    assert_eq!(probe.xgetbv_calls(), 1);
  }
}
