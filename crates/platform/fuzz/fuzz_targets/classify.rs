//! Fuzz target for level classification.
//!
//! Tests that:
//! - No panics on arbitrary probe answers
//! - Wide levels are never selected without their OS register state
//! - Classification is monotone in the raw flags
//! - The probe path and the bit path agree

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use platform::{
  CapabilityLevel, RawFeatureBits, classify_bits, classify_with,
  probe::SimulatedProbe,
};

#[derive(Debug, Arbitrary)]
struct Input {
  max_leaf: u32,
  leaf1_ecx: u32,
  leaf1_edx: u32,
  leaf7_ebx: u32,
  xcr0: u64,
  extra: u16,
}

fuzz_target!(|input: Input| {
  let probe = SimulatedProbe::unsupported()
    .with_max_leaf(input.max_leaf)
    .with_leaf1_ecx(input.leaf1_ecx)
    .with_leaf1_edx(input.leaf1_edx)
    .with_leaf7_ebx(input.leaf7_ebx)
    .with_xcr0(input.xcr0);

  let bits = RawFeatureBits::read(&probe);
  let level = classify_with(&probe);

  // ─── Probe path matches bit path ───
  assert_eq!(level, classify_bits(bits));

  // ─── OS gating ───
  if level >= CapabilityLevel::Avx {
    assert!(bits.has(RawFeatureBits::OSXSAVE | RawFeatureBits::XCR0_YMM), "{bits} -> {level}");
    assert_eq!(input.xcr0 & 0x6, 0x6);
  }
  if level == CapabilityLevel::Avx512F {
    assert_eq!(input.xcr0 & 0xE0, 0xE0);
  }

  // ─── Unsupported probe is scalar ───
  if input.max_leaf == 0 {
    assert_eq!(level, CapabilityLevel::Scalar);
  }

  // ─── Monotonicity ───
  let more = bits | RawFeatureBits::from_raw(input.extra);
  assert!(classify_bits(more) >= level);
  let fewer = bits.difference(RawFeatureBits::from_raw(input.extra));
  assert!(classify_bits(fewer) <= level);
});
