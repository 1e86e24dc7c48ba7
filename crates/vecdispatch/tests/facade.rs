//! Public surface of the facade crate.

use vecdispatch::{CapabilityLevel, OverrideError, features, level_name};

#[test]
fn feature_list_matches_build() {
  let list = features();
  if cfg!(feature = "ops") {
    assert_eq!(list, ["core", "vector_add", "vector_mul", "vector_sub"]);
  } else {
    assert_eq!(list, ["core"]);
  }
  assert!(list.windows(2).skip(1).all(|w| w[0] < w[1]));
}

#[test]
fn level_names_are_total() {
  let names: Vec<_> = (0u8..=5).map(level_name).collect();
  assert_eq!(names, ["Scalar", "SSE2", "SSE4.2", "AVX", "AVX2", "AVX-512F"]);
  assert_eq!(level_name(6), "Unknown");
  assert_eq!(level_name(0xFF), "Unknown");
}

#[test]
fn detection_is_memoized_and_overrides_close() {
  let first = vecdispatch::detect_cached();
  assert_eq!(vecdispatch::cached_level(), Some(first));
  assert_eq!(vecdispatch::detect_cached(), first);
  assert_eq!(vecdispatch::classify(), first);
  assert_eq!(
    vecdispatch::try_set_override(CapabilityLevel::Scalar),
    Err(OverrideError::AlreadyInitialized)
  );
}

#[test]
fn describe_reports_cached_level() {
  let description = vecdispatch::describe();
  assert_eq!(description.level, vecdispatch::detect_cached());
  assert!(!description.overridden);
  assert!(description.to_string().contains(description.level.name()));
}

vecdispatch::safe_resolver! {
  fn widest_named() -> &'static str {
    CapabilityLevel::ALL.last().map(|l| l.name())
  }
}

#[test]
fn resolver_macro_is_reexported() {
  assert_eq!(widest_named(), "AVX-512F");
}

#[cfg(feature = "ops")]
#[test]
fn kernels_reachable_through_facade() {
  let mut out = [0.0f32; 4];
  vecdispatch::add_f32(&[1.0; 4], &[2.0; 4], &mut out).unwrap();
  assert_eq!(out, [3.0; 4]);
  assert!(vecdispatch::sub_f32(&[1.0; 4], &[2.0; 3], &mut out).is_err());

  let level = vecdispatch::init();
  let info = vecdispatch::DispatchInfo::current();
  assert_eq!(info.level(), level);
  assert!(info.kernel("vector_mul").is_some());
}
