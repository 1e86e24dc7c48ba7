//! Binding introspection.
//!
//! ```
//! use vecops::DispatchInfo;
//!
//! let info = DispatchInfo::current();
//! println!("{info}");
//! assert!(info.kernel("vector_add").is_some());
//! ```

use core::fmt;

use crate::dispatch::FAMILIES;

/// Detected platform plus the kernel bound for every operation.
///
/// Taking one resolves every binding that is still unresolved.
#[derive(Clone, Copy)]
pub struct DispatchInfo {
  platform: platform::Description,
  kernels: [(&'static str, &'static str); 3],
}

impl DispatchInfo {
  /// Snapshot for this process.
  #[must_use]
  pub fn current() -> Self {
    let [a, b, c] = FAMILIES;
    Self {
      kernels: [
        (a.operation(), a.kernel_name()),
        (b.operation(), b.kernel_name()),
        (c.operation(), c.kernel_name()),
      ],
      platform: platform::describe(),
    }
  }

  /// Platform description (arch, level, raw bits).
  #[inline]
  #[must_use]
  pub fn platform(&self) -> platform::Description {
    self.platform
  }

  /// Level the bindings were resolved against.
  #[inline]
  #[must_use]
  pub fn level(&self) -> platform::CapabilityLevel {
    self.platform.level
  }

  /// Kernel bound for `operation` (`"vector_add"`, ...), if it exists.
  #[must_use]
  pub fn kernel(&self, operation: &str) -> Option<&'static str> {
    self
      .kernels
      .iter()
      .find(|(op, _)| *op == operation)
      .map(|&(_, kernel)| kernel)
  }

  /// `(operation, kernel)` pairs in feature-list order.
  #[inline]
  pub fn kernels(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
    self.kernels.iter().copied()
  }
}

impl fmt::Display for DispatchInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.platform)?;
    for (op, kernel) in &self.kernels {
      write!(f, " {op}={kernel}")?;
    }
    Ok(())
  }
}

impl fmt::Debug for DispatchInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DispatchInfo")
      .field("platform", &format_args!("{}", self.platform))
      .field("kernels", &self.kernels)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use std::format;

  use super::*;

  #[test]
  fn reports_every_operation() {
    let info = DispatchInfo::current();
    let level = platform::detect_cached();
    assert_eq!(info.level(), level);
    for family in FAMILIES {
      assert_eq!(info.kernel(family.operation()), Some(family.kernel_for(level)));
    }
    assert_eq!(info.kernel("vector_div"), None);
    assert_eq!(info.kernels().count(), 3);
  }

  #[test]
  fn display_lists_bindings() {
    let s = format!("{}", DispatchInfo::current());
    assert!(s.contains("vector_add="));
    assert!(s.contains("vector_mul="));
    assert!(s.contains("vector_sub="));
  }

  #[test]
  fn debug_not_empty() {
    let s = format!("{:?}", DispatchInfo::current());
    assert!(s.contains("DispatchInfo"));
  }
}
