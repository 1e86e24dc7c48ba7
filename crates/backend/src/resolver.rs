//! Resolvers that cannot hand back a null implementation.
//!
//! A resolver turns "which implementation should this process use?" into a
//! concrete value, once. If the resolution logic comes up empty there is no
//! sensible fallback left (the scalar variant is part of every table), so the
//! process stops right there with a hardware trap. The fault address points
//! at the resolver, not at some later call through a null pointer.
//!
//! The trap is not a panic: it does not unwind, cannot be caught, and runs no
//! destructors.
//!
//! # Usage
//!
//! ```
//! backend::safe_resolver! {
//!   /// Kernel for this process.
//!   pub fn pick() -> fn(u32) -> u32 {
//!     fn double(x: u32) -> u32 { x * 2 }
//!     Some(double as fn(u32) -> u32)
//!   }
//! }
//!
//! assert_eq!(pick()(21), 42);
//! ```

use core::ptr::NonNull;

/// Stop the process with a debugger-visible trap.
///
/// | Target | Instruction |
/// |--------|-------------|
/// | x86, x86_64 | `ud2` (SIGILL) |
/// | aarch64 | `brk #0x3e8` (SIGTRAP) |
/// | other, `std` | `std::process::abort` |
/// | other, no `std` | `panic!` |
#[cold]
#[inline(always)]
#[allow(unsafe_code)]
pub fn trap() -> ! {
  #[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), not(miri)))]
  // SAFETY: `ud2` raises #UD and never returns; it touches no memory or stack.
  unsafe {
    core::arch::asm!("ud2", options(noreturn, nomem, nostack));
  }

  #[cfg(all(target_arch = "aarch64", not(miri)))]
  // SAFETY: `brk` raises a breakpoint exception and never returns.
  unsafe {
    core::arch::asm!("brk #0x3e8", options(noreturn, nomem, nostack));
  }

  #[cfg(all(
    any(miri, not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))),
    feature = "std"
  ))]
  std::process::abort();

  #[cfg(all(
    any(miri, not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))),
    not(feature = "std")
  ))]
  panic!("resolver produced no implementation");
}

/// Unwrap a resolution result, trapping on `None`.
#[inline(always)]
pub fn checked<T>(resolved: Option<T>) -> T {
  match resolved {
    Some(value) => value,
    None => trap(),
  }
}

/// Non-null view of `ptr`, trapping on null.
#[inline(always)]
pub fn checked_ptr<T>(ptr: *const T) -> NonNull<T> {
  match NonNull::new(ptr.cast_mut()) {
    Some(ptr) => ptr,
    None => trap(),
  }
}

/// Define resolver functions whose bodies yield `Option<T>`.
///
/// Each generated `fn name() -> T` runs the body once per call and traps on
/// `None`. The wrapper is never inlined so a trap is attributed to it.
///
/// ```
/// backend::safe_resolver! {
///   fn answer() -> u32 { Some(42) }
///   pub(crate) fn banner() -> &'static str { Some("ok") }
/// }
/// assert_eq!(answer(), 42);
/// assert_eq!(banner(), "ok");
/// ```
#[macro_export]
macro_rules! safe_resolver {
  ($($(#[$meta:meta])* $vis:vis fn $name:ident() -> $ty:ty $body:block)+) => {
    $(
      $(#[$meta])*
      #[inline(never)]
      $vis fn $name() -> $ty {
        fn resolve() -> ::core::option::Option<$ty> $body
        $crate::resolver::checked(resolve())
      }
    )+
  };
}
