//! Backend crate: variant tables and runtime binding for vecdispatch.
//!
//! This crate turns a detected [`CapabilityLevel`] into the implementation an
//! operation should use, exactly once per process:
//!
//! - [`variant`]: per-operation tables mapping every level to a [`Variant`].
//! - [`resolver`]: the trap-on-null contract ([`safe_resolver!`],
//!   [`resolver::checked`]).
//! - [`dispatch`]: lazily resolved, CAS-published [`Dispatcher`] statics.
//!
//! # Architecture
//!
//! ```text
//! entry point ─► Dispatcher::get ─► (first call) platform::detect_cached
//!                                    └► VariantTable::resolve ─► resolver::checked
//!                                       └► publish &'static Variant
//! ```
//!
//! After the first call an entry point costs one acquire load and one
//! indirect call.
//!
//! // Fallibility discipline: deny unwrap/expect in production, allow in tests.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod dispatch;
pub mod resolver;
pub mod variant;

pub use dispatch::{BindingState, Dispatcher};
// Re-export platform types for convenience.
pub use platform;
pub use platform::CapabilityLevel;
pub use variant::{Variant, VariantTable};
