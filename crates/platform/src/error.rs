//! Error types for detection overrides, level parsing, and configuration.
//!
//! Detection itself cannot fail. These cover the optional surfaces around it.

use thiserror::Error;

/// Forcing the cached level failed.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum OverrideError {
  /// Detection already published a level; the cache is write-once.
  #[error("capability level already detected; overrides must be set before first use")]
  AlreadyInitialized,
}

/// A string did not name any capability level.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("unrecognized capability level name")]
pub struct ParseLevelError;

/// A raw byte is outside the level encoding.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("invalid capability level encoding: {0}")]
pub struct InvalidLevel(pub u8);

/// Reading the environment ceiling failed.
#[cfg(feature = "std")]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
  /// The variable is set but not valid UTF-8.
  #[error("{var} is not valid unicode")]
  NotUnicode {
    /// Variable name.
    var: &'static str,
  },

  /// The variable names no known level.
  #[error("{var}={value:?} does not name a capability level")]
  InvalidLevel {
    /// Variable name.
    var: &'static str,
    /// Raw value.
    value: std::string::String,
    /// Parse failure.
    #[source]
    source: ParseLevelError,
  },
}
