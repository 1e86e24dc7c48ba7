//! Environment-driven level ceiling.
//!
//! Opt-in: nothing here runs unless the application calls it. The detector
//! never reads the environment on its own.
//!
//! ```no_run
//! // Early in main, before any dispatched call:
//! let level = platform::Config::from_env()?.apply()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
  env::{self, VarError},
  string::String,
};

use crate::{
  classify::classify,
  detect,
  error::{ConfigError, OverrideError},
  level::CapabilityLevel,
};

/// Variable naming the widest level the process may use.
pub const MAX_LEVEL_ENV: &str = "VECDISPATCH_MAX_LEVEL";

/// Process-level dispatch settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
  /// Upper bound on the detected level. `None` leaves detection untouched.
  pub max_level: Option<CapabilityLevel>,
}

impl Config {
  /// Read settings from the environment. An unset variable means no ceiling.
  ///
  /// # Errors
  ///
  /// [`ConfigError`] if the variable is set but unusable.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|var| env::var(var))
  }

  fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: FnOnce(&'static str) -> Result<String, VarError>,
  {
    let raw = match lookup(MAX_LEVEL_ENV) {
      Ok(raw) => raw,
      Err(VarError::NotPresent) => return Ok(Self::default()),
      Err(VarError::NotUnicode(_)) => return Err(ConfigError::NotUnicode { var: MAX_LEVEL_ENV }),
    };
    if raw.trim().is_empty() {
      return Ok(Self::default());
    }
    let max_level = raw.parse().map_err(|source| ConfigError::InvalidLevel {
      var: MAX_LEVEL_ENV,
      value: raw.clone(),
      source,
    })?;
    Ok(Self {
      max_level: Some(max_level),
    })
  }

  /// Level the process will use under this configuration.
  #[must_use]
  pub fn effective_level(&self, detected: CapabilityLevel) -> CapabilityLevel {
    match self.max_level {
      Some(cap) => detected.min(cap),
      None => detected,
    }
  }

  /// Install the ceiling as the process-wide override.
  ///
  /// Returns the level dispatch will use. Without a ceiling this is plain
  /// [`detect_cached`](crate::detect_cached).
  ///
  /// # Errors
  ///
  /// [`OverrideError::AlreadyInitialized`] if detection already published a
  /// level and a ceiling is configured.
  pub fn apply(&self) -> Result<CapabilityLevel, OverrideError> {
    let Some(cap) = self.max_level else {
      return Ok(detect::detect_cached());
    };
    let detected = classify();
    let level = self.effective_level(detected);
    detect::try_set_override(level)?;
    #[cfg(feature = "tracing")]
    if level < detected {
      tracing::info!(
        detected = detected.name(),
        ceiling = cap.name(),
        level = level.name(),
        "capability level capped by {MAX_LEVEL_ENV}"
      );
    }
    #[cfg(not(feature = "tracing"))]
    let _ = cap;
    Ok(detect::detect_cached())
  }
}
