//! Auto-save tuning knobs.
//!
//! One configurable engine replaces the separate foreground/background
//! writers; [`AutoSaveConfig::background`] is the slower preset.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Invalid auto-save configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration field is zero.
    ZeroDuration(&'static str),
    /// A size field is zero.
    ZeroSize(&'static str),
    /// `eviction_margin` must leave room below `max_pending_entries`.
    MarginTooLarge {
        eviction_margin: usize,
        max_pending_entries: usize,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDuration(field) => write!(f, "`{field}` must be greater than zero"),
            Self::ZeroSize(field) => write!(f, "`{field}` must be at least 1"),
            Self::MarginTooLarge {
                eviction_margin,
                max_pending_entries,
            } => write!(
                f,
                "`eviction_margin` ({eviction_margin}) must be smaller than `max_pending_entries` ({max_pending_entries})"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Timing and bound settings for [`AutoSaveService`](super::AutoSaveService).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before a flush fires.
    pub debounce_ms: u64,
    /// Period of the unconditional flush timer.
    pub periodic_flush_ms: u64,
    /// Maximum entries written per transaction.
    pub max_batch_size: usize,
    /// Maximum distinct entries held in the pending buffer.
    pub max_pending_entries: usize,
    /// Extra slots freed on overflow so eviction does not run on every edit.
    pub eviction_margin: usize,
    /// Delay before a non-critical error status returns to idle.
    pub error_clear_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            periodic_flush_ms: 2_500,
            max_batch_size: 15,
            max_pending_entries: 50,
            eviction_margin: 10,
            error_clear_ms: 3_000,
        }
    }
}

impl AutoSaveConfig {
    /// Lower-priority preset for writers running off the UI path.
    pub fn background() -> Self {
        Self {
            debounce_ms: 1_000,
            periodic_flush_ms: 3_000,
            max_batch_size: 10,
            ..Self::default()
        }
    }

    /// Looks up a named preset: `default` or `background`.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::default()),
            "background" => Some(Self::background()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("debounce_ms", self.debounce_ms),
            ("periodic_flush_ms", self.periodic_flush_ms),
            ("error_clear_ms", self.error_clear_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(field));
            }
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroSize("max_batch_size"));
        }
        if self.max_pending_entries == 0 {
            return Err(ConfigError::ZeroSize("max_pending_entries"));
        }
        if self.eviction_margin >= self.max_pending_entries {
            return Err(ConfigError::MarginTooLarge {
                eviction_margin: self.eviction_margin,
                max_pending_entries: self.max_pending_entries,
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn periodic_flush(&self) -> Duration {
        Duration::from_millis(self.periodic_flush_ms)
    }

    pub fn error_clear_delay(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }
}
