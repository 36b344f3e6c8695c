//! Observable save status for UI feedback.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Externally visible auto-save state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    /// Last flush committed at `at` (Unix epoch milliseconds).
    Saved { at: i64 },
    /// Last flush failed; pending edits are still buffered.
    Error { message: String, critical: bool },
}

/// Indicator color a UI can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Gray,
    Blue,
    Green,
    Red,
}

impl StatusColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

impl SaveStatus {
    /// Stable lowercase state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved { .. } => "saved",
            Self::Error { .. } => "error",
        }
    }

    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Saving => "Saving...".to_string(),
            Self::Saved { .. } => "Saved".to_string(),
            Self::Error { message, .. } => format!("Save failed: {message}"),
        }
    }

    pub fn display_color(&self) -> StatusColor {
        match self {
            Self::Idle => StatusColor::Gray,
            Self::Saving => StatusColor::Blue,
            Self::Saved { .. } => StatusColor::Green,
            Self::Error { .. } => StatusColor::Red,
        }
    }
}

/// Single-producer status channel.
///
/// Late subscribers always observe the latest value. Every publish bumps a
/// generation counter under the channel's write lock, so a delayed reset can
/// tell a re-published identical status from the one it was scheduled for.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<SaveStatus>,
    generation: AtomicU64,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SaveStatus::Idle);
        Self {
            tx,
            generation: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> SaveStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.tx.subscribe()
    }

    /// Replaces the status and returns its generation.
    pub fn publish(&self, status: SaveStatus) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|current| {
            *current = status;
            generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        });
        generation
    }

    /// Resets to `Idle` only if nothing was published after `generation`.
    ///
    /// Returns whether the reset happened.
    pub fn reset_if_current(&self, generation: u64) -> bool {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            *current = SaveStatus::Idle;
            self.generation.fetch_add(1, Ordering::AcqRel);
            true
        })
    }
}
