#![allow(dead_code)]

use jotter_core::{AutoSaveConfig, Entry, EntryId, EntryKind, EntryStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Config whose timers never fire during a test unless it advances time.
pub fn manual_config() -> AutoSaveConfig {
    AutoSaveConfig {
        debounce_ms: 60_000,
        periodic_flush_ms: 120_000,
        ..AutoSaveConfig::default()
    }
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<EntryId, Entry>,
    staged: Vec<Entry>,
    in_transaction: bool,
    fail_commits: Option<bool>,
    batch_sizes: Vec<usize>,
}

struct Gate {
    entered: oneshot::Sender<()>,
    release: mpsc::Receiver<()>,
}

/// Shared in-memory store; clones observe the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    gate: Arc<Mutex<Option<Gate>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Entry) -> EntryId {
        let id = entry.uuid;
        self.state.lock().expect("memory store lock").entries.insert(id, entry);
        id
    }

    pub fn insert_notes(&self, count: usize) -> Vec<EntryId> {
        (0..count)
            .map(|idx| self.insert(Entry::new(EntryKind::Note, format!("note {idx}"), "")))
            .collect()
    }

    pub fn get(&self, id: EntryId) -> Option<Entry> {
        self.state.lock().expect("memory store lock").entries.get(&id).cloned()
    }

    /// Makes every commit fail until cleared with `None`.
    pub fn fail_commits(&self, transient: Option<bool>) {
        self.state.lock().expect("memory store lock").fail_commits = transient;
    }

    /// Sizes of committed batches in commit order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().expect("memory store lock").batch_sizes.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().expect("memory store lock").batch_sizes.len()
    }

    /// Blocks the next transaction inside `begin` until released.
    ///
    /// Returns a receiver signalled once the write is blocked and a sender
    /// that releases it.
    pub fn hold_next_write(&self) -> (oneshot::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().expect("memory store lock") = Some(Gate {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }
}

impl EntryStore for MemoryStore {
    fn begin(&mut self) -> StoreResult<()> {
        let gate = self.gate.lock().expect("memory store lock").take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }

        let mut state = self.state.lock().expect("memory store lock");
        if state.in_transaction {
            return Err(StoreError::TransactionOpen);
        }
        state.in_transaction = true;
        state.staged.clear();
        Ok(())
    }

    fn find(&mut self, id: EntryId) -> StoreResult<Option<Entry>> {
        let state = self.state.lock().expect("memory store lock");
        if !state.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        Ok(state
            .entries
            .get(&id)
            .filter(|entry| entry.is_active())
            .cloned())
    }

    fn stage(&mut self, entry: &Entry) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memory store lock");
        if !state.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        state.staged.push(entry.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        let mut state = self.state.lock().expect("memory store lock");
        if !state.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        if let Some(transient) = state.fail_commits {
            return Err(StoreError::Backend {
                message: "simulated commit failure".to_string(),
                transient,
            });
        }

        let staged = std::mem::take(&mut state.staged);
        state.batch_sizes.push(staged.len());
        for entry in staged {
            state.entries.insert(entry.uuid, entry);
        }
        state.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) {
        let mut state = self.state.lock().expect("memory store lock");
        state.staged.clear();
        state.in_transaction = false;
    }
}
