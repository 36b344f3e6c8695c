//! Auto-save orchestration.
//!
//! # Responsibility
//! - Accept fire-and-forget field edits from any thread.
//! - Flush them on a debounce, on a periodic floor, or on demand.
//! - Publish save status for UI feedback.
//!
//! # Invariants
//! - At most one flush is in flight; overlapping requests are rejected
//!   without touching the buffer.
//! - Every flush runs on its own task. Dropping the future of `flush_now`
//!   or `force_save` never ends a flush early or releases the single-flight
//!   flag before the write is acknowledged.
//! - The buffer lock is never held across durable I/O or an `.await`.
//! - Buffered edits are removed only after the transaction that wrote them
//!   committed, or when their entry no longer exists.

use crate::autosave::buffer::{PendingChanges, PendingEntry};
use crate::autosave::config::AutoSaveConfig;
use crate::autosave::scheduler::{DebounceTimer, PeriodicTask};
use crate::autosave::status::{SaveStatus, StatusPublisher};
use crate::autosave::writer::{write_batch, BatchWriteOutcome};
use crate::autosave::AutoSaveError;
use crate::model::entry::{now_epoch_ms, EntryId};
use crate::model::field::FieldChange;
use crate::store::EntryStore;
use log::{debug, info, warn};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Result of one flush attempt.
#[derive(Debug)]
pub enum FlushReport {
    /// Nothing was pending.
    Empty,
    /// Another flush was in flight; nothing was done.
    AlreadySaving,
    /// The batch committed.
    Written(BatchWriteOutcome),
    /// The batch failed; `outcome.failed` lists the entries still buffered.
    Failed {
        error: AutoSaveError,
        outcome: BatchWriteOutcome,
    },
}

#[derive(Debug, Clone, Copy)]
enum FlushTrigger {
    Debounce,
    Periodic,
    Manual,
    Force,
    MemoryPressure,
}

impl FlushTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
            Self::Force => "force",
            Self::MemoryPressure => "memory_pressure",
        }
    }
}

/// Debounced, batched write-back of entry edits.
///
/// Cloning yields another handle to the same buffer and timers. Timers stop
/// when the last handle is dropped or on [`shutdown`](Self::shutdown).
pub struct AutoSaveService<S: EntryStore + 'static> {
    inner: Arc<Inner<S>>,
}

impl<S: EntryStore + 'static> Clone for AutoSaveService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    config: AutoSaveConfig,
    runtime: Handle,
    buffer: Mutex<PendingChanges>,
    store: Arc<Mutex<S>>,
    status: Arc<StatusPublisher>,
    saving: AtomicBool,
    flush_done: Notify,
    debounce: DebounceTimer,
    periodic: Mutex<Option<PeriodicTask>>,
}

impl<S: EntryStore + 'static> AutoSaveService<S> {
    /// Validates `config`, takes ownership of `store` and starts the
    /// periodic flush timer.
    ///
    /// # Errors
    /// - `NoRuntime` when called outside a Tokio runtime.
    /// - `Config` when `config` is invalid.
    pub fn start(store: S, config: AutoSaveConfig) -> Result<Self, AutoSaveError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| AutoSaveError::NoRuntime)?;

        let inner = Arc::new(Inner {
            buffer: Mutex::new(PendingChanges::new(
                config.max_pending_entries,
                config.eviction_margin,
            )),
            store: Arc::new(Mutex::new(store)),
            status: Arc::new(StatusPublisher::new()),
            saving: AtomicBool::new(false),
            flush_done: Notify::new(),
            debounce: DebounceTimer::new(runtime.clone(), config.debounce()),
            periodic: Mutex::new(None),
            runtime,
            config,
        });

        let weak = Arc::downgrade(&inner);
        let periodic = PeriodicTask::spawn(&inner.runtime, inner.config.periodic_flush(), move || {
            periodic_tick(&weak)
        });
        *lock(&inner.periodic) = Some(periodic);

        info!(
            "event=autosave_start module=autosave status=ok debounce_ms={} periodic_flush_ms={} max_batch_size={} max_pending_entries={}",
            inner.config.debounce_ms,
            inner.config.periodic_flush_ms,
            inner.config.max_batch_size,
            inner.config.max_pending_entries
        );
        Ok(Self { inner })
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    /// Buffers one edit and restarts the debounce timer.
    pub fn register_change(&self, id: EntryId, change: FieldChange) {
        self.register_changes(id, [change]);
    }

    /// Buffers several edits for one entry under a single lock acquisition
    /// and restarts the debounce timer.
    ///
    /// If the buffer is full, the oldest-inserted entries are evicted and
    /// their unsaved edits are lost; see [`PendingChanges`].
    pub fn register_changes<I>(&self, id: EntryId, changes: I)
    where
        I: IntoIterator<Item = FieldChange>,
    {
        let changes: Vec<FieldChange> = changes.into_iter().collect();
        if changes.is_empty() {
            return;
        }

        let (evicted, pending) = {
            let mut buffer = lock(&self.inner.buffer);
            let evicted = buffer.register(id, changes);
            (evicted, buffer.len())
        };
        if evicted > 0 {
            warn!(
                "event=autosave_evict module=autosave status=dropped evicted={} pending={} max_pending_entries={}",
                evicted, pending, self.inner.config.max_pending_entries
            );
        }

        self.restart_debounce();
    }

    pub fn has_pending_changes(&self, id: EntryId) -> bool {
        lock(&self.inner.buffer).contains(id)
    }

    /// Number of distinct entries with unsaved edits.
    pub fn pending_changes_count(&self) -> usize {
        lock(&self.inner.buffer).len()
    }

    pub fn pending_changes(&self, id: EntryId) -> Vec<FieldChange> {
        lock(&self.inner.buffer).changes_for(id)
    }

    /// Discards unsaved edits for one entry.
    pub fn clear_pending_changes(&self, id: EntryId) {
        if lock(&self.inner.buffer).remove(id) {
            debug!("event=autosave_clear module=autosave status=ok entry_id={id}");
        }
    }

    /// Discards every unsaved edit and disarms the debounce timer.
    pub fn clear_all(&self) {
        self.inner.debounce.cancel();
        let discarded = lock(&self.inner.buffer).clear();
        if discarded > 0 {
            info!("event=autosave_clear_all module=autosave status=ok discarded={discarded}");
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Returns whether a flush is in flight.
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::Acquire)
    }

    /// Returns whether edits are waiting for the debounce delay to elapse.
    pub fn is_debounce_armed(&self) -> bool {
        self.inner.debounce.is_armed()
    }

    /// Attempts one flush of at most `max_batch_size` entries.
    pub async fn flush_now(&self) -> FlushReport {
        Inner::run_flush(&self.inner, FlushTrigger::Manual).await
    }

    /// Cancels the debounce timer and drains the buffer batch by batch.
    ///
    /// Waits for an in-flight flush to finish instead of overlapping it.
    /// Edits registered after the final batch was taken stay pending.
    ///
    /// # Errors
    /// - Returns the first failing batch's error; that batch and everything
    ///   after it stays buffered.
    pub async fn force_save(&self) -> Result<BatchWriteOutcome, AutoSaveError> {
        self.inner.debounce.cancel();
        let mut total = BatchWriteOutcome::default();
        loop {
            let flush_done = self.inner.flush_done.notified();
            match Inner::run_flush(&self.inner, FlushTrigger::Force).await {
                FlushReport::Empty => return Ok(total),
                FlushReport::AlreadySaving => flush_done.await,
                FlushReport::Written(outcome) => {
                    let drained = outcome.deferred == 0;
                    total.merge(outcome);
                    if drained {
                        return Ok(total);
                    }
                }
                FlushReport::Failed { error, .. } => return Err(error),
            }
        }
    }

    /// Flushes immediately in the background when the host reports memory
    /// pressure.
    pub fn handle_memory_pressure(&self) {
        self.inner.debounce.cancel();
        info!(
            "event=autosave_memory_pressure module=autosave status=flush pending={}",
            self.pending_changes_count()
        );
        Inner::spawn_flush(&self.inner, FlushTrigger::MemoryPressure);
    }

    /// Stops the timers, drains the buffer and discards whatever could not
    /// be written.
    ///
    /// The handle stays usable afterwards, but only debounce flushes run.
    pub async fn shutdown(&self) -> Result<BatchWriteOutcome, AutoSaveError> {
        if let Some(periodic) = lock(&self.inner.periodic).take() {
            periodic.stop();
        }

        let result = self.force_save().await;
        self.inner.debounce.cancel();
        let discarded = lock(&self.inner.buffer).clear();
        if discarded > 0 {
            warn!("event=autosave_shutdown module=autosave status=dropped discarded={discarded}");
        } else {
            info!("event=autosave_shutdown module=autosave status=ok");
        }
        result
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// Blocks while a batch is being written; do not call from async code
    /// that must stay responsive.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut store = lock(&*self.inner.store);
        f(&mut store)
    }

    fn restart_debounce(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.debounce.restart(async move {
            if let Some(inner) = weak.upgrade() {
                Inner::spawn_flush(&inner, FlushTrigger::Debounce);
            }
        });
    }
}

impl<S: EntryStore + 'static> Inner<S> {
    /// Runs a flush on its own task so cancelling the caller (a timer or an
    /// awaiting future) never interrupts the write or its acknowledgement.
    fn spawn_flush(inner: &Arc<Self>, trigger: FlushTrigger) -> JoinHandle<FlushReport> {
        let inner = Arc::clone(inner);
        let runtime = inner.runtime.clone();
        runtime.spawn(async move { inner.flush(trigger).await })
    }

    async fn run_flush(inner: &Arc<Self>, trigger: FlushTrigger) -> FlushReport {
        match Self::spawn_flush(inner, trigger).await {
            Ok(report) => report,
            Err(join_err) => FlushReport::Failed {
                error: AutoSaveError::WriterPanicked(join_err.to_string()),
                outcome: BatchWriteOutcome::default(),
            },
        }
    }

    async fn flush(&self, trigger: FlushTrigger) -> FlushReport {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                "event=autosave_flush module=autosave status=skipped reason=in_flight trigger={}",
                trigger.as_str()
            );
            return FlushReport::AlreadySaving;
        }
        let _guard = SavingGuard {
            saving: &self.saving,
            done: &self.flush_done,
        };

        let (batch, deferred) = {
            let buffer = lock(&self.buffer);
            let batch = buffer.snapshot(self.config.max_batch_size);
            let deferred = buffer.len() - batch.len();
            (batch, deferred)
        };
        if batch.is_empty() {
            return FlushReport::Empty;
        }

        self.status.publish(SaveStatus::Saving);
        let started_at = Instant::now();
        let batch_ids: Vec<EntryId> = batch.iter().map(|entry| entry.id).collect();
        let store = Arc::clone(&self.store);
        let modified_at = now_epoch_ms();
        let joined = tokio::task::spawn_blocking(move || {
            let mut store = lock(&*store);
            let result = write_batch(&mut *store, &batch, modified_at);
            (batch, result)
        })
        .await;

        match joined {
            Ok((batch, Ok(mut outcome))) => {
                outcome.deferred = deferred;
                self.acknowledge(&batch, &outcome);
                self.status.publish(SaveStatus::Saved { at: now_epoch_ms() });
                info!(
                    "event=autosave_flush module=autosave status=ok trigger={} committed={} missing={} deferred={} duration_ms={}",
                    trigger.as_str(),
                    outcome.committed.len(),
                    outcome.missing.len(),
                    outcome.deferred,
                    started_at.elapsed().as_millis()
                );
                FlushReport::Written(outcome)
            }
            Ok((_, Err(err))) => self.fail(trigger, AutoSaveError::Store(err), batch_ids, deferred),
            Err(join_err) => self.fail(
                trigger,
                AutoSaveError::WriterPanicked(join_err.to_string()),
                batch_ids,
                deferred,
            ),
        }
    }

    fn acknowledge(&self, batch: &[PendingEntry], outcome: &BatchWriteOutcome) {
        let mut buffer = lock(&self.buffer);
        for written in batch
            .iter()
            .filter(|entry| outcome.committed.contains(&entry.id))
        {
            buffer.acknowledge(written);
        }
        for id in &outcome.missing {
            buffer.remove(*id);
        }
    }

    fn fail(
        &self,
        trigger: FlushTrigger,
        error: AutoSaveError,
        failed: Vec<EntryId>,
        deferred: usize,
    ) -> FlushReport {
        let critical = error.is_critical();
        warn!(
            "event=autosave_flush module=autosave status=error trigger={} failed={} critical={} error={}",
            trigger.as_str(),
            failed.len(),
            critical,
            error
        );

        let status = SaveStatus::Error {
            message: error.to_string(),
            critical,
        };
        let generation = self.status.publish(status);
        if !critical {
            self.schedule_error_clear(generation);
        }

        FlushReport::Failed {
            error,
            outcome: BatchWriteOutcome {
                failed,
                deferred,
                ..BatchWriteOutcome::default()
            },
        }
    }

    /// Returns a non-critical error to `Idle` after the configured delay,
    /// unless any status was published after it meanwhile.
    fn schedule_error_clear(&self, generation: u64) {
        let delay = self.config.error_clear_delay();
        let publisher = Arc::downgrade(&self.status);
        self.runtime.spawn(async move {
            sleep(delay).await;
            if let Some(publisher) = publisher.upgrade() {
                publisher.reset_if_current(generation);
            }
        });
    }
}

fn periodic_tick<S: EntryStore + 'static>(weak: &Weak<Inner<S>>) -> ControlFlow<()> {
    let Some(inner) = weak.upgrade() else {
        return ControlFlow::Break(());
    };
    if !lock(&inner.buffer).is_empty() {
        Inner::spawn_flush(&inner, FlushTrigger::Periodic);
    }
    ControlFlow::Continue(())
}

/// Clears the single-flight flag and wakes `force_save` waiters.
struct SavingGuard<'a> {
    saving: &'a AtomicBool,
    done: &'a Notify,
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.saving.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
