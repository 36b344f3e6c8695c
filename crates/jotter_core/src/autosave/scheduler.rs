//! Cancellable delayed and repeating tasks on a Tokio runtime.
//!
//! Both types own their spawned task and abort it on drop. Callbacks should
//! hand long-running work to a separate task: aborting a timer only stops
//! the timer, never work it already started elsewhere.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Single-shot timer restarted by every trigger.
#[derive(Debug)]
pub struct DebounceTimer {
    runtime: Handle,
    delay: Duration,
    armed: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new(runtime: Handle, delay: Duration) -> Self {
        Self {
            runtime,
            delay,
            armed: Mutex::new(None),
        }
    }

    /// Aborts the armed timer (if any) and arms a new one that awaits
    /// `on_fire` once `delay` elapses without another restart.
    pub fn restart<F>(&self, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let task = self.runtime.spawn(async move {
            sleep(delay).await;
            on_fire.await;
        });
        let previous = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Disarms the timer. Returns whether a timer was still waiting.
    pub fn cancel(&self) -> bool {
        let armed = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match armed {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Repeating task firing every `period`, first tick one period after spawn.
#[derive(Debug)]
pub struct PeriodicTask {
    task: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns the loop. It ends when `on_tick` returns `Break` or the task
    /// is stopped. Ticks missed while the runtime was busy are not replayed.
    pub fn spawn<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if on_tick().is_break() {
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.task.abort();
    }
}
