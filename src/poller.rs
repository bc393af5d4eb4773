//! Scoped periodic readers.
//!
//! A poller runs one read per tick and publishes the result into a `watch`
//! channel, last-write-wins. A failed read publishes `None`, so consumers see
//! "not loaded" until the next successful tick. The task is aborted when its
//! [`PollerHandle`] is dropped.

use crate::errors::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Owner of one spawned poller. Dropping it cancels the task.
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Adopt an already spawned task so it is cancelled with the rest.
    pub(crate) fn from_task(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task that calls `fetch` every `every` and publishes into `tx`.
///
/// The first read happens immediately.
pub fn spawn_poller<T, F, Fut>(
    name: &'static str,
    every: Duration,
    tx: watch::Sender<Option<T>>,
    mut fetch: F,
) -> PollerHandle
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match fetch().await {
                Ok(value) => {
                    tx.send_replace(Some(value));
                }
                Err(e) => {
                    warn!(poller = name, error = %e, "[POLL] read failed");
                    tx.send_replace(None);
                }
            }
        }
    });
    debug!(poller = name, every_ms = every.as_millis() as u64, "[POLL] started");
    PollerHandle { name, handle }
}

/// A group of pollers torn down together.
#[derive(Debug, Default)]
pub struct PollerSet {
    handles: Vec<PollerHandle>,
}

impl PollerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: PollerHandle) {
        self.handles.push(handle);
    }

    pub fn extend(&mut self, mut other: PollerSet) {
        self.handles.append(&mut other.handles);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every poller in the set.
    pub fn shutdown(self) {
        for h in &self.handles {
            debug!(poller = h.name(), "[POLL] stopping");
        }
        drop(self);
    }
}
