//! Request correlation.
//!
//! Every correlated request gets a fresh monotonically increasing id and a
//! one-shot settlement channel. The reader task resolves the channel when a
//! reply echoing the id arrives; the caller holds the receiving half inside
//! an [`Ack`]. Settlement is a bare "this request is settled" signal - reply
//! payloads reach callers through the state mirror, never through the
//! correlator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

use crate::error::RequestError;

/// Issues request ids for one connection's lifetime.
///
/// Ids start at 1 and strictly increase; they are never reused and reset only
/// with a new connection manager (the only way to begin a new session).
#[derive(Debug)]
pub(crate) struct RequestIdSource {
    next: AtomicU64,
}

impl RequestIdSource {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Tracks settlement channels keyed by request id.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    inner: HashMap<u64, oneshot::Sender<()>>,
}

impl PendingRequests {
    /// Register a settlement channel for `id`.
    ///
    /// An id that is already tracked indicates id reuse, which the id source
    /// rules out; if it happens anyway the original entry is kept and the
    /// defect is logged.
    pub(crate) fn insert(&mut self, id: u64, tx: oneshot::Sender<()>) {
        if self.inner.contains_key(&id) {
            tracing::error!(request_id = id, "request id already tracked, ignoring insert");
            return;
        }
        self.inner.insert(id, tx);
    }

    /// Settle and remove the entry for `id`.
    ///
    /// Returns false without fault if the id is unknown: pushes and replies
    /// that already timed out flow through the same path.
    pub(crate) fn resolve(&mut self, id: u64) -> bool {
        if let Some(tx) = self.inner.remove(&id) {
            let _ = tx.send(());
            true
        } else {
            tracing::debug!(request_id = id, "no pending request for id");
            false
        }
    }

    /// Drop the entry for `id` without settling it.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.inner.remove(&id).is_some()
    }

    /// Abandon every tracked request, returning how many were dropped.
    ///
    /// Dropping the senders wakes the waiting [`Ack`]s with
    /// [`RequestError::Abandoned`].
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Settlement handle for a sent request.
///
/// The send already happened when an `Ack` exists; awaiting it is optional.
/// [`Ack::settled`] resolves when the server's reply has been processed
/// (including its state-mirror side effects), the configured deadline
/// expires, or the session terminates.
#[derive(Debug)]
pub struct Ack {
    id: u64,
    rx: oneshot::Receiver<()>,
    pending: Arc<Mutex<PendingRequests>>,
    deadline: Duration,
}

impl Ack {
    pub(crate) fn new(
        id: u64,
        rx: oneshot::Receiver<()>,
        pending: Arc<Mutex<PendingRequests>>,
        deadline: Duration,
    ) -> Self {
        Self {
            id,
            rx,
            pending,
            deadline,
        }
    }

    /// The request id assigned to this send.
    pub fn request_id(&self) -> u64 {
        self.id
    }

    /// Wait for the request to settle.
    ///
    /// On timeout the pending entry is removed so a late reply resolves
    /// nothing and the table does not accumulate abandoned requests.
    pub async fn settled(self) -> Result<(), RequestError> {
        match tokio::time::timeout(self.deadline, self.rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RequestError::Abandoned),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(self.id);
                tracing::debug!(request_id = self.id, "request timed out, entry discarded");
                Err(RequestError::TimedOut)
            }
        }
    }
}
