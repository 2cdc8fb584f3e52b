//! Contract over a remote key-value tree with optimistic transactions and
//! change notification, plus the in-memory reference store used in tests.
//!
//! Values are JSON-shaped (`serde_json::Value`); paths are slash-separated
//! segments like `rooms/{roomId}/players/{playerId}`.

mod memory;
pub mod path;
mod push_id;

pub use memory::MemoryStore;
pub use push_id::PushIdGenerator;

use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for store operations. Expected protocol outcomes (aborted or
/// contended transactions) are reported through [`TransactOutcome`], not
/// here; this type is for infrastructure faults only.
#[derive(Error, Debug)]
pub enum Error {
    #[error("store unreachable: {0}")]
    Unreachable(String),
    #[error("merge target is not a map: {0}")]
    NotAMap(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Proposed outcome of one invocation of a transaction closure.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionUpdate {
    /// Replace the value at the transaction path.
    Set(Value),
    /// Decline: conditions no longer hold. Not an error.
    Abort,
}

/// Settled result of a [`Store::transact`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactOutcome {
    /// Whether the proposed value was applied.
    pub committed: bool,
    /// Value at the path after settlement: the committed value, or the
    /// current value when the transaction aborted or retried out.
    pub snapshot: Option<Value>,
}

/// Retry policy for contended transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per transaction (including the first).
    pub max_attempts: usize,
    /// Backoff after the first conflicting attempt.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }
}

/// Live subscription to a path. Delivers the full current value at the
/// path immediately, then the full value again on every change, until
/// dropped. Delivery is at-least-once per change; consumers must tolerate
/// redundant fires of an unchanged value.
pub struct WatchStream {
    receiver: mpsc::UnboundedReceiver<Option<Value>>,
}

impl WatchStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Option<Value>>) -> Self {
        Self { receiver }
    }

    /// Next observed value at the path (`None` inside the option means the
    /// path is absent). Returns `None` when the subscription ends.
    pub async fn recv(&mut self) -> Option<Option<Value>> {
        self.receiver.recv().await
    }
}

impl futures::Stream for WatchStream {
    type Item = Option<Value>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Contract over the remote tree. All mutation of contended state must go
/// through [`Store::transact`]; plain writes are reserved for keys only one
/// client writes to (fresh rooms, a user's own record).
pub trait Store: Clone + Send + Sync + 'static {
    /// Point read of the value at `path`, `None` when absent.
    fn read(&self, path: &str) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Unconditional last-writer-wins set.
    fn write(&self, path: &str, value: Value) -> impl Future<Output = Result<()>> + Send;

    /// Patch individual children of the map at `path`, leaving siblings
    /// untouched.
    fn merge(
        &self,
        path: &str,
        fields: serde_json::Map<String, Value>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete the value at `path`.
    fn remove(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to the value at `path`.
    fn watch(&self, path: &str) -> impl Future<Output = Result<WatchStream>> + Send;

    /// Run an optimistic transaction over the subtree at `path`.
    ///
    /// `mutate` receives the current value and proposes a replacement or
    /// aborts. On a conflicting concurrent commit it is re-invoked with a
    /// refreshed snapshot, so it must derive everything from its argument
    /// and never treat captured state as truth.
    fn transact<F>(&self, path: &str, mutate: F) -> impl Future<Output = Result<TransactOutcome>> + Send
    where
        F: FnMut(Option<Value>) -> TransactionUpdate + Send;

    /// New store-generated key, unique and lexicographically increasing in
    /// generation order.
    fn generate_key(&self) -> String;

    /// Ask the store to delete `path` if this connection terminates
    /// without a clean exit.
    fn on_disconnect_remove(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Withdraw a previous [`Store::on_disconnect_remove`] registration.
    fn cancel_disconnect_cleanup(&self, path: &str) -> impl Future<Output = Result<()>> + Send;
}
