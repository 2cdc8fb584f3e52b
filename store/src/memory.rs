use crate::{
    path, Error, PushIdGenerator, Result, RetryPolicy, Store, TransactOutcome, TransactionUpdate,
    WatchStream,
};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

struct Tree {
    root: Value,
    // Tree-global write version. Unrelated writes force a transaction
    // retry, which is harmless under at-least-once semantics.
    version: u64,
}

struct Watcher {
    path: String,
    sender: mpsc::UnboundedSender<Option<Value>>,
}

struct Inner {
    tree: RwLock<Tree>,
    watchers: Mutex<Vec<Watcher>>,
    push: Mutex<(PushIdGenerator, StdRng)>,
    // Paths to delete per connection on unclean termination.
    cleanups: Mutex<HashMap<u64, HashSet<String>>>,
    closed: Mutex<HashSet<u64>>,
    next_connection: AtomicU64,
    retry: RetryPolicy,
}

/// In-memory reference implementation of [`Store`]. Handles created with
/// [`MemoryStore::client`] share one tree but carry their own connection,
/// so disconnect cleanup can be exercised per client.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
    connection: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_retry_policy(RetryPolicy::default())
    }

    pub fn with_retry_policy(retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(Tree {
                    root: Value::Object(Map::new()),
                    version: 0,
                }),
                watchers: Mutex::new(Vec::new()),
                push: Mutex::new((PushIdGenerator::new(), StdRng::from_entropy())),
                cleanups: Mutex::new(HashMap::new()),
                closed: Mutex::new(HashSet::new()),
                next_connection: AtomicU64::new(1),
                retry,
            }),
            connection: 0,
        }
    }

    /// New handle over the same tree with its own connection.
    pub fn client(&self) -> MemoryStore {
        MemoryStore {
            inner: self.inner.clone(),
            connection: self.inner.next_connection.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Terminate this handle's connection uncleanly: registered cleanup
    /// paths are deleted and every further operation through the handle
    /// fails.
    pub async fn disconnect(&self) {
        self.inner
            .closed
            .lock()
            .expect("closed lock poisoned")
            .insert(self.connection);
        let paths = self
            .inner
            .cleanups
            .lock()
            .expect("cleanups lock poisoned")
            .remove(&self.connection)
            .unwrap_or_default();
        for p in paths {
            debug!(path = %p, connection = self.connection, "disconnect cleanup");
            {
                let mut tree = self.inner.tree.write().expect("tree lock poisoned");
                path::remove(&mut tree.root, &p);
                tree.version += 1;
            }
            self.notify(&p);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self
            .inner
            .closed
            .lock()
            .expect("closed lock poisoned")
            .contains(&self.connection)
        {
            return Err(Error::Unreachable("connection closed".to_string()));
        }
        Ok(())
    }

    /// Fan the current value out to every watcher overlapping `written`,
    /// dropping watchers whose receiver is gone.
    fn notify(&self, written: &str) {
        let tree = self.inner.tree.read().expect("tree lock poisoned");
        let mut watchers = self.inner.watchers.lock().expect("watchers lock poisoned");
        watchers.retain(|w| {
            if !path::overlaps(&w.path, written) {
                return !w.sender.is_closed();
            }
            let snapshot = path::get(&tree.root, &w.path).cloned();
            w.sender.send(snapshot).is_ok()
        });
    }
}

impl Store for MemoryStore {
    async fn read(&self, path_str: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        let tree = self.inner.tree.read().expect("tree lock poisoned");
        Ok(path::get(&tree.root, path_str).cloned())
    }

    async fn write(&self, path_str: &str, value: Value) -> Result<()> {
        self.ensure_open()?;
        {
            let mut tree = self.inner.tree.write().expect("tree lock poisoned");
            path::set(&mut tree.root, path_str, value);
            tree.version += 1;
        }
        self.notify(path_str);
        Ok(())
    }

    async fn merge(&self, path_str: &str, fields: Map<String, Value>) -> Result<()> {
        self.ensure_open()?;
        {
            let mut tree = self.inner.tree.write().expect("tree lock poisoned");
            if let Some(existing) = path::get(&tree.root, path_str) {
                if !existing.is_object() {
                    return Err(Error::NotAMap(path_str.to_string()));
                }
            }
            for (key, value) in fields {
                let child = format!("{path_str}/{key}");
                path::set(&mut tree.root, &child, value);
            }
            tree.version += 1;
        }
        self.notify(path_str);
        Ok(())
    }

    async fn remove(&self, path_str: &str) -> Result<()> {
        self.ensure_open()?;
        {
            let mut tree = self.inner.tree.write().expect("tree lock poisoned");
            path::remove(&mut tree.root, path_str);
            tree.version += 1;
        }
        self.notify(path_str);
        Ok(())
    }

    async fn watch(&self, path_str: &str) -> Result<WatchStream> {
        self.ensure_open()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let tree = self.inner.tree.read().expect("tree lock poisoned");
            let initial = path::get(&tree.root, path_str).cloned();
            let _ = sender.send(initial);
            self.inner
                .watchers
                .lock()
                .expect("watchers lock poisoned")
                .push(Watcher {
                    path: path_str.to_string(),
                    sender,
                });
        }
        Ok(WatchStream::new(receiver))
    }

    async fn transact<F>(&self, path_str: &str, mut mutate: F) -> Result<TransactOutcome>
    where
        F: FnMut(Option<Value>) -> TransactionUpdate + Send,
    {
        self.ensure_open()?;
        let retry = self.inner.retry;
        let mut backoff = retry.initial_backoff;
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let (snapshot, seen_version) = {
                let tree = self.inner.tree.read().expect("tree lock poisoned");
                (path::get(&tree.root, path_str).cloned(), tree.version)
            };

            let proposed = match mutate(snapshot) {
                TransactionUpdate::Set(value) => value,
                TransactionUpdate::Abort => {
                    let tree = self.inner.tree.read().expect("tree lock poisoned");
                    return Ok(TransactOutcome {
                        committed: false,
                        snapshot: path::get(&tree.root, path_str).cloned(),
                    });
                }
            };

            let applied = {
                let mut tree = self.inner.tree.write().expect("tree lock poisoned");
                if tree.version == seen_version {
                    path::set(&mut tree.root, path_str, proposed.clone());
                    tree.version += 1;
                    true
                } else {
                    false
                }
            };
            if applied {
                self.notify(path_str);
                return Ok(TransactOutcome {
                    committed: true,
                    snapshot: Some(proposed),
                });
            }

            if attempt >= retry.max_attempts {
                warn!(path = %path_str, attempt, "transaction retries exhausted");
                let tree = self.inner.tree.read().expect("tree lock poisoned");
                return Ok(TransactOutcome {
                    committed: false,
                    snapshot: path::get(&tree.root, path_str).cloned(),
                });
            }
            debug!(path = %path_str, attempt, "transaction conflict, retrying");
            sleep(backoff).await;
            backoff = std::cmp::min(backoff.saturating_mul(2), retry.max_backoff);
        }
    }

    fn generate_key(&self) -> String {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut push = self.inner.push.lock().expect("push lock poisoned");
        let (generator, rng) = &mut *push;
        generator.generate(now_ms, rng)
    }

    async fn on_disconnect_remove(&self, path_str: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner
            .cleanups
            .lock()
            .expect("cleanups lock poisoned")
            .entry(self.connection)
            .or_default()
            .insert(path_str.to_string());
        Ok(())
    }

    async fn cancel_disconnect_cleanup(&self, path_str: &str) -> Result<()> {
        self.ensure_open()?;
        if let Some(paths) = self
            .inner
            .cleanups
            .lock()
            .expect("cleanups lock poisoned")
            .get_mut(&self.connection)
        {
            paths.remove(path_str);
        }
        Ok(())
    }
}
