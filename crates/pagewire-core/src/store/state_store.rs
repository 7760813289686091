// ── StateStore ──
//
// The whole map lives inside a `watch` channel. Every write runs inside
// the channel's critical section and republishes a fresh `Arc` snapshot,
// so readers never observe a half-applied bulk update.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use crate::model::Value;
use crate::stream::StateStream;

/// Immutable view of every key at one point in time.
pub type StateSnapshot = BTreeMap<String, Value>;

/// Process-wide observable key → value map.
///
/// Last write wins, no history. Writes copy the snapshot when a reader
/// still holds the previous one (O(size) per write), which keeps reads
/// wait-free and snapshots consistent.
pub struct StateStore {
    snapshot: watch::Sender<Arc<StateSnapshot>>,
    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,
}

impl StateStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(StateSnapshot::new()));
        let (version, _) = watch::channel(0u64);
        Self { snapshot, version }
    }

    /// Current value for `key`, `None` when never set or removed.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.snapshot.borrow().get(key).cloned()
    }

    /// Overwrite one key. Subscribers are notified once.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        trace!(%key, %value, "state set");
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| {
            Arc::make_mut(snap).insert(key, value);
        });
        self.bump_version();
    }

    /// Overwrite many keys with a single notification covering all of them.
    pub fn set_all<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if entries.is_empty() {
            return;
        }
        trace!(count = entries.len(), "state set_all");
        self.snapshot.send_modify(|snap| {
            Arc::make_mut(snap).extend(entries);
        });
        self.bump_version();
    }

    /// Drop a key. Returns the removed value; notifies only if it existed.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut removed = None;
        let modified = self.snapshot.send_if_modified(|snap| {
            if !snap.contains_key(key) {
                return false;
            }
            removed = Arc::make_mut(snap).remove(key);
            true
        });
        if modified {
            self.bump_version();
        }
        removed
    }

    /// Apply an arbitrary edit to the map as one mutation with one
    /// notification, e.g. removing some keys while setting others.
    pub fn update(&self, edit: impl FnOnce(&mut StateSnapshot)) {
        self.snapshot.send_modify(|snap| edit(Arc::make_mut(snap)));
        self.bump_version();
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.snapshot.subscribe())
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let store = StateStore::new();
        store.set("cart.count", 5);
        assert_eq!(store.get("cart.count"), Some(Value::Number(5.0)));
        store.set("cart.count", "five");
        assert_eq!(store.get("cart.count"), Some(Value::Text("five".into())));
    }

    #[test]
    fn unknown_key_is_absent() {
        let store = StateStore::new();
        assert_eq!(store.get("nope"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let store = StateStore::new();
        store.set("a", 1);
        let before = store.snapshot();
        store.set("a", 2);
        assert_eq!(before.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(store.get("a"), Some(Value::Number(2.0)));
    }

    #[test]
    fn set_all_is_one_mutation() {
        let store = StateStore::new();
        store.set_all([("a", Value::from(1)), ("b", Value::from(true))]);
        assert_eq!(store.version(), 1);
        assert_eq!(store.len(), 2);

        store.set_all(Vec::<(String, Value)>::new());
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn remove_only_counts_existing_keys() {
        let store = StateStore::new();
        store.set("a", 1);
        assert_eq!(store.remove("missing"), None);
        assert_eq!(store.version(), 1);
        assert_eq!(store.remove("a"), Some(Value::Number(1.0)));
        assert_eq!(store.version(), 2);
        assert_eq!(store.get("a"), None);
    }

    #[tokio::test]
    async fn set_all_notifies_subscribers_once() {
        let store = StateStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.set_all([("x", 1), ("y", 2)]);

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 2);
        // Nothing else pending: a second change would require another write.
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(20), stream.changed()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn update_swaps_keys_in_one_notification() {
        let store = StateStore::new();
        store.set_all([("feed.status", "error"), ("feed.error", "offline")]);
        let mut stream = store.subscribe();

        store.update(|map| {
            map.remove("feed.error");
            map.insert("feed.status".into(), Value::from("success"));
        });

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.get("feed.status"), Some(&Value::from("success")));
        assert!(!snap.contains_key("feed.error"));
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn concurrent_bulk_writes_never_expose_half_a_pair() {
        const WRITERS: usize = 4;
        const ROUNDS: u32 = 500;

        fn assert_pairs_intact(snap: &StateSnapshot) {
            for w in 0..WRITERS {
                assert_eq!(
                    snap.get(&format!("w{w}.a")),
                    snap.get(&format!("w{w}.b")),
                    "writer {w} pair torn"
                );
            }
        }

        let store = Arc::new(StateStore::new());
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let stream = store.subscribe();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    assert_pairs_intact(&stream.latest());
                }
                assert_pairs_intact(&stream.latest());
            })
        };

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..ROUNDS {
                        store.set_all([(format!("w{w}.a"), i), (format!("w{w}.b"), i)]);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);

        reader.join().unwrap();
        let snap = store.snapshot();
        assert_pairs_intact(&snap);
        assert_eq!(snap.len(), WRITERS * 2);
        assert_eq!(store.version(), u64::from(ROUNDS) * u64::try_from(WRITERS).unwrap());
    }
}
