//! In-memory change cache with commit-only-on-full-success semantics.
//!
//! `committed` maps object keys to the last modification timestamp seen on a
//! fully successful pass. `pending` accumulates timestamps during the
//! current pass and is merged into `committed` only after every downstream
//! stage (decrypt, extract, publish) succeeded; any failure discards it.
//!
//! The cache is never persisted. After a restart every object is treated as
//! new, which is safe because publishing is an idempotent force-push.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::types::RemoteObject;

type TimestampMap = HashMap<String, DateTime<Utc>>;

/// Process-scoped change cache. Passes are sequential, so `committed` needs
/// no locking; `pending` is mutex-guarded because concurrent fetch workers
/// each write one entry as they finish.
#[derive(Debug, Default)]
pub struct ChangeCache {
    committed: TimestampMap,
    pending: Arc<Mutex<TimestampMap>>,
}

/// Cloneable handle fetch workers use to record a completed fetch.
#[derive(Debug, Clone)]
pub struct PendingWriter {
    pending: Arc<Mutex<TimestampMap>>,
}

impl PendingWriter {
    /// Record the remote timestamp for a fetched key. One write per
    /// completed fetch.
    pub fn record(&self, key: &str, last_modified: DateTime<Utc>) {
        let mut pending = lock(&self.pending);
        pending.insert(key.to_string(), last_modified);
    }
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every listed object that is new or whose remote timestamp
    /// differs from the committed one. Any difference counts, not just
    /// newer: clock skew or object replacement must also trigger a re-sync.
    pub fn diff(&self, listing: &[RemoteObject]) -> Vec<RemoteObject> {
        listing
            .iter()
            .filter(|obj| self.committed.get(&obj.key) != Some(&obj.last_modified))
            .cloned()
            .collect()
    }

    /// Handle for fetch workers to record pending timestamps. Valid for the
    /// current pass only; [`ChangeCache::begin_pass`] detaches older handles.
    pub fn pending_writer(&self) -> PendingWriter {
        PendingWriter {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Start a new pass with a fresh pending map. Workers from an earlier
    /// pass may still hold a [`PendingWriter`] (a fetch that outlived the
    /// deadline); after this call their writes land in the detached map and
    /// can never reach `committed`.
    pub fn begin_pass(&mut self) {
        self.pending = Arc::new(Mutex::new(HashMap::new()));
    }

    /// Merge pending entries into committed and clear pending. Called
    /// exactly once per fully successful pass, never on a failed one.
    pub fn commit(&mut self) {
        let mut pending = lock(&self.pending);
        for (key, ts) in pending.drain() {
            self.committed.insert(key, ts);
        }
    }

    /// Drop everything accumulated during a failed (or dry-run) pass.
    pub fn discard_pending(&self) {
        lock(&self.pending).clear();
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }

    pub fn committed_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.committed.get(key).copied()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }
}

fn lock(map: &Arc<Mutex<TimestampMap>>) -> std::sync::MutexGuard<'_, TimestampMap> {
    // A worker panicking mid-insert leaves the map usable; recover the guard.
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn obj(key: &str, secs: i64) -> RemoteObject {
        RemoteObject {
            key: key.to_string(),
            last_modified: ts(secs),
        }
    }

    #[test]
    fn new_keys_are_changed() {
        let mut cache = ChangeCache::new();
        cache.pending_writer().record("k1", ts(100));
        cache.commit();

        let changed = cache.diff(&[obj("k1", 100), obj("k2", 200)]);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].key, "k2");
    }

    #[test]
    fn any_timestamp_difference_is_changed() {
        let mut cache = ChangeCache::new();
        cache.pending_writer().record("k1", ts(100));
        cache.commit();

        // Older timestamp still counts as a change.
        let changed = cache.diff(&[obj("k1", 50)]);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].key, "k1");
    }

    #[test]
    fn unchanged_listing_yields_empty_diff() {
        let mut cache = ChangeCache::new();
        cache.pending_writer().record("k1", ts(100));
        cache.commit();

        assert!(cache.diff(&[obj("k1", 100)]).is_empty());
    }

    #[test]
    fn discard_pending_keeps_committed_untouched() {
        let mut cache = ChangeCache::new();
        cache.pending_writer().record("k1", ts(100));
        cache.commit();

        cache.pending_writer().record("k2", ts(200));
        cache.discard_pending();

        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.committed_len(), 1);
        assert_eq!(cache.committed_timestamp("k2"), None);
    }

    #[test]
    fn commit_clears_pending() {
        let mut cache = ChangeCache::new();
        cache.pending_writer().record("k1", ts(100));
        cache.commit();

        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.committed_timestamp("k1"), Some(ts(100)));
    }

    #[test]
    fn begin_pass_detaches_earlier_writers() {
        let mut cache = ChangeCache::new();
        let stale_writer = cache.pending_writer();

        cache.begin_pass();
        stale_writer.record("straggler", ts(100));

        assert_eq!(cache.pending_len(), 0);
        cache.pending_writer().record("current", ts(200));
        cache.commit();

        assert_eq!(cache.committed_timestamp("straggler"), None);
        assert_eq!(cache.committed_timestamp("current"), Some(ts(200)));
    }

    #[test]
    fn pending_writer_is_safe_across_threads() {
        let cache = ChangeCache::new();
        let writer = cache.pending_writer();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    writer.record(&format!("k{i}"), ts(i64::from(i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker");
        }

        assert_eq!(cache.pending_len(), 8);
    }
}
