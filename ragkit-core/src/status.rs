//! Source status tracking
//!
//! Keyed map of `source_name -> Status` with per-entry TTL, a global
//! failure flag for entries that expire mid-pipeline, and a batch upload
//! counter.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Processing state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Pipeline is extracting/chunking/enhancing
    Processing,
    /// Pieces are being written to the vector database
    Uploading,
    /// Upload finished successfully
    Ready,
    /// Upload failed or timed out
    Error,
}

impl Status {
    /// Terminal states stay until a new upload begins
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Processing => "PROCESSING",
            Self::Uploading => "UPLOADING",
            Self::Ready => "READY",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
struct StatusEntry {
    status: Status,
    expires_at: Instant,
}

/// Durable keyed status map with TTL
pub struct StatusStore {
    entries: DashMap<String, StatusEntry>,
    ttl: Duration,
    failure: AtomicBool,
    counter: AtomicI64,
}

impl StatusStore {
    /// Create a store whose entries live for `ttl` after their last upsert
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            failure: AtomicBool::new(false),
            counter: AtomicI64::new(0),
        }
    }

    /// Set the status for a source and refresh its TTL
    pub fn upsert(&self, source_name: &str, status: Status) {
        self.entries.insert(
            source_name.to_string(),
            StatusEntry {
                status,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Current status of a source, if present and not expired
    pub fn get(&self, source_name: &str) -> Option<Status> {
        if let Some(expired) = self
            .entries
            .remove_if(source_name, |_, e| e.expires_at <= Instant::now())
        {
            self.note_expired(source_name, expired.1.status);
            return None;
        }
        self.entries.get(source_name).map(|e| e.status)
    }

    /// Snapshot of all live entries
    pub fn get_all(&self) -> Vec<(String, Status)> {
        let now = Instant::now();
        let mut expired = Vec::new();
        let mut live = Vec::new();
        for entry in self.entries.iter() {
            if entry.expires_at <= now {
                expired.push(entry.key().clone());
            } else {
                live.push((entry.key().clone(), entry.status));
            }
        }
        for name in expired {
            if let Some((_, e)) = self.entries.remove_if(&name, |_, e| e.expires_at <= now) {
                self.note_expired(&name, e.status);
            }
        }
        live.sort_by(|a, b| a.0.cmp(&b.0));
        live
    }

    /// Whether any entry ever expired before reaching a terminal state
    pub fn failure(&self) -> bool {
        self.failure.load(Ordering::Relaxed)
    }

    /// Increase the pending upload batch counter
    pub fn add(&self, n: i64) {
        self.counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Decrease the pending upload batch counter
    pub fn subtract(&self, n: i64) {
        self.counter.fetch_sub(n, Ordering::Relaxed);
    }

    /// Current value of the batch counter
    pub fn counter(&self) -> i64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn note_expired(&self, source_name: &str, status: Status) {
        if !status.is_terminal() {
            warn!(source = %source_name, status = %status, "status entry expired before reaching a terminal state");
            self.failure.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get() {
        let store = StatusStore::new(Duration::from_secs(60));
        store.upsert("file:a", Status::Processing);
        assert_eq!(store.get("file:a"), Some(Status::Processing));

        store.upsert("file:a", Status::Ready);
        assert_eq!(store.get("file:a"), Some(Status::Ready));
        assert_eq!(store.get("file:b"), None);
    }

    #[test]
    fn test_get_all_sorted() {
        let store = StatusStore::new(Duration::from_secs(60));
        store.upsert("web:b", Status::Ready);
        store.upsert("file:a", Status::Error);

        let all = store.get_all();
        assert_eq!(
            all,
            vec![
                ("file:a".to_string(), Status::Error),
                ("web:b".to_string(), Status::Ready),
            ]
        );
    }

    #[test]
    fn test_expiry_of_non_terminal_flips_failure() {
        let store = StatusStore::new(Duration::from_millis(0));
        store.upsert("file:a", Status::Processing);

        assert_eq!(store.get("file:a"), None);
        assert!(store.failure());
    }

    #[test]
    fn test_expiry_of_terminal_is_silent() {
        let store = StatusStore::new(Duration::from_millis(0));
        store.upsert("file:a", Status::Ready);

        assert_eq!(store.get("file:a"), None);
        assert!(!store.failure());
    }

    #[test]
    fn test_counter() {
        let store = StatusStore::new(Duration::from_secs(60));
        store.add(2);
        store.subtract(1);
        assert_eq!(store.counter(), 1);
    }
}
