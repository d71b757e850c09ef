//! In-memory TTL cache for fetch results.
//!
//! Entries are keyed by a fingerprint of `source|topic|limit` so the same
//! question to the same source is answered from memory within the TTL.
//! Empty result sets are cached too, so a source that has nothing on a
//! topic is not re-queried on every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use sourcedock_shared::Document;

/// Hit/miss counters, snapshot via [`DocumentCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Entry {
    documents: Vec<Document>,
    stored_at: Instant,
}

/// TTL document cache shared by all of a client's fetches.
pub struct DocumentCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

/// Stable cache key for one (source, topic, limit) question.
pub fn fingerprint(source: &str, topic: &str, limit: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(topic.as_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

impl DocumentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: Mutex::new(0),
            misses: Mutex::new(0),
        }
    }

    /// Look up a fresh entry. Expired entries are removed on the way out and
    /// count as misses.
    pub fn get(&self, key: &str) -> Option<Vec<Document>> {
        let mut entries = self.entries.lock().ok()?;
        let fresh = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                Some(entry.documents.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        match fresh {
            Some(docs) => {
                self.bump(&self.hits);
                debug!(key, count = docs.len(), "cache hit");
                Some(docs)
            }
            None => {
                self.bump(&self.misses);
                None
            }
        }
    }

    /// Store a result set, empty sets included.
    pub fn put(&self, key: String, documents: Vec<Document>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                Entry {
                    documents,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.lock().map(|h| *h).unwrap_or(0),
            misses: self.misses.lock().map(|m| *m).unwrap_or(0),
            entries: self.entries.lock().map(|e| e.len()).unwrap_or(0),
        }
    }

    fn bump(&self, counter: &Mutex<u64>) {
        if let Ok(mut value) = counter.lock() {
            *value += 1;
        }
    }
}
