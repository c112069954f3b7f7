//! Bounded in-memory session cache
//!
//! Sessions live in an LRU map capped by capacity; each entry also carries a
//! time-to-live measured from its last write. Expired entries count as
//! missing and are dropped when touched.

use crate::domain::models::SessionRecord;
use crate::error::{AppError, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct CachedSession {
    written_at: Instant,
    record: SessionRecord,
}

/// LRU session store with per-entry TTL
pub struct SessionCache {
    entries: Mutex<LruCache<String, CachedSession>>,
    ttl: Duration,
}

impl SessionCache {
    /// * `capacity` - Maximum number of sessions kept (must be non-zero)
    /// * `ttl` - How long a session survives after its last write
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| AppError::Config("Session capacity must be positive".to_string()))?;

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        })
    }

    /// Store a session, replacing any previous record with the same id
    pub fn insert(&self, record: SessionRecord) -> Result<()> {
        let mut entries = self.entries.lock()?;
        let key = record.session_id.clone();
        if let Some((evicted, _)) = entries.push(
            key.clone(),
            CachedSession {
                written_at: Instant::now(),
                record,
            },
        ) {
            if evicted != key {
                log::debug!("Evicted session {} (cache full)", evicted);
            }
        }
        Ok(())
    }

    /// Get a copy of a live session
    pub fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let mut entries = self.entries.lock()?;
        match entries.get(session_id) {
            Some(entry) if entry.written_at.elapsed() < self.ttl => Ok(Some(entry.record.clone())),
            Some(_) => {
                entries.pop(session_id);
                log::debug!("Session {} expired", session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Apply `change` to a live session and refresh its TTL
    ///
    /// Returns the updated record, or `None` when the session is unknown or
    /// expired.
    pub fn update<F>(&self, session_id: &str, change: F) -> Result<Option<SessionRecord>>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut entries = self.entries.lock()?;
        let expired = match entries.get_mut(session_id) {
            Some(entry) if entry.written_at.elapsed() < self.ttl => {
                change(&mut entry.record);
                entry.written_at = Instant::now();
                return Ok(Some(entry.record.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(session_id);
        }
        Ok(None)
    }

    /// Number of entries held, including any not yet found to be expired
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }
}
