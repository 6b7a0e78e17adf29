//! In-process store for tests and local development without a Redis server.
//!
//! Mirrors the Redis semantics the facade depends on: `SETEX` deadlines,
//! `INCR`/`DECR` on missing or non-numeric values, glob `MATCH` patterns, and
//! cursor-based `SCAN` that returns to `0` when the keyspace is exhausted and
//! never skips a key that stayed in place for the whole pass.
//! It also counts connections in and out so callers can assert that every
//! connection handed out came back.

use super::{ConnectionSource, StoreConnection};
use async_trait::async_trait;
use kestrel_core::{KestrelError, KestrelResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

#[derive(Debug)]
struct Inner {
    entries: Mutex<BTreeMap<String, Entry>>,
    /// Last key returned by each open scan, keyed by cursor id.
    cursors: Mutex<HashMap<u64, String>>,
    next_cursor: AtomicU64,
    max_connections: usize,
    checked_out: AtomicUsize,
    total_acquired: AtomicUsize,
    offline: AtomicBool,
}

/// An in-process key-value store with a bounded connection count.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with no connection limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_connections(usize::MAX)
    }

    /// Creates an empty store that hands out at most `max` connections at a
    /// time. Acquiring beyond the limit fails immediately with
    /// [`KestrelError::StoreUnavailable`], like a pool whose wait timed out.
    #[must_use]
    pub fn with_max_connections(max: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(BTreeMap::new()),
                cursors: Mutex::new(HashMap::new()),
                next_cursor: AtomicU64::new(1),
                max_connections: max,
                checked_out: AtomicUsize::new(0),
                total_acquired: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Number of connections currently checked out.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        self.inner.checked_out.load(Ordering::SeqCst)
    }

    /// Number of connections handed out since creation.
    #[must_use]
    pub fn total_acquired(&self) -> usize {
        self.inner.total_acquired.load(Ordering::SeqCst)
    }

    /// Simulates the store going away. While offline, acquiring a connection
    /// and running commands on existing connections both fail.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes a raw value directly, bypassing the codec.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entries.lock().insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .entries
            .lock()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live for `key`; `None` if the key is missing or
    /// persistent.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.inner.entries.lock();
        let entry = entries.get(key).filter(|entry| entry.is_live(now))?;
        entry.expires_at.map(|deadline| deadline - now)
    }
}

#[async_trait]
impl ConnectionSource for MemoryStore {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> KestrelResult<MemoryConnection> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(KestrelError::unavailable("store is offline"));
        }

        let max = self.inner.max_connections;
        self.inner
            .checked_out
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .map_err(|n| KestrelError::unavailable(format!("pool exhausted ({} of {} in use)", n, max)))?;
        self.inner.total_acquired.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryConnection {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// A connection checked out of [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    inner: Arc<Inner>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.inner.checked_out.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryConnection {
    fn check_online(&self) -> KestrelResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(KestrelError::unavailable("connection reset by store"));
        }
        Ok(())
    }

    fn write(&self, key: &str, value: &str, expires_at: Option<Instant>) -> KestrelResult<()> {
        self.check_online()?;
        self.inner.entries.lock().insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    fn adjust(&self, key: &str, delta: i64) -> KestrelResult<i64> {
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.inner.entries.lock();

        let (current, expires_at) = match entries.get(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => (
                entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| KestrelError::store(NOT_AN_INTEGER))?,
                entry.expires_at,
            ),
            None => (0, None),
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| KestrelError::store("ERR increment or decrement would overflow"))?;

        entries.insert(
            key.to_owned(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn get(&mut self, key: &str) -> KestrelResult<Option<String>> {
        self.check_online()?;
        let now = Instant::now();
        let entries = self.inner.entries.lock();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&mut self, key: &str, value: &str) -> KestrelResult<()> {
        self.write(key, value, None)
    }

    async fn set_ex(&mut self, key: &str, value: &str, seconds: u64) -> KestrelResult<()> {
        if seconds == 0 {
            return Err(KestrelError::store("ERR invalid expire time in 'setex' command"));
        }
        self.write(key, value, Some(Instant::now() + Duration::from_secs(seconds)))
    }

    async fn del(&mut self, keys: &[String]) -> KestrelResult<u64> {
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.inner.entries.lock();
        let mut deleted = 0;
        for key in keys {
            if entries.remove(key).is_some_and(|entry| entry.is_live(now)) {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn exists(&mut self, key: &str) -> KestrelResult<bool> {
        self.check_online()?;
        let now = Instant::now();
        Ok(self
            .inner
            .entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn incr(&mut self, key: &str) -> KestrelResult<i64> {
        self.adjust(key, 1)
    }

    async fn decr(&mut self, key: &str) -> KestrelResult<i64> {
        self.adjust(key, -1)
    }

    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> KestrelResult<(u64, Vec<String>)> {
        self.check_online()?;

        // A non-zero cursor resumes after the last key it returned, so keys
        // removed behind it cannot shift the rest of the pass.
        let resume = match cursor {
            0 => None,
            id => match self.inner.cursors.lock().remove(&id) {
                Some(last) => Some(last),
                None => return Ok((0, Vec::new())),
            },
        };

        let now = Instant::now();
        let entries = self.inner.entries.lock();
        let lower = resume.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
        let mut live = entries
            .range::<str, _>((lower, Bound::Unbounded))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key);

        let batch: Vec<&String> = live.by_ref().take(count.max(1)).collect();
        let exhausted = live.next().is_none();
        let found = batch
            .iter()
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .map(|key| (*key).clone())
            .collect();

        match batch.last() {
            Some(last) if !exhausted => {
                let next = self.inner.next_cursor.fetch_add(1, Ordering::SeqCst);
                self.inner.cursors.lock().insert(next, (*last).clone());
                Ok((next, found))
            }
            _ => Ok((0, found)),
        }
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a-z]`, and `\` escapes.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'[') => match class_match(pattern, p, text[t]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                None => (text[t] == b'[').then_some(1),
            },
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(2),
            Some(&c) => (c == text[t]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(len), _) => {
                p += len;
                t += 1;
            }
            (None, Some((star, from))) => {
                p = star + 1;
                t = from + 1;
                backtrack = Some((star, from + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p.min(pattern.len())..].iter().all(|&c| c == b'*')
}

/// Matches `ch` against the class opening at `pattern[start]`. Returns whether
/// it matched and how many pattern bytes the class spans, or `None` if the
/// class is unterminated.
fn class_match(pattern: &[u8], start: usize, ch: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    loop {
        let c = *pattern.get(i)?;
        if c == b']' {
            break;
        }
        if c == b'\\' {
            matched |= *pattern.get(i + 1)? == ch;
            i += 2;
        } else if pattern.get(i + 1) == Some(&b'-') && pattern.get(i + 2).is_some_and(|&e| e != b']') {
            let (lo, hi) = (c.min(pattern[i + 2]), c.max(pattern[i + 2]));
            matched |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            matched |= c == ch;
            i += 1;
        }
    }

    Some((matched != negate, i + 1 - start))
}
