//! Cursor-driven enumeration of the keys in a namespace.

use crate::store::StoreConnection;
use kestrel_core::KestrelResult;
use tracing::debug;

/// Cursor value that both starts and ends a full `SCAN` pass.
pub const SCAN_SENTINEL: u64 = 0;

/// Default `COUNT` hint per `SCAN` round.
pub const DEFAULT_SCAN_BATCH: usize = 100;

/// Enumerates every key whose name contains a given prefix.
///
/// The scan is not a snapshot. Keys written or removed while it runs may be
/// missed or reported twice; callers that act on the result (bulk delete)
/// inherit that window. The pass always terminates because the store
/// guarantees the cursor eventually returns to [`SCAN_SENTINEL`].
#[derive(Debug, Clone, Copy)]
pub struct PatternScanner {
    batch_size: usize,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_BATCH)
    }
}

impl PatternScanner {
    /// Creates a scanner requesting up to `batch_size` keys per round.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Builds the `MATCH` pattern `*{prefix}*`, escaping glob metacharacters
    /// so the prefix matches literally.
    #[must_use]
    pub fn pattern_for(prefix: &str) -> String {
        let mut pattern = String::with_capacity(prefix.len() + 2);
        pattern.push('*');
        for c in prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }

    /// Runs a full `SCAN` pass for `prefix` and returns every key reported.
    pub async fn scan<C>(&self, conn: &mut C, prefix: &str) -> KestrelResult<Vec<String>>
    where
        C: StoreConnection + ?Sized,
    {
        let pattern = Self::pattern_for(prefix);
        let mut keys = Vec::new();
        let mut cursor = SCAN_SENTINEL;
        let mut rounds = 0u32;

        loop {
            let (next, batch) = conn.scan(cursor, &pattern, self.batch_size).await?;
            rounds += 1;
            keys.extend(batch);
            if next == SCAN_SENTINEL {
                break;
            }
            cursor = next;
        }

        debug!(%pattern, rounds, found = keys.len(), "Scan complete");
        Ok(keys)
    }
}
