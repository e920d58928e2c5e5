//! TTL-bounded snapshot cache over the sheet store.
//!
//! A snapshot is immutable and replaced wholesale on every successful
//! refresh, so readers never observe a torn view. Two refreshes racing
//! each other may overwrite one with the other; both are valid "latest"
//! reads, so last-write-wins is acceptable here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::card::{CardRecord, ColumnMap};
use crate::error::Result;
use crate::sheet::SheetStore;

/// An immutable point-in-time copy of the sheet.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Arc<Vec<CardRecord>>,
    headers: Arc<Vec<String>>,
    columns: ColumnMap,
    fetched_at: Instant,
}

impl Snapshot {
    /// The mapped records, in sheet order. Rows without a usable name are
    /// dropped during mapping.
    #[must_use]
    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// The header row the snapshot was built from.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The validated column map for this snapshot.
    #[must_use]
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Time elapsed since the snapshot was fetched.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Read-through cache holding the last-fetched sheet snapshot.
pub struct SheetCache {
    store: Arc<dyn SheetStore>,
    ttl: Duration,
    slot: RwLock<Option<Snapshot>>,
}

impl std::fmt::Debug for SheetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetCache")
            .field("store", &"<SheetStore>")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SheetCache {
    /// Creates a cache over the given store with the given TTL.
    #[must_use]
    pub fn new(store: Arc<dyn SheetStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a snapshot has ever been loaded.
    pub async fn primed(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Returns a fresh-enough snapshot, refreshing from the store when the
    /// cached one is expired or empty.
    ///
    /// A zero-record snapshot is indistinguishable from "not yet loaded",
    /// so it is always treated as stale.
    ///
    /// # Errors
    ///
    /// Propagates refresh failures; the previously cached snapshot (if
    /// any) is retained but not silently substituted for the requested
    /// read.
    pub async fn read(&self) -> Result<Snapshot> {
        {
            let slot = self.slot.read().await;
            if let Some(snapshot) = slot.as_ref() {
                if !snapshot.records.is_empty() && snapshot.age() <= self.ttl {
                    return Ok(snapshot.clone());
                }
            }
        }

        tracing::info!("sheet cache expired or empty, refreshing");
        self.refresh().await
    }

    /// Unconditionally re-reads the sheet and replaces the snapshot.
    ///
    /// # Errors
    ///
    /// Fails loudly on store errors or a header row missing required
    /// columns; in both cases the previous snapshot is retained so
    /// existing reservations are not silently hidden behind an empty
    /// result.
    pub async fn refresh(&self) -> Result<Snapshot> {
        let rows = self.store.read_rows().await?;
        let headers = self.store.read_header().await?;
        let columns = ColumnMap::from_headers(&headers)?;

        let records: Vec<CardRecord> = rows.iter().filter_map(CardRecord::from_row).collect();
        let dropped = rows.len() - records.len();
        if dropped > 0 {
            tracing::warn!(dropped, "skipped unmappable sheet rows during refresh");
        }

        let snapshot = Snapshot {
            records: Arc::new(records),
            headers: Arc::new(headers),
            columns,
            fetched_at: Instant::now(),
        };
        tracing::info!(records = snapshot.records.len(), "sheet cache refreshed");

        *self.slot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Refreshes the cache, logging and swallowing any failure.
    ///
    /// Used after reservation writes and on coordinator error paths;
    /// staleness is bounded by the TTL if this fails.
    pub async fn refresh_best_effort(&self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "best-effort cache refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{COL_CARD_NAME, COL_COLOR, COL_RESERVED};
    use crate::error::Error;
    use crate::sheet::MemorySheet;

    fn seeded_sheet() -> Arc<MemorySheet> {
        Arc::new(MemorySheet::new(
            vec![COL_CARD_NAME, COL_COLOR, COL_RESERVED],
            vec![
                vec!["Lightning Bolt", "Red", ""],
                vec!["Shock", "Red", ""],
            ],
        ))
    }

    #[tokio::test]
    async fn first_read_refreshes_empty_cache() {
        let sheet = seeded_sheet();
        let cache = SheetCache::new(sheet.clone(), Duration::from_secs(300));
        assert!(!cache.primed().await);

        let snapshot = cache.read().await.unwrap();
        assert_eq!(snapshot.records().len(), 2);
        assert!(cache.primed().await);
    }

    #[tokio::test]
    async fn fresh_snapshot_is_served_without_a_store_read() {
        let sheet = seeded_sheet();
        let cache = SheetCache::new(sheet.clone(), Duration::from_secs(300));
        cache.read().await.unwrap();

        // An external write within the TTL stays invisible.
        sheet.set_cell_direct(2, 3, "mallory");
        let snapshot = cache.read().await.unwrap();
        assert!(!snapshot.records()[0].is_reserved());
    }

    #[tokio::test]
    async fn expired_snapshot_is_refetched() {
        let sheet = seeded_sheet();
        let cache = SheetCache::new(sheet.clone(), Duration::ZERO);
        cache.read().await.unwrap();

        sheet.set_cell_direct(2, 3, "mallory");
        let snapshot = cache.read().await.unwrap();
        assert_eq!(snapshot.records()[0].holder(), Some("mallory"));
    }

    #[tokio::test]
    async fn zero_record_snapshot_is_always_stale() {
        let sheet = Arc::new(MemorySheet::empty());
        let cache = SheetCache::new(sheet.clone(), Duration::from_secs(300));
        assert!(cache.read().await.unwrap().records().is_empty());

        // Rows added after an empty fetch show up immediately, TTL or not.
        sheet.push_row(vec!["Lightning Bolt", "Red", ""]);
        assert_eq!(cache.read().await.unwrap().records().len(), 1);
    }

    #[tokio::test]
    async fn malformed_headers_fail_and_keep_previous_snapshot() {
        let sheet = Arc::new(MemorySheet::new(
            vec![COL_CARD_NAME, COL_COLOR, COL_RESERVED],
            vec![vec!["Lightning Bolt", "Red", "alice"]],
        ));
        let cache = SheetCache::new(sheet.clone(), Duration::from_secs(300));
        cache.read().await.unwrap();

        // The sheet loses its reservation column behind our back.
        sheet.set_header(vec![COL_CARD_NAME, COL_COLOR]);
        assert!(matches!(
            cache.refresh().await.unwrap_err(),
            Error::MalformedSheet { .. }
        ));

        // The previous snapshot, with its reservation, is still served.
        let snapshot = cache.read().await.unwrap();
        assert_eq!(snapshot.records()[0].holder(), Some("alice"));
    }

    #[tokio::test]
    async fn store_failure_propagates_and_keeps_previous_snapshot() {
        let sheet = seeded_sheet();
        let cache = SheetCache::new(sheet.clone(), Duration::ZERO);
        cache.read().await.unwrap();

        sheet.set_fail_reads(true);
        assert!(matches!(
            cache.refresh().await.unwrap_err(),
            Error::DataSource { .. }
        ));
        // The old snapshot is still there for TTL-based reads.
        assert!(cache.primed().await);

        // Explicitly requested reads fail loudly rather than serving stale.
        assert!(cache.read().await.is_err());
    }

    #[tokio::test]
    async fn best_effort_refresh_swallows_failures() {
        let sheet = seeded_sheet();
        let cache = SheetCache::new(sheet.clone(), Duration::from_secs(300));
        sheet.set_fail_reads(true);
        cache.refresh_best_effort().await;
        assert!(!cache.primed().await);
    }
}
