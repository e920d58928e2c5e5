//! Reservation coordinator.
//!
//! Records a reservation against the live sheet under the single-holder
//! constraint. Every attempt is a fresh linear protocol: fetch the latest
//! table directly from the store (never the cache), validate the schema,
//! locate the first matching row, check the holder, write the cell, then
//! refresh the cache so readers see the new state before the TTL expires.
//!
//! There is no cross-request lock: two simultaneous attempts for the same
//! card can both observe it free and the store's last write wins. Fetching
//! fresh state narrows that window but does not close it.

use std::sync::Arc;

use tracing::Instrument;

use crate::cache::SheetCache;
use crate::card::{CardRecord, Color, ColumnMap, COL_RESERVED};
use crate::error::{Error, Result};
use crate::observability::reservation_span;
use crate::sheet::SheetStore;

/// Physical sheet row of data index 0: one header row plus 1-based rows.
const HEADER_ROW_OFFSET: u32 = 2;

/// Coordinates reservation writes against the sheet store.
pub struct ReservationCoordinator {
    store: Arc<dyn SheetStore>,
    cache: Arc<SheetCache>,
}

impl std::fmt::Debug for ReservationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationCoordinator")
            .field("store", &"<SheetStore>")
            .field("cache", &"<SheetCache>")
            .finish()
    }
}

fn sheet_row(index: usize) -> u32 {
    u32::try_from(index)
        .unwrap_or(u32::MAX)
        .saturating_add(HEADER_ROW_OFFSET)
}

impl ReservationCoordinator {
    /// Creates a coordinator over the given store and cache.
    #[must_use]
    pub fn new(store: Arc<dyn SheetStore>, cache: Arc<SheetCache>) -> Self {
        Self { store, cache }
    }

    /// Reserves `card_name` in `color` for `user`.
    ///
    /// The holder is recorded lowercased. User-side limits (duplicate
    /// color, max count) are the caller's responsibility and must be
    /// checked before invoking this; the coordinator only enforces
    /// existence and the single-holder constraint, both against the
    /// freshest possible read.
    ///
    /// # Errors
    ///
    /// - [`Error::DataSource`] when the fresh fetch fails.
    /// - [`Error::MalformedSheet`] when required columns are missing.
    /// - [`Error::CardNotFound`] when no row matches name and color.
    /// - [`Error::AlreadyReserved`] when the row already has a holder.
    /// - [`Error::Update`] when the cell write fails.
    pub async fn reserve(&self, card_name: &str, color: Color, user: &str) -> Result<()> {
        let span = reservation_span(card_name, color.as_str(), user);
        self.reserve_inner(card_name, color, user).instrument(span).await
    }

    async fn reserve_inner(&self, card_name: &str, color: Color, user: &str) -> Result<()> {
        let (rows, columns) = match self.fetch_latest().await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.cache.refresh_best_effort().await;
                return Err(err);
            }
        };

        let mut located: Option<(u32, CardRecord)> = None;
        for (index, row) in rows.iter().enumerate() {
            let Some(record) = CardRecord::from_row(row) else {
                continue;
            };
            if record.name == card_name && record.color_matches(color) {
                located = Some((sheet_row(index), record));
                break;
            }
        }

        let Some((row, record)) = located else {
            tracing::warn!(card = card_name, %color, "card not found in latest sheet data");
            self.cache.refresh_best_effort().await;
            return Err(Error::CardNotFound {
                name: card_name.to_string(),
                color: color.to_string(),
            });
        };

        if let Some(holder) = record.holder() {
            tracing::warn!(card = card_name, %color, holder, "card already reserved");
            let holder = holder.to_string();
            self.cache.refresh_best_effort().await;
            return Err(Error::AlreadyReserved {
                name: card_name.to_string(),
                reserved_by: holder,
            });
        }

        let user_lower = user.trim().to_lowercase();
        tracing::info!(card = card_name, %color, user = %user_lower, row, "writing reservation");
        if let Err(err) = self
            .store
            .write_cell(row, columns.reserved_column(), &user_lower)
            .await
        {
            self.cache.refresh_best_effort().await;
            return Err(err);
        }

        // Readers should see the reservation before the TTL expires; if
        // this fails, staleness is bounded by the TTL.
        self.cache.refresh_best_effort().await;
        Ok(())
    }

    /// Clears every reservation in the sheet.
    ///
    /// Administrative operation: blanks the reservation cell of each held
    /// row, in sheet order, then refreshes the cache. Returns the number
    /// of cells cleared.
    ///
    /// # Errors
    ///
    /// Propagates the first fetch or write failure; rows already cleared
    /// stay cleared.
    pub async fn clear_reservations(&self) -> Result<usize> {
        let (rows, columns) = self.fetch_latest().await?;

        let mut cleared = 0;
        for (index, row) in rows.iter().enumerate() {
            let held = row
                .get(COL_RESERVED)
                .is_some_and(|value| !value.trim().is_empty());
            if !held {
                continue;
            }
            self.store
                .write_cell(sheet_row(index), columns.reserved_column(), "")
                .await?;
            cleared += 1;
        }

        tracing::info!(cleared, "reservations cleared");
        self.cache.refresh_best_effort().await;
        Ok(cleared)
    }

    /// Reads rows and headers directly from the store and validates the
    /// column map, bypassing the cache.
    async fn fetch_latest(
        &self,
    ) -> Result<(Vec<std::collections::HashMap<String, String>>, ColumnMap)> {
        let rows = self.store.read_rows().await?;
        let headers = self.store.read_header().await?;
        let columns = ColumnMap::from_headers(&headers)?;
        Ok((rows, columns))
    }
}
