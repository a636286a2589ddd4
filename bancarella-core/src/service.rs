//! High-level service facade combining the event and parking pipelines.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::aggregate::ParkingAggregator;
use crate::catalog::{build_catalog, upcoming};
use crate::model::{Occurrence, ParkingReport};
use crate::ports::{EventSourcePort, PortError};
use crate::store::MarketStore;

/// Public entry point for the calendar, parking, and admin features.
pub struct MarketService {
    events: Arc<dyn EventSourcePort>,
    parking: ParkingAggregator,
    store: MarketStore,
}

impl MarketService {
    /// Create a new service over the given event source and parking
    /// aggregator.
    #[must_use]
    pub fn new(events: Arc<dyn EventSourcePort>, parking: ParkingAggregator) -> Self {
        Self {
            events,
            parking,
            store: MarketStore::new(),
        }
    }

    /// Full occurrence catalog for the calendar widget.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the sheet feed cannot be fetched or
    /// parsed; partial calendars are never returned.
    pub async fn event_catalog(&self, reference: NaiveDate) -> Result<Vec<Occurrence>, PortError> {
        let records = self.events.records().await?;
        Ok(build_catalog(&records, reference))
    }

    /// Next `limit` occurrences starting on/after `today`.
    ///
    /// # Errors
    ///
    /// Same failure semantics as [`MarketService::event_catalog`].
    pub async fn upcoming_events(
        &self,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Occurrence>, PortError> {
        let catalog = self.event_catalog(today).await?;
        Ok(upcoming(&catalog, today, limit))
    }

    /// Ranked parking report for the given wall-clock time. Never fails;
    /// degraded sources appear in the report's warnings.
    pub async fn parking_report(&self, at: NaiveDateTime) -> ParkingReport {
        self.parking.collect(at).await
    }

    /// The in-memory admin store.
    #[must_use]
    pub fn store(&self) -> &MarketStore {
        &self.store
    }
}
