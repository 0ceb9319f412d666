//! In-memory weather cache keyed by saved-location id.
//!
//! Entries are derived data: they can be dropped and refetched at any time.
//! Each fetch takes a ticket before going to the network and only writes its
//! result if nothing newer has happened to that id in the meantime (a newer
//! fetch already wrote, or the id was invalidated).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::client::WeatherClient;
use crate::types::{CurrentReport, ForecastDetails, WeatherError};

/// What the location registry needs from a weather cache.
#[async_trait]
pub trait ForecastCache: Send + Sync {
    /// Fetch current conditions and store them under `location_id`.
    async fn fetch_current(
        &self,
        location_id: i64,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentReport, WeatherError>;

    /// Drop everything cached for `location_id`. Absent ids are fine.
    fn invalidate(&self, location_id: i64);
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    ticket: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    current: HashMap<i64, Slot<CurrentReport>>,
    details: HashMap<i64, Slot<ForecastDetails>>,
    /// Fetches still waiting on the network, per id
    in_flight: HashMap<i64, usize>,
    /// Last ticket issued before each id was invalidated. Only kept while
    /// that id has fetches in flight.
    invalidated_at: HashMap<i64, u64>,
    /// Last ticket issued before the whole cache was cleared
    cleared_at: u64,
    next_ticket: u64,
}

impl CacheState {
    fn issue(&mut self, location_id: i64) -> u64 {
        *self.in_flight.entry(location_id).or_default() += 1;
        self.next_ticket += 1;
        self.next_ticket
    }

    fn finish(&mut self, location_id: i64) {
        if let Some(count) = self.in_flight.get_mut(&location_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(&location_id);
                self.invalidated_at.remove(&location_id);
            }
        }
    }

    fn accepts(&self, location_id: i64, ticket: u64, existing: Option<u64>) -> bool {
        let invalidated = self.invalidated_at.get(&location_id).copied().unwrap_or(0);
        ticket > self.cleared_at && ticket > invalidated && existing.map_or(true, |t| ticket > t)
    }
}

/// Marks a fetch as in flight until dropped, including when the fetch
/// future is cancelled.
struct InFlight<'a> {
    state: &'a RwLock<CacheState>,
    location_id: i64,
    ticket: u64,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a RwLock<CacheState>, location_id: i64) -> Self {
        let ticket = state.write().issue(location_id);
        Self {
            state,
            location_id,
            ticket,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.write().finish(self.location_id);
    }
}

#[derive(Debug)]
pub struct WeatherCache {
    client: WeatherClient,
    state: RwLock<CacheState>,
}

impl WeatherCache {
    pub fn new(client: WeatherClient) -> Self {
        Self {
            client,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn client(&self) -> &WeatherClient {
        &self.client
    }

    /// Fetch current conditions for a location and cache them.
    ///
    /// On failure nothing is written and any previous entry stays in place.
    pub async fn fetch_current(
        &self,
        location_id: i64,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentReport, WeatherError> {
        let fetch = InFlight::start(&self.state, location_id);

        let report = match self.client.current(lat, lon).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Current weather fetch failed for location {}: {}", location_id, e);
                return Err(e);
            }
        };

        if !self.commit_current(location_id, fetch.ticket, report.clone()) {
            tracing::debug!("Discarded stale current weather for location {}", location_id);
        }
        Ok(report)
    }

    /// Fetch hourly and daily forecasts for a location and cache them.
    pub async fn fetch_details(
        &self,
        location_id: i64,
        lat: f64,
        lon: f64,
    ) -> Result<ForecastDetails, WeatherError> {
        let fetch = InFlight::start(&self.state, location_id);

        let details = match self.client.details(lat, lon).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Forecast fetch failed for location {}: {}", location_id, e);
                return Err(e);
            }
        };

        if !self.commit_details(location_id, fetch.ticket, details.clone()) {
            tracing::debug!("Discarded stale forecast for location {}", location_id);
        }
        Ok(details)
    }

    fn commit_current(&self, location_id: i64, ticket: u64, value: CurrentReport) -> bool {
        let mut state = self.state.write();
        let existing = state.current.get(&location_id).map(|s| s.ticket);
        if !state.accepts(location_id, ticket, existing) {
            return false;
        }
        state.current.insert(location_id, Slot { value, ticket });
        true
    }

    fn commit_details(&self, location_id: i64, ticket: u64, value: ForecastDetails) -> bool {
        let mut state = self.state.write();
        let existing = state.details.get(&location_id).map(|s| s.ticket);
        if !state.accepts(location_id, ticket, existing) {
            return false;
        }
        state.details.insert(location_id, Slot { value, ticket });
        true
    }

    /// Remove current and forecast entries for `location_id`.
    pub fn invalidate(&self, location_id: i64) {
        let mut state = self.state.write();
        state.current.remove(&location_id);
        state.details.remove(&location_id);
        if state.in_flight.contains_key(&location_id) {
            let last_issued = state.next_ticket;
            state.invalidated_at.insert(location_id, last_issued);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.current.clear();
        state.details.clear();
        state.invalidated_at.clear();
        state.cleared_at = state.next_ticket;
    }

    pub fn current(&self, location_id: i64) -> Option<CurrentReport> {
        self.state.read().current.get(&location_id).map(|s| s.value.clone())
    }

    pub fn details(&self, location_id: i64) -> Option<ForecastDetails> {
        self.state.read().details.get(&location_id).map(|s| s.value.clone())
    }

    /// Ids with at least one cached entry, ascending
    pub fn cached_ids(&self) -> Vec<i64> {
        let state = self.state.read();
        let mut ids: Vec<i64> = state
            .current
            .keys()
            .chain(state.details.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[async_trait]
impl ForecastCache for WeatherCache {
    async fn fetch_current(
        &self,
        location_id: i64,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentReport, WeatherError> {
        WeatherCache::fetch_current(self, location_id, lat, lon).await
    }

    fn invalidate(&self, location_id: i64) {
        WeatherCache::invalidate(self, location_id);
    }
}
