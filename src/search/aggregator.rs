//! Debounced search driver
//!
//! Every query change bumps a generation number. A timer task waits out
//! the debounce window and then starts the search as its own task, so
//! superseding a query cancels only the timer. Results from a search
//! whose generation is no longer current are dropped on arrival.
//!
//! Must be used from within a tokio runtime.

use crate::config::SearchConfig;
use crate::coord::Coordinate;
use crate::geo::{GeoBackend, Geocoder};
use crate::search::{
    match_markers, merge_results, rank_by_proximity, LocationSelect, MapMarker, SearchResult,
};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Observable aggregator state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Latest query text
    pub query: String,
    /// Marker matches first, then geocoded places
    pub results: Vec<SearchResult>,
    /// A search for `query` is pending or in flight
    pub loading: bool,
    /// Bumped on every query change and on close
    pub generation: u64,
}

struct Inner<B> {
    geocoder: Arc<Geocoder<B>>,
    markers: RwLock<Arc<Vec<MapMarker>>>,
    origin: RwLock<Option<Coordinate>>,
    state: watch::Sender<SearchState>,
    debounce: Duration,
    min_query_len: usize,
}

impl<B: GeoBackend> Inner<B> {
    fn is_current(&self, generation: u64) -> bool {
        self.state.borrow().generation == generation
    }

    /// Apply `update` only if `generation` is still current
    fn publish(&self, generation: u64, update: impl FnOnce(&mut SearchState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            update(state);
            true
        })
    }

    fn local_matches(&self, query: &str) -> Vec<MapMarker> {
        let markers = Arc::clone(&self.markers.read().unwrap_or_else(PoisonError::into_inner));
        let mut matches = match_markers(&markers, query);
        if let Some(origin) = *self.origin.read().unwrap_or_else(PoisonError::into_inner) {
            rank_by_proximity(&mut matches, origin);
        }
        matches
    }

    async fn run(&self, generation: u64, query: String) {
        let markers = self.local_matches(&query);

        // Local matches do not wait on the provider
        let partial: Vec<SearchResult> = markers.iter().cloned().map(SearchResult::Marker).collect();
        self.publish(generation, |state| state.results = partial);

        let geocoded = self.geocoder.forward_geocode(&query).await;
        let results = merge_results(markers, geocoded);
        let count = results.len();

        if self.publish(generation, |state| {
            state.results = results;
            state.loading = false;
        }) {
            debug!(query = %query, count, "search complete");
        } else {
            debug!(query = %query, generation, "discarding stale search response");
        }
    }
}

/// Debounced search over local markers and a geocoder
pub struct SearchAggregator<B> {
    inner: Arc<Inner<B>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    selections: broadcast::Sender<LocationSelect>,
}

impl<B: GeoBackend + 'static> SearchAggregator<B> {
    /// Create an aggregator with explicit timing parameters
    pub fn new(
        geocoder: Arc<Geocoder<B>>,
        markers: Vec<MapMarker>,
        debounce: Duration,
        min_query_len: usize,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        let (selections, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(Inner {
                geocoder,
                markers: RwLock::new(Arc::new(markers)),
                origin: RwLock::new(None),
                state,
                debounce,
                min_query_len,
            }),
            pending: Mutex::new(None),
            selections,
        }
    }

    /// Create an aggregator using the `[search]` config section
    pub fn from_config(
        geocoder: Arc<Geocoder<B>>,
        markers: Vec<MapMarker>,
        config: &SearchConfig,
    ) -> Self {
        Self::new(
            geocoder,
            markers,
            Duration::from_millis(config.debounce_ms),
            config.min_query_len,
        )
    }

    /// Watch results and the loading flag
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Receive location-select events
    pub fn subscribe_selections(&self) -> broadcast::Receiver<LocationSelect> {
        self.selections.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Replace the set of loaded markers; affects the next search
    pub fn set_markers(&self, markers: Vec<MapMarker>) {
        *self.inner.markers.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(markers);
    }

    /// Rank marker matches by distance from this position
    pub fn set_origin(&self, origin: Option<Coordinate>) {
        *self.inner.origin.write().unwrap_or_else(PoisonError::into_inner) = origin;
    }

    fn is_searchable(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.inner.min_query_len
    }

    fn cancel_pending(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// React to a change of the query text
    ///
    /// Surrounding whitespace is dropped before anything else. Short queries clear the results immediately and never reach the
    /// provider. Anything else is searched once the input has been quiet
    /// for the debounce window.
    pub fn on_query_change(&self, query: impl Into<String>) {
        let query = query.into().trim().to_string();
        let searchable = self.is_searchable(&query);

        self.cancel_pending();

        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.query = query.clone();
            state.loading = searchable;
            if !searchable {
                state.results.clear();
            }
        });

        if !searchable {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if !inner.is_current(generation) {
                return;
            }
            // The search outlives the timer; superseding it only stales the result
            tokio::spawn(async move { inner.run(generation, query).await });
        });

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Run a search right away, bypassing debounce and published state
    pub async fn search_once(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if !self.is_searchable(query) {
            return Vec::new();
        }
        let markers = self.inner.local_matches(query);
        let geocoded = self.inner.geocoder.forward_geocode(query).await;
        merge_results(markers, geocoded)
    }

    /// The user picked a result
    pub fn select(&self, result: &SearchResult) -> LocationSelect {
        let event = LocationSelect::from(result);
        // No subscribers is fine
        let _ = self.selections.send(event.clone());
        event
    }

    /// Close the search UI: drop pending work and stale anything in flight
    pub fn close(&self) {
        self.cancel_pending();
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            state.query.clear();
            state.results.clear();
            state.loading = false;
        });
    }
}

impl<B> Drop for SearchAggregator<B> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
