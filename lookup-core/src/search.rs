use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::watch;

use crate::{
    client::WeatherClient,
    debounce::{DEFAULT_DEBOUNCE, Debouncer},
    model::Location,
    query::GeocodingQuery,
    resolver::{GeocodingResolver, ResolverState},
};

/// Number of candidates a type-ahead search asks for.
pub const SEARCH_LIMIT: u32 = 3;

/// Settings of a [`LocationSearch`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub api_key: String,
    pub limit: u32,
    pub delay: Duration,
    pub initial_query: String,
}

impl SearchOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            limit: SEARCH_LIMIT,
            delay: DEFAULT_DEBOUNCE,
            initial_query: String::new(),
        }
    }
}

/// Geocoding resolver shared with the debounce timer.
struct Target {
    resolver: GeocodingResolver,
    disposed: bool,
}

/// Type-ahead location search: keystrokes are debounced, then geocoded.
///
/// Must be used from within a tokio runtime.
pub struct LocationSearch {
    debouncer: Debouncer,
    target: Arc<Mutex<Target>>,
    candidates: watch::Receiver<ResolverState<Vec<Location>>>,
}

impl LocationSearch {
    pub fn new(client: WeatherClient, options: SearchOptions) -> Self {
        let query =
            GeocodingQuery::new(options.api_key, options.initial_query).with_limit(options.limit);
        let resolver = GeocodingResolver::new(client, query.clone());
        let candidates = resolver.subscribe();
        let target = Arc::new(Mutex::new(Target {
            resolver,
            disposed: false,
        }));

        let shared = Arc::clone(&target);
        let debouncer = Debouncer::new(options.delay, move |text| {
            let Ok(mut target) = shared.lock() else {
                return;
            };
            // A timer that already fired may still get here after dispose.
            if !target.disposed {
                target.resolver.update(query.with_query(text));
            }
        });

        Self {
            debouncer,
            target,
            candidates,
        }
    }

    /// Feed the current content of the search box.
    pub fn input(&mut self, text: &str) {
        self.debouncer.input(text);
    }

    /// Clear the search: candidates go back to an empty list right away.
    pub fn clear(&mut self) {
        self.debouncer.input("");
    }

    pub fn is_loading(&self) -> bool {
        self.debouncer.is_pending() || self.candidates.borrow().is_loading()
    }

    pub fn state(&self) -> ResolverState<Vec<Location>> {
        self.candidates.borrow().clone()
    }

    /// Candidates to offer. Empty while loading or after a failure.
    pub fn options(&self) -> Vec<Location> {
        if self.debouncer.is_pending() {
            return Vec::new();
        }
        self.candidates.borrow().candidates().to_vec()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState<Vec<Location>>> {
        self.candidates.clone()
    }

    /// Wait until no keystroke is pending and no request is in flight.
    pub async fn settled(&mut self) -> ResolverState<Vec<Location>> {
        loop {
            if self.debouncer.is_pending() {
                tokio::time::sleep(self.debouncer.delay()).await;
                continue;
            }

            if !self.candidates.borrow_and_update().is_loading() {
                return self.state();
            }

            if self.candidates.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Cancel the pending keystroke and the outstanding request. Later input is ignored.
    pub fn dispose(&mut self) {
        self.debouncer.cancel();
        if let Ok(mut target) = self.target.lock() {
            target.disposed = true;
            target.resolver.dispose();
        }
    }
}

impl Drop for LocationSearch {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Endpoints;
    use crate::testing::{ScriptedTransport, london_candidates};
    use serde_json::json;
    use tokio::time::sleep;

    fn search(
        transport: ScriptedTransport,
        initial_query: &str,
    ) -> (LocationSearch, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = WeatherClient::new(transport.clone(), Endpoints::default());
        let options = SearchOptions {
            initial_query: initial_query.to_owned(),
            ..SearchOptions::new("KEY")
        };
        (LocationSearch::new(client, options), transport)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn typing_is_geocoded_once_after_pause() {
        let transport =
            ScriptedTransport::new().respond_after("q=Lond", ms(100), london_candidates());
        let (mut search, transport) = search(transport, "");

        for text in ["L", "Lo", "Lon", "Lond"] {
            search.input(text);
            sleep(ms(150)).await;
            assert!(search.is_loading());
            assert!(search.options().is_empty());
        }

        let state = search.settled().await;
        assert_eq!(state.candidates().len(), 2);
        assert!(!search.is_loading());
        assert_eq!(search.options().len(), 2);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].as_str().contains("q=Lond&appid=KEY&limit=3"));
    }

    #[tokio::test(start_paused = true)]
    async fn initial_query_is_resolved_without_typing() {
        let transport = ScriptedTransport::new().respond("q=London", london_candidates());
        let (mut search, _transport) = search(transport, "London");

        assert!(search.is_loading());
        assert_eq!(search.settled().await.candidates().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_empties_candidates_immediately() {
        let transport = ScriptedTransport::new().respond("q=London", london_candidates());
        let (mut search, _transport) = search(transport, "London");
        search.settled().await;
        assert_eq!(search.options().len(), 2);

        search.input("Londo");
        search.clear();
        assert!(!search.is_loading());
        assert!(search.options().is_empty());
        assert!(matches!(search.state(), ResolverState::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_offers_no_options() {
        let transport = ScriptedTransport::new().respond("q=Atlantis", json!({ "oops": true }));
        let (mut search, _transport) = search(transport, "");

        search.input("Atlantis");
        let state = search.settled().await;
        assert!(state.error().is_some());
        assert!(search.options().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_search_cancels_everything() {
        let transport =
            ScriptedTransport::new().respond_after("q=Lond", ms(500), london_candidates());
        let (mut search, transport) = search(transport, "");
        let rx = search.subscribe();

        search.input("Lond");
        sleep(ms(800)).await;
        assert_eq!(transport.calls().len(), 1);
        drop(search);

        sleep(ms(2_000)).await;
        assert!(rx.borrow().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn input_after_dispose_starts_no_request() {
        let transport = ScriptedTransport::new().respond("q=Oslo", london_candidates());
        let (mut search, transport) = search(transport, "");

        search.dispose();
        search.input("Oslo");
        sleep(ms(2_000)).await;

        assert!(transport.calls().is_empty());
        assert!(matches!(search.state(), ResolverState::Idle));
    }
}
