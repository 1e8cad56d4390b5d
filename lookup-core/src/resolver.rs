//! Input-driven request lifecycle.
//!
//! A [`Resolver`] turns the latest input of an endpoint into a published [`ResolverState`].
//! Changing the input aborts the request for the previous input before the new one starts,
//! and a response is only committed if no newer input (or disposal) happened meanwhile.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures::future::AbortHandle;
use tokio::sync::watch;

use crate::{
    client::WeatherClient,
    error::FetchError,
    model::Location,
    query::{Endpoint, ForecastQuery, GeocodingQuery, ReverseGeocodingQuery, WeatherQuery},
};

/// Published state of a resolver.
#[derive(Debug, Clone)]
pub enum ResolverState<T> {
    /// Nothing to resolve.
    Idle,
    Loading,
    Ready(T),
    Failed(Arc<FetchError>),
}

impl<T> ResolverState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ResolverState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ResolverState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            ResolverState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl ResolverState<Vec<Location>> {
    /// Selectable candidates. Idle means an empty list.
    pub fn candidates(&self) -> &[Location] {
        self.ready().map(Vec::as_slice).unwrap_or_default()
    }
}

pub type GeocodingResolver = Resolver<GeocodingQuery>;
pub type ReverseGeocodingResolver = Resolver<ReverseGeocodingQuery>;
pub type WeatherResolver = Resolver<WeatherQuery>;
pub type ForecastResolver = Resolver<ForecastQuery>;

/// Tracks at most one outstanding request for one endpoint.
///
/// Must be used from within a tokio runtime. Dropping the resolver cancels the outstanding
/// request and freezes the published state.
pub struct Resolver<E: Endpoint> {
    client: WeatherClient,
    input: Option<E>,
    state: Arc<watch::Sender<ResolverState<E::Output>>>,
    ticket: Arc<AtomicU64>,
    inflight: Option<AbortHandle>,
}

impl<E: Endpoint> Resolver<E> {
    /// Starts resolving `input` right away.
    pub fn new(client: WeatherClient, input: E) -> Self {
        let (state, _) = watch::channel(ResolverState::Idle);
        let mut resolver = Self {
            client,
            input: None,
            state: Arc::new(state),
            ticket: Arc::new(AtomicU64::new(0)),
            inflight: None,
        };
        resolver.start(input);
        resolver
    }

    /// Switch to `input`. Does nothing when it equals the current input.
    pub fn update(&mut self, input: E) {
        if self.input.as_ref() == Some(&input) {
            return;
        }
        self.start(input);
    }

    /// Re-issue the request for the current input.
    pub fn refresh(&mut self) {
        if let Some(input) = self.input.clone() {
            self.start(input);
        }
    }

    pub fn state(&self) -> ResolverState<E::Output> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState<E::Output>> {
        self.state.subscribe()
    }

    /// Cancel the outstanding request. The published state is left as is.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        self.ticket.fetch_add(1, Ordering::SeqCst);
    }

    fn start(&mut self, input: E) {
        self.dispose();
        let ticket = self.ticket.load(Ordering::SeqCst);

        if input.is_idle() {
            self.state.send_replace(ResolverState::Idle);
        } else {
            self.state.send_replace(ResolverState::Loading);

            let (handle, registration) = AbortHandle::new_pair();
            let client = self.client.clone();
            let state = Arc::clone(&self.state);
            let current = Arc::clone(&self.ticket);
            let request = input.clone();

            tokio::spawn(async move {
                let next = match client.fetch(&request, registration).await {
                    Ok(value) => ResolverState::Ready(value),
                    Err(err) if err.is_cancelled() => return,
                    Err(err) => {
                        log::debug!("{} request failed: {err}", E::NAME);
                        ResolverState::Failed(Arc::new(err))
                    }
                };

                // The ticket is read under the channel lock, so a newer input always wins.
                state.send_if_modified(|slot| {
                    if current.load(Ordering::SeqCst) != ticket {
                        return false;
                    }
                    *slot = next;
                    true
                });
            });

            self.inflight = Some(handle);
        }

        self.input = Some(input);
    }
}

impl<E: Endpoint> Drop for Resolver<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}
