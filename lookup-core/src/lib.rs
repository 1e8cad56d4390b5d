//! Core library for the `weather-lookup` client.
//!
//! This crate defines:
//! - Response schemas and their validation
//! - Request URLs for the geocoding, weather and forecast endpoints
//! - A cancellable fetch-and-validate primitive over a pluggable transport
//! - Debounced search input and input-driven resolvers publishing their state
//! - Configuration & credentials handling
//!
//! It is used by `lookup-cli`, but can also be reused by other front ends.

pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod model;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use client::WeatherClient;
pub use config::{Config, Preferences};
pub use debounce::Debouncer;
pub use error::{FetchError, JsonPath, ValidationError};
pub use model::{CurrentWeather, Forecast, ForecastEntry, Location};
pub use query::{
    Endpoint, Endpoints, ForecastQuery, GeocodingQuery, ReverseGeocodingQuery, WeatherQuery,
};
pub use resolver::{
    ForecastResolver, GeocodingResolver, Resolver, ResolverState, ReverseGeocodingResolver,
    WeatherResolver,
};
pub use search::{LocationSearch, SearchOptions};
