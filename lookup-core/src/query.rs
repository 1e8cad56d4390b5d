//! Request URLs for the OpenWeather geocoding, weather and forecast endpoints.
//!
//! Building a URL is pure string construction: nothing here touches the network or validates
//! responses.

use std::fmt::Debug;

use reqwest::Url;

use crate::{
    model::{CurrentWeather, Forecast, Location},
    schema::Schema,
};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

pub const DEFAULT_LIMIT: u32 = 5;
pub const DEFAULT_UNITS: &str = "metric";
pub const DEFAULT_LANGUAGE: &str = "EN";
pub const DEFAULT_FORECAST_COUNT: u32 = 3;

const DIRECT_GEOCODING_PATH: &str = "geo/1.0/direct";
const REVERSE_GEOCODING_PATH: &str = "geo/1.0/reverse";
const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";
const FORECAST_PATH: &str = "data/2.5/forecast";

/// Base location of the weather API. Endpoint paths are appended to the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn resolve(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}/{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        let base = Url::parse(OPENWEATHER_BASE_URL).expect("built-in base URL is valid");
        Self::new(base)
    }
}

/// A typed request for one endpoint.
pub trait Endpoint: Clone + PartialEq + Debug + Send + Sync + 'static {
    type Output: Schema + Clone + Debug + Send + Sync + 'static;

    /// Short name used in log lines.
    const NAME: &'static str;

    fn url(&self, endpoints: &Endpoints) -> Url;

    /// Whether the request resolves to nothing without touching the network.
    fn is_idle(&self) -> bool {
        false
    }
}

/// Place name to coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodingQuery {
    pub api_key: String,
    pub query: String,
    pub limit: u32,
}

impl GeocodingQuery {
    pub fn new(api_key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            query: query.into(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(self, limit: u32) -> Self {
        Self { limit, ..self }
    }

    pub fn with_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }
}

impl Endpoint for GeocodingQuery {
    type Output = Vec<Location>;
    const NAME: &'static str = "direct geocoding";

    fn url(&self, endpoints: &Endpoints) -> Url {
        let mut url = endpoints.resolve(DIRECT_GEOCODING_PATH);
        url.query_pairs_mut()
            .append_pair("q", &self.query)
            .append_pair("appid", &self.api_key)
            .append_pair("limit", &self.limit.to_string());
        url
    }

    fn is_idle(&self) -> bool {
        self.query.is_empty()
    }
}

/// Coordinates to place names.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseGeocodingQuery {
    pub api_key: String,
    pub lat: f64,
    pub lon: f64,
    pub limit: u32,
}

impl ReverseGeocodingQuery {
    pub fn new(api_key: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            api_key: api_key.into(),
            lat,
            lon,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(self, limit: u32) -> Self {
        Self { limit, ..self }
    }
}

impl Endpoint for ReverseGeocodingQuery {
    type Output = Vec<Location>;
    const NAME: &'static str = "reverse geocoding";

    fn url(&self, endpoints: &Endpoints) -> Url {
        let mut url = endpoints.resolve(REVERSE_GEOCODING_PATH);
        url.query_pairs_mut()
            .append_pair("lat", &self.lat.to_string())
            .append_pair("lon", &self.lon.to_string())
            .append_pair("appid", &self.api_key)
            .append_pair("limit", &self.limit.to_string());
        url
    }
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub api_key: String,
    pub lat: f64,
    pub lon: f64,
    pub units: String,
    pub language: String,
}

impl WeatherQuery {
    pub fn new(api_key: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            api_key: api_key.into(),
            lat,
            lon,
            units: DEFAULT_UNITS.to_owned(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    pub fn at(api_key: impl Into<String>, location: &Location) -> Self {
        Self::new(api_key, location.lat, location.lon)
    }

    pub fn with_units(self, units: impl Into<String>) -> Self {
        Self {
            units: units.into(),
            ..self
        }
    }

    pub fn with_language(self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self
        }
    }

    /// Forecast for the same coordinate, units and language.
    pub fn forecast(self, count: u32) -> ForecastQuery {
        ForecastQuery {
            weather: self,
            count,
        }
    }

    fn append_pairs(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("lat", &self.lat.to_string())
            .append_pair("lon", &self.lon.to_string())
            .append_pair("units", &self.units.to_lowercase())
            .append_pair("lang", &self.language.to_uppercase())
            .append_pair("mode", "json")
            .append_pair("appid", &self.api_key);
    }
}

impl Endpoint for WeatherQuery {
    type Output = CurrentWeather;
    const NAME: &'static str = "current weather";

    fn url(&self, endpoints: &Endpoints) -> Url {
        let mut url = endpoints.resolve(CURRENT_WEATHER_PATH);
        self.append_pairs(&mut url);
        url
    }
}

/// Multi-step forecast at a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub weather: WeatherQuery,
    pub count: u32,
}

impl ForecastQuery {
    pub fn new(api_key: impl Into<String>, lat: f64, lon: f64) -> Self {
        WeatherQuery::new(api_key, lat, lon).forecast(DEFAULT_FORECAST_COUNT)
    }
}

impl Endpoint for ForecastQuery {
    type Output = Forecast;
    const NAME: &'static str = "forecast";

    fn url(&self, endpoints: &Endpoints) -> Url {
        let mut url = endpoints.resolve(FORECAST_PATH);
        self.weather.append_pairs(&mut url);
        url.query_pairs_mut()
            .append_pair("cnt", &self.count.to_string());
        url
    }
}
