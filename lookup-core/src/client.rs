use std::sync::Arc;

use futures::future::{AbortHandle, AbortRegistration};

use crate::{
    error::FetchError,
    fetch::{HttpTransport, Transport, fetch_validated},
    model::{CurrentWeather, Forecast, Location},
    query::{
        Endpoint, Endpoints, ForecastQuery, GeocodingQuery, ReverseGeocodingQuery, WeatherQuery,
    },
};

/// Entry point to the weather API: a transport plus the endpoint base it talks to.
///
/// Cloning is cheap, clones share the same transport.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
}

impl WeatherClient {
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self::new(Arc::new(HttpTransport::new()), endpoints)
    }

    /// Fetch and validate `request`, stopping early when `abort` fires.
    pub async fn fetch<E: Endpoint>(
        &self,
        request: &E,
        abort: AbortRegistration,
    ) -> Result<E::Output, FetchError> {
        let url = request.url(&self.endpoints);
        log::debug!("requesting {} from {}", E::NAME, url.path());
        fetch_validated(self.transport.as_ref(), url, abort).await
    }

    /// Candidates for a place name. An empty query yields no candidates and no request.
    pub async fn geocode(&self, query: &GeocodingQuery) -> Result<Vec<Location>, FetchError> {
        if query.is_idle() {
            return Ok(Vec::new());
        }
        self.fetch_once(query).await
    }

    pub async fn reverse_geocode(
        &self,
        query: &ReverseGeocodingQuery,
    ) -> Result<Vec<Location>, FetchError> {
        self.fetch_once(query).await
    }

    pub async fn current_weather(
        &self,
        query: &WeatherQuery,
    ) -> Result<CurrentWeather, FetchError> {
        self.fetch_once(query).await
    }

    pub async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast, FetchError> {
        self.fetch_once(query).await
    }

    async fn fetch_once<E: Endpoint>(&self, request: &E) -> Result<E::Output, FetchError> {
        let (_handle, registration) = AbortHandle::new_pair();
        self.fetch(request, registration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ScriptedTransport, current_weather_at, forecast_entry, forecast_json, london_candidates,
    };

    fn client(transport: ScriptedTransport) -> (WeatherClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = WeatherClient::new(transport.clone(), Endpoints::default());
        (client, transport)
    }

    #[tokio::test]
    async fn empty_geocoding_query_skips_network() {
        let (client, transport) =
            client(ScriptedTransport::new().respond("/geo/1.0/direct", london_candidates()));

        let locations = client
            .geocode(&GeocodingQuery::new("KEY", ""))
            .await
            .unwrap();
        assert!(locations.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn one_shot_operations_hit_their_endpoints() {
        let forecast = forecast_json(vec![forecast_entry(1_700_010_800, None)]);
        let (client, transport) = client(
            ScriptedTransport::new()
                .respond("/geo/1.0/direct", london_candidates())
                .respond("/geo/1.0/reverse", london_candidates())
                .respond("/data/2.5/weather", current_weather_at(51.5074, -0.1278))
                .respond("/data/2.5/forecast", forecast),
        );

        let found = client
            .geocode(&GeocodingQuery::new("KEY", "Lond"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        let reverse = ReverseGeocodingQuery::new("KEY", 51.5074, -0.1278);
        let named = client.reverse_geocode(&reverse).await.unwrap();
        assert_eq!(named[0].name, "London");

        let weather = client
            .current_weather(&WeatherQuery::at("KEY", &found[0]))
            .await
            .unwrap();
        assert_eq!(weather.coord, found[0].coord());

        let forecast = client
            .forecast(&ForecastQuery::new("KEY", 51.5074, -0.1278))
            .await
            .unwrap();
        assert_eq!(forecast.list.len(), 1);

        let paths: Vec<String> = transport
            .calls()
            .iter()
            .map(|u| u.path().to_owned())
            .collect();
        assert_eq!(
            paths,
            [
                "/geo/1.0/direct",
                "/geo/1.0/reverse",
                "/data/2.5/weather",
                "/data/2.5/forecast"
            ]
        );
    }
}
