//! Test doubles and payload fixtures shared by unit tests.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{
    error::FetchError,
    fetch::{HttpTransport, Transport},
};

#[derive(Debug, Clone)]
struct Route {
    needle: String,
    delay: Duration,
    response: Result<Value, String>,
}

/// Transport answering from canned routes.
///
/// A route matches when its needle is a substring of the requested URL; the most recently
/// added matching route wins, so tests can override a default answer.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, needle: &str, body: Value) -> Self {
        self.respond_after(needle, Duration::ZERO, body)
    }

    pub fn respond_after(self, needle: &str, delay: Duration, body: Value) -> Self {
        self.route(needle, delay, Ok(body))
    }

    pub fn fail(self, needle: &str, message: &str) -> Self {
        self.route(needle, Duration::ZERO, Err(message.to_owned()))
    }

    fn route(self, needle: &str, delay: Duration, response: Result<Value, String>) -> Self {
        self.routes.lock().unwrap().push(Route {
            needle: needle.to_owned(),
            delay,
            response,
        });
        self
    }

    pub fn calls(&self) -> Vec<Url> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(url.clone());

        let route = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| url.as_str().contains(&r.needle))
            .cloned();
        let Some(route) = route else {
            return Err(FetchError::Network(format!("no route for {url}")));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        route.response.map_err(FetchError::Network)
    }
}

/// HTTP transport that never goes through a proxy from the environment.
pub fn local_transport() -> HttpTransport {
    HttpTransport::with_client(Client::builder().no_proxy().build().unwrap())
}

/// Answers the first connection on a loopback port with a canned HTTP response and returns
/// the base URL of that server.
pub async fn serve_once(status: &str, content_type: &str, body: String) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Base URL of a loopback port nothing listens on.
pub async fn closed_port() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub fn current_weather_json() -> Value {
    current_weather_at(51.5074, -0.1278)
}

pub fn current_weather_at(lat: f64, lon: f64) -> Value {
    json!({
        "coord": { "lon": lon, "lat": lat },
        "weather": [
            { "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }
        ],
        "base": "stations",
        "main": {
            "temp": 12.4, "feels_like": 11.6, "temp_min": 11.1, "temp_max": 13.8,
            "pressure": 1012, "humidity": 81, "sea_level": 1012, "grnd_level": 1008
        },
        "visibility": 10000,
        "wind": { "speed": 4.63, "deg": 250, "gust": 7.2 },
        "clouds": { "all": 75 },
        "dt": 1_700_000_000,
        "sys": {
            "type": 2, "id": 2_075_535, "country": "GB",
            "sunrise": 1_699_946_000, "sunset": 1_699_979_000
        },
        "timezone": 0,
        "id": 2_643_743,
        "name": "London",
        "cod": 200
    })
}

pub fn forecast_entry(dt: i64, city_timezone: Option<i64>) -> Value {
    let mut entry = json!({
        "dt": dt,
        "main": {
            "temp": 10.0, "feels_like": 9.0, "temp_min": 8.5, "temp_max": 10.2,
            "pressure": 1015, "humidity": 70, "sea_level": 1015, "grnd_level": 1011,
            "temp_kf": -0.4
        },
        "weather": [ { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" } ],
        "visibility": 10000,
        "pop": 0.3
    });
    if let Some(timezone) = city_timezone {
        entry["city"] = json!({
            "coord": { "lat": 42.9834, "lon": -81.233 },
            "population": 346_765,
            "timezone": timezone,
            "sunrise": 1_699_963_000,
            "sunset": 1_699_998_000
        });
    }
    entry
}

pub fn forecast_json(entries: Vec<Value>) -> Value {
    json!({ "cod": "200", "message": 0, "cnt": entries.len(), "list": entries })
}

/// The two "London" candidates returned for a "Lond" search.
pub fn london_candidates() -> Value {
    json!([
        { "name": "London", "lat": 51.5074, "lon": -0.1278, "country": "GB" },
        { "name": "London", "lat": 42.9834, "lon": -81.233, "country": "CA", "state": "Ontario" }
    ])
}
