use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use validator::Validate;

/// UTC offset used for a forecast when no entry carries a city block.
pub const DEFAULT_TIMEZONE_OFFSET: i64 = 0;

/// A geocoding candidate.
///
/// Two locations are the same place when their coordinates match, whatever their names.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Location {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

impl Location {
    pub fn coord(&self) -> Coord {
        Coord {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            Some(self.name.as_str()),
            self.state.as_deref(),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();

        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Measurements {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub pressure: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub sea_level: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub grnd_level: Option<f64>,
    pub temp_kf: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Clouds {
    #[validate(range(min = 0.0, max = 100.0))]
    pub all: f64,
}

/// Rain or snow volume in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Precipitation {
    #[serde(rename = "1h")]
    #[validate(range(exclusive_min = 0.0))]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h")]
    #[validate(range(exclusive_min = 0.0))]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Sys {
    pub country: Option<String>,
    #[validate(range(min = 1))]
    pub sunrise: i64,
    #[validate(range(min = 1))]
    pub sunset: i64,
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CurrentWeather {
    pub coord: Coord,
    pub weather: Vec<Condition>,
    pub base: Option<String>,
    #[validate(nested)]
    pub main: Measurements,
    #[validate(range(exclusive_min = 0.0, max = 10000.0))]
    pub visibility: f64,
    pub wind: Wind,
    #[validate(nested)]
    pub clouds: Option<Clouds>,
    #[validate(nested)]
    pub rain: Option<Precipitation>,
    #[validate(nested)]
    pub snow: Option<Precipitation>,
    /// Observation time, unix seconds.
    #[validate(range(min = 1))]
    pub dt: i64,
    #[validate(nested)]
    pub sys: Sys,
    /// Shift in seconds from UTC.
    pub timezone: i64,
    pub name: Option<String>,
    pub cod: i64,
}

impl CurrentWeather {
    /// The condition displayed for this snapshot.
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn observed_at(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.dt, self.timezone)
    }

    pub fn sunrise_at(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.sys.sunrise, self.timezone)
    }

    pub fn sunset_at(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.sys.sunset, self.timezone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct City {
    pub coord: Coord,
    #[validate(range(min = 0.0))]
    pub population: f64,
    pub timezone: i64,
    #[validate(range(min = 1))]
    pub sunrise: i64,
    #[validate(range(min = 1))]
    pub sunset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ForecastEntry {
    #[validate(range(min = 1))]
    pub dt: i64,
    #[validate(nested)]
    pub main: Measurements,
    pub weather: Vec<Condition>,
    pub wind: Option<Wind>,
    #[validate(nested)]
    pub city: Option<City>,
}

impl ForecastEntry {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn local_time(&self, offset: i64) -> Option<DateTime<FixedOffset>> {
        local_time(self.dt, offset)
    }
}

/// Multi-step forecast at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Forecast {
    #[serde(deserialize_with = "status_code")]
    pub cod: i64,
    pub message: f64,
    #[validate(range(min = 1))]
    pub cnt: u32,
    #[validate(nested)]
    pub list: Vec<ForecastEntry>,
    #[validate(nested)]
    pub city: Option<City>,
}

impl Forecast {
    /// UTC offset shared by all entries.
    ///
    /// Taken from the first entry carrying a city block, then from the document-level city
    /// block, then [`DEFAULT_TIMEZONE_OFFSET`].
    pub fn timezone_offset(&self) -> i64 {
        self.list
            .iter()
            .find_map(|entry| entry.city.as_ref())
            .or(self.city.as_ref())
            .map(|city| city.timezone)
            .unwrap_or(DEFAULT_TIMEZONE_OFFSET)
    }
}

/// The forecast endpoint sends its status code as a numeric string.
fn status_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("expected an integer, found {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a numeric string, found {s:?}"))),
        other => Err(D::Error::custom(format!("expected a status code, found {other}"))),
    }
}

fn local_time(ts: i64, offset: i64) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(i32::try_from(offset).ok()?)?;
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(&offset))
}
