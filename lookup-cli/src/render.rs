//! Plain-text presentation of resolver results.

use lookup_core::{CurrentWeather, Forecast, Location, ResolverState};

/// Temperature and wind speed symbols for an OpenWeather unit system.
fn unit_symbols(units: &str) -> (&'static str, &'static str) {
    match units.to_lowercase().as_str() {
        "metric" => ("°C", "m/s"),
        "imperial" => ("°F", "mph"),
        _ => ("K", "m/s"),
    }
}

pub fn candidates(locations: &[Location]) -> String {
    if locations.is_empty() {
        return "No locations".to_string();
    }

    locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            format!(
                "{}. {location} ({:.4}, {:.4})",
                i + 1,
                location.lat,
                location.lon
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn search_status(state: &ResolverState<Vec<Location>>) -> String {
    match state {
        ResolverState::Idle => "(cleared)".to_string(),
        ResolverState::Loading => "searching...".to_string(),
        ResolverState::Ready(locations) => candidates(locations),
        ResolverState::Failed(err) => format!("error: {err}"),
    }
}

pub fn current(state: &ResolverState<CurrentWeather>, units: &str) -> String {
    let weather = match state {
        ResolverState::Ready(weather) => weather,
        ResolverState::Failed(err) => return format!("Current weather unavailable: {err}"),
        ResolverState::Idle | ResolverState::Loading => {
            return "Loading current weather...".to_string();
        }
    };

    let (deg, speed) = unit_symbols(units);
    let main = &weather.main;
    let mut lines = Vec::new();

    if let Some(condition) = weather.condition() {
        lines.push(format!("{}: {}", condition.main, condition.description));
    }
    lines.push(format!(
        "Temperature {:.1}{deg} (feels like {:.1}{deg}, {:.1}..{:.1}{deg})",
        main.temp, main.feels_like, main.temp_min, main.temp_max
    ));
    lines.push(format!(
        "Humidity {}%  Pressure {} hPa",
        main.humidity, main.pressure
    ));

    let wind = &weather.wind;
    let gust = wind
        .gust
        .map(|gust| format!(" (gusts {gust:.1} {speed})"))
        .unwrap_or_default();
    lines.push(format!(
        "Wind {:.1} {speed} from {}°{gust}",
        wind.speed, wind.deg
    ));

    if let Some(rain) = weather.rain.as_ref().and_then(|r| r.one_hour.or(r.three_hours)) {
        lines.push(format!("Rain {rain} mm"));
    }
    if let Some(snow) = weather.snow.as_ref().and_then(|s| s.one_hour.or(s.three_hours)) {
        lines.push(format!("Snow {snow} mm"));
    }
    if let (Some(sunrise), Some(sunset)) = (weather.sunrise_at(), weather.sunset_at()) {
        lines.push(format!(
            "Sunrise {}  Sunset {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        ));
    }

    lines.join("\n")
}

pub fn forecast(state: &ResolverState<Forecast>, units: &str) -> String {
    let forecast = match state {
        ResolverState::Ready(forecast) => forecast,
        ResolverState::Failed(err) => return format!("Forecast unavailable: {err}"),
        ResolverState::Idle | ResolverState::Loading => return "Loading forecast...".to_string(),
    };

    let (deg, _) = unit_symbols(units);
    let offset = forecast.timezone_offset();

    let steps = forecast.list.iter().map(|entry| {
        let when = entry
            .local_time(offset)
            .map(|t| t.format("%a %H:%M").to_string())
            .unwrap_or_else(|| entry.dt.to_string());
        let description = entry
            .condition()
            .map(|c| c.description.as_str())
            .unwrap_or("-");

        format!("  {when}  {:>6.1}{deg}  {description}", entry.main.temp)
    });

    std::iter::once("Forecast:".to_string())
        .chain(steps)
        .collect::<Vec<_>>()
        .join("\n")
}
