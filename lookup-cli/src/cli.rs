use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use lookup_core::{
    Config, Endpoint, ForecastResolver, GeocodingQuery, Location, LocationSearch, Resolver,
    ResolverState, ReverseGeocodingQuery, SearchOptions, WeatherClient, WeatherQuery,
    WeatherResolver,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-lookup",
    version,
    about = "Current weather and short-range forecast by place name"
)]
pub struct Cli {
    /// Print validated payloads as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and preferred units.
    Configure,

    /// List locations matching a place name.
    Search {
        /// Free-text place name, e.g. "London" or "Springfield, US".
        query: String,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Name the places at a coordinate.
    Reverse {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Current weather and forecast at a coordinate.
    Weather {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Search a place, pick one of the matches, then show its weather and forecast.
    Show {
        query: String,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Type-ahead search: each stdin line replaces the content of the search box.
    Find,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// "metric", "imperial" or "standard"; defaults to the configured units.
    #[arg(long)]
    units: Option<String>,

    /// Two-letter language code for condition descriptions.
    #[arg(long)]
    lang: Option<String>,

    /// Number of forecast steps.
    #[arg(long)]
    count: Option<u32>,
}

/// Loaded configuration plus a client pointed at the configured endpoints.
struct Session {
    config: Config,
    api_key: String,
    client: WeatherClient,
    json: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let json = self.json;

        match self.command {
            Command::Configure => configure(),
            Command::Search { query, limit } => Session::load(json)?.search(query, limit).await,
            Command::Reverse { lat, lon, limit } => {
                Session::load(json)?.reverse(lat, lon, limit).await
            }
            Command::Weather { lat, lon, report } => {
                Session::load(json)?.report(lat, lon, &report).await
            }
            Command::Show { query, report } => Session::load(json)?.show(query, &report).await,
            Command::Find => Session::load(json)?.find().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let units = Select::new("Units:", vec!["metric", "imperial", "standard"])
        .prompt()
        .context("Failed to read units")?;

    config.set_api_key(api_key.trim().to_string());
    config.preferences.units = units.to_string();
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

impl Session {
    fn load(json: bool) -> Result<Self> {
        let config = Config::load()?;
        log::debug!("using endpoints at {}", config.endpoints.base_url);

        Ok(Self {
            api_key: config.api_key()?,
            client: WeatherClient::with_endpoints(config.endpoints()?),
            config,
            json,
        })
    }

    fn limit(&self, limit: Option<u32>) -> u32 {
        limit.unwrap_or(self.config.preferences.geocoding_limit)
    }

    async fn geocode(&self, query: String, limit: Option<u32>) -> Result<Vec<Location>> {
        let query = GeocodingQuery::new(self.api_key.as_str(), query).with_limit(self.limit(limit));
        self.client.geocode(&query).await.context("Location search failed")
    }

    async fn search(&self, query: String, limit: Option<u32>) -> Result<()> {
        let locations = self.geocode(query, limit).await?;
        self.print(&locations, || render::candidates(&locations))
    }

    async fn reverse(&self, lat: f64, lon: f64, limit: Option<u32>) -> Result<()> {
        let query = ReverseGeocodingQuery::new(self.api_key.as_str(), lat, lon)
            .with_limit(self.limit(limit));
        let locations = self
            .client
            .reverse_geocode(&query)
            .await
            .context("Reverse geocoding failed")?;
        self.print(&locations, || render::candidates(&locations))
    }

    async fn show(&self, query: String, report: &ReportArgs) -> Result<()> {
        let mut candidates = self.geocode(query.clone(), None).await?;

        let location = match candidates.len() {
            0 => bail!("No locations found for '{query}'"),
            1 => candidates.remove(0),
            _ => Select::new("Location:", candidates).prompt().context("No location selected")?,
        };

        if !self.json {
            println!("{location}");
        }
        self.report(location.lat, location.lon, report).await
    }

    async fn report(&self, lat: f64, lon: f64, report: &ReportArgs) -> Result<()> {
        let prefs = &self.config.preferences;
        let units = report.units.clone().unwrap_or_else(|| prefs.units.clone());
        let query = WeatherQuery::new(self.api_key.as_str(), lat, lon)
            .with_units(units.as_str())
            .with_language(report.lang.clone().unwrap_or_else(|| prefs.language.clone()));

        let weather = WeatherResolver::new(self.client.clone(), query.clone());
        let count = report.count.unwrap_or(prefs.forecast_count);
        let forecast = ForecastResolver::new(self.client.clone(), query.forecast(count));

        let (weather, forecast) = tokio::join!(settle(&weather), settle(&forecast));

        if self.json {
            let payload = serde_json::json!({
                "weather": weather.ready(),
                "forecast": forecast.ready(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);

            let errors = [weather.error(), forecast.error()];
            for err in errors.into_iter().flatten() {
                eprintln!("error: {err}");
            }
            return Ok(());
        }

        println!("{}", render::current(&weather, &units));
        println!("{}", render::forecast(&forecast, &units));
        Ok(())
    }

    async fn find(&self) -> Result<()> {
        let options = SearchOptions {
            api_key: self.api_key.clone(),
            limit: self.config.preferences.geocoding_limit,
            delay: self.config.debounce_delay(),
            initial_query: String::new(),
        };
        let mut search = LocationSearch::new(self.client.clone(), options);
        let mut updates = search.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line.context("Failed to read from stdin")? {
                    Some(text) => search.input(text.trim()),
                    None => break,
                },
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    self.print_search(&state)?;
                }
            }
        }

        let state = search.settled().await;
        self.print_search(&state)
    }

    fn print_search(&self, state: &ResolverState<Vec<Location>>) -> Result<()> {
        match state {
            ResolverState::Ready(locations) => {
                self.print(locations, || render::candidates(locations))
            }
            other => {
                println!("{}", render::search_status(other));
                Ok(())
            }
        }
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Wait for the resolver to leave the loading state.
async fn settle<E: Endpoint>(resolver: &Resolver<E>) -> ResolverState<E::Output> {
    let mut rx = resolver.subscribe();
    let settled = rx.wait_for(|state| !state.is_loading()).await.map(|state| state.clone());
    settled.unwrap_or_else(|_| resolver.state())
}
