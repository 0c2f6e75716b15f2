use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use clap::{Parser, Subcommand};
use meteo_core::{
    Config, Connectivity, Coord, HttpClient, ProviderId, QueryParams, WeatherProvider,
    provider::{
        darksky_from_config, default_provider_from_config, openweather_from_config,
        photon_from_config, provider_from_config,
    },
};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather and geocoding from the command line")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print raw JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "darksky".
        provider: String,
    },

    /// Current conditions at a coordinate.
    Current {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,
    },

    /// DarkSky forecast, hourly data grouped by day.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// OpenWeatherMap five-day forecast for a city id.
    CityForecast {
        city_id: i64,
    },

    /// Search places by name.
    Search {
        query: String,

        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Maximum number of places to return.
        #[arg(long)]
        limit: Option<u32>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        // No platform callback here; assume the host is online.
        let http = HttpClient::new(config.timeout(), Connectivity::always_online())?;

        match self.command {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                if config.is_provider_configured(id) {
                    let replace = inquire::Confirm::new(&format!(
                        "{id} already has an API key. Replace it?"
                    ))
                    .with_default(false)
                    .prompt()
                    .context("Failed to read answer")?;
                    if !replace {
                        return Ok(());
                    }
                }

                let api_key = inquire::Password::new(&format!("API key for {id}:"))
                    .without_confirmation()
                    .prompt()
                    .context("Failed to read API key")?;

                config.upsert_provider_api_key(id, api_key.trim().to_string());
                let make_default = inquire::Confirm::new(&format!("Use {id} by default?"))
                    .with_default(config.default_provider_id().ok() == Some(id))
                    .prompt()
                    .context("Failed to read answer")?;
                if make_default {
                    config.set_default_provider(id);
                }

                config.save()?;
                info!(provider = %id, "saved configuration");
                println!("Saved to {}", Config::config_file_path()?.display());
            }
            Command::Current { lat, lon, provider } => {
                let provider = match provider {
                    Some(name) => {
                        provider_from_config(ProviderId::try_from(name.as_str())?, &config, &http)?
                    }
                    None => default_provider_from_config(&config, &http)?,
                };

                let now = provider.current(Coord::new(lat, lon)).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&now)?);
                } else {
                    println!(
                        "{} ({}) at {}",
                        now.location_name.as_deref().unwrap_or("Unknown location"),
                        now.provider,
                        now.observation_time.format("%Y-%m-%d %H:%M UTC"),
                    );
                    println!("  {:.1}°C  {}", now.temperature_c, now.summary);
                    if let Some(h) = now.humidity_pct {
                        println!("  humidity {h:.0}%");
                    }
                    if let Some(w) = now.wind_speed {
                        println!("  wind {w:.1} {}", now.wind_icon.as_deref().unwrap_or(""));
                    }
                }
            }
            Command::Forecast { lat, lon } => {
                let darksky = darksky_from_config(&config, &http)?;
                let forecast = darksky.forecast(Coord::new(lat, lon), QueryParams::new()).await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&forecast)?);
                    return Ok(());
                }

                let tz = FixedOffset::east_opt((forecast.offset * 3600.0).round() as i32)
                    .unwrap_or_else(|| Utc.fix());
                for bucket in &forecast.daily {
                    println!(
                        "{}  {}",
                        bucket.day.time.with_timezone(&tz).format("%a %d %b"),
                        bucket.day.summary.as_deref().unwrap_or(""),
                    );
                    for hour in &bucket.hourly {
                        println!(
                            "  {:>2} {}  {:>6}  {:<24} {}",
                            hour.index,
                            hour.data.time.with_timezone(&tz).format("%H:%M"),
                            hour.data
                                .temperature
                                .map(|t| format!("{t:.1}°C"))
                                .unwrap_or_default(),
                            hour.data.icon.as_deref().unwrap_or(""),
                            hour.color,
                        );
                    }
                }
            }
            Command::CityForecast { city_id } => {
                let owm = openweather_from_config(&config, &http)?;
                let days = owm.forecast(city_id).await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&days)?);
                    return Ok(());
                }

                for day in &days {
                    let Some(first) = day.first() else { continue };
                    println!(
                        "{}  {}",
                        first.location_name.as_deref().unwrap_or(""),
                        first.local_time().format("%a %d %b"),
                    );
                    for step in day {
                        println!(
                            "  {}  {:>7}  {:<4} {:<20} {}",
                            step.local_time().format("%H:%M"),
                            step.temp,
                            step.icon,
                            step.description,
                            step.fall_desc,
                        );
                    }
                }
            }
            Command::Search { query, lat, lon, limit } => {
                let mut photon = photon_from_config(&config, &http);
                if let Some(limit) = limit {
                    photon = photon.with_limit(limit);
                }
                let near = lat.zip(lon).map(|(lat, lon)| Coord::new(lat, lon));
                let results = photon.search(&query, near).await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                } else {
                    for r in &results {
                        println!(
                            "{:<32} {:>9.4} {:>9.4}",
                            r.name.as_deref().unwrap_or("-"),
                            r.coord.lat,
                            r.coord.lon
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
