//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - Query-string assembly and single-shot HTTP access with typed errors
//! - Clients for OpenWeatherMap, DarkSky and Photon
//! - Reshaping of forecast and geocoding payloads into display-ready models
//! - Configuration & credentials handling
//!
//! It is used by `meteo-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod forecast;
pub mod model;
pub mod network;
pub mod provider;
pub mod query;

pub use client::{HttpClient, Payload, RequestParams, classify_response};
pub use config::{Config, Endpoints, ProviderConfig};
pub use error::RequestError;
pub use forecast::bucket_forecast;
pub use model::{
    Coord, CurrentConditions, DailyBucket, DataPoint, Forecast, GeocodeResult, HourlyPoint,
    OwmSnapshot,
};
pub use network::{ConnectionState, ConnectionType, Connectivity};
pub use provider::{ProviderId, WeatherProvider};
pub use query::{QueryParams, QueryValue, query_string};
