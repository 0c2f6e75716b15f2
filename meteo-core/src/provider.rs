use crate::{
    Config, Coord, CurrentConditions,
    client::HttpClient,
    error::RequestError,
    provider::{darksky::DarkSkyProvider, openweather::OpenWeatherProvider, photon::PhotonClient},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod darksky;
pub mod openweather;
pub mod photon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    DarkSky,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::DarkSky => "darksky",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::DarkSky]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" | "owm" => Ok(ProviderId::OpenWeather),
            "darksky" => Ok(ProviderId::DarkSky),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, darksky."
            )),
        }
    }
}

/// Current conditions for a coordinate, whatever the upstream service.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current(&self, coord: Coord) -> Result<CurrentConditions, RequestError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    http: &HttpClient,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => Box::new(openweather_from_config(config, http)?),
        ProviderId::DarkSky => Box::new(darksky_from_config(config, http)?),
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(
    config: &Config,
    http: &HttpClient,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config, http)
}

pub fn openweather_from_config(
    config: &Config,
    http: &HttpClient,
) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = require_api_key(config, ProviderId::OpenWeather)?;
    let mut provider =
        OpenWeatherProvider::new(api_key.to_owned(), http.clone()).with_lang(&config.lang);
    if let Some(url) = &config.endpoints.openweather {
        provider = provider.with_base_url(url);
    }
    Ok(provider)
}

pub fn darksky_from_config(config: &Config, http: &HttpClient) -> anyhow::Result<DarkSkyProvider> {
    let api_key = require_api_key(config, ProviderId::DarkSky)?;
    let mut provider =
        DarkSkyProvider::new(api_key.to_owned(), http.clone()).with_lang(&config.lang);
    if let Some(url) = &config.endpoints.darksky {
        provider = provider.with_base_url(url);
    }
    Ok(provider)
}

/// Photon needs no key; only the language and an optional self-hosted endpoint.
pub fn photon_from_config(config: &Config, http: &HttpClient) -> PhotonClient {
    let client = PhotonClient::new(http.clone()).with_lang(&config.lang);
    match &config.endpoints.photon {
        Some(url) => client.with_base_url(url),
        None => client,
    }
}

fn require_api_key(config: &Config, id: ProviderId) -> anyhow::Result<&str> {
    config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
             Hint: run `meteo configure {id}` and enter your API key."
        )
    })
}
