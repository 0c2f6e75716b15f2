use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{
    client::{HttpClient, RequestParams},
    error::RequestError,
    forecast::{ForecastPayload, bucket_forecast},
    model::{Coord, CurrentConditions, Forecast},
    query::QueryParams,
};

use super::{ProviderId, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.darksky.net/forecast";

/// DarkSky-compatible forecast API. The key is part of the path.
#[derive(Debug, Clone)]
pub struct DarkSkyProvider {
    api_key: String,
    lang: String,
    base_url: String,
    http: HttpClient,
}

impl DarkSkyProvider {
    pub fn new(api_key: String, http: HttpClient) -> Self {
        Self {
            api_key,
            lang: "en".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch(
        &self,
        coord: Coord,
        params: QueryParams,
    ) -> Result<ForecastPayload, RequestError> {
        let query = QueryParams::new()
            .set("lang", self.lang.as_str())
            .set("units", "ca")
            .extend(params);

        let url = format!("{}/{}/{},{}", self.base_url, self.api_key, coord.lat, coord.lon);
        self.http.get_json(RequestParams::get(url).with_query(query)).await
    }

    /// Forecast with hourly records grouped under their day. `params` are
    /// merged over the defaults (`lang`, `units=ca`).
    #[instrument(skip(self, params))]
    pub async fn forecast(
        &self,
        coord: Coord,
        params: QueryParams,
    ) -> Result<Forecast, RequestError> {
        let payload = self.fetch(coord, params).await?;
        let forecast = bucket_forecast(payload)?;
        debug!(days = forecast.daily.len(), "bucketed forecast");
        Ok(forecast)
    }
}

#[async_trait]
impl WeatherProvider for DarkSkyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::DarkSky
    }

    async fn current(&self, coord: Coord) -> Result<CurrentConditions, RequestError> {
        let payload = self
            .fetch(coord, QueryParams::new().set("exclude", "minutely,hourly,daily,alerts,flags"))
            .await?;
        let now = payload
            .currently
            .ok_or_else(|| RequestError::malformed("missing currently block"))?;
        let temperature_c = now
            .temperature
            .ok_or_else(|| RequestError::malformed("currently block has no temperature"))?;

        Ok(CurrentConditions {
            provider: ProviderId::DarkSky.to_string(),
            location_name: None,
            temperature_c,
            summary: now.summary.unwrap_or_default(),
            icon: now.icon.unwrap_or_default(),
            humidity_pct: now.humidity.map(|h| h * 100.0),
            wind_speed: now.wind_speed,
            wind_icon: now.wind_bearing.map(|deg| crate::display::wind_icon(deg).to_string()),
            observation_time: now.time,
        })
    }
}
