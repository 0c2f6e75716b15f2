use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Provider-agnostic current conditions, as returned by every [`crate::WeatherProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub provider: String,
    pub location_name: Option<String>,
    pub temperature_c: f64,
    pub summary: String,
    pub icon: String,
    pub humidity_pct: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_icon: Option<String>,
    pub observation_time: DateTime<Utc>,
}

/// One OpenWeatherMap observation or forecast step with its display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwmSnapshot {
    pub time: DateTime<Utc>,
    /// Seconds east of UTC at the observed place.
    pub utc_offset_secs: i32,
    pub location_name: Option<String>,
    pub coord: Option<Coord>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,

    pub temp_c: f64,
    pub temp: String,
    pub feels_like_c: f64,
    pub feels_like: String,
    pub pressure_hpa: f64,
    pub pressure: String,
    pub humidity_pct: f64,
    pub humidity: String,

    pub condition_id: i64,
    pub description: String,
    /// Two-character icon code with a `d`/`n` suffix for day or night.
    pub icon: String,

    pub wind_speed_mps: f64,
    pub wind_speed: String,
    pub wind_deg: Option<f64>,
    pub wind_icon: Option<String>,

    /// Rain per hour, or snow when there is no rain.
    pub fall_per_hour: f64,
    pub fall_desc: String,
    pub front_alpha: f64,
    pub temp_color: String,
}

impl OwmSnapshot {
    /// `time` on the observed place's wall clock.
    pub fn local_time(&self) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix());
        self.time.with_timezone(&tz)
    }
}

/// A DarkSky data point (currently, hourly or daily).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    #[serde(default)]
    pub temperature_high: Option<f64>,
    #[serde(default)]
    pub temperature_low: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_bearing: Option<f64>,
    #[serde(default)]
    pub precip_intensity: Option<f64>,
    #[serde(default)]
    pub precip_probability: Option<f64>,
    #[serde(default)]
    pub precip_type: Option<String>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunrise_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunset_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub wind_icon: Option<String>,
}

/// An hourly DarkSky record placed in its day.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyPoint {
    #[serde(flatten)]
    pub data: DataPoint,
    pub color: String,
    /// Position within the owning [`DailyBucket`].
    pub index: usize,
}

/// A daily DarkSky record and the hourly records that fall on that day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyBucket {
    #[serde(flatten)]
    pub day: DataPoint,
    pub hourly: Vec<HourlyPoint>,
    /// Hourly block summary, only set on the first bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_icon: Option<String>,
}

/// DarkSky forecast with hourly data folded into daily buckets.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    /// Hours east of UTC used for the day boundaries.
    pub offset: f64,
    pub currently: Option<DataPoint>,
    pub daily: Vec<DailyBucket>,
}

/// A geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub name: Option<String>,
    /// Raw provider properties.
    pub sys: Value,
    pub coord: Coord,
}
