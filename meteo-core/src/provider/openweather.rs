use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    client::{HttpClient, RequestParams},
    display::{
        Unit, color_from_temp_c, format_value, is_day_time, same_time_on_day, titlecase,
        wind_icon,
    },
    error::RequestError,
    model::{Coord, CurrentConditions, OwmSnapshot},
    query::QueryParams,
};

use super::{ProviderId, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    lang: String,
    base_url: String,
    http: HttpClient,
}

impl OpenWeatherProvider {
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

    async fn fetch<T: DeserializeOwned>(
        &self,
        api_name: &str,
        params: QueryParams,
    ) -> Result<T, RequestError> {
        let query = QueryParams::new()
            .set("lang", self.lang.as_str())
            .set("appid", self.api_key.as_str())
            .set("units", "metric")
            .extend(params);

        let request =
            RequestParams::get(format!("{}/{api_name}", self.base_url)).with_query(query);
        self.http.get_json(request).await
    }

    /// Current weather at a coordinate.
    #[instrument(skip(self))]
    pub async fn weather(&self, coord: Coord) -> Result<OwmSnapshot, RequestError> {
        let parsed: OwCurrentResponse = self
            .fetch(
                "weather",
                QueryParams::new()
                    .set("lat", coord.lat)
                    .set("lon", coord.lon),
            )
            .await?;

        let tz = utc_offset(parsed.timezone)?;
        let sys = parsed.sys.unwrap_or_default();
        let sun = SunTimes {
            sunrise: sys.sunrise.and_then(unix_to_utc),
            sunset: sys.sunset.and_then(unix_to_utc),
        };

        let mut snapshot = build_snapshot(parsed.entry, &sun, &tz)?;
        snapshot.location_name = parsed.name;
        snapshot.coord = parsed.coord.or(Some(coord));
        Ok(snapshot)
    }

    /// Five-day forecast for a city id, one inner list per local calendar day.
    #[instrument(skip(self))]
    pub async fn forecast(&self, city_id: i64) -> Result<Vec<Vec<OwmSnapshot>>, RequestError> {
        let parsed: OwForecastResponse =
            self.fetch("forecast", QueryParams::new().set("id", city_id)).await?;

        let tz = utc_offset(parsed.city.timezone)?;
        let sun = SunTimes {
            sunrise: parsed.city.sunrise.and_then(unix_to_utc),
            sunset: parsed.city.sunset.and_then(unix_to_utc),
        };
        let location_name = match &parsed.city.country {
            Some(country) => format!("{}, {}", parsed.city.name, country),
            None => parsed.city.name.clone(),
        };

        let mut days: Vec<Vec<OwmSnapshot>> = Vec::new();
        let mut last_day: Option<NaiveDate> = None;

        for entry in parsed.list {
            let mut snapshot = build_snapshot(entry, &sun, &tz)?;
            snapshot.location_name = Some(location_name.clone());
            snapshot.coord = parsed.city.coord;

            let day = snapshot.time.with_timezone(&tz).date_naive();
            match days.last_mut() {
                Some(current) if last_day == Some(day) => current.push(snapshot),
                _ => days.push(vec![snapshot]),
            }
            last_day = Some(day);
        }

        debug!(days = days.len(), "grouped forecast");
        Ok(days)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwFall {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    three_hours: Option<f64>,
}

impl OwFall {
    fn amount(fall: Option<&OwFall>) -> f64 {
        fall.and_then(|f| f.three_hours.filter(|v| *v != 0.0).or(f.one_hour))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
}

/// Fields shared by current observations and forecast steps.
#[derive(Debug, Deserialize)]
struct OwEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    rain: Option<OwFall>,
    #[serde(default)]
    snow: Option<OwFall>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    coord: Option<Coord>,
    #[serde(default)]
    sys: Option<OwSys>,
    /// Seconds east of UTC.
    #[serde(default)]
    timezone: i64,
    #[serde(flatten)]
    entry: OwEntry,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    coord: Option<Coord>,
    #[serde(default)]
    timezone: i64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwEntry>,
}

struct SunTimes {
    sunrise: Option<DateTime<Utc>>,
    sunset: Option<DateTime<Utc>>,
}

fn build_snapshot(
    entry: OwEntry,
    sun: &SunTimes,
    tz: &FixedOffset,
) -> Result<OwmSnapshot, RequestError> {
    let time = unix_to_utc(entry.dt)
        .ok_or_else(|| RequestError::malformed(format!("invalid timestamp {}", entry.dt)))?;
    let weather = entry
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| RequestError::malformed("weather list is empty"))?;

    let local = time.with_timezone(tz);
    let sunrise = sun.sunrise.map(|t| same_time_on_day(&t.with_timezone(tz), &local));
    let sunset = sun.sunset.map(|t| same_time_on_day(&t.with_timezone(tz), &local));
    let suffix = if is_day_time(sunrise, sunset, &local) { 'd' } else { 'n' };
    let icon: String = weather
        .icon
        .chars()
        .take(2)
        .chain(std::iter::once(suffix))
        .collect();

    let rain = OwFall::amount(entry.rain.as_ref());
    let snow = OwFall::amount(entry.snow.as_ref());
    let fall_per_hour = if rain > 0.0 { rain } else { snow };

    let main = entry.main;
    Ok(OwmSnapshot {
        time,
        utc_offset_secs: tz.local_minus_utc(),
        location_name: None,
        coord: None,
        sunrise: sunrise.map(|t| t.with_timezone(&Utc)),
        sunset: sunset.map(|t| t.with_timezone(&Utc)),
        temp_c: main.temp,
        temp: format_value(main.temp, Unit::Celsius),
        feels_like_c: main.feels_like,
        feels_like: format_value(main.feels_like, Unit::Celsius),
        pressure_hpa: main.pressure,
        pressure: format_value(main.pressure, Unit::Hpa),
        humidity_pct: main.humidity,
        humidity: format_value(main.humidity, Unit::Percent),
        condition_id: weather.id,
        description: titlecase(&weather.description),
        icon,
        wind_speed_mps: entry.wind.speed,
        wind_speed: format_value(entry.wind.speed, Unit::Speed),
        wind_deg: entry.wind.deg,
        wind_icon: entry.wind.deg.map(|d| wind_icon(d).to_string()),
        fall_per_hour,
        fall_desc: format_value(fall_per_hour, Unit::Mm),
        front_alpha: (fall_per_hour / 5.0).min(1.0),
        temp_color: color_from_temp_c(main.temp),
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn current(&self, coord: Coord) -> Result<CurrentConditions, RequestError> {
        let snapshot = self.weather(coord).await?;

        Ok(CurrentConditions {
            provider: ProviderId::OpenWeather.to_string(),
            location_name: snapshot.location_name,
            temperature_c: snapshot.temp_c,
            summary: snapshot.description,
            icon: snapshot.icon,
            humidity_pct: Some(snapshot.humidity_pct),
            wind_speed: Some(snapshot.wind_speed_mps),
            wind_icon: snapshot.wind_icon,
            observation_time: snapshot.time,
        })
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn utc_offset(seconds: i64) -> Result<FixedOffset, RequestError> {
    i32::try_from(seconds)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| RequestError::malformed(format!("invalid timezone offset {seconds}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(dt: i64, icon: &str) -> OwEntry {
        serde_json::from_value(json!({
            "dt": dt,
            "main": { "temp": 21.46, "feels_like": 20.9, "pressure": 1016, "humidity": 48 },
            "weather": [{ "id": 500, "description": "light rain", "icon": icon }],
            "wind": { "speed": 3.6, "deg": 240 },
            "rain": { "3h": 0.0, "1h": 1.5 }
        }))
        .unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn derives_display_fields() {
        // 2024-06-01T12:00:00Z
        let sun = SunTimes { sunrise: None, sunset: None };
        let snap = build_snapshot(entry(1_717_243_200, "10n"), &sun, &utc()).unwrap();

        assert_eq!(snap.icon, "10d");
        assert_eq!(snap.temp, "21.5°C");
        assert_eq!(snap.pressure, "1016 hPa");
        assert_eq!(snap.humidity, "48%");
        assert_eq!(snap.description, "Light Rain");
        assert_eq!(snap.wind_icon.as_deref(), Some("wi-wind-south-west"));
        assert_eq!(snap.fall_per_hour, 1.5);
        assert_eq!(snap.fall_desc, "1.5 mm");
        assert!((snap.front_alpha - 0.3).abs() < 1e-9);
    }

    #[test]
    fn night_icon_from_sun_times_of_another_day() {
        // sunrise/sunset on 2024-06-01, observation 2024-06-03T22:00Z
        let sun = SunTimes {
            sunrise: unix_to_utc(1_717_200_000 + 5 * 3600),
            sunset: unix_to_utc(1_717_200_000 + 20 * 3600),
        };
        let observed = entry(1_717_200_000 + 2 * 86_400 + 22 * 3600, "04d");
        let snap = build_snapshot(observed, &sun, &utc()).unwrap();
        assert_eq!(snap.icon, "04n");
        assert_eq!(
            snap.sunset.map(|t| t.timestamp()),
            Some(1_717_200_000 + 2 * 86_400 + 20 * 3600)
        );
    }

    #[test]
    fn empty_weather_list_is_malformed() {
        let mut e = entry(0, "01d");
        e.weather.clear();
        let sun = SunTimes { sunrise: None, sunset: None };
        assert!(matches!(
            build_snapshot(e, &sun, &utc()),
            Err(RequestError::MalformedResponse(_))
        ));
    }

    #[test]
    fn snow_used_when_no_rain() {
        let mut e = entry(0, "13d");
        e.rain = None;
        e.snow = Some(OwFall { one_hour: None, three_hours: Some(12.0) });
        let sun = SunTimes { sunrise: None, sunset: None };
        let snap = build_snapshot(e, &sun, &utc()).unwrap();
        assert_eq!(snap.fall_per_hour, 12.0);
        assert_eq!(snap.front_alpha, 1.0);
    }

    #[test]
    fn local_time_uses_place_offset() {
        // 2024-06-01T22:00:00Z is already June 2nd in UTC+2
        let tz = FixedOffset::east_opt(7200).unwrap();
        let sun = SunTimes { sunrise: None, sunset: None };
        let snap = build_snapshot(entry(1_717_200_000 + 22 * 3600, "10d"), &sun, &tz).unwrap();

        assert_eq!(snap.utc_offset_secs, 7200);
        assert_eq!(snap.local_time().format("%d %H:%M").to_string(), "02 00:00");
    }
}
