//! Folds DarkSky hourly records into the daily records they belong to.
//!
//! Each daily record opens a bucket that lasts until the next local midnight
//! (in the payload's UTC offset). Hourly records are walked once in order and
//! appended to the bucket whose day they fall in.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::{
    display::{hourly_color, wind_icon},
    error::RequestError,
    model::{DailyBucket, DataPoint, Forecast, HourlyPoint},
};

/// Raw DarkSky forecast body.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub currently: Option<DataPoint>,
    #[serde(default)]
    pub hourly: Option<DataBlock>,
    #[serde(default)]
    pub daily: Option<DataBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataBlock {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

pub fn bucket_forecast(payload: ForecastPayload) -> Result<Forecast, RequestError> {
    let ForecastPayload { latitude, longitude, timezone, offset, currently, hourly, daily } =
        payload;

    let daily = daily.ok_or_else(|| RequestError::malformed("missing daily block"))?;
    if daily.data.is_empty() {
        return Err(RequestError::EmptyForecast);
    }

    let offset = offset.unwrap_or(0.0);
    let tz = utc_offset(offset)?;

    let mut buckets: Vec<DailyBucket> = daily
        .data
        .into_iter()
        .map(|day| DailyBucket {
            day: with_wind_icon(day),
            hourly: Vec::new(),
            hourly_summary: None,
            hourly_icon: None,
        })
        .collect();

    let hourly = hourly.unwrap_or(DataBlock { summary: None, icon: None, data: Vec::new() });
    buckets[0].hourly_summary = hourly.summary;
    buckets[0].hourly_icon = hourly.icon;

    let mut cursor = 0;
    let mut day_end = next_day_start(buckets[cursor].day.time, &tz)?;

    for hour in hourly.data {
        while hour.time >= day_end {
            cursor += 1;
            let bucket = buckets.get(cursor).ok_or_else(|| {
                RequestError::malformed(format!(
                    "hourly record at {} falls after the last daily record",
                    hour.time
                ))
            })?;
            day_end = next_day_start(bucket.day.time, &tz)?;
        }

        let color = hourly_color(
            hour.icon.as_deref().unwrap_or_default(),
            hour.precip_probability,
            hour.cloud_cover,
        );
        let bucket = &mut buckets[cursor];
        let index = bucket.hourly.len();
        bucket.hourly.push(HourlyPoint { data: with_wind_icon(hour), color, index });
    }

    Ok(Forecast {
        latitude,
        longitude,
        timezone,
        offset,
        currently: currently.map(with_wind_icon),
        daily: buckets,
    })
}

fn with_wind_icon(mut point: DataPoint) -> DataPoint {
    point.wind_icon = point.wind_bearing.map(|deg| wind_icon(deg).to_string());
    point
}

fn utc_offset(hours: f64) -> Result<FixedOffset, RequestError> {
    FixedOffset::east_opt((hours * 3600.0).round() as i32)
        .ok_or_else(|| RequestError::malformed(format!("invalid UTC offset {hours}")))
}

/// First instant of the local day after the one containing `time`.
fn next_day_start(time: DateTime<Utc>, tz: &FixedOffset) -> Result<DateTime<Utc>, RequestError> {
    time.with_timezone(tz)
        .date_naive()
        .succ_opt()
        .and_then(|day| tz.from_local_datetime(&day.and_time(NaiveTime::MIN)).single())
        .map(|start| start.with_timezone(&Utc))
        .ok_or_else(|| RequestError::malformed(format!("no day after {time}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DAY_N: i64 = 1_717_200_000; // 2024-06-01T00:00:00Z

    fn hourly(start: i64, count: i64) -> Vec<serde_json::Value> {
        (0..count)
            .map(|i| {
                json!({
                    "time": start + i * 3600,
                    "icon": "rain",
                    "precipProbability": 0.4,
                    "windBearing": 90
                })
            })
            .collect()
    }

    fn payload(body: serde_json::Value) -> ForecastPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn splits_two_days_evenly() {
        let forecast = bucket_forecast(payload(json!({
            "latitude": 45.0,
            "longitude": 5.0,
            "hourly": { "summary": "Rain all week", "icon": "rain", "data": hourly(DAY_N, 48) },
            "daily": { "data": [
                { "time": DAY_N, "windBearing": 0 },
                { "time": DAY_N + 86_400, "windBearing": 45 }
            ]}
        })))
        .unwrap();

        assert_eq!(forecast.daily.len(), 2);
        for (day, bucket) in forecast.daily.iter().enumerate() {
            assert_eq!(bucket.hourly.len(), 24);
            for (i, hour) in bucket.hourly.iter().enumerate() {
                assert_eq!(hour.index, i);
                let expected = DAY_N + (day as i64 * 24 + i as i64) * 3600;
                assert_eq!(hour.data.time.timestamp(), expected);
            }
        }

        assert_eq!(forecast.daily[0].day.wind_icon.as_deref(), Some("wi-wind-north"));
        assert_eq!(forecast.daily[1].day.wind_icon.as_deref(), Some("wi-wind-north-east"));
        assert_eq!(forecast.daily[0].hourly_summary.as_deref(), Some("Rain all week"));
        assert_eq!(forecast.daily[1].hourly_summary, None);

        let first = &forecast.daily[0].hourly[0];
        assert_eq!(first.color, "rgba(66, 135, 245, 0.4)");
        assert_eq!(first.data.wind_icon.as_deref(), Some("wi-wind-east"));
    }

    #[test]
    fn day_boundary_follows_local_offset() {
        // Local midnight in UTC+2 is 22:00 UTC the previous day.
        let local_midnight = DAY_N - 2 * 3600;
        let forecast = bucket_forecast(payload(json!({
            "latitude": 45.0,
            "longitude": 5.0,
            "offset": 2,
            "hourly": { "data": hourly(local_midnight, 30) },
            "daily": { "data": [
                { "time": local_midnight },
                { "time": local_midnight + 86_400 }
            ]}
        })))
        .unwrap();

        assert_eq!(forecast.daily[0].hourly.len(), 24);
        assert_eq!(forecast.daily[1].hourly.len(), 6);
        assert_eq!(forecast.daily[1].hourly[0].data.time.timestamp(), local_midnight + 86_400);
    }

    #[test]
    fn skips_days_without_hourly_data() {
        let mut hours = hourly(DAY_N, 2);
        hours.extend(hourly(DAY_N + 2 * 86_400, 1));
        let forecast = bucket_forecast(payload(json!({
            "latitude": 0.0,
            "longitude": 0.0,
            "hourly": { "data": hours },
            "daily": { "data": [
                { "time": DAY_N },
                { "time": DAY_N + 86_400 },
                { "time": DAY_N + 2 * 86_400 }
            ]}
        })))
        .unwrap();

        let counts: Vec<_> = forecast.daily.iter().map(|b| b.hourly.len()).collect();
        assert_eq!(counts, vec![2, 0, 1]);
        assert_eq!(forecast.daily[2].hourly[0].index, 0);
    }

    #[test]
    fn empty_daily_list_is_an_error() {
        let err = bucket_forecast(payload(json!({
            "latitude": 0.0,
            "longitude": 0.0,
            "hourly": { "data": hourly(DAY_N, 3) },
            "daily": { "data": [] }
        })))
        .unwrap_err();
        assert!(matches!(err, RequestError::EmptyForecast));
    }

    #[test]
    fn missing_daily_block_is_malformed() {
        let err = bucket_forecast(payload(json!({ "latitude": 0.0, "longitude": 0.0 })))
            .unwrap_err();
        assert!(matches!(err, RequestError::MalformedResponse(_)));
    }

    #[test]
    fn hours_past_last_day_are_malformed() {
        let err = bucket_forecast(payload(json!({
            "latitude": 0.0,
            "longitude": 0.0,
            "hourly": { "data": hourly(DAY_N, 25) },
            "daily": { "data": [{ "time": DAY_N }] }
        })))
        .unwrap_err();
        assert!(matches!(err, RequestError::MalformedResponse(_)));
    }

    #[test]
    fn no_hourly_block_leaves_buckets_empty() {
        let forecast = bucket_forecast(payload(json!({
            "latitude": 0.0,
            "longitude": 0.0,
            "currently": { "time": DAY_N, "windBearing": 180 },
            "daily": { "data": [{ "time": DAY_N }] }
        })))
        .unwrap();
        assert!(forecast.daily[0].hourly.is_empty());
        assert_eq!(
            forecast.currently.and_then(|c| c.wind_icon).as_deref(),
            Some("wi-wind-south")
        );
    }
}
