//! Derived display fields: wind icons, icon colors, unit strings.

use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Indexed by `round(((deg + 180) % 360) / 45)`, so the table starts at south.
const CARDINALS: [&str; 9] = [
    "wi-wind-south",
    "wi-wind-south-west",
    "wi-wind-west",
    "wi-wind-north-west",
    "wi-wind-north",
    "wi-wind-north-east",
    "wi-wind-east",
    "wi-wind-south-east",
    "wi-wind-south",
];

/// Eight-point compass icon for a wind bearing in degrees.
pub fn wind_icon(degrees: f64) -> &'static str {
    let idx = ((degrees + 180.0).rem_euclid(360.0) / 45.0).round() as usize;
    CARDINALS[idx.min(CARDINALS.len() - 1)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Base color for a DarkSky icon code.
pub fn color_for_icon(icon: &str) -> Rgb {
    match icon {
        "clear-day" => Rgb(255, 201, 48),
        "clear-night" => Rgb(38, 55, 94),
        "rain" => Rgb(66, 135, 245),
        "snow" => Rgb(224, 238, 255),
        "sleet" => Rgb(150, 180, 220),
        "wind" => Rgb(165, 214, 167),
        "fog" => Rgb(176, 176, 176),
        "cloudy" => Rgb(140, 150, 160),
        "partly-cloudy-day" => Rgb(255, 224, 130),
        "partly-cloudy-night" => Rgb(82, 96, 130),
        _ => Rgb(128, 128, 128),
    }
}

/// Icon color with its alpha taken from precipitation probability for
/// rain/snow icons and from cloud cover for cloudy icons.
pub fn hourly_color(
    icon: &str,
    precip_probability: Option<f64>,
    cloud_cover: Option<f64>,
) -> String {
    let alpha = if icon.contains("rain") || icon.contains("snow") {
        precip_probability
    } else if icon.contains("cloudy") {
        cloud_cover
    } else {
        None
    };
    rgb_string(color_for_icon(icon), alpha.unwrap_or(1.0))
}

/// `rgb(r, g, b)` when opaque, `rgba(r, g, b, a)` otherwise.
pub fn rgb_string(Rgb(r, g, b): Rgb, alpha: f64) -> String {
    let alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(0.0, 1.0) };
    let alpha = (alpha * 100.0).round() / 100.0;
    if alpha >= 1.0 {
        format!("rgb({r}, {g}, {b})")
    } else {
        format!("rgba({r}, {g}, {b}, {alpha})")
    }
}

/// Blue at -10°C through to red at 35°C.
pub fn color_from_temp_c(temp_c: f64) -> String {
    let t = ((temp_c + 10.0) / 45.0).clamp(0.0, 1.0);
    let r = (60.0 + t * 175.0).round() as u8;
    let g = (120.0 - (t - 0.5).abs() * 80.0).round() as u8;
    let b = (235.0 - t * 175.0).round() as u8;
    rgb_string(Rgb(r, g, b), 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Hpa,
    Percent,
    Speed,
    Mm,
}

pub fn format_value(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Celsius => format!("{value:.1}°C"),
        Unit::Hpa => format!("{value:.0} hPa"),
        Unit::Percent => format!("{value:.0}%"),
        Unit::Speed => format!("{value:.1} m/s"),
        Unit::Mm => format!("{value:.1} mm"),
    }
}

pub fn titlecase(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `time` falls between sunrise and sunset. Without both, 07:00-20:00
/// local time counts as day.
pub fn is_day_time<Tz: TimeZone>(
    sunrise: Option<DateTime<Tz>>,
    sunset: Option<DateTime<Tz>>,
    time: &DateTime<Tz>,
) -> bool {
    match (sunrise, sunset) {
        (Some(rise), Some(set)) => *time > rise && *time < set,
        _ => (7..20).contains(&time.hour()),
    }
}

/// Move `instant` to the calendar day of `target`, keeping its local time of day.
pub fn same_time_on_day<Tz: TimeZone>(
    instant: &DateTime<Tz>,
    target: &DateTime<Tz>,
) -> DateTime<Tz> {
    let days = (target.date_naive() - instant.date_naive()).num_days();
    instant.clone() + Duration::days(days)
}
