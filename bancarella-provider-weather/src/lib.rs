//! Weather for the market widget: OpenWeatherMap when a key is
//! configured, a plausible mock otherwise.
//!
//! The widget is decorative, so this provider never fails: any upstream
//! problem quietly falls back to generated data and the report's
//! `source` field tells the frontend which one it got.

use std::env;
use std::time::Duration;

use chrono::{DateTime, Duration as TimeDelta, NaiveDate, NaiveDateTime, Timelike};
use futures::try_join;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use bancarella_core::{
    geo::MARKET_CENTER,
    model::{DailyForecast, HourlyForecast, WeatherReport, WeatherSnapshot},
    ports::PortError,
};

const CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    rain: Option<RainBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct RainBlock {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

/// Weather provider over the market square coordinates.
pub struct WeatherProvider {
    client: Client,
    api_key: Option<String>,
}

impl WeatherProvider {
    /// Create a provider from the environment. A missing key is not an
    /// error here: the provider simply stays in mock mode.
    #[must_use]
    pub fn from_env(client: Client) -> Self {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self { client, api_key }
    }

    /// Weather report for the widget. Infallible: upstream failures and
    /// missing configuration both degrade to the mock generator.
    pub async fn report(&self, at: NaiveDateTime) -> WeatherReport {
        let Some(api_key) = self.api_key.as_deref() else {
            return mock_report(at);
        };

        match self.fetch_report(api_key).await {
            Ok(report) => {
                info!("live weather fetched");
                report
            }
            Err(error) => {
                warn!(%error, "weather fetch failed, serving mock data");
                mock_report(at)
            }
        }
    }

    async fn fetch_report(&self, api_key: &str) -> Result<WeatherReport, PortError> {
        let params = [
            ("lat", MARKET_CENTER.lat.to_string()),
            ("lon", MARKET_CENTER.lng.to_string()),
            ("units", String::from("metric")),
            ("lang", String::from("it")),
            ("appid", api_key.to_owned()),
        ];

        let current = async {
            self.client
                .get(CURRENT_URL)
                .query(&params)
                .timeout(FETCH_TIMEOUT)
                .send()
                .await?
                .error_for_status()?
                .json::<CurrentResponse>()
                .await
                .map_err(PortError::from)
        };
        let forecast = async {
            self.client
                .get(FORECAST_URL)
                .query(&params)
                .timeout(FETCH_TIMEOUT)
                .send()
                .await?
                .error_for_status()?
                .json::<ForecastResponse>()
                .await
                .map_err(PortError::from)
        };

        let (current, forecast) = try_join!(current, forecast)?;
        Ok(build_report(&current, &forecast))
    }
}

/// Map an OpenWeatherMap condition group to the widget's Italian label
/// and icon slug.
fn condition_label(block: Option<&ConditionBlock>) -> (&'static str, &'static str) {
    let Some(block) = block else {
        return ("Nuvoloso", "cloudy");
    };
    match block.main.as_str() {
        "Rain" | "Drizzle" | "Thunderstorm" => ("Pioggia", "rainy"),
        "Clear" => ("Sereno", "sunny"),
        "Squall" | "Tornado" => ("Vento forte", "windy"),
        "Clouds" => {
            if block.description.contains("few") || block.description.contains("scattered") {
                ("Parzialmente nuvoloso", "partly-cloudy")
            } else {
                ("Nuvoloso", "cloudy")
            }
        }
        _ => ("Nuvoloso", "cloudy"),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "wind speeds are small positive numbers"
)]
fn kmh(meters_per_second: f64) -> u32 {
    (meters_per_second * 3.6).round() as u32
}

fn build_report(current: &CurrentResponse, forecast: &ForecastResponse) -> WeatherReport {
    let (label, icon) = condition_label(current.weather.first());
    let snapshot = WeatherSnapshot {
        temperature: round1(current.main.temp),
        condition: String::from(label),
        icon: String::from(icon),
        humidity: current.main.humidity,
        wind_speed: kmh(current.wind.speed),
    };

    // The forecast feed is 3-hourly; the first eight entries cover the
    // widget's 24-hour strip.
    let hourly: Vec<HourlyForecast> = forecast
        .list
        .iter()
        .take(8)
        .filter_map(|entry| {
            let time = DateTime::from_timestamp(entry.dt, 0)?.naive_utc();
            let (label, icon) = condition_label(entry.weather.first());
            Some(HourlyForecast {
                time,
                temperature: round1(entry.main.temp),
                condition: String::from(label),
                icon: String::from(icon),
                precipitation: entry
                    .rain
                    .as_ref()
                    .and_then(|rain| rain.three_hours)
                    .unwrap_or(0.0),
            })
        })
        .collect();

    let daily = daily_from_entries(&forecast.list);

    WeatherReport {
        current: snapshot,
        hourly,
        daily,
        source: String::from("openweathermap"),
    }
}

/// Fold the 3-hourly feed into per-day min/max over the next three days.
fn daily_from_entries(entries: &[ForecastEntry]) -> Vec<DailyForecast> {
    let mut days: Vec<DailyForecast> = Vec::new();
    for entry in entries {
        let Some(timestamp) = DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        let date = timestamp.date_naive();
        let precipitation = entry
            .rain
            .as_ref()
            .and_then(|rain| rain.three_hours)
            .unwrap_or(0.0);

        if let Some(day) = days.iter_mut().find(|day| day.date == date) {
            day.max_temp = day.max_temp.max(round1(entry.main.temp));
            day.min_temp = day.min_temp.min(round1(entry.main.temp));
            day.precipitation += precipitation;
        } else {
            if days.len() == 3 {
                break;
            }
            let (label, icon) = condition_label(entry.weather.first());
            days.push(DailyForecast {
                date,
                max_temp: round1(entry.main.temp),
                min_temp: round1(entry.main.temp),
                condition: String::from(label),
                icon: String::from(icon),
                precipitation,
            });
        }
    }
    days
}

/// Seasonally plausible generated weather, used whenever live data is
/// unavailable.
#[must_use]
pub fn mock_report(at: NaiveDateTime) -> WeatherReport {
    let mut rng = rand::rng();

    let daytime = (7..19).contains(&at.hour());
    let base_temp = if daytime {
        rng.random_range(16.0..24.0)
    } else {
        rng.random_range(10.0..16.0)
    };

    // Skewed toward fair weather, as the riviera deserves.
    let pick = |rng: &mut rand::rngs::ThreadRng| match rng.random_range(0..10_u32) {
        0..=4 => ("Sereno", "sunny"),
        5..=7 => ("Parzialmente nuvoloso", "partly-cloudy"),
        8 => ("Nuvoloso", "cloudy"),
        _ => ("Pioggia", "rainy"),
    };

    let (label, icon) = pick(&mut rng);
    let current = WeatherSnapshot {
        temperature: round1(base_temp),
        condition: String::from(label),
        icon: String::from(icon),
        humidity: rng.random_range(50..85),
        wind_speed: rng.random_range(5..25),
    };

    let start = at.date().and_hms_opt(at.hour(), 0, 0).unwrap_or(at);
    let hourly: Vec<HourlyForecast> = (0..24)
        .map(|offset| {
            let time = start + TimeDelta::hours(offset);
            let night = !(7..19).contains(&time.hour());
            let drift = rng.random_range(-2.0..2.0);
            let temperature = if night { base_temp - 4.0 } else { base_temp } + drift;
            let (label, icon) = pick(&mut rng);
            HourlyForecast {
                time,
                temperature: round1(temperature),
                condition: String::from(label),
                icon: String::from(icon),
                precipitation: if icon == "rainy" {
                    round1(rng.random_range(0.2..3.0))
                } else {
                    0.0
                },
            }
        })
        .collect();

    let daily: Vec<DailyForecast> = (1..=3)
        .map(|offset| {
            let date: NaiveDate = at.date() + TimeDelta::days(offset);
            let max = base_temp + rng.random_range(-1.0..3.0);
            let min = max - rng.random_range(5.0..9.0);
            let (label, icon) = pick(&mut rng);
            DailyForecast {
                date,
                max_temp: round1(max),
                min_temp: round1(min),
                condition: String::from(label),
                icon: String::from(icon),
                precipitation: if icon == "rainy" {
                    round1(rng.random_range(1.0..8.0))
                } else {
                    0.0
                },
            }
        })
        .collect();

    WeatherReport {
        current,
        hourly,
        daily,
        source: String::from("mock"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .expect("valid date")
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn mock_report_has_full_shape() {
        let report = mock_report(noon());
        assert_eq!(report.source, "mock");
        assert_eq!(report.hourly.len(), 24);
        assert_eq!(report.daily.len(), 3);
        assert!(report.current.temperature >= 10.0);
        assert!(report.current.temperature <= 24.1);
    }

    #[test]
    fn mock_hourly_strip_starts_at_the_request_hour() {
        let report = mock_report(noon());
        let first = report.hourly.first().expect("hour");
        assert_eq!(first.time.hour(), 12);
        let last = report.hourly.last().expect("hour");
        assert_eq!(last.time.hour(), 11);
    }

    #[test]
    fn conditions_map_to_italian_labels() {
        let rain = ConditionBlock {
            main: String::from("Rain"),
            description: String::from("light rain"),
        };
        assert_eq!(condition_label(Some(&rain)), ("Pioggia", "rainy"));

        let few = ConditionBlock {
            main: String::from("Clouds"),
            description: String::from("few clouds"),
        };
        assert_eq!(
            condition_label(Some(&few)),
            ("Parzialmente nuvoloso", "partly-cloudy")
        );

        let clear = ConditionBlock {
            main: String::from("Clear"),
            description: String::from("clear sky"),
        };
        assert_eq!(condition_label(Some(&clear)), ("Sereno", "sunny"));

        assert_eq!(condition_label(None), ("Nuvoloso", "cloudy"));
    }

    #[test]
    fn forecast_feed_folds_into_hourly_and_daily() {
        let body = r#"{
            "list": [
                {
                    "dt": 1710500400,
                    "main": { "temp": 15.3, "humidity": 60 },
                    "weather": [{ "main": "Clear", "description": "clear sky" }],
                    "rain": null
                },
                {
                    "dt": 1710511200,
                    "main": { "temp": 17.8, "humidity": 55 },
                    "weather": [{ "main": "Rain", "description": "light rain" }],
                    "rain": { "3h": 1.2 }
                },
                {
                    "dt": 1710586800,
                    "main": { "temp": 14.0, "humidity": 70 },
                    "weather": [{ "main": "Clouds", "description": "overcast clouds" }]
                }
            ]
        }"#;
        let forecast: ForecastResponse = serde_json::from_str(body).expect("valid payload");

        let current = CurrentResponse {
            main: MainBlock {
                temp: 16.44,
                humidity: 58,
            },
            weather: vec![ConditionBlock {
                main: String::from("Clear"),
                description: String::from("clear sky"),
            }],
            wind: WindBlock { speed: 4.2 },
        };

        let report = build_report(&current, &forecast);
        assert_eq!(report.source, "openweathermap");
        assert_eq!(report.current.condition, "Sereno");
        assert!((report.current.temperature - 16.4).abs() < f64::EPSILON);
        assert_eq!(report.current.wind_speed, 15);

        assert_eq!(report.hourly.len(), 3);
        let rainy = report.hourly.get(1).expect("entry");
        assert!((rainy.precipitation - 1.2).abs() < f64::EPSILON);

        // Two distinct calendar days in the feed.
        assert_eq!(report.daily.len(), 2);
        let first_day = report.daily.first().expect("day");
        assert!((first_day.max_temp - 17.8).abs() < f64::EPSILON);
        assert!((first_day.min_temp - 15.3).abs() < f64::EPSILON);
    }
}
