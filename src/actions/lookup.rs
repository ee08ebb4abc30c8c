//! Weather (weatherapi.com) and world-time (worldtimeapi.org) lookups.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use super::LookupService;
use crate::config::LookupConfig;
use crate::error::{OrionError, Result};

#[derive(Debug, Deserialize)]
pub struct WeatherReport {
    pub location: WeatherLocation,
    pub current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
pub struct WeatherLocation {
    pub name: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub feelslike_c: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub wind_kph: f64,
    pub condition: Condition,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct WorldTime {
    datetime: String,
}

/// Spoken summary of a weather report.
#[must_use]
pub fn describe_weather(report: &WeatherReport) -> String {
    let cur = &report.current;
    let place = if report.location.country.is_empty() {
        report.location.name.clone()
    } else {
        format!("{}, {}", report.location.name, report.location.country)
    };
    format!(
        "In {place} it's {:.0}°C and {}. It feels like {:.0}°C, humidity is {:.0}% and wind is {:.1} m/s.",
        cur.temp_c,
        cur.condition.text.trim().to_lowercase(),
        cur.feelslike_c,
        cur.humidity,
        cur.wind_kph / 3.6
    )
}

/// First timezone whose identifier mentions `location` (spaces as `_`).
#[must_use]
pub fn match_zone<'a>(zones: &'a [String], location: &str) -> Option<&'a str> {
    let wanted = location.trim().to_lowercase().replace(' ', "_");
    if wanted.is_empty() {
        return None;
    }
    zones
        .iter()
        .find(|z| z.to_lowercase().contains(&wanted))
        .map(String::as_str)
}

/// Blocking web lookup client.
pub struct WebLookup {
    agent: ureq::Agent,
    weather_url: String,
    weather_key: Option<String>,
    time_url: String,
}

impl WebLookup {
    /// Build from config, reading the weather key from `weather_api_key_env`.
    #[must_use]
    pub fn new(config: &LookupConfig) -> Self {
        let key = std::env::var(&config.weather_api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_endpoints(
            &config.weather_url,
            key,
            &config.time_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    #[must_use]
    pub fn with_endpoints(
        weather_url: &str,
        weather_key: Option<String>,
        time_url: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            weather_url: weather_url.to_owned(),
            weather_key,
            time_url: time_url.trim_end_matches('/').to_owned(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("lookup GET {}", url.split('?').next().unwrap_or(url));
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                OrionError::Lookup(format!("{code}: {}", error_message(&body)))
            }
            other => OrionError::Lookup(other.to_string()),
        })?;
        response
            .into_json()
            .map_err(|e| OrionError::Lookup(format!("response decode failed: {e}")))
    }
}

/// weatherapi.com reports errors as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

impl LookupService for WebLookup {
    fn weather(&self, query: &str) -> Result<String> {
        let Some(key) = &self.weather_key else {
            return Ok("I don't have a weather API key configured.".to_owned());
        };
        let url = format!(
            "{}?key={}&q={}",
            self.weather_url,
            urlencoding::encode(key),
            urlencoding::encode(query)
        );
        let report: WeatherReport = self.get_json(&url).map_err(|e| {
            OrionError::Lookup(format!("couldn't get the weather for {query}: {e}"))
        })?;
        Ok(describe_weather(&report))
    }

    fn time_in(&self, location: &str) -> Result<String> {
        let zones: Vec<String> = self.get_json(&self.time_url)?;
        let Some(zone) = match_zone(&zones, location) else {
            return Ok(format!("I'm not sure what timezone '{location}' is in."));
        };
        let time: WorldTime = self.get_json(&format!("{}/{zone}", self.time_url))?;
        let at = DateTime::parse_from_rfc3339(&time.datetime)
            .map_err(|e| OrionError::Lookup(format!("bad datetime from time service: {e}")))?;
        Ok(format!(
            "In {location} it's {}.",
            at.format("%H:%M on %A, %d %B %Y")
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn weather_description_rounds_and_converts_wind() {
        let report: WeatherReport = serde_json::from_value(serde_json::json!({
            "location": {"name": "Lagos", "country": "Nigeria"},
            "current": {
                "temp_c": 29.6, "feelslike_c": 33.2, "humidity": 79,
                "wind_kph": 18.0, "condition": {"text": "Partly cloudy"}
            }
        }))
        .unwrap();
        assert_eq!(
            describe_weather(&report),
            "In Lagos, Nigeria it's 30°C and partly cloudy. It feels like 33°C, humidity is 79% and wind is 5.0 m/s."
        );
    }

    #[test]
    fn zone_matching_uses_underscored_names() {
        let zones = vec!["America/New_York".to_owned(), "Europe/Paris".to_owned()];
        assert_eq!(match_zone(&zones, "new york"), Some("America/New_York"));
        assert_eq!(match_zone(&zones, "Paris"), Some("Europe/Paris"));
        assert_eq!(match_zone(&zones, "Atlantis"), None);
    }

    #[test]
    fn missing_weather_key_is_reported_politely() {
        let lookup = WebLookup::with_endpoints(
            "http://127.0.0.1:9",
            None,
            "http://127.0.0.1:9",
            Duration::from_millis(100),
        );
        assert_eq!(
            lookup.weather("auto:ip").unwrap(),
            "I don't have a weather API key configured."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn time_in_resolves_zone_then_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timezone"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!(["Europe/Paris", "Asia/Kolkata"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/timezone/Asia/Kolkata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "datetime": "2024-05-06T14:05:00.123+05:30"
            })))
            .mount(&server)
            .await;

        let base = format!("{}/api/timezone", server.uri());
        let reply = tokio::task::spawn_blocking(move || {
            WebLookup::with_endpoints("http://unused", None, &base, Duration::from_secs(5))
                .time_in("kolkata")
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(reply, "In kolkata it's 14:05 on Monday, 06 May 2024.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn weather_api_errors_carry_the_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .and(query_param("q", "Nowhere"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 1006, "message": "No matching location found."}
            })))
            .mount(&server)
            .await;

        let url = format!("{}/v1/current.json", server.uri());
        let result = tokio::task::spawn_blocking(move || {
            WebLookup::with_endpoints(&url, Some("k".into()), "http://unused", Duration::from_secs(5))
                .weather("Nowhere")
        })
        .await
        .unwrap();
        let err = result.unwrap_err().to_string();
        assert!(err.contains("No matching location found."), "{err}");
    }
}
