//! Thin asynchronous client for a distance-matrix style HTTP API.
//!
//! - One origin, one destination per request.
//! - Element statuses `ZERO_RESULTS` and `NOT_FOUND` mean there is no drivable route.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::distance::{DistanceLookup, LookupError, RouteLookup};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct DistanceMatrixClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl DistanceMatrixClient {
    pub fn new(api_key: Option<String>) -> Result<Self, LookupError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        base: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    fn request_url(&self, origin: &str, destination: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("origins", origin)
                .append_pair("destinations", destination)
                .append_pair("units", "metric");
            if let Some(key) = &self.api_key {
                query.append_pair("key", key);
            }
        }
        url
    }
}

impl DistanceLookup for DistanceMatrixClient {
    async fn lookup(&self, origin: &str, destination: &str) -> Result<RouteLookup, LookupError> {
        let url = self.request_url(origin, destination);
        debug!(origin, destination, "requesting distance matrix");
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body: MatrixResponse = response.json().await?;
        interpret(body)
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

fn interpret(body: MatrixResponse) -> Result<RouteLookup, LookupError> {
    if !body.status.eq_ignore_ascii_case("ok") {
        return Err(LookupError::Api(body.error_message.unwrap_or(body.status)));
    }

    let element = body
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| LookupError::Api("response missing route element".into()))?;

    match element.status.as_str() {
        "OK" => element
            .distance
            .map(|d| RouteLookup::Meters(d.value))
            .ok_or_else(|| LookupError::Api("route element missing distance".into())),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(RouteLookup::NoRoute),
        other => Err(LookupError::Api(format!("route lookup failed: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RouteLookup, LookupError> {
        interpret(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn reads_meters_from_first_element() {
        let body = r#"{
            "status": "OK",
            "rows": [{ "elements": [{
                "status": "OK",
                "distance": { "text": "1,482 km", "value": 1481932 },
                "duration": { "text": "14 hours", "value": 50400 }
            }]}]
        }"#;
        assert_eq!(parse(body).unwrap(), RouteLookup::Meters(1_481_932.0));
    }

    #[test]
    fn zero_results_means_no_route() {
        let body = r#"{"status":"OK","rows":[{"elements":[{"status":"ZERO_RESULTS"}]}]}"#;
        assert_eq!(parse(body).unwrap(), RouteLookup::NoRoute);
    }

    #[test]
    fn request_level_error_surfaces_message() {
        let body = r#"{"status":"REQUEST_DENIED","error_message":"bad key","rows":[]}"#;
        assert!(matches!(parse(body), Err(LookupError::Api(msg)) if msg == "bad key"));
    }

    #[test]
    fn empty_rows_are_an_error() {
        assert!(parse(r#"{"status":"OK","rows":[]}"#).is_err());
    }

    #[test]
    fn request_url_carries_key_only_when_set() {
        let client = DistanceMatrixClient::with_base_url(
            "http://localhost/matrix",
            Some("secret".into()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let url = client.request_url("Austin, TX", "Boston, MA");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("origins".into(), "Austin, TX".into())));
        assert!(pairs.contains(&("key".into(), "secret".into())));

        let anonymous =
            DistanceMatrixClient::with_base_url("http://localhost/matrix", Some(" ".into()), DEFAULT_TIMEOUT)
                .unwrap();
        assert!(!anonymous
            .request_url("A", "B")
            .query_pairs()
            .any(|(k, _)| k == "key"));
    }
}
