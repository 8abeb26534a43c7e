//! Distance Matrix API adapter. Accepts postal addresses as well as
//! coordinates, so stops need not be geocoded beforehand.

use serde::Deserialize;

use crate::error::DistanceProviderError;
use crate::stop::LocationKey;
use crate::traits::{DEFAULT_BATCH_SIZE, DistanceProvider};

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "GOOGLEMAP_API_KEY";

#[derive(Debug, Clone)]
pub struct GoogleMatrixConfig {
    pub api_key: String,
    pub base_url: String,
    /// Travel mode, e.g. `driving`.
    pub mode: String,
    pub timeout_secs: u64,
}

impl Default for GoogleMatrixConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
            mode: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

impl GoogleMatrixConfig {
    /// Defaults with the key read from `GOOGLEMAP_API_KEY`, if set.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_VAR).unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleMatrixClient {
    config: GoogleMatrixConfig,
    client: reqwest::blocking::Client,
}

impl GoogleMatrixClient {
    pub fn new(config: GoogleMatrixConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl DistanceProvider for GoogleMatrixClient {
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(vec![Vec::new(); origins.len()]);
        }

        let body = self
            .client
            .get(self.config.base_url.as_str())
            .query(&[
                ("origins", pipe_joined(origins)),
                ("destinations", pipe_joined(destinations)),
                ("mode", self.config.mode.clone()),
                ("key", self.config.api_key.clone()),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<MatrixResponse>())?;

        body.into_durations(origins, destinations)
    }

    /// 10 x 10 keeps a call within the 100-element limit.
    fn max_batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

fn pipe_joined(keys: &[LocationKey]) -> String {
    keys.iter().map(ToString::to_string).collect::<Vec<_>>().join("|")
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
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: u64,
}

impl MatrixResponse {
    fn into_durations(
        self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        if self.status != "OK" {
            return Err(DistanceProviderError::Status {
                code: self.status,
                message: self.error_message.unwrap_or_default(),
            });
        }

        self.rows
            .into_iter()
            .zip(origins)
            .map(|(row, origin)| {
                row.elements
                    .into_iter()
                    .zip(destinations)
                    .map(|(element, destination)| match (element.status.as_str(), element.duration) {
                        ("OK", Some(duration)) => Ok(duration.value),
                        _ => Err(DistanceProviderError::Unreachable {
                            origin: origin.to_string(),
                            destination: destination.to_string(),
                        }),
                    })
                    .collect::<Result<Vec<u64>, _>>()
            })
            .collect()
    }
}
