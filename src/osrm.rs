//! OSRM HTTP adapter for duration blocks.

use serde::Deserialize;

use crate::error::DistanceProviderError;
use crate::stop::LocationKey;
use crate::traits::{DEFAULT_BATCH_SIZE, DistanceProvider};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// `table` request with origins listed first, destinations after them.
    fn table_url(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<String, DistanceProviderError> {
        let coords = origins
            .iter()
            .chain(destinations)
            .map(|key| {
                key.lat_lng()
                    .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
                    .ok_or_else(|| DistanceProviderError::UnsupportedLocation(key.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?
            .join(";");

        let sources = index_list(0..origins.len());
        let targets = index_list(origins.len()..origins.len() + destinations.len());

        Ok(format!(
            "{}/table/v1/{}/{}?sources={}&destinations={}&annotations=duration",
            self.config.base_url, self.config.profile, coords, sources, targets
        ))
    }
}

impl DistanceProvider for OsrmClient {
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(vec![Vec::new(); origins.len()]);
        }

        let url = self.table_url(origins, destinations)?;
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())?;

        body.into_durations(origins, destinations)
    }

    fn max_batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

fn index_list(indices: std::ops::Range<usize>) -> String {
    indices.map(|i| i.to_string()).collect::<Vec<_>>().join(";")
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    fn into_durations(
        self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        if self.code != "Ok" {
            return Err(DistanceProviderError::Status {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        let durations = self
            .durations
            .ok_or_else(|| DistanceProviderError::MalformedResponse("missing durations".to_string()))?;

        durations
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(j, value)| match value {
                        Some(seconds) if seconds >= 0.0 => Ok(seconds.round() as u64),
                        _ => Err(DistanceProviderError::Unreachable {
                            origin: location_label(origins, i),
                            destination: location_label(destinations, j),
                        }),
                    })
                    .collect::<Result<Vec<u64>, _>>()
            })
            .collect()
    }
}

fn location_label(keys: &[LocationKey], index: usize) -> String {
    keys.get(index)
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}
