//! Prometheus instant-query client.

use std::collections::BTreeMap;
use std::sync::Arc;

use jiff::Timestamp;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// One element of an instant vector.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Sample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// `[unix seconds, "value"]`.
    pub value: (f64, String),
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
}

#[derive(Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

/// Handle to a Prometheus server. Cheap to clone.
#[derive(Clone, Debug)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    /// Evaluate `query` at `time`; the result must be an instant vector.
    pub async fn query(&self, query: &str, time: Timestamp) -> Result<Vec<Sample>> {
        let time = time.as_second().to_string();
        let response = self
            .http
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query), ("time", time.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(query, status = status.as_u16(), "Prometheus query");

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| Error::Query(format!("HTTP {status}: {e}; body: {body}")))?;
        if envelope.status != "success" {
            return Err(Error::Query(format!(
                "{}: {}",
                envelope.error_type.unwrap_or_default(),
                envelope.error.unwrap_or_default()
            )));
        }
        let data = envelope
            .data
            .ok_or_else(|| Error::MissingField("data".to_string()))?;
        if data.result_type != "vector" {
            return Err(Error::UnexpectedResultType(data.result_type));
        }
        Ok(serde_json::from_value(data.result)?)
    }
}
