//! Entropy service client
//!
//! HTTP client for the external high-entropy source used to refill the
//! random cache. The wire shape follows the ANU QRNG-style API: a GET with a
//! length parameter, answered by a JSON body whose `data` field carries
//! blocks of hexadecimal digits.
//!
//! Every failure mode here (non-2xx, unsuccessful body, timeout, network
//! error, malformed payload) is an ordinary refill failure: the random
//! source falls back to local synthesis and callers never see it.

use log::debug;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php";
const USER_AGENT: &str = concat!("mixflow/", env!("CARGO_PKG_VERSION"));

/// Hex block size requested per array element.
const BLOCK_SIZE: usize = 16;

/// Entropy service failures. All variants are treated identically by the
/// refill path.
#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Service reported failure")]
    Unsuccessful,
}

/// Response body of the entropy service.
#[derive(Debug, Deserialize)]
struct EntropyResponse {
    success: bool,
    data: Vec<String>,
}

/// Client for the external entropy service.
#[derive(Debug, Clone)]
pub struct EntropyClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl EntropyClient {
    /// Build a client against the default service endpoint.
    pub fn new(timeout: Duration) -> Result<Self, EntropyError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Build a client against a custom endpoint (used by tests and config).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, EntropyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EntropyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    /// Fetch at least `count` lowercase hex digits from the service.
    ///
    /// The request is bounded by the configured timeout; expiry is reported
    /// as [`EntropyError::Timeout`] and handled like any other failure.
    pub async fn fetch(&self, count: usize) -> Result<String, EntropyError> {
        let blocks = count.div_ceil(BLOCK_SIZE).max(1);
        debug!(
            "Requesting {count} hex digits ({blocks} blocks) from entropy service"
        );

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("length", blocks.to_string()),
                ("type", format!("hex{BLOCK_SIZE}")),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EntropyError::Timeout(self.timeout)
                } else {
                    EntropyError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EntropyError::Api(status.as_u16(), body));
        }

        let body: EntropyResponse = response
            .json()
            .await
            .map_err(|e| EntropyError::Parse(e.to_string()))?;

        if !body.success {
            return Err(EntropyError::Unsuccessful);
        }

        let digits: String = body.data.concat().to_lowercase();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EntropyError::Parse(
                "service returned non-hexadecimal payload".to_string(),
            ));
        }

        debug!("Entropy service returned {} hex digits", digits.len());
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_endpoint() {
        let client = EntropyClient::new(Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn response_body_parses() {
        let body: EntropyResponse =
            serde_json::from_str(r#"{"success":true,"data":["AB12","cd34"],"length":2}"#).unwrap();
        assert!(body.success);
        assert_eq!(body.data.concat(), "AB12cd34");
    }

    #[tokio::test]
    async fn unreachable_service_reports_network_error() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let client =
            EntropyClient::with_base_url("http://192.0.2.1/api", Duration::from_millis(200))
                .unwrap();
        let err = client.fetch(32).await.unwrap_err();
        assert!(matches!(
            err,
            EntropyError::Network(_) | EntropyError::Timeout(_)
        ));
    }
}
