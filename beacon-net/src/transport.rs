//! Blocking HTTP transport over reqwest.

use std::time::Duration;

use beacon_core::config::NetworkConfig;
use beacon_core::errors::NetworkError;
use beacon_core::traits::{ITransport, TransportResponse};

fn net_err(reason: String) -> NetworkError {
    NetworkError::ConnectionFailed { reason }
}

/// Production transport. One shared client, gzip request bodies,
/// whole-request timeout from [`NetworkConfig`]. No retries here;
/// the dispatcher owns the backoff schedule.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .gzip(true)
            .build()
            .map_err(|e| net_err(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ITransport for HttpTransport {
    fn post(&self, url: &str, body: &[u8]) -> Result<TransportResponse, NetworkError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body.to_vec())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    net_err(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| net_err(format!("reading response body: {e}")))?
            .to_vec();
        Ok(TransportResponse { status, body })
    }
}
