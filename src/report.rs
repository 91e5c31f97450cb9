//! Error telemetry.
//!
//! Cascading failures within one run are reported only once: the reporter
//! owns a latch that flips on the first report and silences the rest.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::assertion::post_json;
use crate::error::{BridgeError, BridgeResult};

/// Error descriptor accepted by the bridge's report endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientError {
    pub message: String,
    pub source: String,
    pub lineno: u32,
    pub colno: u32,
}

impl ClientError {
    /// Descriptor for a relay failure. Location fields carry the module that
    /// raised it; line and column are not meaningful here.
    pub fn from_bridge_error(error: &BridgeError, source: &str) -> Self {
        Self {
            message: format!("{}: {}", error.kind(), error),
            source: source.to_string(),
            lineno: 0,
            colno: 0,
        }
    }
}

/// Posts at most one error report per run.
pub struct ErrorReporter {
    http_client: reqwest::Client,
    error_url: String,
    reported: AtomicBool,
}

impl ErrorReporter {
    pub fn new(http_client: reqwest::Client, error_url: impl Into<String>) -> Self {
        Self {
            http_client,
            error_url: error_url.into(),
            reported: AtomicBool::new(false),
        }
    }

    /// Whether a report has already gone out.
    pub fn has_reported(&self) -> bool {
        self.reported.load(Ordering::SeqCst)
    }

    /// Report an error unless one was reported before.
    ///
    /// Returns `true` if this call sent the report.
    pub async fn report(&self, error: &ClientError) -> BridgeResult<bool> {
        if self.reported.swap(true, Ordering::SeqCst) {
            debug!(report = %error.message, "Error already reported, skipping");
            return Ok(false);
        }

        warn!(
            report = %error.message,
            source = %error.source,
            "Reporting client error"
        );
        let reply = post_json(&self.http_client, &self.error_url, error).await?;
        if reply.status != 200 {
            warn!(status = reply.status, "Error report was not accepted");
        }
        Ok(true)
    }

    /// Report a relay failure.
    pub async fn report_failure(&self, error: &BridgeError, source: &str) -> BridgeResult<bool> {
        self.report(&ClientError::from_bridge_error(error, source))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_error_from_bridge_error() {
        let error = ClientError::from_bridge_error(&BridgeError::ReturnTimeout, "relay");
        assert_eq!(error.message, "return_timeout: Returning to the service failed");
        assert_eq!(error.source, "relay");
        assert_eq!(error.lineno, 0);
    }

    #[tokio::test]
    async fn test_report_latch_fires_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report"))
            .and(body_json(json!({
                "message": "exchange_http: Assertion endpoint u answered with HTTP 500",
                "source": "lifecycle",
                "lineno": 0,
                "colno": 0
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = ErrorReporter::new(reqwest::Client::new(), format!("{}/report", server.uri()));
        assert!(!reporter.has_reported());

        let first = BridgeError::ExchangeHttp {
            url: "u".to_string(),
            status: 500,
        };
        assert!(reporter.report_failure(&first, "lifecycle").await.unwrap());
        assert!(reporter.has_reported());

        assert!(!reporter
            .report_failure(&BridgeError::ReturnTimeout, "relay")
            .await
            .unwrap());
        assert!(!reporter
            .report_failure(&BridgeError::Widget("boom".to_string()), "widget")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_latch_set_even_if_report_fails() {
        let reporter = ErrorReporter::new(reqwest::Client::new(), "http://127.0.0.1:1/report");
        assert!(reporter
            .report_failure(&BridgeError::ReturnTimeout, "relay")
            .await
            .is_err());
        assert!(reporter.has_reported());
        assert!(!reporter
            .report_failure(&BridgeError::ReturnTimeout, "relay")
            .await
            .unwrap());
    }
}
