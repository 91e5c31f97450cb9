//! Exchange of session results for SAML assertions.
//!
//! Three mutually exclusive calls: the success assert carrying the disclosure
//! token, the error assert, and the abort assert. All of them answer with the
//! same redirect instruction, which is validated before anyone may use it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::transport::{post_json, JsonReply};
use crate::error::{BridgeError, BridgeResult};
use crate::session::SessionConfig;

/// One of the three assertion requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionRequest {
    Success { token: String, parameters: String },
    Error { parameters: String },
    Abort { parameters: String },
}

impl AssertionRequest {
    /// Name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            AssertionRequest::Success { .. } => "success",
            AssertionRequest::Error { .. } => "error",
            AssertionRequest::Abort { .. } => "abort",
        }
    }

    /// Endpoint this request is posted to.
    pub fn endpoint(&self, config: &SessionConfig) -> String {
        match self {
            AssertionRequest::Success { .. } => config.assert_url().to_string(),
            AssertionRequest::Error { .. } => config.error_assert_url().to_string(),
            AssertionRequest::Abort { .. } => config.abort_url(),
        }
    }

    /// JSON body of the request.
    pub fn body(&self) -> AssertionRequestBody<'_> {
        match self {
            AssertionRequest::Success { token, parameters } => AssertionRequestBody {
                token: Some(token),
                parameters,
            },
            AssertionRequest::Error { parameters } | AssertionRequest::Abort { parameters } => {
                AssertionRequestBody {
                    token: None,
                    parameters,
                }
            }
        }
    }
}

/// Wire format of an assertion request.
#[derive(Debug, Serialize)]
pub struct AssertionRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
    pub parameters: &'a str,
}

/// Raw answer of an assert endpoint, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(skip)]
    pub http_status: u16,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub saml_response: Option<String>,
    #[serde(default)]
    pub relay_state: Option<String>,
}

impl AssertionResponse {
    /// Build from a transport reply. A body that does not have the expected
    /// shape is treated as carrying no fields.
    pub fn from_reply(reply: JsonReply) -> Self {
        let mut response = reply
            .data
            .and_then(|data| serde_json::from_value::<AssertionResponse>(data).ok())
            .unwrap_or_default();
        response.http_status = reply.status;
        response
    }

    /// Turn the response into a usable assertion, or fail without exposing
    /// any partially populated value.
    pub fn validate(self, url: &str) -> BridgeResult<Assertion> {
        if self.http_status != 200 {
            return Err(BridgeError::ExchangeHttp {
                url: url.to_string(),
                status: self.http_status,
            });
        }

        let service_url = non_empty(self.service_url)
            .ok_or_else(|| BridgeError::InvalidAssertion("missing serviceUrl".to_string()))?;
        let saml_response = non_empty(self.saml_response)
            .ok_or_else(|| BridgeError::InvalidAssertion("missing samlResponse".to_string()))?;

        Ok(Assertion {
            service_url,
            saml_response,
            relay_state: non_empty(self.relay_state),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// A validated assertion, ready to be relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub service_url: String,
    pub saml_response: String,
    pub relay_state: Option<String>,
}

/// Client for the bridge's assert endpoints.
pub struct AssertionClient {
    http_client: reqwest::Client,
    config: SessionConfig,
}

impl AssertionClient {
    pub fn new(http_client: reqwest::Client, config: SessionConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Exchange the disclosure token for an assertion.
    pub async fn exchange_success(&self, token: &str) -> BridgeResult<Assertion> {
        self.exchange(AssertionRequest::Success {
            token: token.to_string(),
            parameters: self.config.assert_parameters().to_string(),
        })
        .await
    }

    /// Ask for the assertion that reports a failed login.
    pub async fn exchange_error(&self) -> BridgeResult<Assertion> {
        self.exchange(AssertionRequest::Error {
            parameters: self.config.assert_parameters().to_string(),
        })
        .await
    }

    /// Ask for the assertion that reports a cancelled login.
    pub async fn exchange_abort(&self) -> BridgeResult<Assertion> {
        self.exchange(AssertionRequest::Abort {
            parameters: self.config.assert_parameters().to_string(),
        })
        .await
    }

    /// Post a request and validate the answer. Never retries.
    pub async fn exchange(&self, request: AssertionRequest) -> BridgeResult<Assertion> {
        let url = request.endpoint(&self.config);
        debug!(kind = request.label(), url = %url, "Requesting assertion");

        let reply = post_json(&self.http_client, &url, &request.body()).await?;
        match AssertionResponse::from_reply(reply).validate(&url) {
            Ok(assertion) => {
                info!(
                    kind = request.label(),
                    service_url = %assertion.service_url,
                    "Assertion received"
                );
                Ok(assertion)
            }
            Err(e) => {
                warn!(kind = request.label(), error = %e, "Assertion exchange failed");
                Err(e)
            }
        }
    }
}
