//! Boundary to the external authentication widget.
//!
//! The widget owns the QR code and the protocol with the app. The lifecycle
//! only hands it a session and waits for one of three outcomes.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info, warn};

use super::pointer::SessionPointer;

/// What the widget is given to run a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSession {
    /// Pointer rendered in the QR code, already rewritten to our host.
    pub session_ptr: SessionPointer,
    /// Where the signed session result can be fetched.
    pub result_url: String,
    pub language: String,
}

/// How a widget run ended. Produced once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Disclosure finished; carries the opaque result token.
    Completed(String),
    /// The widget raised an error.
    Failed(String),
    /// The user cancelled, or the run was aborted from outside.
    Aborted,
}

/// Capability exposed by an authentication widget.
#[async_trait]
pub trait AuthWidget: Send + Sync {
    /// Run the session until it completes, fails or is aborted.
    async fn start(&self, session: &WidgetSession) -> SessionOutcome;

    /// Stop an in-progress run. `start` then resolves with `Aborted`.
    fn abort(&self);
}

/// Headless widget: publishes the session pointer, waits until the operator
/// confirms the app finished, then fetches the result JWT.
pub struct ResultJwtWidget {
    http_client: reqwest::Client,
    confirmations: Mutex<mpsc::Receiver<()>>,
    aborted: Notify,
}

impl ResultJwtWidget {
    /// `confirmations` yields once for every "app is done" signal.
    pub fn new(http_client: reqwest::Client, confirmations: mpsc::Receiver<()>) -> Self {
        Self {
            http_client,
            confirmations: Mutex::new(confirmations),
            aborted: Notify::new(),
        }
    }

    async fn fetch_result(&self, url: &str) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch session result")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Session result endpoint returned {}",
                response.status()
            ));
        }

        response
            .text()
            .await
            .context("Failed to read session result")
    }
}

#[async_trait]
impl AuthWidget for ResultJwtWidget {
    async fn start(&self, session: &WidgetSession) -> SessionOutcome {
        match serde_json::to_string(&session.session_ptr) {
            Ok(pointer) => info!(session_ptr = %pointer, "Session started, waiting for the app"),
            Err(e) => return SessionOutcome::Failed(format!("Unprintable session pointer: {}", e)),
        }

        let mut confirmations = self.confirmations.lock().await;
        tokio::select! {
            _ = self.aborted.notified() => {
                debug!("Widget aborted");
                return SessionOutcome::Aborted;
            }
            confirmed = confirmations.recv() => {
                if confirmed.is_none() {
                    return SessionOutcome::Failed("Confirmation source closed".to_string());
                }
            }
        }

        match self.fetch_result(&session.result_url).await {
            Ok(token) => SessionOutcome::Completed(token),
            Err(e) => {
                warn!(error = %e, "Session result unavailable");
                SessionOutcome::Failed(e.to_string())
            }
        }
    }

    fn abort(&self) {
        self.aborted.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(result_url: String) -> WidgetSession {
        WidgetSession {
            session_ptr: SessionPointer {
                u: "https://bridge.example/irma/session/abc".to_string(),
                extra: serde_json::Map::new(),
            },
            result_url,
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn test_completes_with_result_jwt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/tok/result-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("eyJhbGciOi.jwt"))
            .expect(1)
            .mount(&server)
            .await;

        let (tx, rx) = mpsc::channel(1);
        let widget = ResultJwtWidget::new(reqwest::Client::new(), rx);
        tx.send(()).await.unwrap();

        let outcome = widget
            .start(&session(format!("{}/session/tok/result-jwt", server.uri())))
            .await;
        assert_eq!(outcome, SessionOutcome::Completed("eyJhbGciOi.jwt".to_string()));
    }

    #[tokio::test]
    async fn test_fails_when_result_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (tx, rx) = mpsc::channel(1);
        let widget = ResultJwtWidget::new(reqwest::Client::new(), rx);
        tx.send(()).await.unwrap();

        let outcome = widget.start(&session(server.uri())).await;
        assert!(matches!(outcome, SessionOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_abort_before_confirmation() {
        let (_tx, rx) = mpsc::channel(1);
        let widget = ResultJwtWidget::new(reqwest::Client::new(), rx);
        widget.abort();

        let outcome = widget
            .start(&session("http://127.0.0.1:1/unused".to_string()))
            .await;
        assert_eq!(outcome, SessionOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_closed_confirmation_source() {
        let (tx, rx) = mpsc::channel::<()>(1);
        drop(tx);
        let widget = ResultJwtWidget::new(reqwest::Client::new(), rx);

        let outcome = widget
            .start(&session("http://127.0.0.1:1/unused".to_string()))
            .await;
        assert!(matches!(outcome, SessionOutcome::Failed(_)));
    }
}
