//! Session lifecycle: from widget outcome to a relayed assertion.
//!
//! ```text
//! Idle ──start──▶ Starting ──completed──▶ Succeeded ──exchange failed──▶ Erroring
//!   │                │
//!   │                └──failure──▶ Erroring
//!   ├──handle_error────────────────▶ Erroring
//!   └──abort (also from Starting)──▶ Aborting
//! ```
//!
//! `Succeeded`, `Erroring` and `Aborting` are claimed before any exchange is
//! made, so only one exchange is in flight and only one relay ever runs per
//! instance.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::widget::{AuthWidget, SessionOutcome, WidgetSession};
use crate::assertion::{Assertion, AssertionClient};
use crate::error::{BridgeError, BridgeResult};
use crate::relay::{ReturnAttempt, ReturnRelay};
use crate::view::LoginView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Succeeded,
    Erroring,
    Aborting,
}

impl LifecycleState {
    /// Whether the relay sequence of this session has been claimed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Succeeded | LifecycleState::Erroring | LifecycleState::Aborting
        )
    }
}

/// Drives one authentication attempt.
pub struct SessionLifecycle {
    client: AssertionClient,
    relay: ReturnRelay,
    view: Arc<dyn LoginView>,
    state: Mutex<LifecycleState>,
    widget: Mutex<Option<Arc<dyn AuthWidget>>>,
}

impl SessionLifecycle {
    pub fn new(client: AssertionClient, relay: ReturnRelay, view: Arc<dyn LoginView>) -> Self {
        Self {
            client,
            relay,
            view,
            state: Mutex::new(LifecycleState::Idle),
            widget: Mutex::new(None),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_widget(&self) -> MutexGuard<'_, Option<Arc<dyn AuthWidget>>> {
        self.widget.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move from a non-terminal state to `target`. Fails if the session
    /// already settled.
    fn claim(&self, target: LifecycleState) -> bool {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return false;
        }
        *state = target;
        true
    }

    /// Move from exactly `from` to `to`.
    fn advance(&self, from: LifecycleState, to: LifecycleState) -> bool {
        let mut state = self.lock_state();
        if *state != from {
            debug!(state = ?*state, target = ?to, "Transition ignored");
            return false;
        }
        *state = to;
        true
    }

    fn widget_session(&self) -> BridgeResult<WidgetSession> {
        let config = self.client.config();
        Ok(WidgetSession {
            session_ptr: config.session_pointer()?,
            result_url: config.result_jwt_url()?,
            language: config.language().to_string(),
        })
    }

    /// Run the widget and relay whatever it produced.
    ///
    /// Returns `None` when the attempt was superseded by an abort or the
    /// lifecycle already left `Idle`.
    pub async fn start(&self, widget: Arc<dyn AuthWidget>) -> BridgeResult<Option<ReturnAttempt>> {
        if !self.advance(LifecycleState::Idle, LifecycleState::Starting) {
            return Ok(None);
        }

        let session = match self.widget_session() {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Cannot start widget");
                return self.handle_error().await;
            }
        };

        {
            // Registered under the state lock so a concurrent abort either
            // sees the widget or has already settled the session.
            let state = self.lock_state();
            if *state != LifecycleState::Starting {
                debug!(state = ?*state, "Session settled before the widget started");
                return Ok(None);
            }
            *self.lock_widget() = Some(Arc::clone(&widget));
        }

        info!(session_ptr = %session.session_ptr.u, "Starting widget");
        let outcome = widget.start(&session).await;
        self.lock_widget().take();

        match outcome {
            SessionOutcome::Completed(token) => {
                if !self.advance(LifecycleState::Starting, LifecycleState::Succeeded) {
                    info!(state = ?self.state(), "Session settled elsewhere, dropping result");
                    return Ok(None);
                }
                match self.client.exchange_success(&token).await {
                    Ok(assertion) => Ok(Some(self.relay.relay(&assertion))),
                    Err(e) => {
                        warn!(error = %e, "Success assertion failed, falling back to error assertion");
                        *self.lock_state() = LifecycleState::Erroring;
                        self.return_with_error().await
                    }
                }
            }
            SessionOutcome::Failed(reason) => {
                warn!(error = %BridgeError::Widget(reason), "Widget failed");
                self.handle_error().await
            }
            SessionOutcome::Aborted => {
                debug!("Widget reported abort");
                self.abort().await
            }
        }
    }

    /// Run `start` until `interrupt` resolves, then abort.
    ///
    /// A sequence that already claimed the session when the interrupt
    /// arrives is run to completion instead of being dropped.
    pub async fn run(
        &self,
        widget: Arc<dyn AuthWidget>,
        interrupt: impl Future<Output = ()>,
    ) -> BridgeResult<Option<ReturnAttempt>> {
        let start = self.start(widget);
        tokio::pin!(start);

        tokio::select! {
            result = &mut start => result,
            _ = interrupt => {
                info!("Interrupted, aborting session");
                match self.abort().await {
                    Ok(None) => {
                        info!(state = ?self.state(), "Return already under way, waiting for it");
                        start.await
                    }
                    other => other,
                }
            }
        }
    }

    /// Return the user with an error assertion.
    ///
    /// Used after a widget failure and for pages the server already flagged
    /// as failed. Failures are surfaced after `on_returning_failed`.
    pub async fn handle_error(&self) -> BridgeResult<Option<ReturnAttempt>> {
        if !self.claim(LifecycleState::Erroring) {
            debug!(state = ?self.state(), "Error handling ignored");
            return Ok(None);
        }

        self.return_with_error().await
    }

    async fn return_with_error(&self) -> BridgeResult<Option<ReturnAttempt>> {
        self.view.on_error();
        let result = self.client.exchange_error().await;
        self.relay_or_fail(result)
    }

    /// Return the user with a cancellation assertion. No-op once the session
    /// settled.
    pub async fn abort(&self) -> BridgeResult<Option<ReturnAttempt>> {
        if !self.claim(LifecycleState::Aborting) {
            debug!(state = ?self.state(), "Abort ignored");
            return Ok(None);
        }

        let widget = self.lock_widget().take();
        if let Some(widget) = widget {
            widget.abort();
        }

        self.view.on_error();
        let result = self.client.exchange_abort().await;
        self.relay_or_fail(result)
    }

    fn relay_or_fail(&self, result: BridgeResult<Assertion>) -> BridgeResult<Option<ReturnAttempt>> {
        match result {
            Ok(assertion) => Ok(Some(self.relay.relay(&assertion))),
            Err(e) => {
                self.view.on_returning_failed();
                Err(e)
            }
        }
    }
}
