//! Delivery of a validated assertion to the relying party.
//!
//! Relaying schedules two independent tasks at the same instant: the delayed
//! form submission and the fallback check. A submission that makes the user
//! leave the page disarms the fallback; otherwise the fallback marks the
//! return as failed once its timeout expires.

use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::config::RelayConfig;
use super::form::ReturnForm;
use super::navigator::Navigator;
use crate::assertion::Assertion;
use crate::error::{BridgeError, BridgeResult};
use crate::view::LoginView;

/// Relays assertions by submitting return forms.
pub struct ReturnRelay {
    navigator: Arc<dyn Navigator>,
    view: Arc<dyn LoginView>,
    config: RelayConfig,
}

impl ReturnRelay {
    pub fn new(navigator: Arc<dyn Navigator>, view: Arc<dyn LoginView>, config: RelayConfig) -> Self {
        Self {
            navigator,
            view,
            config,
        }
    }

    /// Submit the return form after the grace period and arm the fallback.
    ///
    /// Must be called from within a tokio runtime.
    pub fn relay(&self, assertion: &Assertion) -> ReturnAttempt {
        let form = ReturnForm::from_assertion(assertion);
        let now = Instant::now();
        let submit_at = now + self.config.submit_delay();
        let fallback_at = now + self.config.fallback_timeout();

        let (navigated_tx, navigated_rx) = oneshot::channel::<()>();

        let submit_task = {
            let navigator = Arc::clone(&self.navigator);
            let form = form.clone();
            tokio::spawn(async move {
                sleep_until(submit_at).await;
                debug!(service_url = %form.action, "Submitting return form");
                match navigator.submit(&form).await {
                    Ok(()) => {
                        let _ = navigated_tx.send(());
                    }
                    Err(e) => {
                        // Fallback stays armed and reports the failure.
                        warn!(error = %e, service_url = %form.action, "Return form submission failed");
                    }
                }
            })
        };

        let fallback_task = {
            let view = Arc::clone(&self.view);
            tokio::spawn(async move {
                tokio::select! {
                    Ok(()) = navigated_rx => {
                        debug!("Left the login page, fallback disarmed");
                        Ok(())
                    }
                    _ = sleep_until(fallback_at) => {
                        view.on_returning_failed();
                        Err(BridgeError::ReturnTimeout)
                    }
                }
            })
        };

        info!(
            service_url = %form.action,
            relay_state = form.field(super::form::RELAY_STATE_FIELD).is_some(),
            "Return scheduled"
        );

        ReturnAttempt {
            form,
            submit_task,
            fallback_task,
        }
    }
}

/// One armed return to the relying party.
pub struct ReturnAttempt {
    form: ReturnForm,
    submit_task: JoinHandle<()>,
    fallback_task: JoinHandle<BridgeResult<()>>,
}

impl ReturnAttempt {
    /// The form being submitted.
    pub fn form(&self) -> &ReturnForm {
        &self.form
    }

    /// Tear down both timers, as leaving the page would.
    pub fn cancel(&self) {
        self.submit_task.abort();
        self.fallback_task.abort();
    }

    /// Wait until the attempt settles.
    ///
    /// `Ok` once the user left the page (or the attempt was cancelled),
    /// `ReturnTimeout` when the fallback fired.
    pub async fn outcome(self) -> BridgeResult<()> {
        match self.fallback_task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                warn!(error = %e, "Return fallback task failed");
                Ok(())
            }
        }
    }
}
