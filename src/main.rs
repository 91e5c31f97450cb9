//! IRMA SAML Relay
//!
//! Headless client for the IRMA/Yivi SAML bridge. It runs one disclosure
//! session, exchanges its result (or the error/abort context) for a SAML
//! assertion and returns the user to the relying party with it.

mod assertion;
mod error;
mod relay;
mod report;
mod session;
mod view;

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use assertion::AssertionClient;
use relay::{HtmlNavigator, HttpNavigator, Navigator, RelayConfig, ReturnRelay};
use report::ErrorReporter;
use session::{ResultJwtWidget, SessionConfig, SessionLifecycle};
use view::LoginState;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "irma-saml-relay")]
#[command(about = "Relays IRMA disclosure results as SAML assertions")]
struct Args {
    /// Origin of the IRMA server as seen by the app
    #[arg(long, env = "IRMA_SERVER")]
    server: String,

    /// Endpoint exchanging a disclosure result for an assertion
    #[arg(long, env = "ASSERT_URL")]
    assert_url: String,

    /// Endpoint issuing error assertions (`/abort` is appended for cancels)
    #[arg(long, env = "ERROR_ASSERT_URL")]
    error_assert_url: String,

    /// Session data JSON as embedded in the login page
    #[arg(long, env = "SESSION_DATA")]
    session_data: Option<String>,

    /// Signed assertion parameters, forwarded verbatim
    #[arg(long, env = "ASSERT_PARAMETERS")]
    assert_parameters: String,

    /// Error telemetry endpoint
    #[arg(long, env = "ERROR_URL")]
    error_url: String,

    /// Language tag passed to the widget
    #[arg(long, default_value = "en", env = "LANGUAGE")]
    language: String,

    /// Error flagged by the server before the session started
    #[arg(long, env = "ERROR")]
    error: Option<String>,

    /// Relay configuration file (JSON)
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Write the auto-posting return page here instead of posting it
    #[arg(long, env = "FORM_OUTPUT")]
    form_output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, env = "RELAY_VERBOSE")]
    verbose: bool,
}

/// Forward every line on stdin as an "app finished" confirmation.
fn spawn_confirmation_reader() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .json()
        .init();

    info!("Starting IRMA SAML relay");

    let relay_config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    let http_client = relay_config.http_client()?;
    let reporter = ErrorReporter::new(http_client.clone(), args.error_url.clone());

    let has_error = args.error.as_deref().is_some_and(|e| !e.is_empty());
    if has_error {
        warn!(error = ?args.error, "Server flagged an error, skipping the session");
    }

    let base_config = SessionConfig::new(
        args.server.clone(),
        args.assert_url.clone(),
        args.error_assert_url.clone(),
        args.assert_parameters.clone(),
    )
    .with_language(args.language.clone());
    base_config.validate().map_err(|e| anyhow!(e))?;

    let session_config = match args.session_data.as_deref() {
        Some(raw) if !has_error => match base_config.clone().with_session_data(raw) {
            Ok(config) => config,
            Err(e) => {
                // Still return the user; the lifecycle falls back to the error assertion.
                error!(error = %e, "Unusable session data");
                if let Err(report_err) = reporter.report_failure(&e, "session").await {
                    warn!(error = %report_err, "Failed to report error");
                }
                base_config
            }
        },
        _ => base_config,
    };

    info!(
        server = %session_config.server(),
        language = %session_config.language(),
        has_error,
        submit_delay_ms = relay_config.submit_delay_ms,
        fallback_timeout_ms = relay_config.fallback_timeout_ms,
        "Configuration loaded"
    );

    let view = Arc::new(LoginState::new(has_error, relay_config.support_contact.clone()));
    let navigator: Arc<dyn Navigator> = match args.form_output {
        Some(path) => Arc::new(HtmlNavigator::new(path)),
        None => Arc::new(HttpNavigator::new(http_client.clone())),
    };
    let relay = ReturnRelay::new(navigator, view.clone(), relay_config);
    let lifecycle = SessionLifecycle::new(
        AssertionClient::new(http_client.clone(), session_config),
        relay,
        view.clone(),
    );

    let run = if has_error {
        lifecycle.handle_error().await
    } else {
        info!("Press Enter once the app reports a successful disclosure");
        let widget = Arc::new(ResultJwtWidget::new(
            http_client.clone(),
            spawn_confirmation_reader(),
        ));
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        lifecycle.run(widget, interrupted).await
    };

    let outcome = match run {
        Ok(Some(attempt)) => {
            info!(service_url = %attempt.form().action, "Waiting for the return to complete");
            attempt.outcome().await
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };

    info!(
        screen = ?view.screen(),
        state = ?lifecycle.state(),
        reported = reporter.has_reported(),
        "Session finished"
    );

    if let Err(e) = outcome {
        error!(error = %e, "Login could not be completed");
        if let Err(report_err) = reporter.report_failure(&e, "relay").await {
            warn!(error = %report_err, "Failed to report error");
        }
        return Err(e.into());
    }

    Ok(())
}
