//! Form submission capability.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use super::form::ReturnForm;

/// Submits a return form on behalf of the user.
///
/// `Ok` means the user has left the login page; the relay uses that to
/// disarm its fallback timer.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn submit(&self, form: &ReturnForm) -> Result<()>;
}

/// Posts the form straight to the relying party.
pub struct HttpNavigator {
    http_client: reqwest::Client,
}

impl HttpNavigator {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn submit(&self, form: &ReturnForm) -> Result<()> {
        let body = form.encoded_body().context("Failed to encode return form")?;

        let response = self
            .http_client
            .post(&form.action)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to post return form to {}", form.action))?;

        // Like a browser, any answer from the relying party means we left.
        info!(
            service_url = %form.action,
            status = response.status().as_u16(),
            "Returned to service"
        );
        Ok(())
    }
}

/// Hands the auto-posting page to a real browser by writing it to disk.
pub struct HtmlNavigator {
    path: PathBuf,
}

impl HtmlNavigator {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Navigator for HtmlNavigator {
    async fn submit(&self, form: &ReturnForm) -> Result<()> {
        tokio::fs::write(&self.path, form.to_html())
            .await
            .with_context(|| format!("Failed to write return form: {:?}", self.path))?;
        debug!(path = ?self.path, "Return form written");
        Ok(())
    }
}
