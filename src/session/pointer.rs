//! Session data handed over by the page, and rewriting of the session pointer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{BridgeError, BridgeResult};

/// Path segment that identifies a session on the IRMA server.
pub const SESSION_PATH_SEGMENT: &str = "irma/session/";

static SESSION_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"irma/session/([^/]+)$").expect("SESSION_ID_PATTERN is a valid regex pattern")
});

/// Session pointer as rendered in the QR code.
///
/// Only `u` is interpreted; everything else (`irmaqr`, ...) belongs to the
/// widget and is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPointer {
    /// URL the app contacts to join the session.
    pub u: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionPointer {
    /// Return a copy of this pointer whose URL points at `server`.
    pub fn rewritten(&self, server: &str) -> BridgeResult<Self> {
        Ok(Self {
            u: rewrite_session_url(&self.u, server)?,
            extra: self.extra.clone(),
        })
    }
}

/// The `SESSION_DATA` blob the bridge backend embeds in the login page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub session_ptr: SessionPointer,

    /// Requestor token used to fetch the session result.
    pub token: String,
}

impl SessionData {
    /// Parse the JSON string as found on the page.
    pub fn parse(raw: &str) -> BridgeResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BridgeError::Configuration(format!("Malformed session data: {}", e)))
    }
}

/// Extract the session id from a pointer URL of the form `.../irma/session/<id>`.
pub fn session_id(raw_url: &str) -> BridgeResult<&str> {
    SESSION_ID_PATTERN
        .captures(raw_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            BridgeError::Configuration(format!(
                "Session pointer does not contain {}<id>: {}",
                SESSION_PATH_SEGMENT, raw_url
            ))
        })
}

/// Rewrite a session pointer URL so the app talks to our own host.
pub fn rewrite_session_url(raw_url: &str, server: &str) -> BridgeResult<String> {
    let id = session_id(raw_url)?;
    Ok(format!(
        "{}/{}{}",
        server.trim_end_matches('/'),
        SESSION_PATH_SEGMENT,
        id
    ))
}
