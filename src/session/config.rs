//! Per-attempt session configuration.

use super::pointer::{SessionData, SessionPointer};
use crate::error::{BridgeError, BridgeResult};

/// Default language when the page does not specify one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Everything one authentication attempt needs to know.
///
/// Built once from the page parameters and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    server: String,
    session: Option<SessionData>,
    assert_url: String,
    error_assert_url: String,
    assert_parameters: String,
    language: String,
}

impl SessionConfig {
    /// Create a configuration without session data.
    ///
    /// Pages flagged with a server-side error carry no session, only the
    /// endpoints needed for the error assertion.
    pub fn new(
        server: impl Into<String>,
        assert_url: impl Into<String>,
        error_assert_url: impl Into<String>,
        assert_parameters: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            session: None,
            assert_url: assert_url.into(),
            error_assert_url: error_assert_url.into(),
            assert_parameters: assert_parameters.into(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Attach the raw `SESSION_DATA` JSON.
    pub fn with_session_data(mut self, raw: &str) -> BridgeResult<Self> {
        self.session = Some(SessionData::parse(raw)?);
        Ok(self)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Validate the endpoint configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.is_empty() {
            return Err("server origin is required".to_string());
        }
        if self.assert_url.is_empty() {
            return Err("assert url is required".to_string());
        }
        if self.error_assert_url.is_empty() {
            return Err("error assert url is required".to_string());
        }
        Ok(())
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn assert_url(&self) -> &str {
        &self.assert_url
    }

    pub fn error_assert_url(&self) -> &str {
        &self.error_assert_url
    }

    /// Endpoint for the assertion issued when the user cancelled.
    pub fn abort_url(&self) -> String {
        format!("{}/abort", self.error_assert_url.trim_end_matches('/'))
    }

    /// Opaque signed parameters, forwarded verbatim to every assert call.
    pub fn assert_parameters(&self) -> &str {
        &self.assert_parameters
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn session(&self) -> BridgeResult<&SessionData> {
        self.session
            .as_ref()
            .ok_or_else(|| BridgeError::Configuration("No session data available".to_string()))
    }

    /// Session pointer rewritten to point at our own server.
    pub fn session_pointer(&self) -> BridgeResult<SessionPointer> {
        self.session()?.session_ptr.rewritten(&self.server)
    }

    /// URL the signed session result can be fetched from.
    pub fn result_jwt_url(&self) -> BridgeResult<String> {
        Ok(format!(
            "{}/session/{}/result-jwt",
            self.server.trim_end_matches('/'),
            self.session()?.token
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        SessionConfig::new(
            "https://bridge.example.com/irma",
            "https://bridge.example.com/assert",
            "https://bridge.example.com/errorassert",
            "signed-parameters",
        )
    }

    #[test]
    fn test_abort_url() {
        assert_eq!(
            test_config().abort_url(),
            "https://bridge.example.com/errorassert/abort"
        );
    }

    #[test]
    fn test_validation() {
        assert!(test_config().validate().is_ok());
        let config = SessionConfig::new("", "a", "b", "p");
        assert!(config.validate().is_err());
        let config = SessionConfig::new("s", "a", "", "p");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_without_session_data() {
        let config = test_config();
        assert_eq!(config.language(), DEFAULT_LANGUAGE);
        assert!(matches!(
            config.session_pointer(),
            Err(BridgeError::Configuration(_))
        ));
        assert!(config.result_jwt_url().is_err());
    }

    #[test]
    fn test_with_session_data() {
        let config = test_config()
            .with_session_data(
                r#"{"sessionPtr": {"u": "http://irma:8088/irma/session/S9", "irmaqr": "disclosing"}, "token": "tok"}"#,
            )
            .unwrap()
            .with_language("nl");

        assert_eq!(config.language(), "nl");
        assert_eq!(
            config.session_pointer().unwrap().u,
            "https://bridge.example.com/irma/irma/session/S9"
        );
        assert_eq!(
            config.result_jwt_url().unwrap(),
            "https://bridge.example.com/irma/session/tok/result-jwt"
        );
    }
}
