//! Presentation hooks and render state of the login page.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Hooks the session lifecycle calls into the presentation layer.
pub trait LoginView: Send + Sync {
    /// The login failed and the error screen should show.
    fn on_error(&self);

    /// Returning to the service failed as well.
    fn on_returning_failed(&self);
}

/// Translation keys of the messages on the error screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    LoginUnsuccessful,
    Error,
    ErrorReturningFailed,
    ErrorPersists,
}

impl MessageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::LoginUnsuccessful => "loginUnsuccessful",
            MessageKey::Error => "error",
            MessageKey::ErrorReturningFailed => "errorReturningFailed",
            MessageKey::ErrorPersists => "errorPersists",
        }
    }
}

/// What the page currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// The widget is in control.
    Widget,
    /// Generic "login unsuccessful" screen.
    Error {
        header: MessageKey,
        message: MessageKey,
        /// Only shown when returning to the service failed.
        support: Option<(MessageKey, String)>,
    },
}

/// Render state of the login page.
pub struct LoginState {
    has_error: AtomicBool,
    returning_failed: AtomicBool,
    support_contact: String,
}

impl LoginState {
    /// `has_error` is set when the server already flagged an error.
    pub fn new(has_error: bool, support_contact: impl Into<String>) -> Self {
        Self {
            has_error: AtomicBool::new(has_error),
            returning_failed: AtomicBool::new(false),
            support_contact: support_contact.into(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn returning_failed(&self) -> bool {
        self.returning_failed.load(Ordering::SeqCst)
    }

    pub fn screen(&self) -> Screen {
        let returning_failed = self.returning_failed();
        if !self.has_error() && !returning_failed {
            return Screen::Widget;
        }

        Screen::Error {
            header: MessageKey::LoginUnsuccessful,
            message: if returning_failed {
                MessageKey::ErrorReturningFailed
            } else {
                MessageKey::Error
            },
            support: returning_failed
                .then(|| (MessageKey::ErrorPersists, self.support_contact.clone())),
        }
    }
}

impl LoginView for LoginState {
    fn on_error(&self) {
        if !self.has_error.swap(true, Ordering::SeqCst) {
            info!(key = MessageKey::Error.as_str(), "Showing error screen");
        }
    }

    fn on_returning_failed(&self) {
        if !self.returning_failed.swap(true, Ordering::SeqCst) {
            warn!(
                key = MessageKey::ErrorReturningFailed.as_str(),
                support = %self.support_contact,
                "Returning to service failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_screen() {
        let state = LoginState::new(false, "support@yivi.app");
        assert_eq!(state.screen(), Screen::Widget);

        let state = LoginState::new(true, "support@yivi.app");
        assert_eq!(
            state.screen(),
            Screen::Error {
                header: MessageKey::LoginUnsuccessful,
                message: MessageKey::Error,
                support: None,
            }
        );
    }

    #[test]
    fn test_returning_failed_shows_support_contact() {
        let state = LoginState::new(false, "support@yivi.app");
        state.on_error();
        state.on_returning_failed();

        match state.screen() {
            Screen::Error {
                message, support, ..
            } => {
                assert_eq!(message, MessageKey::ErrorReturningFailed);
                assert_eq!(
                    support,
                    Some((MessageKey::ErrorPersists, "support@yivi.app".to_string()))
                );
            }
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    #[test]
    fn test_returning_failed_without_error() {
        // fallback timer after a successful exchange
        let state = LoginState::new(false, "help@example.com");
        state.on_returning_failed();
        assert!(!state.has_error());
        assert!(matches!(
            state.screen(),
            Screen::Error {
                message: MessageKey::ErrorReturningFailed,
                ..
            }
        ));
        assert_eq!(MessageKey::ErrorReturningFailed.as_str(), "errorReturningFailed");
    }
}
