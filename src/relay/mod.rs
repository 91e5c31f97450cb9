//! Return to the relying party.
//!
//! Builds the auto-posting SAML form, submits it through a [`Navigator`] and
//! watches for the return silently failing.

pub mod attempt;
pub mod config;
pub mod form;
pub mod navigator;

pub use attempt::{ReturnAttempt, ReturnRelay};
pub use config::RelayConfig;
pub use navigator::{HtmlNavigator, HttpNavigator, Navigator};
