//! Assertion exchange with the bridge backend.
//!
//! Trades a disclosure token, or the error/abort context, for a SAML
//! assertion addressed to the relying party.

pub mod exchange;
pub mod transport;

pub use exchange::{Assertion, AssertionClient};
pub use transport::post_json;
