//! Authentication session handling.
//!
//! This module owns the per-attempt configuration, the rewriting of the
//! session pointer, the widget boundary and the lifecycle that turns the
//! widget's outcome into a relayed assertion.

pub mod config;
pub mod lifecycle;
pub mod pointer;
pub mod widget;

pub use config::SessionConfig;
pub use lifecycle::SessionLifecycle;
pub use widget::ResultJwtWidget;
