//! Session creation against the external execution engine
//!
//! The matchmaking engine only knows the `SessionCreator` capability; the
//! HTTP client here is the production transport.

pub mod creator;
pub mod http;

pub use creator::{RecordingSessionCreator, SessionCreator};
pub use http::{HttpSessionCreator, HttpSessionCreatorConfig};
