//! Microsoft Outlook calendar support for calupsert, via Microsoft Graph.
//!
//! Sign-in uses the device code flow by default, or the confidential
//! authorization-code flow when a client secret and redirect URI are set.

pub mod auth;
pub mod auth_code;
pub mod device_code;
pub mod graph;
pub mod identity;
pub mod to_graph;

pub use auth::{GraphAuthenticator, SignInMethod};
pub use graph::GraphCalendar;
pub use identity::Authority;

/// Default token cache file name under the calupsert config directory.
pub const TOKEN_FILE_NAME: &str = "graph_token.json";
