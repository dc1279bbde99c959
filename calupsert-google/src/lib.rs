//! Google Calendar support for calupsert.
//!
//! `gcal-upsert` signs the user in with the installed-app OAuth flow and
//! creates or patches a single event through the Calendar API v3.

pub mod auth;
pub mod calendar;
pub mod client_secrets;
pub mod to_google;

pub use auth::GoogleAuthenticator;
pub use calendar::GoogleCalendar;
pub use client_secrets::ClientSecrets;

/// Default token cache file name under the calupsert config directory.
pub const TOKEN_FILE_NAME: &str = "google_token.json";
