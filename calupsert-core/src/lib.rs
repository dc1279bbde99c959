//! Core pieces of the calupsert tools.
//!
//! This crate holds everything that does not depend on a particular calendar
//! service:
//! - `event_request`: validation and timezone handling of event fields
//! - `session` and `token_cache`: cached, refreshed or interactive OAuth credentials
//! - `upsert`: create-or-update dispatch over the `CalendarProvider` trait
//!
//! The `calupsert-google` and `calupsert-outlook` crates implement the trait
//! and the OAuth flows for their services.

pub mod cli;
pub mod error;
pub mod event_request;
pub mod http;
pub mod logging;
pub mod loopback;
pub mod oauth;
pub mod provider;
pub mod session;
pub mod settings;
pub mod timezone;
pub mod token_cache;
pub mod upsert;

pub use error::{CalError, CalResult};
pub use event_request::{EventRequest, NormalizedEvent, ZonedDateTime};
pub use provider::{CalendarProvider, CalendarTarget, RemoteEvent};
pub use session::{Authenticator, SessionManager};
pub use token_cache::{Credential, TokenCache};
pub use upsert::{UpsertKind, UpsertResult};
