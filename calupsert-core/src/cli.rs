//! Command-line pieces shared by `gcal-upsert` and `graph-upsert`.

use std::future::Future;
use std::path::PathBuf;

use clap::{ArgAction, Args};
use tokio_util::sync::CancellationToken;

use crate::error::CalError;
use crate::event_request::EventRequest;
use crate::settings::Settings;

/// Event fields and common options, flattened into each binary's parser.
#[derive(Debug, Clone, Default, Args)]
pub struct EventArgs {
    /// Event title
    #[arg(long)]
    pub title: Option<String>,

    /// Same as --title
    #[arg(long, value_name = "TITLE")]
    pub subject: Option<String>,

    /// Same as --title
    #[arg(long, value_name = "TITLE")]
    pub summary: Option<String>,

    /// Event description (plain text)
    #[arg(long)]
    pub description: Option<String>,

    /// Same as --description
    #[arg(long, value_name = "DESCRIPTION")]
    pub body: Option<String>,

    /// Start as local time, e.g. 2025-10-17T09:00:00
    #[arg(long)]
    pub start: Option<String>,

    /// End as local time, e.g. 2025-10-17T09:30:00
    #[arg(long)]
    pub end: Option<String>,

    /// IANA timezone, e.g. Europe/Rome (defaults to the system zone)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Where the event takes place
    #[arg(long)]
    pub location: Option<String>,

    /// Update this event instead of creating a new one
    #[arg(long)]
    pub event_id: Option<String>,

    /// Target calendar (defaults to the primary calendar)
    #[arg(long)]
    pub calendar_id: Option<String>,

    /// Where to cache OAuth tokens
    #[arg(long, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Settings file (defaults to <config dir>/calupsert/<provider>.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl EventArgs {
    /// Resolve aliases and fill gaps from settings.
    pub fn to_request(&self, settings: &Settings) -> EventRequest {
        EventRequest {
            title: first_present([&self.title, &self.subject, &self.summary]),
            description: first_present([&self.description, &self.body]),
            start: self.start.clone(),
            end: self.end.clone(),
            timezone: first_present([&self.timezone, &settings.timezone]),
            location: self.location.clone(),
            event_id: self.event_id.clone(),
            calendar_id: first_present([&self.calendar_id, &settings.calendar_id]),
        }
    }
}

fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .cloned()
}

/// Drive `operation` on a current-thread runtime, cancelling it on Ctrl-C.
pub fn run_interruptible<T, E, F, Fut>(operation: F) -> Result<T, E>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<CalError>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| E::from(CalError::Io(e)))?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();

        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("received Ctrl-C");
                watcher.cancel();
            }
        });

        tokio::select! {
            outcome = operation(cancel.clone()) => outcome,
            _ = cancel.cancelled() => Err(E::from(CalError::Cancelled)),
        }
    })
}
