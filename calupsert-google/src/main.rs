//! gcal-upsert: create or update a Google Calendar event.
//!
//! Prints `OK event_id=<id>` (and `htmlLink=<url>`) on stdout. Everything
//! else, including the consent URL, goes to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use calupsert_core::cli::{EventArgs, run_interruptible};
use calupsert_core::error::CalError;
use calupsert_core::session::SessionManager;
use calupsert_core::settings::{Settings, expand_path};
use calupsert_core::token_cache::TokenCache;
use calupsert_core::{CalendarProvider, http, logging, upsert};
use calupsert_google::{ClientSecrets, GoogleAuthenticator, GoogleCalendar, TOKEN_FILE_NAME};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "gcal-upsert", version)]
#[command(about = "Create or update a Google Calendar event (delegated OAuth)")]
struct Cli {
    /// OAuth client secrets JSON downloaded from Google Cloud Console
    #[arg(long, value_name = "PATH")]
    client_secrets: Option<PathBuf>,

    #[command(flatten)]
    event: EventArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.event.verbose);

    match run_interruptible(|cancel| run(cli, cancel)) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<String> {
    let settings = Settings::load("google", cli.event.config.as_deref())
        .context("Failed to load settings")?;
    let request = cli.event.to_request(&settings);

    // Bad event input must fail before any sign-in happens.
    request.normalize()?;

    let secrets_path = cli
        .client_secrets
        .or_else(|| settings.client_secrets.clone())
        .ok_or_else(|| {
            CalError::Validation(
                "--client-secrets is required (path to the OAuth client JSON from Google Cloud Console)"
                    .into(),
            )
        })?;
    let secrets = ClientSecrets::load(&expand_path(&secrets_path))?;

    let token_path = settings.token_path(cli.event.token_file.as_deref(), TOKEN_FILE_NAME)?;
    tracing::debug!(path = %token_path.display(), "token cache");

    let http = http::client(settings.http_timeout())?;
    let sessions = SessionManager::new(
        TokenCache::new(token_path),
        GoogleAuthenticator::new(http.clone(), secrets),
        settings.auth_timeout(),
    );
    let calendar = GoogleCalendar::new(http)?;

    let result = upsert::execute(&calendar, &sessions, &request, &cancel)
        .await
        .context("Google Calendar upsert failed")?;

    Ok(result.render(calendar.link_label()))
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CalError>().map_or(1, CalError::exit_code)
}
