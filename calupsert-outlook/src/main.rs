//! graph-upsert: create or update an Outlook calendar event through Microsoft Graph.
//!
//! Prints `OK event_id=<id>` (and `webLink=<url>`) on stdout. Sign-in
//! instructions and logs go to stderr.

use std::process::ExitCode;

use anyhow::{Context, Result};
use calupsert_core::cli::{EventArgs, run_interruptible};
use calupsert_core::error::CalError;
use calupsert_core::session::SessionManager;
use calupsert_core::settings::Settings;
use calupsert_core::token_cache::TokenCache;
use calupsert_core::{CalendarProvider, http, logging, upsert};
use calupsert_outlook::{Authority, GraphAuthenticator, GraphCalendar, TOKEN_FILE_NAME};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "graph-upsert", version)]
#[command(about = "Create or update a Microsoft Graph calendar event (delegated)")]
struct Cli {
    /// Azure AD tenant ID (GUID) or domain name
    #[arg(long)]
    tenant_id: Option<String>,

    /// Azure AD application (client) ID
    #[arg(long)]
    client_id: Option<String>,

    /// Use the confidential authorization-code flow with this secret
    #[arg(long)]
    client_secret: Option<String>,

    /// Redirect URI for the authorization-code flow (e.g. http://localhost:8400/callback)
    #[arg(long)]
    redirect_uri: Option<String>,

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
    let settings = Settings::load("graph", cli.event.config.as_deref())
        .context("Failed to load settings")?;
    let request = cli.event.to_request(&settings);

    // Bad event input must fail before any sign-in happens.
    request.normalize()?;

    let tenant_id = required(cli.tenant_id, &settings.tenant_id, "--tenant-id")?;
    let client_id = required(cli.client_id, &settings.client_id, "--client-id")?;
    let client_secret = cli.client_secret.or_else(|| settings.client_secret.clone());
    let redirect_uri = cli.redirect_uri.or_else(|| settings.redirect_uri.clone());

    let token_path = settings.token_path(cli.event.token_file.as_deref(), TOKEN_FILE_NAME)?;
    tracing::debug!(path = %token_path.display(), "token cache");

    let http = http::client(settings.http_timeout())?;
    let authenticator = GraphAuthenticator::new(
        http.clone(),
        Authority::new(&tenant_id)?,
        &client_id,
        client_secret,
        redirect_uri,
    );
    tracing::debug!(method = ?authenticator.method(), "sign-in method");

    let sessions = SessionManager::new(
        TokenCache::new(token_path),
        authenticator,
        settings.auth_timeout(),
    );
    let calendar = GraphCalendar::new(http)?;

    let result = upsert::execute(&calendar, &sessions, &request, &cancel)
        .await
        .context("Microsoft Graph upsert failed")?;

    Ok(result.render(calendar.link_label()))
}

fn required(flag: Option<String>, setting: &Option<String>, name: &str) -> Result<String, CalError> {
    flag.or_else(|| setting.clone())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CalError::Validation(format!("{} is required", name)))
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CalError>().map_or(1, CalError::exit_code)
}
