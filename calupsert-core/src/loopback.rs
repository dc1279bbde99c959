//! Loopback redirect listener for browser-based OAuth flows.
//!
//! The consent page redirects to `http://127.0.0.1:<port>/...?code=..&state=..`;
//! we accept connections until that request shows up, answer the browser
//! with a short page, and hand the authorization code back.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use url::Url;

use crate::error::{CalError, CalResult};

const SUCCESS_PAGE: &str = "<html><body>\
    <h1>Authentication successful!</h1>\
    <p>You can close this window and return to the terminal.</p>\
    </body></html>";

const FAILURE_PAGE: &str = "<html><body>\
    <h1>Authentication failed</h1>\
    <p>Return to the terminal for details.</p>\
    </body></html>";

/// Port used when a configured redirect URI does not name one.
pub const DEFAULT_REDIRECT_PORT: u16 = 8400;

/// How long a single connection may take to send its request line and headers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
    callback_path: String,
}

impl LoopbackListener {
    /// Bind an OS-assigned port on 127.0.0.1.
    pub async fn bind_ephemeral() -> CalResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| CalError::Authentication(format!("Failed to bind OAuth callback listener: {}", e)))?;
        let port = listener.local_addr()?.port();

        Ok(LoopbackListener {
            listener,
            redirect_uri: format!("http://127.0.0.1:{}/", port),
            callback_path: "/".to_string(),
        })
    }

    /// Bind the host and port named by a registered redirect URI.
    pub async fn bind_redirect_uri(redirect_uri: &str) -> CalResult<Self> {
        let url = Url::parse(redirect_uri).map_err(|e| {
            CalError::Validation(format!("Invalid redirect URI '{}': {}", redirect_uri, e))
        })?;
        let host = url.host_str().unwrap_or("localhost");
        let port = url.port().unwrap_or(DEFAULT_REDIRECT_PORT);

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            CalError::Authentication(format!("Failed to bind {}:{} for OAuth callback: {}", host, port, e))
        })?;

        Ok(LoopbackListener {
            listener,
            redirect_uri: redirect_uri.to_string(),
            callback_path: url.path().to_string(),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the redirect carrying `code`, checking `state` against ours.
    ///
    /// Each connection is served on its own task, so an idle or broken
    /// connection cannot hold up the real callback.
    pub async fn wait_for_code(&self, expected_state: &str) -> CalResult<String> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    tracing::debug!(%peer, "OAuth callback connection");

                    let callback_path = self.callback_path.clone();
                    let expected_state = expected_state.to_string();
                    connections.spawn(async move {
                        let served = handle_connection(stream, &callback_path, &expected_state);
                        match tokio::time::timeout(REQUEST_TIMEOUT, served).await {
                            Ok(result) => result,
                            Err(_) => Err(CalError::Authentication("no request received".into())),
                        }
                    });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    match joined {
                        Ok(Ok(Some(outcome))) => return outcome,
                        Ok(Ok(None)) => {}
                        Ok(Err(e)) => tracing::debug!(error = %e, "dropping callback connection"),
                        Err(e) => tracing::debug!(error = %e, "callback connection task failed"),
                    }
                }
            }
        }
    }
}

/// `None` means the request was unrelated (e.g. favicon) and we keep waiting.
async fn handle_connection(
    stream: TcpStream,
    callback_path: &str,
    expected_state: &str,
) -> CalResult<Option<CalResult<String>>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Consume the headers so closing the socket doesn't reset the connection.
    let mut header = String::new();
    loop {
        header.clear();
        let n = reader.read_line(&mut header).await?;
        if n == 0 || header.trim().is_empty() {
            break;
        }
    }

    // Request line looks like: GET /callback?code=xxx&state=yyy HTTP/1.1
    let Some(target) = request_line.split_whitespace().nth(1) else {
        respond(reader.into_inner(), "400 Bad Request", "").await?;
        return Ok(None);
    };

    let url = match Url::parse(&format!("http://localhost{}", target)) {
        Ok(url) => url,
        Err(_) => {
            respond(reader.into_inner(), "400 Bad Request", "").await?;
            return Ok(None);
        }
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    let code = param("code");
    let error = param("error");

    if url.path() != callback_path || (code.is_none() && error.is_none()) {
        respond(reader.into_inner(), "404 Not Found", "").await?;
        return Ok(None);
    }

    let outcome = if let Some(error) = error {
        let detail = param("error_description")
            .map(|d| format!("{}: {}", error, d))
            .unwrap_or(error);
        Err(CalError::Authentication(format!("Consent was not granted ({})", detail)))
    } else if param("state").as_deref() != Some(expected_state) {
        Err(CalError::Authentication(
            "OAuth state mismatch in callback, refusing the authorization code".into(),
        ))
    } else {
        code.ok_or_else(|| CalError::Authentication("No code in callback".into()))
    };

    let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
    // The outcome stands even if the browser went away before the page was sent.
    if let Err(e) = respond(reader.into_inner(), "200 OK", page).await {
        tracing::debug!(error = %e, "could not answer OAuth callback");
    }

    Ok(Some(outcome))
}

async fn respond(mut stream: TcpStream, status: &str, body: &str) -> CalResult<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Random value for the OAuth `state` parameter.
pub fn new_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Print the consent URL and try to open it in the default browser.
pub fn open_browser(url: &str) {
    eprintln!("\nOpen this URL in your browser to authenticate:\n");
    eprintln!("{}\n", url);

    if open::that(url).is_err() {
        eprintln!("(Could not open browser automatically, please copy the URL above)");
    }
}
