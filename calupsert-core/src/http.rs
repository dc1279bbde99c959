//! Shared HTTP plumbing for the calendar APIs.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{CalError, CalResult};

/// Build the client used for both token and calendar requests.
pub fn client(timeout: Duration) -> CalResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("calupsert/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

// Google and Graph both wrap failures as {"error": {"code": .., "message": ..}}.
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Decode a successful JSON response or map the failure status.
pub async fn read_json<T: DeserializeOwned>(provider: &'static str, response: Response) -> CalResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(classify(provider, status, &body));
    }

    serde_json::from_str(&body).map_err(|e| CalError::RemoteService {
        provider,
        status: status.as_u16(),
        message: format!("Unreadable response body: {}", e),
    })
}

/// Map a non-success status to the error taxonomy.
pub fn classify(provider: &'static str, status: StatusCode, body: &str) -> CalError {
    let message = error_message(body);

    match status {
        StatusCode::UNAUTHORIZED => CalError::Authentication(format!(
            "{} rejected the access token: {}",
            provider, message
        )),
        StatusCode::FORBIDDEN => CalError::Authorization(format!("{}: {}", provider, message)),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            CalError::NotFound(format!("{}: {}", provider, message))
        }
        _ => CalError::RemoteService {
            provider,
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> String {
    if let Ok(ApiErrorEnvelope {
        error: ApiError { message: Some(msg) },
    }) = serde_json::from_str(body)
    {
        return msg;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}
