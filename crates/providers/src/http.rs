//! HTTP plumbing shared by the adapters: client construction and mapping
//! transport failures and status codes onto [`ModelError`].

use std::time::Duration;
use toolpilot_core::error::ModelError;
use tracing::warn;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ModelError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ModelError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

/// Classify a failure to send or read a request.
///
/// Only timeouts and failed connections are transient.
pub(crate) fn transport_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() || err.is_connect() {
        ModelError::TransientNetwork(err.to_string())
    } else {
        ModelError::RemoteProtocol(err.to_string())
    }
}

/// Map a non-success status to an error.
///
/// - 429 → `RateLimited` (retry-after seconds, 0 when the header is absent)
/// - 5xx → `TransientNetwork`
/// - 401/403 → `Authentication`
/// - anything else → `RemoteProtocol`
pub(crate) fn status_error(status: u16, retry_after: Option<u64>, body: &str) -> ModelError {
    match status {
        429 => ModelError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(0),
        },
        401 | 403 => ModelError::Authentication(format!("HTTP {status}: {}", truncate(body))),
        500..=599 => ModelError::TransientNetwork(format!("HTTP {status}: {}", truncate(body))),
        _ => ModelError::RemoteProtocol(format!("HTTP {status}: {}", truncate(body))),
    }
}

/// Read the body of a response, turning any non-2xx status into an error.
pub(crate) async fn read_body(
    response: reqwest::Response,
    provider: &str,
) -> Result<String, ModelError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        warn!(provider, status = status.as_u16(), body = %truncate(&body), "Model API error");
        return Err(status_error(status.as_u16(), retry_after, &body));
    }
    Ok(body)
}

/// Decode a successful body, reporting malformed JSON as a protocol error.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    body: &str,
    provider: &str,
) -> Result<T, ModelError> {
    serde_json::from_str(body).map_err(|e| {
        ModelError::RemoteProtocol(format!("Failed to parse {provider} response: {e}"))
    })
}

fn truncate(body: &str) -> &str {
    const LIMIT: usize = 500;
    if body.len() <= LIMIT {
        return body;
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
