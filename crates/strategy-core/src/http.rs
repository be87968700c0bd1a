//! Shared plumbing for the clients that talk to the proxy server.

use crate::error::{Result, StrategyError};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a server root such as `http://localhost:3001`.
pub(crate) fn parse_base(base_url: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| StrategyError::InvalidRequest(format!("server url '{base_url}': {e}")))?;
    if base.cannot_be_a_base() {
        return Err(StrategyError::InvalidRequest(format!(
            "server url '{base_url}' cannot carry a path"
        )));
    }
    Ok(base)
}

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// `base` with `segments` appended, each percent-encoded as one segment.
pub(crate) fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Turn a non-2xx response into [`StrategyError::Remote`], preferring the
/// server's `{error, message}` body over the bare status line.
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            message: Some(m), ..
        }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ if !text.trim().is_empty() => text.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(StrategyError::Remote {
        status: status.as_u16(),
        message,
    })
}
