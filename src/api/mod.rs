pub mod auth;
pub mod polls;

use log::error;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::models::requests::ErrorBody;

pub(crate) fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header("Authorization", format!("Bearer {}", token)),
        None => request,
    }
}

/// Human-readable failure text: the string `detail` of an error body, else `fallback`.
pub fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|d| d.as_str().map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Sends `request`, turning transport failures and non-2xx replies into
/// [`ClientError::Request`].
pub(crate) async fn send(request: RequestBuilder, fallback: &str) -> Result<Response> {
    let resp = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("{}: {}", fallback, e);
            return Err(ClientError::Request(fallback.to_string()));
        }
    };

    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    error!("{} ({})", fallback, status);
    Err(ClientError::Request(error_message(&body, fallback)))
}

pub(crate) async fn json_body(resp: Response, fallback: &str) -> Result<Value> {
    resp.json::<Value>().await.map_err(|e| {
        error!("{}: unreadable response body: {}", fallback, e);
        ClientError::Request(fallback.to_string())
    })
}
