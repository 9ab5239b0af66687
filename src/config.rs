use std::{env, path::PathBuf, time::Duration};

use log::{info, warn};
use url::Url;

use crate::models::poll::PollId;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

pub const API_URL_VAR: &str = "POLLSYNC_API_URL";
pub const WS_URL_VAR: &str = "POLLSYNC_WS_URL";
pub const TOKEN_FILE_VAR: &str = "POLLSYNC_TOKEN_FILE";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub ws_override: Option<String>,
    pub token_file: Option<PathBuf>,
    pub reconnect: ReconnectConfig,
}

/// Push-channel timers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectConfig {
    pub ping_interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_override: None,
            token_file: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let api_url = var(API_URL_VAR).unwrap_or_else(|| {
            info!("{API_URL_VAR} not set, using default: {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_override: var(WS_URL_VAR),
            token_file: var(TOKEN_FILE_VAR).map(PathBuf::from),
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn ws_url(&self) -> String {
        resolve_ws_url(self.ws_override.as_deref(), Some(&self.api_url))
    }
}

/// Push-channel endpoint: the explicit override if given, else the REST base with
/// its scheme swapped (`https` to `wss`, anything else to `ws`) and its path
/// replaced by `/ws`, else [`DEFAULT_WS_URL`].
pub fn resolve_ws_url(ws_override: Option<&str>, api_url: Option<&str>) -> String {
    if let Some(url) = ws_override {
        return url.to_string();
    }

    if let Some(api_url) = api_url {
        match Url::parse(api_url) {
            Ok(mut url) => {
                let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
                if url.set_scheme(scheme).is_ok() {
                    url.set_path("/ws");
                    url.set_query(None);
                    url.set_fragment(None);
                    return url.to_string();
                }
                warn!("Cannot derive a WebSocket URL from {api_url}");
            }
            Err(e) => warn!("Invalid API URL for WebSocket derivation: {e}"),
        }
    }

    DEFAULT_WS_URL.to_string()
}

/// Appends the `poll_id` scope, if any, keeping any query the base already has.
pub fn scoped_ws_url(base: &str, scope: Option<PollId>) -> String {
    let Some(poll_id) = scope else {
        return base.to_string();
    };
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("poll_id", &poll_id.to_string());
            url.to_string()
        }
        Err(e) => {
            warn!("Cannot parse WebSocket URL {base}: {e}");
            format!("{base}?poll_id={poll_id}")
        }
    }
}
