use std::{net::SocketAddr, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{proxy::fetcher::Fetcher, rewriting::html::html_rewriter};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The listen address for the relay server
    pub host: SocketAddr,
    /// Upper bound on a whole fetch, from connecting to reading the last body byte
    pub fetch_timeout_secs: u64,
    /// Upper bound on establishing the connection to the origin
    pub connect_timeout_secs: u64,
    /// Largest response body that will be read from an origin
    pub max_body_bytes: usize,
    /// The `User-Agent` sent to origins
    pub user_agent: String,
    /// Proxy that every outbound fetch is sent through, e.g. `http://egress.internal:3128`
    pub outbound_proxy: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: SocketAddr::from(([0, 0, 0, 0], 3001)),
            fetch_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            outbound_proxy: None,
        }
    }
}

#[derive(Clone)]
/// The state that is passed to the API routes
pub struct APIState {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
    pub html_rewriter: Arc<html_rewriter::HtmlRewriter>,
}
