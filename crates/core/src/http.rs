//! HTTP client construction shared by trackers and lookup services.

use reqwest::Client;
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("bookseed/", env!("CARGO_PKG_VERSION"));

/// Options applied to every client built by [`build_client`].
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl HttpOptions {
    pub fn from_timeout_secs(timeout_secs: Option<u64>) -> Self {
        Self {
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Build a client. Tracker sessions pass `cookies = true` so the login cookie
/// is kept for the lifetime of the session.
pub fn build_client(options: &HttpOptions, cookies: bool) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(cookies);

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
