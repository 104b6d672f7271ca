//! Page fetching
//!
//! This module handles all HTTP requests for the harvester:
//! - A fresh session context per page attempt (new client, fresh cookie
//!   store, user agent sampled from the configured pool, optional proxy)
//! - Typed outcome classification so the controller never branches on a
//!   raw response
//! - Redirect following with the final URL reported, which the controller
//!   uses as end-of-catalog evidence

use crate::config::FetcherConfig;
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;

/// Result of a page fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// Got a body back
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: String,
    },

    /// Network-level or server-side failure worth retrying (timeout,
    /// connection failure, 5xx)
    TransientFailure {
        /// Failure description
        reason: String,
    },

    /// Transport-level denial (HTTP 403/429); fed into the block policy,
    /// not retried as a transient failure
    Denied {
        /// Denial description
        reason: String,
    },
}

/// Trait for page fetcher implementations
///
/// The fetcher owns session contexts entirely: one is created per call and
/// released before the call returns, on every path. Callers only see the
/// typed outcome.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page with a fresh session context
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Per-attempt session state: an isolated client with its own cookie store
/// and sampled identity. Dropped at the end of the attempt.
struct SessionContext {
    client: Client,
    user_agent: String,
}

/// HTTP fetcher backed by `reqwest`
pub struct HttpFetcher {
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Builds a fresh session context
    ///
    /// Each context gets its own cookie store and a user agent sampled from
    /// the pool, so consecutive page attempts present unrelated identities.
    fn new_session(&self) -> Result<SessionContext, reqwest::Error> {
        let pool = &self.config.user_agents;
        let user_agent = pool[rand::thread_rng().gen_range(0..pool.len())].clone();

        let mut builder = Client::builder()
            .user_agent(&user_agent)
            .cookie_store(true)
            .timeout(Duration::from_millis(self.config.request_timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &self.config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(SessionContext {
            client: builder.build()?,
            user_agent,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        // The session lives for exactly this attempt; dropping it on any
        // return path below releases the client and its cookie store.
        let session = match self.new_session() {
            Ok(s) => s,
            Err(e) => {
                return FetchOutcome::TransientFailure {
                    reason: format!("session setup failed: {}", e),
                }
            }
        };

        tracing::debug!("Fetching {} as '{}'", url, session.user_agent);

        match session.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let final_url = response.url().to_string();

                if status == 403 || status == 429 {
                    return FetchOutcome::Denied {
                        reason: format!("HTTP {}", status),
                    };
                }

                if !response.status().is_success() {
                    return FetchOutcome::TransientFailure {
                        reason: format!("HTTP {}", status),
                    };
                }

                match response.text().await {
                    Ok(body) => FetchOutcome::Success {
                        final_url,
                        status_code: status,
                        body,
                    },
                    Err(e) => FetchOutcome::TransientFailure {
                        reason: format!("failed to read body: {}", e),
                    },
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    FetchOutcome::TransientFailure {
                        reason: "request timeout".to_string(),
                    }
                } else if e.is_connect() {
                    FetchOutcome::TransientFailure {
                        reason: "connection failed".to_string(),
                    }
                } else {
                    FetchOutcome::TransientFailure {
                        reason: e.to_string(),
                    }
                }
            }
        }
    }
}
