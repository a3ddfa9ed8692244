//! Client configuration and wire types.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "https://127.0.0.1";

/// How requests authenticate.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// No credentials.
    #[default]
    None,
    /// OAuth2 token sent as a bearer token.
    Token(String),
    /// Username and password sent as HTTP Basic.
    Basic {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },
}

impl Auth {
    /// Value of the `Authorization` header, if any.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        match self {
            Self::None => None,
            Self::Token(token) => Some(format!("Bearer {token}")),
            Self::Basic { username, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{username}:{password}"))
            )),
        }
    }
}

// Credentials never end up in logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Token(_) => write!(f, "Token(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Everything needed to build a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, without a trailing slash
    pub host: String,
    /// Credentials
    pub auth: Auth,
    /// Verify TLS certificates
    pub verify_ssl: bool,
    /// Timeout for a whole request
    pub timeout: Duration,
    /// Retry policy for reads
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            auth: Auth::None,
            verify_ssl: true,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config for `host` with default settings.
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: normalize_host(host),
            ..Default::default()
        }
    }

    /// Set the credentials.
    #[must_use]
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Enable or disable TLS verification.
    #[must_use]
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Add `https://` to a bare host and drop trailing slashes.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        DEFAULT_HOST.to_string()
    } else if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Total number of matches across all pages
    #[serde(default)]
    pub count: u64,
    /// Link to the next page
    #[serde(default)]
    pub next: Option<String>,
    /// Objects on this page
    #[serde(default)]
    pub results: Vec<Value>,
}
