//! # towerkit
//!
//! Blocking client for the AWX / Ansible Tower REST API (v2).
//!
//! This crate provides:
//! - A [`Client`] with token or basic authentication, paging and retries
//!   for reads
//! - An implementation of [`declarative::ControlPlane`] on top of it, so the
//!   reconciler can drive a real server
//!
//! ## Example
//!
//! ```no_run
//! use towerkit::{Auth, Client, ClientConfig};
//!
//! let config = ClientConfig::new("tower.example.com")
//!     .auth(Auth::Token("s3cr3t".to_string()));
//! let client = Client::new(config).expect("invalid config");
//!
//! let inventories = client.list("inventories/", &[]).expect("request failed");
//! println!("{} inventories", inventories.len());
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod plane;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result, error_message};
pub use types::{Auth, ClientConfig, DEFAULT_HOST, Page, RetryConfig, normalize_host};

use retry::with_retry;
use serde_json::Value;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

const USER_AGENT: &str = concat!("tower-inventory/", env!("CARGO_PKG_VERSION"));

/// Client for one AWX / Tower server.
pub struct Client {
    agent: Agent,
    host: String,
    authorization: Option<String>,
    retry: RetryConfig,
}

impl Client {
    /// Build a client from `config`.
    ///
    /// No request is made until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if !(config.host.starts_with("http://") || config.host.starts_with("https://")) {
            return Err(Error::Config(format!(
                "host '{}' must start with http:// or https://",
                config.host
            )));
        }
        if !config.verify_ssl {
            log::warn!("TLS certificate verification is disabled for {}", config.host);
        }

        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!config.verify_ssl)
            .build();
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .tls_config(tls)
            .build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            host: config.host,
            authorization: config.auth.header_value(),
            retry: config.retry,
        })
    }

    /// Base URL of the server.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Absolute URL for an API path.
    ///
    /// Absolute URLs pass through, `/api/...` paths are joined to the host,
    /// anything else is taken relative to `/api/v2/`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with("/api/") {
            format!("{}{path}", self.host)
        } else {
            format!("{}/api/v2/{}", self.host, path.trim_start_matches('/'))
        }
    }

    fn prepare<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.authorization {
            Some(value) => request.header("Authorization", value.as_str()),
            None => request,
        }
    }

    fn get_at(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        with_retry(&self.retry, || {
            log::debug!("GET {url} {query:?}");
            let mut request = self.prepare(self.agent.get(url));
            for (key, value) in query {
                request = request.query(key, value);
            }
            let response = request.call().map_err(|e| Error::from_ureq(url, e))?;
            read_json(url, response)?
                .ok_or_else(|| Error::InvalidResponse(format!("empty response from {url}")))
        })
    }

    /// Fetch one object.
    pub fn get(&self, path: &str) -> Result<Value> {
        self.get_at(&self.url(path), &[])
    }

    /// Fetch every object of a list endpoint, following `next` links.
    pub fn list(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>> {
        let url = self.url(path);
        let mut page: Page = serde_json::from_value(self.get_at(&url, query)?)?;
        let mut results = std::mem::take(&mut page.results);

        while let Some(next) = page.next.take() {
            page = serde_json::from_value(self.get_at(&self.url(&next), &[])?)?;
            results.append(&mut page.results);
        }

        log::debug!("{} result(s) from {url}", results.len());
        Ok(results)
    }

    /// POST a JSON body. Returns `None` when the server sends no content.
    pub fn post(&self, path: &str, body: &Value) -> Result<Option<Value>> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self
            .prepare(self.agent.post(&url))
            .send_json(body)
            .map_err(|e| Error::from_ureq(&url, e))?;
        read_json(&url, response)
    }

    /// PATCH a JSON body and return the updated object.
    pub fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        log::debug!("PATCH {url}");
        let response = self
            .prepare(self.agent.patch(&url))
            .send_json(body)
            .map_err(|e| Error::from_ureq(&url, e))?;
        read_json(&url, response)?
            .ok_or_else(|| Error::InvalidResponse(format!("empty response from {url}")))
    }

    /// DELETE an object. Returns `false` when it was already gone.
    pub fn delete(&self, path: &str) -> Result<bool> {
        let url = self.url(path);
        log::debug!("DELETE {url}");
        let response = self
            .prepare(self.agent.delete(&url))
            .call()
            .map_err(|e| Error::from_ureq(&url, e))?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        read_json(&url, response)?;
        Ok(true)
    }
}

/// Turn a response into JSON, or an [`Error::Http`] for non-2xx statuses.
fn read_json(url: &str, mut response: Response<Body>) -> Result<Option<Value>> {
    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::transport(url, e))?;

    if !(200..300).contains(&status) {
        return Err(Error::Http {
            status,
            url: url.to_string(),
            message: error_message(&text),
        });
    }
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&text)?))
}
