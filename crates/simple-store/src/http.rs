//! # HTTP Transport
//!
//! [`HttpTransport`] sends resource requests with `reqwest`. Resource URLs are
//! paths (`/contacts/3`); the transport prefixes them with the configured
//! origin.
//!
//! ## Configuration
//!
//! [`TransportConfig`] can be built in code, deserialized with `serde`, or read
//! from the environment:
//!
//! - `SIMPLE_STORE_ORIGIN` (required), e.g. `https://api.example.com`
//! - `SIMPLE_STORE_USER_AGENT` (optional)

use crate::error::{StoreError, TransportError};
use crate::transport::{Method, Payload, ResourceRequest, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub const ORIGIN_VAR: &str = "SIMPLE_STORE_ORIGIN";
pub const USER_AGENT_VAR: &str = "SIMPLE_STORE_USER_AGENT";

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Scheme and host every resource path is appended to.
    pub origin: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl TransportConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn from_env() -> Result<Self, StoreError> {
        let origin = std::env::var(ORIGIN_VAR)
            .map_err(|_| StoreError::Config(format!("{ORIGIN_VAR} not set")))?;
        let mut config = Self::new(origin);
        config.user_agent = std::env::var(USER_AGENT_VAR).ok();
        Ok(config)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.config.origin.trim_end_matches('/'), path)
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: ResourceRequest) -> Result<Payload, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), self.absolute_url(&request.url))
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in self.config.headers.iter().chain(
            request
                .headers
                .iter()
                .map(|(name, value)| (name, value)),
        ) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = text.len(), "Response");

        let body = if text.trim().is_empty() {
            None
        } else if status.is_success() {
            Some(serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?)
        } else {
            serde_json::from_str(&text).ok()
        };

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
