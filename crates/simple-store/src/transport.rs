//! # Transport Capability
//!
//! The store never talks HTTP directly. Every request goes through a
//! [`Transport`], which takes a fully built [`ResourceRequest`] and resolves to
//! the decoded JSON body or a [`TransportError`]. Deciding what counts as
//! success (status codes, empty bodies) is entirely the transport's job.
//!
//! Two families of implementations ship with the crate:
//!
//! - [`HttpTransport`](crate::http::HttpTransport) for real servers.
//! - [`MockTransport`](crate::mock::MockTransport) and
//!   [`ChannelTransport`](crate::mock::ChannelTransport) for tests.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// The decoded response body of a request. `None` when the server sent nothing.
pub type Payload = Option<Value>;

/// HTTP verbs used by resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected encoding of the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
}

/// A single request against a resource URL.
///
/// Built by [`ResourceAdapter::resource_request`](crate::ResourceAdapter::resource_request)
/// and handed to the caller's `prepare_request` hook before it is sent, so
/// headers or the URL can still be adjusted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub format: ResponseFormat,
}

impl ResourceRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            format: ResponseFormat::Json,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Performs resource requests.
///
/// Implementations must be cheap to share: records and collections hold the
/// transport behind an `Arc` and issue requests from spawned tasks.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send the request and resolve to the decoded response body.
    async fn send(&self, request: ResourceRequest) -> Result<Payload, TransportError>;
}
