//! # ResourceAdapter Trait
//!
//! The request plumbing shared by [`Record`](crate::Record) and
//! [`Collection`](crate::Collection). Both resolve their own URL differently,
//! but everything after that (building the request, letting the model adjust
//! it, sending it, reporting failures) is identical and lives here once.

use crate::error::StoreError;
use crate::transport::{Method, Payload, ResourceRequest, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Provides `resource_request()` to anything that knows its URL and transport.
///
/// # Example
///
/// ```rust
/// use simple_store::mock::MockTransport;
/// use simple_store::{Method, ResourceAdapter, ResourceRequest, Transport};
/// use std::sync::Arc;
///
/// struct Health {
///     transport: Arc<dyn Transport>,
/// }
///
/// impl ResourceAdapter for Health {
///     fn transport(&self) -> &Arc<dyn Transport> {
///         &self.transport
///     }
///     fn resource_url(&self) -> Option<String> {
///         Some("/health".to_string())
///     }
///     fn model_name(&self) -> &str {
///         "Health"
///     }
///     fn prepare_request(&self, request: &mut ResourceRequest) {
///         request.headers.push(("X-Probe".into(), "1".into()));
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let mock = MockTransport::new();
///     mock.expect(Method::Get, "/health").return_ok(serde_json::json!({"ok": true}));
///
///     let health = Health { transport: Arc::new(mock.clone()) };
///     let body = health.resource_request(Method::Get, None).await.unwrap();
///     assert_eq!(body.unwrap()["ok"], true);
///     assert_eq!(mock.requests()[0].headers.len(), 1);
/// }
/// ```
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// The transport requests are sent through.
    fn transport(&self) -> &Arc<dyn Transport>;

    /// The URL requests are sent to, if one can be resolved.
    fn resource_url(&self) -> Option<String>;

    /// Name of the model variant, used in errors and logs.
    fn model_name(&self) -> &str;

    /// Adjust a request right before it is sent.
    fn prepare_request(&self, _request: &mut ResourceRequest) {}

    /// Build, prepare and send a request to `resource_url()`.
    #[tracing::instrument(skip(self, body))]
    async fn resource_request(
        &self,
        method: Method,
        body: Option<Value>,
    ) -> Result<Payload, StoreError> {
        let url = self
            .resource_url()
            .ok_or_else(|| StoreError::UnresolvedUrl {
                model: self.model_name().to_string(),
            })?;
        self.request_at(url, method, body).await
    }

    /// Build, prepare and send a request to an explicit URL.
    async fn request_at(
        &self,
        url: String,
        method: Method,
        body: Option<Value>,
    ) -> Result<Payload, StoreError> {
        let mut request = ResourceRequest::new(method, url);
        request.body = body;
        self.prepare_request(&mut request);

        debug!(model = self.model_name(), url = %request.url, "Sending request");
        self.transport().send(request).await.map_err(|e| {
            warn!(model = self.model_name(), error = %e, "Request failed");
            StoreError::from(e)
        })
    }
}
