//! # Mock Transports & Testing Guide
//!
//! Records and collections only ever see a [`Transport`], so tests swap the
//! HTTP layer for one of two in-memory transports.
//!
//! | | [`MockTransport`] | [`ChannelTransport`] |
//! |---|---|---|
//! | **Replies** | Queued up front | Sent by the test, whenever it wants |
//! | **Good for** | Request/response flows | Observing state *while* a request is pending |
//! | **Verification** | [`MockTransport::verify`], [`MockTransport::requests`] | Inspect each [`PendingRequest`] |
//!
//! ## Pattern 1: Queued replies
//!
//! ```rust
//! use serde_json::json;
//! use simple_store::mock::MockTransport;
//! use simple_store::{Collection, ConfigLayer, Method, ModelVariant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect(Method::Get, "/contacts")
//!         .return_ok(json!([{"id": 1, "first_name": "Joe"}]));
//!
//!     let contact = ModelVariant::new("Contact").extend(ConfigLayer::new().url("/contacts"));
//!     let contacts = Collection::new(contact, Arc::new(mock.clone()));
//!     contacts.find_all().await.unwrap();
//!
//!     assert_eq!(contacts.len(), 1);
//!     mock.verify();
//! }
//! ```
//!
//! ## Pattern 2: Held replies
//!
//! ```rust
//! use serde_json::json;
//! use simple_store::mock::{create_mock_transport, expect_request};
//! use simple_store::{Collection, ConfigLayer, FetchState, ModelVariant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (transport, mut server) = create_mock_transport(8);
//!     let contact = ModelVariant::new("Contact").extend(ConfigLayer::new().url("/contacts"));
//!     let contacts = Collection::new(contact, Arc::new(transport));
//!
//!     let dan = contacts.find_by_id(3);
//!     assert_eq!(dan.state(), Some(FetchState::Finding));
//!
//!     let pending = expect_request(&mut server).await.unwrap();
//!     assert_eq!(pending.request.url, "/contacts/3");
//!     pending.respond_ok(json!({"id": 3, "first_name": "Tall"}));
//!
//!     dan.loaded().await;
//!     assert_eq!(dan.get("first_name"), Some(json!("Tall")));
//! }
//! ```
//!
//! ## Testing Failure Scenarios
//!
//! Both transports can fail a request with any [`TransportError`], which
//! reaches the caller unchanged as `StoreError::Transport`.

use crate::error::TransportError;
use crate::transport::{Method, Payload, ResourceRequest, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    method: Method,
    url: String,
    reply: Result<Payload, TransportError>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    requests: Vec<ResourceRequest>,
    mismatches: Vec<String>,
}

/// A transport that answers from a queue of expectations.
///
/// Requests must arrive in the order they were expected. A request that does
/// not match the next expectation fails with [`TransportError::Unexpected`]
/// and is reported by [`verify`](Self::verify).
///
/// Clones share the same queue and request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect a `method` request to `url` next.
    pub fn expect(&self, method: Method, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            url: url.into(),
            state: self.state.clone(),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.lock().requests.clone()
    }

    /// Panics unless every expectation was met and nothing unexpected arrived.
    pub fn verify(&self) {
        let state = self.lock();
        if !state.mismatches.is_empty() {
            panic!("Unexpected requests: {}", state.mismatches.join("; "));
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ResourceRequest) -> Result<Payload, TransportError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let mismatch = match state.expectations.pop_front() {
            Some(expected) if expected.method == request.method && expected.url == request.url => {
                return expected.reply;
            }
            Some(expected) => format!(
                "expected {} {}, got {} {}",
                expected.method, expected.url, request.method, request.url
            ),
            None => format!("no expectation for {} {}", request.method, request.url),
        };
        state.mismatches.push(mismatch.clone());
        Err(TransportError::Unexpected(mismatch))
    }
}

/// Builder for one expected request.
#[must_use = "an expectation is only queued once a reply is chosen"]
pub struct ExpectationBuilder {
    method: Method,
    url: String,
    state: Arc<Mutex<MockState>>,
}

impl ExpectationBuilder {
    /// Reply with a JSON body.
    pub fn return_ok(self, body: Value) {
        self.push(Ok(Some(body)));
    }

    /// Reply successfully with no body.
    pub fn return_empty(self) {
        self.push(Ok(None));
    }

    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(self, reply: Result<Payload, TransportError>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expectations.push_back(Expectation {
            method: self.method,
            url: self.url,
            reply,
        });
    }
}

// =============================================================================
// CHANNEL TRANSPORT
// =============================================================================

/// A request waiting for the test to answer it.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: ResourceRequest,
    respond_to: oneshot::Sender<Result<Payload, TransportError>>,
}

impl PendingRequest {
    pub fn respond(self, reply: Result<Payload, TransportError>) {
        // The requester may have gone away; nothing to do then.
        let _ = self.respond_to.send(reply);
    }

    pub fn respond_ok(self, body: Value) {
        self.respond(Ok(Some(body)));
    }

    pub fn respond_empty(self) {
        self.respond(Ok(None));
    }

    pub fn respond_err(self, error: TransportError) {
        self.respond(Err(error));
    }
}

/// A transport that forwards every request to a channel the test reads.
#[derive(Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<PendingRequest>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, request: ResourceRequest) -> Result<Payload, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(PendingRequest {
                request,
                respond_to,
            })
            .await
            .map_err(|_| TransportError::Disconnected)?;
        response.await.map_err(|_| TransportError::Disconnected)?
    }
}

/// Creates a channel transport and the receiver its requests arrive on.
///
/// Dropping a [`PendingRequest`] without answering fails the request with
/// [`TransportError::Disconnected`].
pub fn create_mock_transport(buffer_size: usize) -> (ChannelTransport, mpsc::Receiver<PendingRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ChannelTransport { sender }, receiver)
}

/// Waits for the next request.
pub async fn expect_request(receiver: &mut mpsc::Receiver<PendingRequest>) -> Option<PendingRequest> {
    receiver.recv().await
}

/// Waits for the next request and returns it only if it is a `GET`.
pub async fn expect_get(receiver: &mut mpsc::Receiver<PendingRequest>) -> Option<PendingRequest> {
    receiver
        .recv()
        .await
        .filter(|pending| pending.request.method == Method::Get)
}
