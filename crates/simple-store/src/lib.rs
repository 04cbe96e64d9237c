//! # Simple Store
//!
//! This crate maps RESTful JSON resources onto observable in-memory records
//! and keeps a local collection of them in sync with a server.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Configuration** ([`ModelVariant`]) - where a resource lives, which field identifies it,
//!    and how it is (de)serialized.
//! 2. **State** ([`Record`], [`Collection`], [`Store`]) - observable records, identity-indexed
//!    collections and a named registry of collections.
//! 3. **Transport** ([`Transport`]) - the only place requests leave the process.
//!
//! Records and collections share their request plumbing through the [`ResourceAdapter`]
//! trait, and every network operation hands back a [`Deferred`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use simple_store::mock::MockTransport;
//! use simple_store::{ConfigLayer, Method, ModelVariant, Store};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect(Method::Get, "/contacts").return_ok(json!([
//!         {"id": 1, "first_name": "Joe", "last_name": "Blow"},
//!         {"id": 2, "first_name": "Jane", "last_name": "Doe"},
//!     ]));
//!     mock.expect(Method::Put, "/contacts/2").return_ok(json!({"id": 2, "last_name": "Roe"}));
//!
//!     let contact = ModelVariant::new("Contact").extend(
//!         ConfigLayer::new()
//!             .url("/contacts")
//!             .resource_name("contact")
//!             .resource_properties(["first_name", "last_name"]),
//!     );
//!
//!     let mut store = Store::new(Arc::new(mock.clone()));
//!     let contacts = store.collection_for("contacts", contact).clone();
//!
//!     // 1. Replace local state with the server's list
//!     contacts.find_all().await.unwrap();
//!     assert_eq!(contacts.len(), 2);
//!
//!     // 2. Edit and save one record
//!     let jane = contacts.find_by_id(2);
//!     jane.set("last_name", json!("Roe"));
//!     jane.save_resource().await.unwrap();
//!
//!     assert_eq!(
//!         mock.requests()[1].body,
//!         Some(json!({"contact": {"first_name": "Jane", "last_name": "Roe"}}))
//!     );
//!     mock.verify();
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Requests are spawned onto the Tokio runtime as soon as they are issued.
//! - Local state is only mutated in the synchronous part of an operation; no lock
//!   is held while a request is in flight.
//! - Racing `find_all` calls are last-writer-wins.
//!
//! ## Testing
//!
//! See the [`mock`] module for [`MockTransport`](mock::MockTransport) (queued replies) and
//! [`ChannelTransport`](mock::ChannelTransport) (replies sent by the test).

pub mod adapter;
pub mod collection;
pub mod deferred;
pub mod error;
pub mod http;
pub mod mock;
pub mod model;
pub mod record;
pub mod store;
pub mod tracing;
pub mod transport;
pub mod variant;

// Re-export core types for convenience
pub use adapter::ResourceAdapter;
pub use collection::Collection;
pub use deferred::Deferred;
pub use error::{StoreError, TransportError};
pub use http::{HttpTransport, TransportConfig};
pub use record::{ChangeBatch, FetchState, Record};
pub use store::Store;
pub use transport::{Method, Payload, ResourceRequest, ResponseFormat, Transport};
pub use variant::{ConfigLayer, DefaultHooks, ModelHooks, ModelVariant};
