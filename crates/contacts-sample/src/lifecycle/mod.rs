//! # System Lifecycle
//!
//! Builds the contact application's [`Store`](simple_store::Store) and hands
//! out its collections.
//!
//! ## The ContactSystem Pattern
//!
//! [`ContactSystem`] is the one place that decides which transport the store
//! talks through:
//!
//! ```rust,ignore
//! // Production: HTTP, configured from the environment
//! let system = ContactSystem::from_env()?;
//!
//! // Tests: any Transport, usually a mock
//! let system = ContactSystem::new(Arc::new(MockTransport::new()));
//! ```
//!
//! Everything downstream (collections, records, requests) only ever sees the
//! `Arc<dyn Transport>` chosen here.
//!
//! ## Configuration
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SIMPLE_STORE_ORIGIN` | Server origin, e.g. `http://localhost:3000` (required) |
//! | `SIMPLE_STORE_USER_AGENT` | User agent sent with every request |
//! | `RUST_LOG` | Log filter, see [`setup_tracing`](simple_store::tracing::setup_tracing) |

pub mod contact_system;

pub use contact_system::*;
