//! # Store
//!
//! A named registry of collections for one application session. The store
//! owns no reconciliation logic; it hands out collections by name and gives
//! new ones its transport.

use crate::collection::Collection;
use crate::transport::Transport;
use crate::variant::ModelVariant;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Groups collections under resource names.
///
/// ```rust
/// use simple_store::mock::MockTransport;
/// use simple_store::{ConfigLayer, ModelVariant, Store};
/// use std::sync::Arc;
///
/// let mut store = Store::new(Arc::new(MockTransport::new()));
/// let contact = ModelVariant::new("Contact").extend(ConfigLayer::new().url("/contacts"));
/// store.collection_for("contacts", contact);
///
/// assert_eq!(store.collection("contacts").unwrap().url().as_deref(), Some("/contacts"));
/// assert!(store.collection("invoices").is_none());
/// ```
pub struct Store {
    transport: Arc<dyn Transport>,
    collections: HashMap<String, Collection>,
}

impl Store {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            collections: HashMap::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The collection registered as `name`, created over `model` with this
    /// store's transport if there is none yet.
    pub fn collection_for(&mut self, name: &str, model: ModelVariant) -> &Collection {
        let transport = &self.transport;
        self.collections.entry(name.to_string()).or_insert_with(|| {
            debug!(name, model = model.name(), "Registering collection");
            Collection::new(model, transport.clone())
        })
    }

    /// Register `collection` as `name`, returning the one it replaces.
    pub fn register(&mut self, name: impl Into<String>, collection: Collection) -> Option<Collection> {
        self.collections.insert(name.into(), collection)
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Collection> {
        self.collections.remove(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Clear every collection locally.
    pub fn clear_all(&self) {
        for collection in self.collections.values() {
            collection.clear_all();
        }
    }
}
