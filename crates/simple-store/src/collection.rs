//! # Collections
//!
//! A [`Collection`] keeps an ordered list of [`Record`]s of one
//! [`ModelVariant`] in sync with a remote list endpoint.
//!
//! ## Reconciliation
//!
//! Incoming JSON is merged by identity rather than replaced blindly. The
//! collection keeps a positional index next to its content
//! (`index[i]` is the identity of `content[i]`), and [`Collection::load`]
//! either deserializes into the record already at that identity or appends a
//! new one:
//!
//! ```rust
//! use serde_json::json;
//! use simple_store::mock::MockTransport;
//! use simple_store::{Collection, ConfigLayer, ModelVariant};
//! use std::sync::Arc;
//!
//! let contact = ModelVariant::new("Contact").extend(ConfigLayer::new().url("/contacts"));
//! let contacts = Collection::new(contact, Arc::new(MockTransport::new()));
//!
//! contacts.load(&json!({"id": 1, "first_name": "joe", "last_name": "blow"}));
//! contacts.load(&json!({"id": 1, "last_name": "GO"}));
//!
//! assert_eq!(contacts.len(), 1);
//! let joe = contacts.find_by_id_in_store(1).unwrap();
//! assert_eq!(joe.get("last_name"), Some(json!("GO")));
//! assert_eq!(joe.get("first_name"), Some(json!("joe")));
//! ```
//!
//! ## Concurrency
//!
//! Content and index live behind one mutex that is only held for the
//! synchronous part of an operation, never across a request. `find_all`
//! replaces the whole content in a single critical section, so two racing
//! `find_all` calls leave whichever response arrived last.

use crate::adapter::ResourceAdapter;
use crate::deferred::Deferred;
use crate::model::id_segment;
use crate::record::{FetchState, Record};
use crate::transport::{Method, Payload, ResourceRequest, Transport};
use crate::variant::ModelVariant;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Default)]
struct Contents {
    content: Vec<Record>,
    index: Vec<Value>,
}

impl Contents {
    /// Refresh every index entry from its record's current identity.
    ///
    /// Records gain an identity outside the collection (a save writes the
    /// server's id into them), so the index is re-read before it is used.
    fn sync_index(&mut self) {
        for (known, record) in self.index.iter_mut().zip(&self.content) {
            let id = record.id().unwrap_or(Value::Null);
            if *known != id {
                *known = id;
            }
        }
    }

    fn position(&mut self, id: &Value) -> Option<usize> {
        if id.is_null() {
            return None;
        }
        self.sync_index();
        self.index.iter().position(|known| known == id)
    }

    fn load(&mut self, model: &ModelVariant, transport: &Arc<dyn Transport>, json: &Value) -> Record {
        let existing = json
            .get(model.resource_id_field())
            .and_then(|id| self.position(id));

        if let Some(position) = existing {
            let record = self.content[position].clone();
            record.deserialize(json);
            return record;
        }

        let record = Record::new(model.clone(), transport.clone());
        record.deserialize(json);
        self.index.push(record.id().unwrap_or(Value::Null));
        self.content.push(record.clone());
        record
    }

    fn clear(&mut self) {
        self.content.clear();
        self.index.clear();
    }
}

/// An identity-indexed, ordered set of records backed by a list endpoint.
///
/// Clones share the same contents.
#[derive(Clone)]
pub struct Collection {
    model: ModelVariant,
    url: Option<String>,
    transport: Arc<dyn Transport>,
    contents: Arc<Mutex<Contents>>,
}

impl Collection {
    pub fn new(model: ModelVariant, transport: Arc<dyn Transport>) -> Self {
        Self {
            model,
            url: None,
            transport,
            contents: Arc::new(Mutex::new(Contents::default())),
        }
    }

    /// Use `url` instead of the model's URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn model(&self) -> &ModelVariant {
        &self.model
    }

    pub fn set_model(&mut self, model: ModelVariant) {
        self.model = model;
    }

    pub fn set_url(&mut self, url: Option<String>) {
        self.url = url;
    }

    /// The base URL for requests.
    ///
    /// Sources are consulted in order: this collection's own `url`, then every
    /// layer of the model variant from most derived to base. `None` if no
    /// source sets one.
    pub fn url(&self) -> Option<String> {
        self.url
            .as_deref()
            .into_iter()
            .chain(self.model.layer_urls())
            .next()
            .map(str::to_owned)
    }

    /// Upsert one record by its identity.
    ///
    /// A record already holding `json[resource_id_field]` is updated in place
    /// (same handle, same position); otherwise a new record is appended.
    pub fn load(&self, json: &Value) -> Record {
        self.lock().load(&self.model, &self.transport, json)
    }

    /// [`load`](Self::load) each element in order. Existing content is kept.
    pub fn load_all(&self, items: &[Value]) {
        let mut contents = self.lock();
        for item in items {
            contents.load(&self.model, &self.transport, item);
        }
        debug!(model = self.model.name(), size = contents.content.len(), "Loaded");
    }

    /// Forget every local record. Nothing is deleted remotely.
    pub fn clear_all(&self) {
        self.lock().clear();
        debug!(model = self.model.name(), "Cleared");
    }

    /// `GET` the list endpoint and replace the local content with the result.
    pub fn find_all(&self) -> Deferred<Payload> {
        let span = info_span!("find_all", model = self.model.name());
        let collection = self.clone();
        Deferred::spawn(
            async move {
                let payload = collection.resource_request(Method::Get, None).await?;
                collection.replace_all(payload.as_ref());
                Ok(payload)
            }
            .instrument(span),
        )
    }

    /// The local record with this identity, or a placeholder fetched from the
    /// server (see [`find_from_server`](Self::find_from_server)).
    pub fn find_by_id(&self, id: impl Into<Value>) -> Record {
        let id = id.into();
        match self.find_by_id_in_store(id.clone()) {
            Some(record) => record,
            None => self.find_from_server(id),
        }
    }

    /// The local record with this identity, without touching the server.
    pub fn find_by_id_in_store(&self, id: impl Into<Value>) -> Option<Record> {
        let id = id.into();
        let mut contents = self.lock();
        let position = contents.position(&id);
        let record = position.map(|position| contents.content[position].clone());
        debug!(model = self.model.name(), %id, found = record.is_some(), "Get");
        record
    }

    /// Return a placeholder for `id` right away and fill it in from
    /// `GET <url>/<id>` in the background.
    ///
    /// The placeholder starts in [`FetchState::Finding`] and moves to
    /// [`FetchState::Loaded`] once the response has been deserialized into it.
    /// If the request fails it stays in `Finding`. The placeholder is not
    /// added to this collection.
    ///
    /// Outside a Tokio runtime no request is made and the placeholder stays
    /// in `Finding`.
    pub fn find_from_server(&self, id: impl Into<Value>) -> Record {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert(self.model.resource_id_field().to_string(), id.clone());
        let record = Record::with_fields(self.model.clone(), self.transport.clone(), fields);
        record.set_state(FetchState::Finding);

        let Ok(runtime) = Handle::try_current() else {
            warn!(model = self.model.name(), %id, "No Tokio runtime; record stays in Finding");
            return record;
        };

        let span = info_span!("find_from_server", model = self.model.name(), %id);
        let collection = self.clone();
        let placeholder = record.clone();
        let fetch = async move {
            let model = collection.model.name();
            let Some(base) = collection.url() else {
                warn!(model, %id, "No url configured; record stays in Finding");
                return;
            };
            let url = format!("{base}/{}", id_segment(&id));

            match collection.request_at(url, Method::Get, None).await {
                Ok(payload) => {
                    if let Some(json) = &payload {
                        placeholder.deserialize(json);
                    }
                    placeholder.set_state(FetchState::Loaded);
                    info!(model, %id, "Loaded from server");
                }
                Err(e) => {
                    warn!(model, %id, error = %e, "Fetch failed; record stays in Finding");
                }
            }
        };
        runtime.spawn(fetch.instrument(span));

        record
    }

    /// A snapshot of the records, in order.
    pub fn content(&self) -> Vec<Record> {
        self.lock().content.clone()
    }

    /// A snapshot of the identity index, aligned with [`content`](Self::content).
    pub fn index(&self) -> Vec<Value> {
        let mut contents = self.lock();
        contents.sync_index();
        contents.index.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn replace_all(&self, payload: Option<&Value>) {
        let items: &[Value] = match payload {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => &[],
            Some(_) => {
                warn!(model = self.model.name(), "Expected a JSON array; loading nothing");
                &[]
            }
        };

        let mut contents = self.lock();
        contents.clear();
        for item in items {
            contents.load(&self.model, &self.transport, item);
        }
        info!(model = self.model.name(), size = contents.content.len(), "Replaced");
    }

    fn lock(&self) -> MutexGuard<'_, Contents> {
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceAdapter for Collection {
    fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn resource_url(&self) -> Option<String> {
        self.url()
    }

    fn model_name(&self) -> &str {
        self.model.name()
    }

    fn prepare_request(&self, request: &mut ResourceRequest) {
        self.model.hooks().prepare_request(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::variant::ConfigLayer;
    use serde_json::json;

    fn contacts() -> Collection {
        let contact = ModelVariant::new("Contact").extend(ConfigLayer::new().url("/contacts"));
        Collection::new(contact, Arc::new(MockTransport::new()))
    }

    fn assert_aligned(collection: &Collection) {
        let content = collection.content();
        let index = collection.index();
        assert_eq!(content.len(), index.len());
        for (record, id) in content.iter().zip(&index) {
            assert_eq!(&record.id().unwrap_or(Value::Null), id);
        }
    }

    #[test]
    fn test_load_keeps_index_aligned() {
        let contacts = contacts();
        contacts.load(&json!({"id": 1, "first_name": "Joe"}));
        contacts.load(&json!({"id": 2, "first_name": "Jane"}));
        contacts.load(&json!({"id": 1, "first_name": "Joseph"}));
        contacts.load(&json!({"first_name": "Anonymous"}));
        assert_aligned(&contacts);
        assert_eq!(contacts.index(), vec![json!(1), json!(2), Value::Null]);
    }

    #[test]
    fn test_records_without_identity_are_never_merged() {
        let contacts = contacts();
        contacts.load(&json!({"first_name": "A"}));
        contacts.load(&json!({"first_name": "B"}));
        contacts.load(&json!({"id": null, "first_name": "C"}));
        assert_eq!(contacts.len(), 3);
        assert!(contacts.find_by_id_in_store(Value::Null).is_none());
    }

    #[test]
    fn test_update_in_place_keeps_handle() {
        let contacts = contacts();
        let first = contacts.load(&json!({"id": "a", "n": 1}));
        let second = contacts.load(&json!({"id": "a", "n": 2}));
        assert!(Record::ptr_eq(&first, &second));
        assert_eq!(first.get("n"), Some(json!(2)));
    }

    #[test]
    fn test_custom_identity_field() {
        let variant = ModelVariant::new("Item").extend(
            ConfigLayer::new()
                .url("/items")
                .resource_id_field("sku"),
        );
        let items = Collection::new(variant, Arc::new(MockTransport::new()));
        items.load(&json!({"sku": "X1", "id": 1}));
        items.load(&json!({"sku": "X1", "id": 2}));
        assert_eq!(items.len(), 1);
        assert_eq!(items.index(), vec![json!("X1")]);
    }

    #[test]
    fn test_index_follows_identity_assigned_later() {
        let contacts = contacts();
        let anonymous = contacts.load(&json!({"first_name": "Anonymous"}));
        anonymous.set("id", json!(7));

        let again = contacts.load(&json!({"id": 7, "first_name": "Known"}));
        assert!(Record::ptr_eq(&anonymous, &again));
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts.index(), vec![json!(7)]);
        assert_aligned(&contacts);
    }

    #[test]
    fn test_find_by_id_outside_runtime_leaves_placeholder_finding() {
        let contacts = contacts();
        let missing = contacts.find_by_id(3);
        assert_eq!(missing.state(), Some(FetchState::Finding));
        assert_eq!(missing.id(), Some(json!(3)));
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_url_resolution_order() {
        let mut contacts = contacts();
        assert_eq!(contacts.url().as_deref(), Some("/contacts"));

        contacts.set_url(Some("/contacts/active".into()));
        assert_eq!(contacts.url().as_deref(), Some("/contacts/active"));

        contacts.set_url(None);
        contacts.set_model(ModelVariant::new("Nowhere"));
        assert_eq!(contacts.url(), None);
    }
}
