//! # Resource Operations
//!
//! Everything a [`Record`] does against its resource: identity, URL,
//! (de)serialization, and the save / destroy requests.
//!
//! ## Wire format
//!
//! The two directions are not symmetric:
//!
//! - [`Record::serialize`] nests the configured properties under
//!   `resource_name`: `{"contact": {"first_name": "Joe"}}`.
//! - [`Record::deserialize`] reads top-level keys directly:
//!   `{"id": 1, "first_name": "Joe"}`.
//!
//! Servers that echo the nested form back will therefore set a single
//! `contact` field on the record.

use crate::adapter::ResourceAdapter;
use crate::deferred::Deferred;
use crate::error::StoreError;
use crate::record::Record;
use crate::transport::{Method, Payload, ResourceRequest, Transport};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

impl ResourceAdapter for Record {
    fn transport(&self) -> &Arc<dyn Transport> {
        self.shared_transport()
    }

    fn resource_url(&self) -> Option<String> {
        self.url()
    }

    fn model_name(&self) -> &str {
        self.variant().name()
    }

    fn prepare_request(&self, request: &mut ResourceRequest) {
        self.variant().hooks().prepare_request(request);
    }
}

impl Record {
    /// True while the identity field is unset.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// The variant's base URL, followed by `/<id>` once the record has one.
    pub fn url(&self) -> Option<String> {
        let base = self.variant().url()?;
        Some(match self.id() {
            Some(id) => format!("{base}/{}", id_segment(&id)),
            None => base.to_string(),
        })
    }

    /// `{ resource_name: { prop: serialize_property(prop), .. } }`.
    ///
    /// Properties the hook maps to `None` are left out.
    pub fn serialize(&self) -> Result<Value, StoreError> {
        let variant = self.variant();
        let missing = |key| StoreError::MissingConfiguration {
            model: variant.name().to_string(),
            key,
        };
        let name = variant.resource_name().ok_or_else(|| missing("resource_name"))?;
        let props = variant
            .resource_properties()
            .ok_or_else(|| missing("resource_properties"))?;

        let hooks = variant.hooks();
        let fields: Map<String, Value> = props
            .iter()
            .filter_map(|prop| {
                hooks
                    .serialize_property(self, prop)
                    .map(|value| (prop.clone(), value))
            })
            .collect();

        let mut wrapper = Map::new();
        wrapper.insert(name.to_string(), Value::Object(fields));
        Ok(Value::Object(wrapper))
    }

    /// Apply every top-level key of `json` through `deserialize_property`, as
    /// one change batch.
    ///
    /// Anything other than a JSON object leaves the record untouched.
    pub fn deserialize(&self, json: &Value) -> &Self {
        let Some(object) = json.as_object() else {
            debug!(model = self.variant().name(), "Ignoring non-object payload");
            return self;
        };

        let hooks = self.variant().hooks();
        let mut batch = self.begin_changes();
        for (prop, value) in object {
            hooks.deserialize_property(&mut batch, prop, value.clone());
        }
        batch.commit();
        self
    }

    /// Create (`POST`) or update (`PUT`) the remote resource.
    ///
    /// A failing `validate()` hook rejects the handle without any request.
    /// On success a non-null response is deserialized into this record, which
    /// is how a new record receives its identity.
    pub fn save_resource(&self) -> Deferred<Payload> {
        let model = self.variant().name();
        if let Err(reason) = self.variant().hooks().validate(self) {
            warn!(model, %reason, "Validation failed");
            return Deferred::rejected(StoreError::Validation(reason));
        }
        let body = match self.serialize() {
            Ok(body) => body,
            Err(e) => return Deferred::rejected(e),
        };
        let method = if self.is_new() {
            Method::Post
        } else {
            Method::Put
        };
        debug!(model, %method, ?body, "Saving");

        let span = info_span!("save_resource", model, %method);
        let record = self.clone();
        Deferred::spawn(
            async move {
                let payload = record.resource_request(method, Some(body)).await?;
                if let Some(json) = payload.as_ref().filter(|json| !json.is_null()) {
                    record.deserialize(json);
                }
                info!(id = ?record.id(), "Saved");
                Ok(payload)
            }
            .instrument(span),
        )
    }

    /// `DELETE` the remote resource. Collections holding this record are not
    /// touched.
    pub fn destroy_resource(&self) -> Deferred<Payload> {
        let span = info_span!("destroy_resource", model = self.variant().name(), id = ?self.id());
        let record = self.clone();
        Deferred::spawn(
            async move {
                let payload = record.resource_request(Method::Delete, None).await?;
                info!("Destroyed");
                Ok(payload)
            }
            .instrument(span),
        )
    }

    /// Copy `props` (default: `resource_properties`) from `source`.
    pub fn duplicate_properties(&self, source: &Record, props: Option<&[String]>) {
        let props = props.or_else(|| self.variant().resource_properties()).unwrap_or(&[]);
        // Read everything first: `source` may be this very record.
        let values: Vec<(String, Option<Value>)> = props
            .iter()
            .map(|prop| (prop.clone(), source.get(prop)))
            .collect();

        let mut batch = self.begin_changes();
        for (prop, value) in values {
            match value {
                Some(value) => batch.set(prop, value),
                None => {
                    batch.remove(&prop);
                }
            }
        }
    }

    /// A new record of the same variant with this record's properties and
    /// identity.
    pub fn copy(&self) -> Record {
        let copy = Record::new(self.variant().clone(), self.shared_transport().clone());
        copy.duplicate_properties(self, None);
        if let Some(id) = self.id() {
            copy.set(self.variant().resource_id_field(), id);
        }
        copy
    }
}

/// The URL path segment for an identity value.
pub(crate) fn id_segment(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
