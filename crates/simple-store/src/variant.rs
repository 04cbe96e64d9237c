//! # Model Variants
//!
//! A [`ModelVariant`] describes one kind of resource: where it lives, which
//! field identifies it, and how it is (de)serialized. It is what a `Collection`
//! holds records *of*.
//!
//! Configuration is an ordered stack of [`ConfigLayer`]s. [`ModelVariant::extend`]
//! pushes a layer on top and returns a derived variant, so a base variant can be
//! specialised without touching it:
//!
//! ```rust
//! use simple_store::{ConfigLayer, ModelVariant};
//!
//! let base = ModelVariant::new("Person").extend(
//!     ConfigLayer::new()
//!         .url("/people")
//!         .resource_name("person")
//!         .resource_properties(["first_name", "last_name"]),
//! );
//! let admins = base.extend(ConfigLayer::new().url("/admins"));
//!
//! assert_eq!(base.url(), Some("/people"));
//! assert_eq!(admins.url(), Some("/admins"));
//! assert_eq!(admins.resource_name(), Some("person"));
//! assert_eq!(admins.resource_id_field(), "id");
//! ```
//!
//! Every lookup walks the layers from the most recently added to the base and
//! takes the first layer that sets the key.
//!
//! Behaviour that cannot be expressed as data goes into [`ModelHooks`], whose
//! methods all have default implementations.

use crate::record::{ChangeBatch, Record};
use crate::transport::ResourceRequest;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One set of configuration values. Unset keys fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    pub url: Option<String>,
    pub resource_id_field: Option<String>,
    pub resource_name: Option<String>,
    pub resource_properties: Option<Vec<String>>,
}

impl ConfigLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL of the resource, e.g. `/contacts`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn resource_id_field(mut self, field: impl Into<String>) -> Self {
        self.resource_id_field = Some(field.into());
        self
    }

    /// Key the serialized fields are nested under.
    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    /// Fields included by `serialize()`, in order.
    pub fn resource_properties<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_properties = Some(props.into_iter().map(Into::into).collect());
        self
    }
}

/// Overridable per-variant behaviour.
///
/// # Provided Methods
/// All methods have defaults, so `impl ModelHooks for MyHooks {}` is valid:
/// - [`ModelHooks::serialize_property`] returns the field's current value.
/// - [`ModelHooks::deserialize_property`] assigns the value to the field.
/// - [`ModelHooks::validate`] accepts everything.
/// - [`ModelHooks::prepare_request`] leaves the request untouched.
pub trait ModelHooks: Send + Sync + 'static {
    /// The JSON representation of one field. `None` omits the field.
    fn serialize_property(&self, record: &Record, prop: &str) -> Option<Value> {
        record.get(prop)
    }

    /// Apply one field from an incoming JSON object.
    ///
    /// Runs inside the change batch of [`Record::deserialize`].
    fn deserialize_property(&self, batch: &mut ChangeBatch<'_>, prop: &str, value: Value) {
        batch.set(prop, value);
    }

    /// Check the record before it is saved. An `Err` cancels the save.
    fn validate(&self, _record: &Record) -> Result<(), String> {
        Ok(())
    }

    /// Adjust an outgoing request for records and collections of this variant.
    fn prepare_request(&self, _request: &mut ResourceRequest) {}
}

/// Hooks with every default left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ModelHooks for DefaultHooks {}

struct VariantInner {
    name: String,
    layers: Vec<ConfigLayer>,
    hooks: Arc<dyn ModelHooks>,
}

/// A configured kind of resource. Cheap to clone.
#[derive(Clone)]
pub struct ModelVariant {
    inner: Arc<VariantInner>,
}

impl ModelVariant {
    pub const DEFAULT_ID_FIELD: &'static str = "id";

    /// A variant with only the base layer (`resource_id_field = "id"`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(VariantInner {
                name: name.into(),
                layers: vec![ConfigLayer::new().resource_id_field(Self::DEFAULT_ID_FIELD)],
                hooks: Arc::new(DefaultHooks),
            }),
        }
    }

    /// A derived variant with `layer` on top of this one's layers.
    pub fn extend(&self, layer: ConfigLayer) -> Self {
        let mut layers = self.inner.layers.clone();
        layers.push(layer);
        Self {
            inner: Arc::new(VariantInner {
                name: self.inner.name.clone(),
                layers,
                hooks: self.inner.hooks.clone(),
            }),
        }
    }

    /// A copy of this variant using `hooks`.
    pub fn with_hooks(&self, hooks: impl ModelHooks) -> Self {
        Self {
            inner: Arc::new(VariantInner {
                name: self.inner.name.clone(),
                layers: self.inner.layers.clone(),
                hooks: Arc::new(hooks),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn hooks(&self) -> &dyn ModelHooks {
        self.inner.hooks.as_ref()
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.inner.layers
    }

    /// Every `url` set by a layer, most derived first.
    pub fn layer_urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner
            .layers
            .iter()
            .rev()
            .filter_map(|layer| layer.url.as_deref())
    }

    pub fn url(&self) -> Option<&str> {
        self.layer_urls().next()
    }

    pub fn resource_id_field(&self) -> &str {
        self.lookup(|layer| layer.resource_id_field.as_deref())
            .unwrap_or(Self::DEFAULT_ID_FIELD)
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.lookup(|layer| layer.resource_name.as_deref())
    }

    pub fn resource_properties(&self) -> Option<&[String]> {
        self.lookup(|layer| layer.resource_properties.as_deref())
    }

    fn lookup<'a, T: ?Sized>(
        &'a self,
        key: impl Fn(&'a ConfigLayer) -> Option<&'a T>,
    ) -> Option<&'a T> {
        self.inner.layers.iter().rev().find_map(key)
    }
}

impl fmt::Debug for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelVariant")
            .field("name", &self.inner.name)
            .field("layers", &self.inner.layers)
            .finish()
    }
}
