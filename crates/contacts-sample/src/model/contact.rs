//! The contact resource served at `/contacts`.
//!
//! # Simple Store
//! [`contact()`] builds the [`ModelVariant`] that collections of contacts are
//! made of. [`Contact`] is a typed snapshot of one record, for code that would
//! rather not work with raw JSON fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use simple_store::{ConfigLayer, ModelHooks, ModelVariant, Record};
use std::fmt::Display;

/// Type-safe identifier for Contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub u64);

impl From<u64> for ContactId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ContactId> for Value {
    fn from(id: ContactId) -> Self {
        Value::from(id.0)
    }
}

impl Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contact_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: Option<ContactId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Contact {
    /// Reads the current fields of `record`. Unknown fields are ignored.
    pub fn from_record(record: &Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record.fields()))
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Contacts must have a first name before they can be saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactHooks;

impl ModelHooks for ContactHooks {
    fn validate(&self, record: &Record) -> Result<(), String> {
        match record.get("first_name") {
            Some(Value::String(name)) if !name.trim().is_empty() => Ok(()),
            _ => Err("first_name can't be blank".to_string()),
        }
    }
}

/// The `Contact` model variant.
pub fn contact() -> ModelVariant {
    ModelVariant::new("Contact")
        .extend(
            ConfigLayer::new()
                .url("/contacts")
                .resource_name("contact")
                .resource_properties(["first_name", "last_name"]),
        )
        .with_hooks(ContactHooks)
}
