//! # Observable Records
//!
//! A [`Record`] is one resource instance: a JSON field map plus a transient
//! [`FetchState`], shared behind an `Arc` so a caller can keep a handle while a
//! background fetch fills it in.
//!
//! Observers subscribe to a revision counter ([`Record::subscribe`]). Each
//! committed [`ChangeBatch`] that actually changed something bumps the
//! revision exactly once, however many fields it touched, so nobody ever
//! observes a half-applied update.

use crate::transport::Transport;
use crate::variant::ModelVariant;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Progress of a record fetched on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// The request for this record has been issued and has not succeeded yet.
    Finding,
    Loaded,
}

#[derive(Debug, Default)]
struct RecordData {
    fields: Map<String, Value>,
    state: Option<FetchState>,
}

struct RecordInner {
    variant: ModelVariant,
    transport: Arc<dyn Transport>,
    data: RwLock<RecordData>,
    revision: watch::Sender<u64>,
}

/// A shared handle to one resource instance. Clones point at the same record.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl Record {
    /// An empty record. It is new until its identity field is set.
    pub fn new(variant: ModelVariant, transport: Arc<dyn Transport>) -> Self {
        Self::with_fields(variant, transport, Map::new())
    }

    pub fn with_fields(
        variant: ModelVariant,
        transport: Arc<dyn Transport>,
        fields: Map<String, Value>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(RecordInner {
                variant,
                transport,
                data: RwLock::new(RecordData {
                    fields,
                    state: None,
                }),
                revision,
            }),
        }
    }

    pub fn variant(&self) -> &ModelVariant {
        &self.inner.variant
    }

    pub(crate) fn shared_transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn get(&self, prop: &str) -> Option<Value> {
        self.read().fields.get(prop).cloned()
    }

    /// Set one field. Observers are notified if the value changed.
    pub fn set(&self, prop: impl Into<String>, value: Value) {
        self.begin_changes().set(prop, value);
    }

    /// A snapshot of every field.
    pub fn fields(&self) -> Map<String, Value> {
        self.read().fields.clone()
    }

    /// The identity value. `null` counts as unset.
    pub fn id(&self) -> Option<Value> {
        let id_field = self.inner.variant.resource_id_field();
        self.read()
            .fields
            .get(id_field)
            .filter(|value| !value.is_null())
            .cloned()
    }

    pub fn state(&self) -> Option<FetchState> {
        self.read().state
    }

    pub fn set_state(&self, state: FetchState) {
        let changed = {
            let mut data = self.write();
            let changed = data.state != Some(state);
            data.state = Some(state);
            changed
        };
        if changed {
            self.notify();
        }
    }

    /// Start a change batch. Observers are notified once, when it ends.
    pub fn begin_changes(&self) -> ChangeBatch<'_> {
        ChangeBatch {
            record: self,
            data: Some(self.write()),
            changed: false,
        }
    }

    /// Number of change notifications emitted so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Wait until the record reaches [`FetchState::Loaded`].
    ///
    /// Never completes for a placeholder whose fetch failed.
    pub async fn loaded(&self) {
        let mut changes = self.subscribe();
        while self.state() != Some(FetchState::Loaded) {
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(a: &Record, b: &Record) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordData> {
        self.inner.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordData> {
        self.inner.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("Record")
            .field("variant", &self.inner.variant.name())
            .field("fields", &data.fields)
            .field("state", &data.state)
            .finish()
    }
}

/// Field updates applied as one unit.
///
/// Holds the record's write lock until it is committed or dropped; observers
/// then see one notification if any field changed.
pub struct ChangeBatch<'a> {
    record: &'a Record,
    data: Option<RwLockWriteGuard<'a, RecordData>>,
    changed: bool,
}

impl ChangeBatch<'_> {
    pub fn set(&mut self, prop: impl Into<String>, value: Value) {
        let Some(data) = self.data.as_mut() else {
            return;
        };
        let prop = prop.into();
        if data.fields.get(&prop) != Some(&value) {
            data.fields.insert(prop, value);
            self.changed = true;
        }
    }

    pub fn remove(&mut self, prop: &str) -> Option<Value> {
        let removed = self.data.as_mut()?.fields.remove(prop);
        if removed.is_some() {
            self.changed = true;
        }
        removed
    }

    /// The value as of this batch, including uncommitted changes.
    pub fn get(&self, prop: &str) -> Option<&Value> {
        self.data.as_ref()?.fields.get(prop)
    }

    pub fn variant(&self) -> &ModelVariant {
        self.record.variant()
    }

    /// End the batch. Same as dropping it.
    pub fn commit(self) {}
}

impl Drop for ChangeBatch<'_> {
    fn drop(&mut self) {
        // Release the lock before observers run.
        self.data.take();
        if self.changed {
            self.record.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;

    fn record() -> Record {
        Record::new(ModelVariant::new("Thing"), Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_batch_emits_one_notification() {
        let record = record();
        let mut changes = record.subscribe();

        let mut batch = record.begin_changes();
        batch.set("a", json!(1));
        batch.set("b", json!(2));
        batch.set("c", json!(3));
        assert!(!changes.has_changed().unwrap());
        batch.commit();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
        assert_eq!(record.get("b"), Some(json!(2)));
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let record = record();
        record.set("a", json!("x"));
        let before = record.revision();

        record.set("a", json!("x"));
        assert_eq!(record.revision(), before);

        record.set("a", json!("y"));
        assert_eq!(record.revision(), before + 1);
    }

    #[test]
    fn test_null_identity_is_unset() {
        let record = record();
        record.set("id", Value::Null);
        assert_eq!(record.id(), None);
        record.set("id", json!(4));
        assert_eq!(record.id(), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_loaded_waits_for_state() {
        let record = record();
        record.set_state(FetchState::Finding);

        let waiter = {
            let record = record.clone();
            tokio::spawn(async move { record.loaded().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        record.set_state(FetchState::Loaded);
        waiter.await.unwrap();
    }
}
