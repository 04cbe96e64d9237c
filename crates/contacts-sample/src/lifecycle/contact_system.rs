use crate::model::{contact, Contact};
use simple_store::{Collection, HttpTransport, Store, StoreError, Transport, TransportConfig};
use std::sync::Arc;
use tracing::{debug, info};

/// Name the contacts collection is registered under.
pub const CONTACTS: &str = "contacts";

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Malformed contact record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Owns the application's [`Store`] and wires its collections.
pub struct ContactSystem {
    store: Store,
    contacts: Collection,
}

impl ContactSystem {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let mut store = Store::new(transport);
        let contacts = store.collection_for(CONTACTS, contact()).clone();
        debug!(collections = ?store.names(), "Contact system ready");
        Self { store, contacts }
    }

    /// Talks HTTP to the server named by `SIMPLE_STORE_ORIGIN`.
    pub fn from_env() -> Result<Self, ContactError> {
        let config = TransportConfig::from_env()?;
        info!(origin = %config.origin, "Using HTTP transport");
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The collection registered as [`CONTACTS`]. Clones share its contents.
    pub fn contacts(&self) -> Collection {
        self.contacts.clone()
    }

    /// Refresh the contacts collection and return a typed snapshot of it.
    pub async fn refresh_contacts(&self) -> Result<Vec<Contact>, ContactError> {
        let contacts = self.contacts();
        contacts.find_all().await?;
        let snapshot = contacts
            .content()
            .iter()
            .map(Contact::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = snapshot.len(), "Contacts refreshed");
        Ok(snapshot)
    }

    /// Forget every locally held record.
    pub fn reset(&self) {
        self.store.clear_all();
        info!("Local state cleared");
    }
}
