//! # Contacts Sample
//!
//! A small client for a RESTful `/contacts` endpoint built on
//! [`simple_store`].
//!
//! ## Quick Start
//!
//! ```bash
//! SIMPLE_STORE_ORIGIN=http://localhost:3000 RUST_LOG=info cargo run -p contacts-sample
//! ```
//!
//! The entry point demonstrates:
//! 1.  Setting up the [`ContactSystem`] from the environment.
//! 2.  Loading every contact with `find_all`.
//! 3.  Creating a contact and saving it.
//!
//! ## Testing
//!
//! See [`simple_store::mock`] for transports that let tests run without a server.

use contacts_sample::lifecycle::ContactSystem;
use contacts_sample::model::{contact, Contact};
use serde_json::json;
use simple_store::tracing::setup_tracing;
use simple_store::Record;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting contacts sample");

    let system = ContactSystem::from_env().map_err(|e| e.to_string())?;

    let span = tracing::info_span!("refresh");
    let contacts = async {
        info!("Fetching contacts");
        system.refresh_contacts().await.map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    for contact in &contacts {
        info!(id = ?contact.id, name = %contact.full_name(), "Contact");
    }

    let span = tracing::info_span!("create");
    let created = async {
        let record = Record::new(contact(), system.store().transport().clone());
        record.deserialize(&json!({"first_name": "Tall", "last_name": "Dan"}));
        record.save_resource().await.map(|_| record)
    }
    .instrument(span)
    .await;

    match created {
        Ok(record) => match Contact::from_record(&record) {
            Ok(contact) => info!(id = ?contact.id, "Contact created"),
            Err(e) => error!(error = %e, "Server returned a malformed contact"),
        },
        Err(e) => error!(error = %e, "Contact creation failed"),
    }

    info!("Contacts sample completed");
    Ok(())
}
