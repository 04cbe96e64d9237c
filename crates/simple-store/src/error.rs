//! # Store Errors
//!
//! This module defines the error types used throughout the store. Transport
//! failures are kept in their own enum so they can be handed back to the caller
//! exactly as the transport produced them.

use serde_json::Value;

/// Errors produced by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}")]
    Status { status: u16, body: Option<Value> },
    #[error("Network error: {0}")]
    Network(String),
    /// The response body was not valid JSON.
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Transport disconnected")]
    Disconnected,
    /// A mock transport received a request it was not told to expect.
    #[error("Unexpected request: {0}")]
    Unexpected(String),
}

/// Errors that can occur while working with records and collections.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// `validate()` rejected the record; no request was issued.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Neither the caller nor its model variant declares a `url`.
    #[error("No url configured for {model}")]
    UnresolvedUrl { model: String },

    /// A configuration key needed for serialization is unset.
    #[error("{model} has no {key} configured")]
    MissingConfiguration { model: String, key: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The background task driving a request panicked or was cancelled.
    #[error("Request task failed: {0}")]
    Task(String),
}
