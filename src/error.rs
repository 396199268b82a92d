//! Errors surfaced to callers of the organizer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A store name (and optional postal code) matched nothing
    #[error("store '{name}'{} not found", postal_suffix(.postal_code))]
    StoreNotFound {
        name: String,
        postal_code: Option<String>,
    },

    /// Malformed store identifier (blank name, non-positive id, bad ZIP)
    #[error("invalid store identifier: {0}")]
    InvalidStore(String),

    /// Label outside the closed category set
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Infrastructure failure (SQLite, IO)
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

fn postal_suffix(postal_code: &Option<String>) -> String {
    match postal_code {
        Some(code) => format!(" with postal code '{}'", code),
        None => String::new(),
    }
}
