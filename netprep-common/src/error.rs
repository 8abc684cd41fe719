//! Error types shared across the netprep workspace

use thiserror::Error;

/// Main error type for county handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// County name outside the closed enumeration
    #[error("unknown county '{name}'{}", suggestion_hint(.suggestion))]
    UnknownCounty {
        name: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

/// Convenience result type for county operations
pub type Result<T> = std::result::Result<T, Error>;
