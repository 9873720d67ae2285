//! Error types for the bloodbank_core library.

use crate::{BloodType, RequestId, RequestStatus, Role};
use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for bloodbank_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input failed shape or range checks
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stock withdrawal would drive the ledger negative
    #[error(
        "Insufficient {blood_type} stock: {available_ml}ml available, {requested_ml}ml requested"
    )]
    InsufficientStock {
        blood_type: BloodType,
        available_ml: i64,
        requested_ml: i64,
    },

    /// Request is no longer pending
    #[error("Request {request_id} is already {status}")]
    InvalidState {
        request_id: RequestId,
        status: RequestStatus,
    },

    /// Blood type label outside the eight canonical values
    #[error("Invalid blood type: {0:?}")]
    InvalidBloodType(String),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Donor is still inside the donation interval
    #[error("Donor is not eligible until {next_eligible}")]
    Ineligible { next_eligible: NaiveDate },

    /// Acting identity lacks the capability for the operation
    #[error("A {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    /// Uniqueness constraint violated
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store file missing, unreadable or corrupt
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for deterministic business-rule outcomes, false for infrastructure faults.
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::InsufficientStock { .. }
                | Error::InvalidState { .. }
                | Error::InvalidBloodType(_)
                | Error::NotFound { .. }
                | Error::Ineligible { .. }
                | Error::Forbidden { .. }
                | Error::Duplicate(_)
        )
    }
}
