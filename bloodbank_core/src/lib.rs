#![forbid(unsafe_code)]

//! Core domain model and business logic for the Bloodbank system.
//!
//! This crate provides:
//! - Domain types (blood types, roles, donors, requests, notifications)
//! - Inventory ledger with a non-negative stock invariant
//! - Donation eligibility window
//! - Blood request lifecycle
//! - Notification inbox
//! - Transactional file-backed store
//! - CSV reports

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod ledger;
pub mod eligibility;
pub mod notify;
pub mod lifecycle;
pub mod users;
pub mod donor;
pub mod store;
pub mod report;
pub mod bank;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use ledger::Ledger;
pub use eligibility::{
    can_schedule, EligibilityWindow, MAX_DONATION_INTERVAL_DAYS, MIN_DONATION_INTERVAL_DAYS,
};
pub use notify::Inbox;
pub use store::{Database, Store};
pub use bank::BloodBank;
