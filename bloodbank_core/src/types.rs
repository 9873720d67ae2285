//! Core domain types for the blood bank.
//!
//! This module defines the fundamental types used throughout the system:
//! - Blood types and roles
//! - Identifiers and the acting identity
//! - Donor profiles and donation schedules
//! - Inventory entries, blood requests and notifications

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Blood Types
// ============================================================================

/// One of the eight canonical ABO/Rh combinations
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodType {
    /// All blood types in canonical display order
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::AbPos,
        BloodType::AbNeg,
        BloodType::OPos,
        BloodType::ONeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_ascii_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|t| t.as_str() == label)
            .ok_or_else(|| Error::InvalidBloodType(s.to_string()))
    }
}

// ============================================================================
// Roles and Identity
// ============================================================================

/// Role of a registered user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Donor,
    Recipient,
    Admin,
}

impl Role {
    pub fn can_manage_inventory(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_review_requests(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_request_blood(&self) -> bool {
        matches!(self, Role::Recipient)
    }

    pub fn can_donate(&self) -> bool {
        matches!(self, Role::Donor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Donor => "donor",
            Role::Recipient => "recipient",
            Role::Admin => "admin",
        };
        f.pad(s)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "donor" => Ok(Role::Donor),
            "recipient" => Ok(Role::Recipient),
            "admin" => Ok(Role::Admin),
            other => Err(Error::Validation(format!("Unknown role: {}", other))),
        }
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| Error::Validation(format!("Invalid id {:?}: {}", s, e)))
            }
        }
    };
}

id_type!(
    /// Registered user identifier
    UserId
);
id_type!(
    /// Blood request identifier
    RequestId
);
id_type!(
    /// Notification identifier
    NotificationId
);
id_type!(
    /// Donation schedule identifier
    ScheduleId
);

/// A registered user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Already-authenticated identity passed into every gated operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            user_id: user.id,
            role: user.role,
        }
    }
}

// ============================================================================
// Donors
// ============================================================================

/// Whether a donor is currently accepting donation contacts
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
}

/// Donor profile, one per donor user
///
/// `last_donation` and `total_donations` are only mutated by scheduling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DonorProfile {
    pub user_id: UserId,
    pub blood_type: BloodType,
    pub last_donation: Option<NaiveDateTime>,
    pub medical_conditions: Option<String>,
    pub availability: Availability,
    pub total_donations: u32,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a donor profile
#[derive(Clone, Debug)]
pub struct NewDonorProfile {
    pub blood_type: BloodType,
    pub last_donation: Option<NaiveDate>,
    pub medical_conditions: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Donor search filters; empty filters match nothing
#[derive(Clone, Debug, Default)]
pub struct DonorSearch {
    pub blood_type: Option<BloodType>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl DonorSearch {
    pub fn is_empty(&self) -> bool {
        self.blood_type.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
    }
}

/// Donation schedule status
///
/// Only `Scheduled` is ever assigned; `Completed` and `Cancelled` are kept
/// for stored data compatibility but no operation sets them yet.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// A scheduled donation; one row per scheduling event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DonationSchedule {
    pub id: ScheduleId,
    pub donor_id: UserId,
    pub scheduled_date: NaiveDate,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Inventory
// ============================================================================

/// Stock level for one blood type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryEntry {
    pub blood_type: BloodType,
    pub quantity_ml: i64,
    pub last_updated: DateTime<Utc>,
}

/// Direction of an administrative inventory update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryOperation {
    Add,
    Remove,
}

// ============================================================================
// Requests
// ============================================================================

/// Blood request status
///
/// `Completed` is declared but no transition reaches it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Completed => "completed",
        };
        f.pad(s)
    }
}

/// A request for blood from a recipient
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: RequestId,
    pub recipient_id: UserId,
    pub blood_type: BloodType,
    pub quantity_ml: i64,
    pub hospital_name: String,
    pub contact_number: String,
    pub emergency: bool,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields submitted with a new blood request
#[derive(Clone, Debug)]
pub struct NewBloodRequest {
    pub blood_type: BloodType,
    pub quantity_ml: i64,
    pub hospital_name: String,
    pub contact_number: String,
    pub emergency: bool,
    pub notes: Option<String>,
}

// ============================================================================
// Notifications
// ============================================================================

/// A user-facing message; append-only apart from the read flag
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
