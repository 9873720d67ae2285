//! Per-blood-type stock ledger.
//!
//! Quantities are kept in millilitres and never go below zero. Every
//! blood type always has an entry; a ledger loaded from storage that is
//! missing a type reports it as zero and creates it on first adjustment.

use crate::{BloodType, Error, InventoryEntry, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stock levels keyed by blood type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<InventoryEntry>", into = "Vec<InventoryEntry>")]
pub struct Ledger {
    entries: BTreeMap<BloodType, InventoryEntry>,
}

impl Ledger {
    /// Ledger with all eight blood types at zero
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let entries = BloodType::ALL
            .into_iter()
            .map(|blood_type| {
                (
                    blood_type,
                    InventoryEntry {
                        blood_type,
                        quantity_ml: 0,
                        last_updated: now,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Current quantity for a blood type (zero if never stocked)
    pub fn get(&self, blood_type: BloodType) -> i64 {
        self.entries
            .get(&blood_type)
            .map(|e| e.quantity_ml)
            .unwrap_or(0)
    }

    /// Apply a signed adjustment
    ///
    /// Positive deltas restock, negative deltas consume. A withdrawal larger
    /// than the current stock fails without touching the entry.
    pub fn adjust(
        &mut self,
        blood_type: BloodType,
        delta_ml: i64,
        now: DateTime<Utc>,
    ) -> Result<&InventoryEntry> {
        let available_ml = self.get(blood_type);
        let new_quantity = available_ml
            .checked_add(delta_ml)
            .ok_or_else(|| Error::Validation(format!("Adjustment of {}ml overflows", delta_ml)))?;

        if new_quantity < 0 {
            return Err(Error::InsufficientStock {
                blood_type,
                available_ml,
                requested_ml: delta_ml.saturating_neg(),
            });
        }

        let entry = self
            .entries
            .entry(blood_type)
            .or_insert_with(|| InventoryEntry {
                blood_type,
                quantity_ml: 0,
                last_updated: now,
            });
        entry.quantity_ml = new_quantity;
        entry.last_updated = now;

        tracing::debug!(
            "Adjusted {} by {}ml, now {}ml",
            blood_type,
            delta_ml,
            new_quantity
        );
        Ok(entry)
    }

    /// Adjust by blood type label, as received from an untyped source
    pub fn adjust_label(
        &mut self,
        label: &str,
        delta_ml: i64,
        now: DateTime<Utc>,
    ) -> Result<&InventoryEntry> {
        let blood_type = label.parse::<BloodType>().map_err(|e| {
            tracing::error!("Rejected inventory adjustment for unknown blood type {:?}", label);
            e
        })?;
        self.adjust(blood_type, delta_ml, now)
    }

    /// Entry for a blood type, synthesized at zero if missing
    pub fn entry(&self, blood_type: BloodType) -> InventoryEntry {
        self.entries
            .get(&blood_type)
            .cloned()
            .unwrap_or(InventoryEntry {
                blood_type,
                quantity_ml: 0,
                last_updated: DateTime::<Utc>::MIN_UTC,
            })
    }

    /// All eight entries in canonical order
    pub fn entries(&self) -> Vec<InventoryEntry> {
        BloodType::ALL.into_iter().map(|t| self.entry(t)).collect()
    }

    /// Total stock across all blood types
    pub fn total_ml(&self) -> i64 {
        self.entries.values().map(|e| e.quantity_ml).sum()
    }
}

impl From<Vec<InventoryEntry>> for Ledger {
    fn from(list: Vec<InventoryEntry>) -> Self {
        let entries = list.into_iter().map(|e| (e.blood_type, e)).collect();
        Self { entries }
    }
}

impl From<Ledger> for Vec<InventoryEntry> {
    fn from(ledger: Ledger) -> Self {
        ledger.entries.into_values().collect()
    }
}
