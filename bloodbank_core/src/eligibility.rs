//! Donation interval rules.
//!
//! A donor may donate again once at least `min_interval_days` calendar days
//! have passed since the last donation. The stored last donation carries a
//! time of day; it is truncated to its date before comparing so a partial
//! day never counts against the donor.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Minimum number of days between successive donations
pub const MIN_DONATION_INTERVAL_DAYS: i64 = 56;

/// Largest interval a configuration may set (ten years)
pub const MAX_DONATION_INTERVAL_DAYS: i64 = 3650;

/// Interval policy applied when scheduling donations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EligibilityWindow {
    pub min_interval_days: i64,
}

impl Default for EligibilityWindow {
    fn default() -> Self {
        Self {
            min_interval_days: MIN_DONATION_INTERVAL_DAYS,
        }
    }
}

impl EligibilityWindow {
    pub fn new(min_interval_days: i64) -> Self {
        Self { min_interval_days }
    }

    /// Whether a donation on `proposed` is allowed
    pub fn can_schedule(&self, last_donation: Option<NaiveDateTime>, proposed: NaiveDate) -> bool {
        self.check(last_donation, proposed).is_ok()
    }

    /// Like [`can_schedule`](Self::can_schedule) but explains a refusal
    ///
    /// Returns `Validation` when the proposed date precedes the last
    /// donation and `Ineligible` when it falls inside the window.
    pub fn check(&self, last_donation: Option<NaiveDateTime>, proposed: NaiveDate) -> Result<()> {
        let Some(last) = last_donation.map(|dt| dt.date()) else {
            return Ok(());
        };

        let days = (proposed - last).num_days();
        if days < 0 {
            return Err(Error::Validation(format!(
                "Proposed date {} is before the last donation on {}",
                proposed, last
            )));
        }
        if days < self.min_interval_days {
            return Err(Error::Ineligible {
                next_eligible: self.window_end(last)?,
            });
        }
        Ok(())
    }

    /// First date on which the donor may donate again
    pub fn next_eligible(&self, last_donation: Option<NaiveDateTime>) -> Result<Option<NaiveDate>> {
        last_donation
            .map(|dt| self.window_end(dt.date()))
            .transpose()
    }

    fn window_end(&self, last: NaiveDate) -> Result<NaiveDate> {
        Duration::try_days(self.min_interval_days)
            .and_then(|interval| last.checked_add_signed(interval))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Interval of {} days from {} is out of range",
                    self.min_interval_days, last
                ))
            })
    }
}

/// Check against the standard 56-day window
pub fn can_schedule(last_donation: Option<NaiveDateTime>, proposed: NaiveDate) -> bool {
    EligibilityWindow::default().can_schedule(last_donation, proposed)
}
