//! Donor profiles, donation scheduling and donor search.

use crate::eligibility::EligibilityWindow;
use crate::{
    Availability, DonationSchedule, DonorProfile, DonorSearch, NewDonorProfile, Result,
    ScheduleId, ScheduleStatus, UserId,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DonorProfile {
    /// Fresh profile: available, no donations counted yet
    pub fn create(user_id: UserId, fields: NewDonorProfile, now: DateTime<Utc>) -> Self {
        DonorProfile {
            user_id,
            blood_type: fields.blood_type,
            last_donation: fields
                .last_donation
                .map(|d| d.and_time(NaiveTime::MIN)),
            medical_conditions: non_empty(fields.medical_conditions),
            availability: Availability::Available,
            total_donations: 0,
            address: non_empty(fields.address),
            city: non_empty(fields.city),
            state: non_empty(fields.state),
            zip_code: non_empty(fields.zip_code),
            created_at: now,
        }
    }

    /// Schedule a donation if the interval allows it
    ///
    /// On success the scheduled date becomes the last donation and the
    /// donation counter goes up by one.
    pub fn schedule(
        &mut self,
        window: &EligibilityWindow,
        proposed: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DonationSchedule> {
        window.check(self.last_donation, proposed)?;

        self.last_donation = Some(proposed.and_time(NaiveTime::MIN));
        self.total_donations += 1;

        Ok(DonationSchedule {
            id: ScheduleId::new(),
            donor_id: self.user_id,
            scheduled_date: proposed,
            status: ScheduleStatus::Scheduled,
            created_at: now,
        })
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

impl DonorSearch {
    /// Whether a profile satisfies every filter that is set
    pub fn matches(&self, profile: &DonorProfile) -> bool {
        if let Some(blood_type) = self.blood_type {
            if profile.blood_type != blood_type {
                return false;
            }
        }
        if let Some(ref city) = self.city {
            if !contains_ignore_case(profile.city.as_deref(), city) {
                return false;
            }
        }
        if let Some(ref state) = self.state {
            if !contains_ignore_case(profile.state.as_deref(), state) {
                return false;
            }
        }
        if let Some(ref zip) = self.zip_code {
            if profile.zip_code.as_deref() != Some(zip.trim()) {
                return false;
            }
        }
        true
    }
}

/// Donors matching the filter; no filter means no search
pub fn search(donors: &[DonorProfile], filter: &DonorSearch) -> Vec<DonorProfile> {
    if filter.is_empty() {
        return Vec::new();
    }
    donors
        .iter()
        .filter(|d| filter.matches(d))
        .cloned()
        .collect()
}
