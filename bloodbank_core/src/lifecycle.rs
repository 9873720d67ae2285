//! Blood request state machine.
//!
//! ```text
//! submit() ──> Pending ──approve()──> Approved
//!                  │
//!                  └─────reject()───> Rejected
//! ```
//!
//! Approved and Rejected are terminal. Approval withdraws the requested
//! quantity from the ledger; if stock is short the request stays pending
//! and nothing is mutated. `Completed` exists in stored data but no
//! transition reaches it.

use crate::notify::{self, Inbox};
use crate::{
    BloodRequest, Error, Ledger, NewBloodRequest, NotificationId, RequestId, RequestStatus,
    Result, UserId,
};
use chrono::{DateTime, Utc};

impl BloodRequest {
    /// Validate fields and create a pending request
    pub fn submit(recipient_id: UserId, fields: NewBloodRequest, now: DateTime<Utc>) -> Result<Self> {
        if fields.quantity_ml <= 0 {
            return Err(Error::Validation(format!(
                "Quantity must be positive, got {}ml",
                fields.quantity_ml
            )));
        }
        let hospital_name = fields.hospital_name.trim().to_string();
        if hospital_name.is_empty() {
            return Err(Error::Validation("Hospital name is required".into()));
        }
        let contact_number = fields.contact_number.trim().to_string();
        if contact_number.is_empty() {
            return Err(Error::Validation("Contact number is required".into()));
        }

        Ok(BloodRequest {
            id: RequestId::new(),
            recipient_id,
            blood_type: fields.blood_type,
            quantity_ml: fields.quantity_ml,
            hospital_name,
            contact_number,
            emergency: fields.emergency,
            status: RequestStatus::Pending,
            notes: fields.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
        })
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidState {
                request_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Approve, consuming stock and notifying the recipient
    pub fn approve(
        &mut self,
        ledger: &mut Ledger,
        inbox: &mut Inbox,
        now: DateTime<Utc>,
    ) -> Result<NotificationId> {
        self.ensure_pending()?;
        ledger.adjust(self.blood_type, -self.quantity_ml, now)?;

        self.status = RequestStatus::Approved;
        self.updated_at = now;
        let id = inbox.emit(self.recipient_id, notify::request_approved_message(self), now);
        Ok(id)
    }

    /// Reject and notify the recipient; inventory is untouched
    pub fn reject(&mut self, inbox: &mut Inbox, now: DateTime<Utc>) -> Result<NotificationId> {
        self.ensure_pending()?;

        self.status = RequestStatus::Rejected;
        self.updated_at = now;
        let id = inbox.emit(self.recipient_id, notify::request_rejected_message(self), now);
        Ok(id)
    }
}

/// Tell every reviewer about a newly submitted request
pub fn notify_reviewers(
    inbox: &mut Inbox,
    reviewers: &[UserId],
    request: &BloodRequest,
    now: DateTime<Utc>,
) -> Vec<NotificationId> {
    let message = notify::request_submitted_message(request);
    reviewers
        .iter()
        .map(|&reviewer| inbox.emit(reviewer, message.clone(), now))
        .collect()
}

/// Dashboard ordering: emergencies first, then newest first
pub fn sort_for_review(requests: &mut [BloodRequest]) {
    requests.sort_by(|a, b| {
        b.emergency
            .cmp(&a.emergency)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
