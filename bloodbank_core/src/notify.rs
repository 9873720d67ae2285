//! Notification inbox.
//!
//! Notifications are appended unread and only ever change by being marked
//! read. Delivery is at-least-attempted: the append happens inside the same
//! store transaction as the transition that caused it.

use crate::{BloodRequest, Error, Notification, NotificationId, Result, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only list of notifications for all users
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inbox {
    notifications: Vec<Notification>,
}

impl Inbox {
    /// Append an unread notification for a user
    pub fn emit(
        &mut self,
        user_id: UserId,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> NotificationId {
        let notification = Notification {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            read: false,
            created_at: now,
        };
        let id = notification.id;
        tracing::debug!("Notification {} queued for user {}", id, user_id);
        self.notifications.push(notification);
        id
    }

    /// Unread notifications for a user, oldest first
    pub fn list_unread(&self, user_id: UserId) -> Vec<Notification> {
        self.notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .cloned()
            .collect()
    }

    /// All notifications for a user, newest first
    pub fn for_user(&self, user_id: UserId) -> Vec<Notification> {
        let mut list: Vec<_> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Mark one notification read; only its owner may do so
    pub fn mark_read(&mut self, owner: UserId, id: NotificationId) -> Result<()> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == owner)
            .ok_or_else(|| Error::not_found("Notification", id))?;
        notification.read = true;
        Ok(())
    }

    /// Mark every notification for a user read, returning how many changed
    pub fn mark_all_read(&mut self, owner: UserId) -> usize {
        let mut count = 0;
        for n in self
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == owner && !n.read)
        {
            n.read = true;
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

/// Message sent to reviewers when a request is submitted
pub fn request_submitted_message(request: &BloodRequest) -> String {
    let prefix = if request.emergency { "EMERGENCY: " } else { "" };
    format!(
        "{}New blood request: {}ml of {} for {}",
        prefix, request.quantity_ml, request.blood_type, request.hospital_name
    )
}

/// Message sent to the recipient when a request is approved
pub fn request_approved_message(request: &BloodRequest) -> String {
    format!(
        "Your blood request for {}ml of {} has been approved.",
        request.quantity_ml, request.blood_type
    )
}

/// Message sent to the recipient when a request is rejected
pub fn request_rejected_message(request: &BloodRequest) -> String {
    format!(
        "Your blood request for {}ml of {} has been rejected.",
        request.quantity_ml, request.blood_type
    )
}
