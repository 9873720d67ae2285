//! Blood bank engine.
//!
//! [`BloodBank`] is the entry point used by the presentation layer. Each
//! operation takes the acting identity explicitly, checks the role's
//! capability and runs as a single store transaction.

use crate::lifecycle;
use crate::{
    donor, Actor, BloodRequest, BloodType, Config, Database, DonationSchedule, DonorProfile,
    DonorSearch, Error, InventoryEntry, InventoryOperation, NewBloodRequest, NewDonorProfile,
    Notification, NotificationId, RequestId, RequestStatus, Result, Role, Store, User, UserId,
};
use chrono::{NaiveDate, Utc};

fn authorize(actor: &Actor, allowed: bool, action: &'static str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        tracing::warn!("Denied {} for {} {}", action, actor.role, actor.user_id);
        Err(Error::Forbidden {
            role: actor.role,
            action,
        })
    }
}

/// Blood bank engine backed by a durable store
#[derive(Clone, Debug)]
pub struct BloodBank {
    store: Store,
    config: Config,
}

impl BloodBank {
    /// Engine using the store in the configured data directory
    pub fn open(config: Config) -> Self {
        let store = Store::in_dir(&config.data.data_dir);
        Self { store, config }
    }

    pub fn with_store(store: Store, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the store with all blood types seeded at zero
    pub fn init(&self) -> Result<bool> {
        self.store.init()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn register_user(&self, username: &str, email: &str, role: Role) -> Result<User> {
        let user = self.store.transaction(|db| {
            let user = User::register(username, email, role, &db.users, Utc::now())?;
            db.users.push(user.clone());
            Ok(user)
        })?;
        tracing::info!("Registered {} {} ({})", user.role, user.username, user.id);
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.store.read(|db| db.user(id).cloned())
    }

    pub fn users(&self) -> Result<Vec<User>> {
        self.store.read(|db| Ok(db.users.clone()))
    }

    /// Resolve an authenticated user id to an acting identity
    pub fn actor(&self, id: UserId) -> Result<Actor> {
        self.user(id).map(|u| Actor::from(&u))
    }

    // ------------------------------------------------------------------
    // Inventory ledger
    // ------------------------------------------------------------------

    /// Current stock for a blood type
    pub fn ledger_get(&self, blood_type: BloodType) -> Result<i64> {
        self.store.read(|db| Ok(db.inventory.get(blood_type)))
    }

    /// Signed stock adjustment; fails without effect if it would go negative
    pub fn adjust(&self, blood_type: BloodType, delta_ml: i64) -> Result<InventoryEntry> {
        let result = self
            .store
            .transaction(|db| db.inventory.adjust(blood_type, delta_ml, Utc::now()).cloned());
        match result {
            Ok(entry) => {
                tracing::info!(
                    "Inventory {} adjusted by {}ml to {}ml",
                    blood_type,
                    delta_ml,
                    entry.quantity_ml
                );
                Ok(entry)
            }
            Err(e) => {
                tracing::warn!("Inventory adjustment for {} refused: {}", blood_type, e);
                Err(e)
            }
        }
    }

    /// Administrative add/remove of stock
    pub fn update_inventory(
        &self,
        actor: &Actor,
        blood_type: BloodType,
        quantity_ml: i64,
        operation: InventoryOperation,
    ) -> Result<InventoryEntry> {
        authorize(actor, actor.role.can_manage_inventory(), "update inventory")?;
        if quantity_ml <= 0 {
            return Err(Error::Validation(format!(
                "Quantity must be positive, got {}ml",
                quantity_ml
            )));
        }
        let delta = match operation {
            InventoryOperation::Add => quantity_ml,
            InventoryOperation::Remove => -quantity_ml,
        };
        self.adjust(blood_type, delta)
    }

    /// All eight inventory entries in canonical order
    pub fn inventory(&self) -> Result<Vec<InventoryEntry>> {
        self.store.read(|db| Ok(db.inventory.entries()))
    }

    // ------------------------------------------------------------------
    // Request lifecycle
    // ------------------------------------------------------------------

    /// Admin users plus configured recipients that are registered users
    fn reviewers(&self, db: &Database) -> Vec<UserId> {
        if !self.config.notifications.notify_admins_on_submit {
            return Vec::new();
        }
        let mut reviewers = db.admin_ids();
        for id in &self.config.notifications.admin_recipients {
            if reviewers.contains(id) {
                continue;
            }
            if db.user(*id).is_ok() {
                reviewers.push(*id);
            } else {
                tracing::warn!("Skipping unknown admin recipient {}", id);
            }
        }
        reviewers
    }

    /// Submit a pending request and alert reviewers
    pub fn submit_request(&self, actor: &Actor, fields: NewBloodRequest) -> Result<RequestId> {
        authorize(actor, actor.role.can_request_blood(), "request blood")?;

        let request = self.store.transaction(|db| {
            db.user(actor.user_id)?;
            let now = Utc::now();
            let request = BloodRequest::submit(actor.user_id, fields, now)?;
            let reviewers = self.reviewers(db);
            lifecycle::notify_reviewers(&mut db.notifications, &reviewers, &request, now);
            db.requests.push(request.clone());
            Ok(request)
        })?;

        tracing::info!(
            "Request {} submitted: {}ml of {}{}",
            request.id,
            request.quantity_ml,
            request.blood_type,
            if request.emergency { " (emergency)" } else { "" }
        );
        Ok(request.id)
    }

    /// Approve a pending request, withdrawing its quantity from stock
    pub fn approve_request(&self, actor: &Actor, id: RequestId) -> Result<()> {
        authorize(actor, actor.role.can_review_requests(), "review blood requests")?;

        let result = self.store.transaction(|db| {
            let (request, ledger, inbox) = db.request_for_review(id)?;
            request.approve(ledger, inbox, Utc::now())?;
            Ok(ledger.get(request.blood_type))
        });

        match result {
            Ok(remaining) => {
                tracing::info!("Request {} approved, {}ml remaining", id, remaining);
                Ok(())
            }
            Err(e @ Error::InvalidState { .. }) => {
                tracing::warn!("Illegal transition on request {}: {}", id, e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Approval of request {} refused: {}", id, e);
                Err(e)
            }
        }
    }

    /// Reject a pending request; inventory is untouched
    pub fn reject_request(&self, actor: &Actor, id: RequestId) -> Result<()> {
        authorize(actor, actor.role.can_review_requests(), "review blood requests")?;

        self.store
            .transaction(|db| {
                let (request, _, inbox) = db.request_for_review(id)?;
                request.reject(inbox, Utc::now())?;
                Ok(())
            })
            .map_err(|e| {
                tracing::warn!("Rejection of request {} refused: {}", id, e);
                e
            })?;

        tracing::info!("Request {} rejected", id);
        Ok(())
    }

    pub fn request(&self, id: RequestId) -> Result<BloodRequest> {
        self.store.read(|db| db.request(id).cloned())
    }

    /// A recipient's own requests, newest first
    pub fn requests_for_recipient(&self, recipient: UserId) -> Result<Vec<BloodRequest>> {
        self.store.read(|db| {
            let mut list: Vec<_> = db
                .requests
                .iter()
                .filter(|r| r.recipient_id == recipient)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(list)
        })
    }

    /// Pending requests in dashboard order: emergencies, then newest
    pub fn review_queue(&self) -> Result<Vec<BloodRequest>> {
        self.store.read(|db| {
            let mut list: Vec<_> = db
                .requests
                .iter()
                .filter(|r| r.status == RequestStatus::Pending)
                .cloned()
                .collect();
            lifecycle::sort_for_review(&mut list);
            Ok(list)
        })
    }

    /// Every request, newest first
    pub fn all_requests(&self) -> Result<Vec<BloodRequest>> {
        self.store.read(|db| {
            let mut list = db.requests.clone();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(list)
        })
    }

    // ------------------------------------------------------------------
    // Donors
    // ------------------------------------------------------------------

    pub fn create_donor_profile(&self, actor: &Actor, fields: NewDonorProfile) -> Result<DonorProfile> {
        authorize(actor, actor.role.can_donate(), "create a donor profile")?;

        let profile = self.store.transaction(|db| {
            db.user(actor.user_id)?;
            if db.donor(actor.user_id).is_some() {
                return Err(Error::Duplicate(format!(
                    "donor profile for {}",
                    actor.user_id
                )));
            }
            let profile = DonorProfile::create(actor.user_id, fields, Utc::now());
            db.donors.push(profile.clone());
            Ok(profile)
        })?;

        tracing::info!("Created {} donor profile for {}", profile.blood_type, actor.user_id);
        Ok(profile)
    }

    pub fn donor_profile(&self, user_id: UserId) -> Result<DonorProfile> {
        self.store.read(|db| {
            db.donor(user_id)
                .cloned()
                .ok_or_else(|| Error::not_found("Donor profile", user_id))
        })
    }

    /// Whether the donor may donate on `proposed`
    pub fn can_schedule(&self, user_id: UserId, proposed: NaiveDate) -> Result<bool> {
        let profile = self.donor_profile(user_id)?;
        Ok(self
            .config
            .eligibility
            .window()
            .can_schedule(profile.last_donation, proposed))
    }

    /// Book a donation, moving the donor's last donation forward
    pub fn schedule_donation(&self, actor: &Actor, proposed: NaiveDate) -> Result<DonationSchedule> {
        authorize(actor, actor.role.can_donate(), "schedule a donation")?;
        let window = self.config.eligibility.window();

        let schedule = self
            .store
            .transaction(|db| {
                let profile = db
                    .donor_mut(actor.user_id)
                    .ok_or_else(|| Error::not_found("Donor profile", actor.user_id))?;
                let schedule = profile.schedule(&window, proposed, Utc::now())?;
                db.schedules.push(schedule.clone());
                Ok(schedule)
            })
            .map_err(|e| {
                tracing::warn!("Donation on {} refused for {}: {}", proposed, actor.user_id, e);
                e
            })?;

        tracing::info!("Donation {} scheduled on {}", schedule.id, proposed);
        Ok(schedule)
    }

    pub fn schedules_for(&self, donor_id: UserId) -> Result<Vec<DonationSchedule>> {
        self.store.read(|db| {
            Ok(db
                .schedules
                .iter()
                .filter(|s| s.donor_id == donor_id)
                .cloned()
                .collect())
        })
    }

    pub fn search_donors(&self, filter: &DonorSearch) -> Result<Vec<DonorProfile>> {
        self.store.read(|db| Ok(donor::search(&db.donors, filter)))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Append an unread notification
    pub fn emit(&self, user_id: UserId, message: &str) -> Result<NotificationId> {
        self.store.transaction(|db| {
            db.user(user_id)?;
            Ok(db.notifications.emit(user_id, message, Utc::now()))
        })
    }

    pub fn list_unread(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.store.read(|db| Ok(db.notifications.list_unread(user_id)))
    }

    /// Inbox view, newest first
    pub fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.store.read(|db| Ok(db.notifications.for_user(user_id)))
    }

    pub fn mark_read(&self, actor: &Actor, id: NotificationId) -> Result<()> {
        self.store
            .transaction(|db| db.notifications.mark_read(actor.user_id, id))
    }

    pub fn mark_all_read(&self, actor: &Actor) -> Result<usize> {
        self.store
            .transaction(|db| Ok(db.notifications.mark_all_read(actor.user_id)))
    }
}
