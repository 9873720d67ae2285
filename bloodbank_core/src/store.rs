//! Durable store with file locking.
//!
//! The full database is one JSON snapshot. Every mutation runs inside
//! [`Store::transaction`]: an exclusive lock on a sidecar lock file is held
//! while the snapshot is loaded, mutated and written back through a temp
//! file that is fsynced and renamed over the original. If the closure
//! fails nothing is written, so ledger, request and notification changes
//! commit together or not at all.

use crate::notify::Inbox;
use crate::{
    BloodRequest, DonationSchedule, DonorProfile, Error, Ledger, RequestId, Result, Role, User,
    UserId,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the store inside the data directory
pub const STORE_FILE: &str = "bloodbank.json";

/// Complete persisted state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub donors: Vec<DonorProfile>,
    #[serde(default = "seeded_ledger")]
    pub inventory: Ledger,
    #[serde(default)]
    pub requests: Vec<BloodRequest>,
    #[serde(default)]
    pub notifications: Inbox,
    #[serde(default)]
    pub schedules: Vec<DonationSchedule>,
}

fn seeded_ledger() -> Ledger {
    Ledger::seeded(Utc::now())
}

impl Database {
    /// Empty database with every blood type stocked at zero
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            users: Vec::new(),
            donors: Vec::new(),
            inventory: Ledger::seeded(now),
            requests: Vec::new(),
            notifications: Inbox::default(),
            schedules: Vec::new(),
        }
    }

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::not_found("User", id))
    }

    pub fn request(&self, id: RequestId) -> Result<&BloodRequest> {
        self.requests
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found("Request", id))
    }

    /// Request together with the ledger and inbox, borrowed disjointly
    pub fn request_for_review(
        &mut self,
        id: RequestId,
    ) -> Result<(&mut BloodRequest, &mut Ledger, &mut Inbox)> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found("Request", id))?;
        Ok((request, &mut self.inventory, &mut self.notifications))
    }

    pub fn donor(&self, user_id: UserId) -> Option<&DonorProfile> {
        self.donors.iter().find(|d| d.user_id == user_id)
    }

    pub fn donor_mut(&mut self, user_id: UserId) -> Option<&mut DonorProfile> {
        self.donors.iter_mut().find(|d| d.user_id == user_id)
    }

    /// Ids of every user holding the admin role
    pub fn admin_ids(&self) -> Vec<UserId> {
        self.users
            .iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| u.id)
            .collect()
    }
}

/// Handle to the on-disk store
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Store backed by the given snapshot file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the standard file name inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::open(data_dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Create a seeded store if none exists; returns true when created
    pub fn init(&self) -> Result<bool> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = if self.path.exists() {
            self.load_unlocked().map(|_| false)
        } else {
            self.save_unlocked(&Database::new(Utc::now())).map(|_| true)
        };

        lock.unlock()?;
        if let Ok(true) = result {
            tracing::info!("Initialized store at {:?}", self.path);
        }
        result
    }

    /// Run a read-only query under a shared lock
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_shared()?;

        let result = self.load_unlocked().and_then(|db| f(&db));

        let unlocked = lock.unlock();
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// Run a read-modify-write unit of work under an exclusive lock
    ///
    /// The snapshot is persisted only when `f` returns `Ok`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = self.load_unlocked().and_then(|mut db| {
            let value = f(&mut db)?;
            self.save_unlocked(&db)?;
            Ok(value)
        });

        let unlocked = lock.unlock();
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// Load the snapshot; caller must hold the lock
    ///
    /// A missing file yields a fresh seeded database. A corrupt file is an
    /// error: silently replacing it would wipe the inventory.
    fn load_unlocked(&self) -> Result<Database> {
        if !self.path.exists() {
            tracing::debug!("No store at {:?}, starting from seeded state", self.path);
            return Ok(Database::new(Utc::now()));
        }

        let mut contents = String::new();
        let file = File::open(&self.path)?;
        std::io::BufReader::new(&file).read_to_string(&mut contents)?;

        serde_json::from_str::<Database>(&contents).map_err(|e| {
            tracing::error!("Store file {:?} is corrupt: {}", self.path, e);
            Error::Store(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Atomically replace the snapshot; caller must hold the lock
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn save_unlocked(&self, db: &Database) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store("store path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(db)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", self.path);
        Ok(())
    }
}
