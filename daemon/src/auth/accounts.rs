use crate::auth::gate::GateError;
use crate::storage::file::{Config, FileIoWithBackup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use warden_protocol::user::{PendingRegistrationInfo, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&PendingRegistration> for PendingRegistrationInfo {
    fn from(value: &PendingRegistration) -> Self {
        Self {
            username: value.username.clone(),
            email: value.email.clone(),
            created_at: value.created_at,
        }
    }
}

pub struct AccountsFile;
impl FileIoWithBackup for AccountsFile {}
impl Config for AccountsFile {
    type ConfigType = BTreeMap<String, Account>;
}

pub struct PendingFile;
impl FileIoWithBackup for PendingFile {}
impl Config for PendingFile {
    type ConfigType = BTreeMap<String, PendingRegistration>;
}

#[derive(Debug, Clone)]
pub struct AccountPaths {
    pub accounts: PathBuf,
    pub pending: PathBuf,
}

impl AccountPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            accounts: dir.join("users.json"),
            pending: dir.join("pending_registrations.json"),
        }
    }
}

/// Approved accounts and pending registrations. A username lives in at most one
/// of the two maps.
#[derive(Debug, Default)]
pub struct AccountBook {
    accounts: BTreeMap<String, Account>,
    pending: BTreeMap<String, PendingRegistration>,
}

impl AccountBook {
    pub fn load(paths: &AccountPaths) -> Self {
        let accounts = AccountsFile::load_config_or_default(&paths.accounts, BTreeMap::new);
        let mut pending = PendingFile::load_config_or_default(&paths.pending, BTreeMap::new);

        // a hand edited store may list someone twice; the account wins
        pending.retain(|name, _| !accounts.contains_key(name));
        Self { accounts, pending }
    }

    pub fn save(&self, paths: &AccountPaths) -> anyhow::Result<()> {
        AccountsFile::save_config(&paths.accounts, &self.accounts)?;
        PendingFile::save_config(&paths.pending, &self.pending)?;
        Ok(())
    }

    pub fn is_taken(&self, username: &str) -> bool {
        self.accounts.contains_key(username) || self.pending.contains_key(username)
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn pending(&self, username: &str) -> Option<&PendingRegistration> {
        self.pending.get(username)
    }

    pub fn has_accounts(&self) -> bool {
        !self.accounts.is_empty()
    }

    pub fn insert_account(&mut self, account: Account) -> Result<(), GateError> {
        if self.is_taken(&account.username) {
            return Err(GateError::Conflict(account.username));
        }
        self.accounts.insert(account.username.clone(), account);
        Ok(())
    }

    pub fn add_pending(&mut self, registration: PendingRegistration) -> Result<(), GateError> {
        if self.is_taken(&registration.username) {
            return Err(GateError::Conflict(registration.username));
        }
        self.pending
            .insert(registration.username.clone(), registration);
        Ok(())
    }

    /// Moves a pending registration into the approved accounts as a plain user.
    pub fn approve(&mut self, username: &str) -> Result<&Account, GateError> {
        let registration = self
            .pending
            .remove(username)
            .ok_or_else(|| GateError::NotFound(username.to_string()))?;

        let account = Account {
            username: registration.username,
            password_hash: registration.password_hash,
            role: Role::User,
            approved: true,
        };
        let entry = self.accounts.entry(account.username.clone());
        Ok(entry.or_insert(account))
    }

    pub fn reject(&mut self, username: &str) -> Result<PendingRegistration, GateError> {
        self.pending
            .remove(username)
            .ok_or_else(|| GateError::NotFound(username.to_string()))
    }

    pub fn list_pending(&self) -> Vec<PendingRegistrationInfo> {
        let mut list: Vec<_> = self.pending.values().map(Into::into).collect();
        list.sort_by_key(|info: &PendingRegistrationInfo| info.created_at);
        list
    }
}
