//! User lookup against the instance's configured accounts.

use crate::config::ConfigMap;
use crate::{InstanceError, LoginError};
use serde::Deserialize;
use std::collections::BTreeMap;

/// An authenticated (resolved) user of the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub name: String,
    pub admin: bool,
    pub display_name: Option<String>,
}

/// Lookup service keyed by username.
///
/// The default implementation reads the `[users.<name>]` tables of the
/// instance configuration; richer directories (the application's own
/// account store) can be swapped in behind this trait.
pub trait UserDirectory {
    /// The system user logged in when no username is requested.
    fn admin(&self) -> Result<UserHandle, InstanceError>;

    fn lookup(&self, name: &str) -> Result<UserHandle, InstanceError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserRecord {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    display_name: Option<String>,
}

/// Directory backed by the `[users]` section of the configuration.
#[derive(Debug, Default)]
pub struct ConfigUserDirectory {
    users: BTreeMap<String, UserRecord>,
}

impl ConfigUserDirectory {
    pub fn from_config(config: &ConfigMap) -> Self {
        let users = config
            .get("users")
            .and_then(|v| v.clone().try_into().ok())
            .unwrap_or_default();
        Self { users }
    }

    fn handle(name: &str, record: &UserRecord) -> UserHandle {
        UserHandle {
            name: name.to_owned(),
            admin: record.admin,
            display_name: record.display_name.clone(),
        }
    }
}

impl UserDirectory for ConfigUserDirectory {
    fn admin(&self) -> Result<UserHandle, InstanceError> {
        self.users
            .iter()
            .find(|(_, record)| record.admin)
            .map(|(name, record)| Self::handle(name, record))
            .ok_or(InstanceError::Login(LoginError::NoAdminAccount))
    }

    fn lookup(&self, name: &str) -> Result<UserHandle, InstanceError> {
        self.users
            .get(name)
            .map(|record| Self::handle(name, record))
            .ok_or_else(|| InstanceError::Login(LoginError::UnknownUser(name.to_owned())))
    }
}
