//! The version-bound handle driven through the boot lifecycle.

use crate::config::ConfigMap;
use crate::database::{ConnectionHandle, DriverRegistry};
use crate::locate::InstancePath;
use crate::metadata::{InfoProperty, ReleaseInfo};
use crate::users::{ConfigUserDirectory, UserDirectory, UserHandle};
use crate::InstanceError;
use tracing::debug;

/// Lifecycle operations of one resolved Atrium instance, one operation per
/// boot level beyond the base level.
///
/// Implementations are created exclusively by the handler registry; the
/// kernel owns one handle per boot attempt and invokes the operations in
/// level order. Operations cache their results; a failed operation leaves
/// earlier results intact.
pub trait Instance: std::fmt::Debug {
    fn path(&self) -> &InstancePath;

    /// The version family identifier this handler was registered under.
    fn family(&self) -> &'static str;

    /// Marks the instance active for the current process. Idempotent.
    fn bind_root(&mut self);

    fn entry_bound(&self) -> bool;

    fn load_configuration(&mut self, refresh: bool) -> Result<&ConfigMap, InstanceError>;

    fn configuration(&self) -> Option<&ConfigMap>;

    fn connect_database(&mut self) -> Result<&ConnectionHandle, InstanceError>;

    fn connection(&self) -> Option<&ConnectionHandle>;

    /// The external application's own full initialization; opaque here.
    fn boot_application(&mut self) -> Result<(), InstanceError>;

    /// Resolves the admin user when `username` is empty, else looks the
    /// name up in the instance's user directory.
    fn login(&mut self, username: &str) -> Result<&UserHandle, InstanceError>;

    fn user(&self) -> Option<&UserHandle>;

    /// One of the closed set of release metadata properties. Cached until
    /// `refresh` forces a re-read of the release file.
    fn info(&mut self, property: &str, refresh: bool) -> Result<String, InstanceError>;
}

/// Shared per-instance state and default lifecycle behavior.
///
/// Version handlers own one of these and delegate; a handler overrides a
/// lifecycle operation only where its version family diverges.
#[derive(Debug)]
pub struct InstanceState {
    path: InstancePath,
    drivers: DriverRegistry,
    entry_bound: bool,
    application_booted: bool,
    release: Option<ReleaseInfo>,
    config: Option<ConfigMap>,
    connection: Option<ConnectionHandle>,
    user: Option<UserHandle>,
}

impl InstanceState {
    pub fn new(path: InstancePath) -> Self {
        Self {
            path,
            drivers: DriverRegistry::builtin(),
            entry_bound: false,
            application_booted: false,
            release: None,
            config: None,
            connection: None,
            user: None,
        }
    }

    pub fn path(&self) -> &InstancePath {
        &self.path
    }

    pub fn bind_root(&mut self) {
        if !self.entry_bound {
            debug!(root = %self.path, "entry flag bound");
            self.entry_bound = true;
        }
    }

    pub fn entry_bound(&self) -> bool {
        self.entry_bound
    }

    pub fn load_configuration(&mut self, refresh: bool) -> Result<&ConfigMap, InstanceError> {
        self.load_configuration_with(refresh, ConfigMap::load)
    }

    /// Base file only; legacy installs without an override layer.
    pub fn load_configuration_base(&mut self, refresh: bool) -> Result<&ConfigMap, InstanceError> {
        self.load_configuration_with(refresh, ConfigMap::load_base)
    }

    fn load_configuration_with(
        &mut self,
        refresh: bool,
        loader: fn(&InstancePath) -> Result<ConfigMap, InstanceError>,
    ) -> Result<&ConfigMap, InstanceError> {
        let config = match (refresh, self.config.take()) {
            (false, Some(cached)) => cached,
            _ => loader(&self.path)?,
        };
        Ok(self.config.insert(config))
    }

    pub fn configuration(&self) -> Option<&ConfigMap> {
        self.config.as_ref()
    }

    /// Derives a connection from the already-loaded configuration.
    pub fn connect_database(&mut self) -> Result<&ConnectionHandle, InstanceError> {
        let Some(config) = &self.config else {
            return Err(InstanceError::ConfigurationMissing(
                "configuration not loaded".to_owned(),
            ));
        };
        let settings = config.database()?;
        let handle = self.drivers.connect(&settings)?;
        Ok(self.connection.insert(handle))
    }

    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.connection.as_ref()
    }

    pub fn boot_application(&mut self) -> Result<(), InstanceError> {
        if !self.application_booted {
            debug!(root = %self.path, "application initialized");
            self.application_booted = true;
        }
        Ok(())
    }

    pub fn application_booted(&self) -> bool {
        self.application_booted
    }

    pub fn login(&mut self, username: &str) -> Result<&UserHandle, InstanceError> {
        let Some(config) = &self.config else {
            return Err(InstanceError::ConfigurationMissing(
                "configuration not loaded".to_owned(),
            ));
        };
        let directory = ConfigUserDirectory::from_config(config);
        let user = if username.is_empty() {
            directory.admin()?
        } else {
            directory.lookup(username)?
        };
        debug!(user = %user.name, admin = user.admin, "login resolved");
        Ok(self.user.insert(user))
    }

    pub fn user(&self) -> Option<&UserHandle> {
        self.user.as_ref()
    }

    pub fn info(&mut self, property: &str, refresh: bool) -> Result<String, InstanceError> {
        let property = InfoProperty::parse(property)?;
        let release = match (refresh, self.release.take()) {
            (false, Some(cached)) => cached,
            _ => ReleaseInfo::read(&self.path)?,
        };
        let release = self.release.insert(release);
        match release.get(property) {
            Some(value) => Ok(value.to_owned()),
            None => Err(InstanceError::UnsupportedProperty {
                property: property.key().to_owned(),
                path: self.path.as_path().to_path_buf(),
            }),
        }
    }
}
