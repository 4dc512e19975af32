//! Instance discovery and lifecycle operations for on-disk Atrium installations.
//!
//! This crate locates an Atrium install root starting from an arbitrary
//! directory, reads its `release.info` version metadata, and resolves the
//! version tag to the most specific registered handler — the [`Instance`]
//! implementation the boot state machine drives through its lifecycle
//! operations (root binding, configuration, database, full init, login).

pub mod config;
pub mod database;
pub mod handle;
pub mod locate;
pub mod metadata;
pub mod resolver;
pub mod users;
pub mod versions;
pub mod walk;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ConfigMap, DatabaseSettings, CONFIG_FILE, CONFIG_OVERRIDE_FILE};
pub use database::{ConnectionHandle, DriverRegistry};
pub use handle::{Instance, InstanceState};
pub use locate::{locate, InstancePath, ROOT_MARKERS};
pub use metadata::{InfoProperty, ReleaseInfo, VersionTag, RELEASE_FILE};
pub use resolver::{HandlerFactory, HandlerRegistry};
pub use users::{ConfigUserDirectory, UserDirectory, UserHandle};
pub use versions::{Atrium6, Atrium7, Atrium70};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("invalid path: '{0}' is not a directory")]
    InvalidArgument(PathBuf),
    #[error("no Atrium instance root found under '{0}'")]
    RootNotFound(PathBuf),
    #[error("unsupported Atrium version: '{0}'")]
    UnsupportedVersion(String),
    #[error("malformed version tag: '{0}'")]
    MalformedVersion(String),
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("no adapter registered for database driver '{0}'")]
    UnsupportedDriver(String),
    #[error("login failed: {0}")]
    Login(#[from] LoginError),
    #[error("unknown instance property '{0}'")]
    UnknownProperty(String),
    #[error("property '{property}' is not defined by the instance at '{path}'")]
    UnsupportedProperty { property: String, path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("no admin account configured")]
    NoAdminAccount,
    #[error("unknown user '{0}'")]
    UnknownUser(String),
}
