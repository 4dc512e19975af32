//! Database connection factories keyed by driver name.
//!
//! The actual wire connection belongs to the external application; this
//! registry only derives an opaque connection handle from configuration
//! and rejects engines with no adapter.

use crate::config::DatabaseSettings;
use crate::InstanceError;
use std::collections::BTreeMap;
use tracing::debug;

/// Opaque handle describing an established database binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub driver: String,
    pub dsn: String,
}

pub type DriverFactory = fn(&DatabaseSettings) -> ConnectionHandle;

/// Maps a configured driver name to its connection factory.
pub struct DriverRegistry {
    adapters: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Registry with the shipped adapters.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("mysql", mysql_adapter);
        registry.register("pgsql", pgsql_adapter);
        registry
    }

    pub fn register(&mut self, driver: &str, factory: DriverFactory) {
        self.adapters.insert(driver.to_owned(), factory);
    }

    pub fn connect(&self, settings: &DatabaseSettings) -> Result<ConnectionHandle, InstanceError> {
        let Some(factory) = self.adapters.get(&settings.driver) else {
            return Err(InstanceError::UnsupportedDriver(settings.driver.clone()));
        };
        let handle = factory(settings);
        debug!(driver = %handle.driver, dsn = %handle.dsn, "database connection derived");
        Ok(handle)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn mysql_adapter(settings: &DatabaseSettings) -> ConnectionHandle {
    ConnectionHandle {
        driver: settings.driver.clone(),
        dsn: format!(
            "mysql://{}@{}:{}/{}",
            settings.user,
            settings.host,
            settings.port.unwrap_or(3306),
            settings.name
        ),
    }
}

fn pgsql_adapter(settings: &DatabaseSettings) -> ConnectionHandle {
    ConnectionHandle {
        driver: settings.driver.clone(),
        dsn: format!(
            "postgres://{}@{}:{}/{}",
            settings.user,
            settings.host,
            settings.port.unwrap_or(5432),
            settings.name
        ),
    }
}
