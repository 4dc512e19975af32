//! Instance configuration loading and override merging.

use crate::locate::InstancePath;
use crate::InstanceError;
use serde::Deserialize;
use std::fs;
use tracing::debug;

/// Base configuration file, required once the Config boot level runs.
pub const CONFIG_FILE: &str = "etc/atrium.toml";
/// Optional site-local override, deep-merged on top of the base file.
pub const CONFIG_OVERRIDE_FILE: &str = "etc/atrium.local.toml";

/// Nested key/value configuration of one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigMap(toml::Table);

impl ConfigMap {
    /// Loads the base configuration plus the local override layer.
    pub fn load(root: &InstancePath) -> Result<Self, InstanceError> {
        let mut config = Self::load_base(root)?;
        let override_path = root.join(CONFIG_OVERRIDE_FILE);
        if override_path.is_file() {
            debug!(path = %override_path.display(), "merging configuration override");
            let overlay: toml::Table = fs::read_to_string(&override_path)?.parse()?;
            merge_tables(&mut config.0, overlay);
        }
        Ok(config)
    }

    /// Loads only the base configuration file. Legacy 6.x installs have no
    /// override layer.
    pub fn load_base(root: &InstancePath) -> Result<Self, InstanceError> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(InstanceError::ConfigurationMissing(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let table: toml::Table = fs::read_to_string(&path)?.parse()?;
        Ok(Self(table))
    }

    pub fn table(&self) -> &toml::Table {
        &self.0
    }

    /// Looks up a value by dotted path, e.g. `database.driver`.
    pub fn get(&self, dotted: &str) -> Option<&toml::Value> {
        let mut parts = dotted.split('.');
        let mut value = self.0.get(parts.next()?)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }

    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        self.get(dotted).and_then(toml::Value::as_str)
    }

    /// Database connection parameters from the `[database]` section.
    pub fn database(&self) -> Result<DatabaseSettings, InstanceError> {
        let Some(section) = self.0.get("database") else {
            return Err(InstanceError::ConfigurationMissing(
                "no [database] section in configuration".to_owned(),
            ));
        };
        section
            .clone()
            .try_into()
            .map_err(InstanceError::ParseToml)
    }

    #[cfg(test)]
    pub(crate) fn from_table(table: toml::Table) -> Self {
        Self(table)
    }
}

/// Overlay wins on scalars and arrays; nested tables merge recursively.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Connection parameters read from the `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    pub driver: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_owned()
}
