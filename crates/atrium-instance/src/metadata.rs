//! Version metadata read from an instance's `release.info` file.

use crate::locate::InstancePath;
use crate::InstanceError;
use std::fmt;
use std::fs;

/// Well-known file inside the install root holding release metadata as
/// `key = value` assignments.
pub const RELEASE_FILE: &str = "release.info";

/// The closed set of metadata properties an instance can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoProperty {
    Flavor,
    Version,
    Build,
}

impl InfoProperty {
    /// Parses a property name, rejecting anything outside the closed set.
    pub fn parse(name: &str) -> Result<Self, InstanceError> {
        match name {
            "flavor" => Ok(Self::Flavor),
            "version" => Ok(Self::Version),
            "build" => Ok(Self::Build),
            other => Err(InstanceError::UnknownProperty(other.to_owned())),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Flavor => "flavor",
            Self::Version => "version",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for InfoProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parsed contents of `release.info`.
///
/// Every property is optional on disk; lookups distinguish a property
/// missing from the file (`UnsupportedProperty`) from a property outside
/// the closed set (`UnknownProperty`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    flavor: Option<String>,
    version: Option<String>,
    build: Option<String>,
}

impl ReleaseInfo {
    /// Reads and parses the release file under `root`.
    pub fn read(root: &InstancePath) -> Result<Self, InstanceError> {
        let content = fs::read_to_string(root.join(RELEASE_FILE))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines; blank lines and `#` comments are
    /// skipped, unknown keys are ignored.
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_owned();
            match key.trim() {
                "flavor" => info.flavor = Some(value),
                "version" => info.version = Some(value),
                "build" => info.build = Some(value),
                _ => {}
            }
        }
        info
    }

    pub fn get(&self, property: InfoProperty) -> Option<&str> {
        match property {
            InfoProperty::Flavor => self.flavor.as_deref(),
            InfoProperty::Version => self.version.as_deref(),
            InfoProperty::Build => self.build.as_deref(),
        }
    }

    /// The version tag announced by the instance, required for handler
    /// resolution.
    pub fn version_tag(&self, root: &InstancePath) -> Result<VersionTag, InstanceError> {
        match &self.version {
            Some(raw) => VersionTag::parse(raw),
            None => Err(InstanceError::UnsupportedProperty {
                property: InfoProperty::Version.key().to_owned(),
                path: root.as_path().to_path_buf(),
            }),
        }
    }
}

/// A dotted numeric version string such as `7.0.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn parse(raw: &str) -> Result<Self, InstanceError> {
        let valid = !raw.is_empty()
            && raw
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InstanceError::MalformedVersion(raw.to_owned()))
        }
    }

    /// Ordered dotted components, most significant first.
    pub fn components(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
