//! Version-to-handler resolution with decreasing specificity.

use crate::handle::Instance;
use crate::locate::{locate, InstancePath};
use crate::metadata::{ReleaseInfo, VersionTag};
use crate::versions::{Atrium6, Atrium7, Atrium70};
use crate::InstanceError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub type HandlerFactory = fn(InstancePath) -> Box<dyn Instance>;

/// Explicit registry mapping a version identifier to a handler factory.
///
/// Resolution concatenates the dotted components of a version tag and
/// drops the least significant component until an identifier hits:
/// `7.0.1` tries `701`, then `70`, then `7`. The most specific registered
/// handler wins; an exhausted tag is an unsupported version.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registry with the shipped version families.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("6", |path| Box::new(Atrium6::new(path)));
        registry.register("7", |path| Box::new(Atrium7::new(path)));
        registry.register("70", |path| Box::new(Atrium70::new(path)));
        registry
    }

    pub fn register(&mut self, id: &str, factory: HandlerFactory) {
        self.handlers.insert(id.to_owned(), factory);
    }

    /// Selects the most specific handler for `tag` and binds it to `path`.
    pub fn resolve(
        &self,
        tag: &VersionTag,
        path: InstancePath,
    ) -> Result<Box<dyn Instance>, InstanceError> {
        let mut components = tag.components();
        while !components.is_empty() {
            let id = components.concat();
            if let Some(factory) = self.handlers.get(&id) {
                debug!(version = %tag, handler = %id, "handler resolved");
                return Ok(factory(path));
            }
            components.pop();
        }
        Err(InstanceError::UnsupportedVersion(tag.to_string()))
    }

    /// Binds a known install root: reads its release metadata and resolves
    /// the announced version.
    pub fn open(&self, root: InstancePath) -> Result<Box<dyn Instance>, InstanceError> {
        let release = ReleaseInfo::read(&root)?;
        let tag = release.version_tag(&root)?;
        self.resolve(&tag, root)
    }

    /// Searches upward from `start` for an install root, then opens it.
    pub fn discover(&self, start: &Path) -> Result<Box<dyn Instance>, InstanceError> {
        let root = locate(start)?;
        self.open(root)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
