//! Boot orchestration for atriumctl.
//!
//! The [`Kernel`] drives a resolved instance handle through an ordered
//! sequence of boot levels, one lifecycle operation per level, publishing
//! events on a synchronous bus and stopping at the first failure while
//! keeping everything reached so far usable.

pub mod events;
pub mod kernel;
pub mod level;

pub use events::{BootEvent, EventBus};
pub use kernel::{BootState, Kernel, KernelOptions, LevelFailure, Service};
pub use level::BootLevel;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("boot failed at level {level}: {message}")]
    LevelFailed { level: BootLevel, message: String },
    #[error("instance error: {0}")]
    Instance(#[from] atrium_instance::InstanceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_failure_names_the_level() {
        let e = BootError::LevelFailed {
            level: BootLevel::Config,
            message: "configuration missing".to_owned(),
        };
        assert!(e.to_string().contains("level config"));
    }
}
