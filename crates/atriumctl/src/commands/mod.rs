pub mod completions;
pub mod info;
pub mod man_pages;
pub mod status;

use atrium_boot::{BootEvent, BootLevel, Kernel, KernelOptions};
use clap::ValueEnum;
use console::Style;
use std::path::PathBuf;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_BOOT_INCOMPLETE: u8 = 2;

/// Command failure carrying the exit code it maps to.
#[derive(Debug)]
pub struct CommandError {
    pub code: u8,
    pub message: String,
}

impl CommandError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_FAILURE,
            message: message.into(),
        }
    }

    /// The instance never reached the level the command needs.
    pub fn boot_incomplete(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_BOOT_INCOMPLETE,
            message: message.into(),
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::failure(message)
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Options shared by every subcommand, parsed once in `main`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub path: Option<PathBuf>,
    pub debug: bool,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn colorize_level(level: BootLevel) -> String {
    let style = if level == BootLevel::Login {
        Style::new().green()
    } else {
        Style::new().yellow()
    };
    style.apply_to(level.name()).to_string()
}

/// Kernel configured from the global options, with the lifecycle printer
/// attached when `--debug` is set.
pub fn build_kernel(options: &GlobalOptions) -> Kernel {
    let mut kernel = Kernel::new(KernelOptions {
        start_path: options.path.clone(),
        username: options.user.clone(),
    });
    if options.debug {
        kernel.subscribe(lifecycle_printer());
    }
    kernel
}

/// Event-bus subscriber that narrates the boot sequence on stderr.
pub fn lifecycle_printer() -> impl FnMut(&BootEvent) {
    let dim = Style::new().dim();
    let red = Style::new().red();
    move |event| match event {
        BootEvent::BeforeLevel { level } => {
            eprintln!("{}", dim.apply_to(format!("-> {level}")));
        }
        BootEvent::LevelSucceeded { level } => {
            eprintln!("{}", dim.apply_to(format!("ok {level}")));
        }
        BootEvent::LevelFailed { level, error } => {
            eprintln!("{}", red.apply_to(format!("!! {level}: {error}")));
        }
        BootEvent::BootSucceeded { level } => {
            eprintln!("{}", dim.apply_to(format!("boot complete at {level}")));
        }
        BootEvent::BootFailed { level, error } => {
            eprintln!("{}", red.apply_to(format!("boot failed at {level}: {error}")));
        }
    }
}
