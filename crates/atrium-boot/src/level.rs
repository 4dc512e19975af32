//! The ordered set of boot levels.

use std::fmt;

/// One stage of the initialization sequence.
///
/// Levels are totally ordered and fixed at compile time; level *n* is
/// only reachable when level *n-1* was reached in the same boot attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BootLevel {
    /// The controller itself, no instance code involved.
    Tool = 1,
    /// A valid install root is bound and the entry flag is set.
    Root = 2,
    /// Instance configuration is loaded, override layer included.
    Config = 3,
    /// A database connection is derived from the configuration.
    Database = 4,
    /// The external application is fully initialized.
    Full = 5,
    /// A user is logged in; the default target of every command.
    Login = 6,
}

impl BootLevel {
    /// All levels in boot order.
    pub const ALL: [BootLevel; 6] = [
        BootLevel::Tool,
        BootLevel::Root,
        BootLevel::Config,
        BootLevel::Database,
        BootLevel::Full,
        BootLevel::Login,
    ];

    /// The base level a successful boot must at least reach.
    pub const BASE: BootLevel = BootLevel::Tool;

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            BootLevel::Tool => "tool",
            BootLevel::Root => "root",
            BootLevel::Config => "config",
            BootLevel::Database => "database",
            BootLevel::Full => "full",
            BootLevel::Login => "login",
        }
    }
}

impl fmt::Display for BootLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        let mut previous = None;
        for level in BootLevel::ALL {
            if let Some(p) = previous {
                assert!(p < level);
            }
            previous = Some(level);
        }
        assert!(BootLevel::Root < BootLevel::Login);
    }

    #[test]
    fn ranks_are_contiguous_from_one() {
        let ranks: Vec<u8> = BootLevel::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn display_uses_the_short_name() {
        assert_eq!(BootLevel::Database.to_string(), "database");
    }
}
