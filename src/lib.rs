pub mod codec;
pub mod convert;
pub mod error;
pub mod ini;

pub use codec::{Format, Record, RecordCodec};
pub use convert::TreeConverter;
pub use error::{Error, Result};

// Define common types used across modules
use std::collections::HashSet;

/// Which top-level directories of the input root take part in a run.
/// Applies only to directories whose parent is the input root itself.
#[derive(Clone)]
pub enum TopLevelFilter {
    /// Process everything except the named directories.
    Deny(HashSet<String>),
    /// Process only the named directories.
    Allow(HashSet<String>),
}

/// Generated output and cache directories of an IG build.
pub const DEFAULT_SKIP_DIRS: [&str; 3] = ["output", "temp", "input-cache"];

impl TopLevelFilter {
    pub fn default_deny() -> TopLevelFilter {
        TopLevelFilter::Deny(DEFAULT_SKIP_DIRS.into_iter().map(String::from).collect())
    }

    pub fn allows(&self, name: &str) -> bool {
        match self {
            TopLevelFilter::Deny(names) => !names.contains(name),
            TopLevelFilter::Allow(names) => names.contains(name),
        }
    }
}

#[derive(Clone)]
pub struct ConvertOptions {
    /// Target format label, used only for the config-file rewrite
    pub target_format: Format,
    /// Name of the config file to patch instead of convert
    pub config_file: String,
    /// Key prefix of the config line that names the IG resource file
    pub config_key: String,
    pub top_level: TopLevelFilter,
}

impl ConvertOptions {
    pub fn new(target_format: Format) -> ConvertOptions {
        ConvertOptions {
            target_format,
            config_file: String::from("ig.ini"),
            config_key: String::from("ig"),
            top_level: TopLevelFilter::default_deny(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deny_matches_default_skip_dirs() {
        let filter = TopLevelFilter::default_deny();
        for name in DEFAULT_SKIP_DIRS {
            assert!(!filter.allows(name));
        }
        assert!(filter.allows("input"));
    }

    #[test]
    fn allow_list_inverts_the_policy() {
        let filter = TopLevelFilter::Allow(HashSet::from([String::from("input")]));
        assert!(filter.allows("input"));
        assert!(!filter.allows("output"));
    }
}
