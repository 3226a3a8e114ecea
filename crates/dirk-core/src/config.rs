//! Listing configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Toggles controlling how a directory listing is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct ListingConfig {
    /// Include directories in the listing.
    #[builder(default = "true")]
    pub include_folders: bool,

    /// Include non-directories in the listing.
    #[builder(default = "true")]
    pub include_files: bool,

    /// Include hidden entries (starting with .).
    #[builder(default = "false")]
    pub include_hidden: bool,

    /// Descend into subdirectories.
    #[builder(default = "false")]
    pub recursive: bool,

    /// Compute recursive directory sizes.
    #[builder(default = "false")]
    pub disk_usage: bool,

    /// Recurse through symbolic links that refer to directories.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Base names excluded from every listing.
    #[builder(default = "default_ignore()")]
    pub ignore: Vec<String>,

    /// Directory names pruned during recursive descent.
    #[builder(default = "default_ignore_recursive()")]
    pub ignore_recursive: Vec<String>,
}

fn default_ignore() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_ignore_recursive() -> Vec<String> {
    vec!["node_modules".to_string(), ".git".to_string()]
}

impl ListingConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let lists = [self.ignore.as_ref(), self.ignore_recursive.as_ref()];
        for name in lists.into_iter().flatten().flatten() {
            if name.is_empty() {
                return Err("Ignore names cannot be empty".to_string());
            }
            if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
                return Err(format!("Ignore name must be a base name: {name}"));
            }
        }
        Ok(())
    }
}

impl ListingConfig {
    /// Create a new listing config builder.
    pub fn builder() -> ListingConfigBuilder {
        ListingConfigBuilder::default()
    }

    /// Config for a recursive listing with otherwise default toggles.
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Self::default()
        }
    }

    /// Check if a base name is excluded from the listing.
    ///
    /// Recursive listings also exclude the names pruned from descent.
    pub fn should_ignore(&self, name: &str) -> bool {
        if self.ignore.iter().any(|ignored| ignored == name) {
            return true;
        }
        self.recursive && self.ignore_recursive.iter().any(|ignored| ignored == name)
    }

    /// Check if a hidden entry should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            include_folders: true,
            include_files: true,
            include_hidden: false,
            recursive: false,
            disk_usage: false,
            follow_symlinks: false,
            ignore: default_ignore(),
            ignore_recursive: default_ignore_recursive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ListingConfig::builder()
            .recursive(true)
            .include_hidden(true)
            .ignore(vec!["target".to_string()])
            .build()
            .unwrap();

        assert!(config.recursive);
        assert!(config.include_hidden);
        assert!(config.include_folders);
        assert_eq!(config.ignore, vec!["target".to_string()]);
        assert_eq!(config.ignore_recursive, default_ignore_recursive());
    }

    #[test]
    fn test_builder_rejects_paths() {
        let result = ListingConfig::builder()
            .ignore(vec!["a/b".to_string()])
            .build();
        assert!(result.is_err());

        let result = ListingConfig::builder()
            .ignore_recursive(vec![String::new()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_should_ignore_exact_names_only() {
        let config = ListingConfig::builder()
            .ignore(vec!["build".to_string()])
            .build()
            .unwrap();

        assert!(config.should_ignore("build"));
        assert!(!config.should_ignore("builds"));
        assert!(!config.should_ignore("src"));
        // Recursive prune list only applies to recursive listings
        assert!(!config.should_ignore("node_modules"));
        assert!(ListingConfig::recursive().should_ignore("node_modules"));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = ListingConfig::default();

        assert!(config.should_skip_hidden(".secret"));
        assert!(!config.should_skip_hidden("visible"));

        config.include_hidden = true;
        assert!(!config.should_skip_hidden(".secret"));
    }

    #[test]
    fn test_default_matches_builder() {
        assert_eq!(ListingConfig::builder().build().unwrap(), ListingConfig::default());
    }
}
