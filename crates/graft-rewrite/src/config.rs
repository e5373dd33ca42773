//! Rewrite configuration.
//!
//! Every switch defaults to off, which gives a sequential, path-insensitive
//! rewrite into a separate target. A TOML file may set any subset of fields:
//!
//! ```toml
//! overwrite = true
//! concurrent = true
//! threads = 8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RewriteError, RewriteResult};

/// Engine switches, fixed for the lifetime of one engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// The target is the source repository: refs are renamed and deleted in
    /// place and unchanged blobs are never copied.
    pub overwrite: bool,
    /// Make an entry's parent path part of its cache key.
    pub path_sensitive: bool,
    /// Run the parallel pre-pass before the sequential commit pass.
    pub concurrent: bool,
    /// Pre-pass worker count. 0 means one per core.
    pub threads: usize,
}

impl RewriteConfig {
    /// Rewrite a repository in place.
    pub fn in_place() -> Self {
        Self {
            overwrite: true,
            ..Self::default()
        }
    }

    /// Enable the pre-pass with the given worker count.
    pub fn with_concurrency(mut self, threads: usize) -> Self {
        self.concurrent = true;
        self.threads = threads;
        self
    }

    /// Key entries by full path as well as content.
    pub fn with_path_sensitivity(mut self) -> Self {
        self.path_sensitive = true;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> RewriteResult<Self> {
        toml::from_str(text).map_err(|e| RewriteError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> RewriteResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> RewriteResult<String> {
        toml::to_string(self).map_err(|e| RewriteError::Config(e.to_string()))
    }
}
