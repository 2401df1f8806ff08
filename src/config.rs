//! Settings file.
//!
//! Loaded from `linemetrics.toml` in the working directory unless `--config`
//! names another file. Command-line flags override what the file says.

use crate::error::Result;
use crate::resolve::DEFAULT_SKIP_EXTENSIONS;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "linemetrics.toml";
pub const DEFAULT_CACHE_PATH: &str = ".linemetrics/cache.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache_enabled: bool,
    pub cache_path: PathBuf,
    /// Extensions of paths never diffed.
    pub skip_extensions: Vec<String>,
    /// Project name -> repository path.
    pub projects: BTreeMap<String, PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            skip_extensions: DEFAULT_SKIP_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            projects: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Reads `path`, or the default file if present. An explicitly named file
    /// must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
