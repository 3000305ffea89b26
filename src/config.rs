//! Optional `fuzzer-bundle.toml` at the pipeline root.
//!
//! ```toml
//! validation = "strict"
//!
//! [sources]
//! general = "git@example.com:afl-other-arch.git"
//! specialized = "git@example.com:driller-afl.git"
//! ```
//!
//! Every key is optional; a missing file yields [`BundleConfig::default`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "fuzzer-bundle.toml";

pub const DEFAULT_GENERAL_REPOSITORY: &str = "git@git.seclab.cs.ucsb.edu:cgc/afl-other-arch.git";
pub const DEFAULT_SPECIALIZED_REPOSITORY: &str = "git@git.seclab.cs.ucsb.edu:cgc/driller-afl.git";

/// How much the pipeline trusts what it finds on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    /// Reject interrupted installs and manifests that reference missing files.
    #[default]
    Strict,
    /// Any existing path counts as complete; manifest entries are not checked.
    Lenient,
}

impl Validation {
    pub fn is_strict(self) -> bool {
        self == Validation::Strict
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub general: String,
    pub specialized: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            general: DEFAULT_GENERAL_REPOSITORY.to_string(),
            specialized: DEFAULT_SPECIALIZED_REPOSITORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    pub validation: Validation,
    pub sources: SourcesConfig,
}

impl BundleConfig {
    /// Load `fuzzer-bundle.toml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading bundle config '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing bundle config '{}'", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut config: BundleConfig = toml::from_str(text)?;
        config.sources.general = config.sources.general.trim().to_string();
        config.sources.specialized = config.sources.specialized.trim().to_string();
        if config.sources.general.is_empty() || config.sources.specialized.is_empty() {
            anyhow::bail!("sources.general and sources.specialized must not be empty");
        }
        Ok(config)
    }
}
