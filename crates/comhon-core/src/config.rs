//! TOML configuration
//!
//! Every key is optional:
//!
//! ```toml
//! manifest_dir = "manifests"
//! manifest_file = "manifest.json"
//! pattern_file = "patterns.json"
//! default_format = "json"
//! log_profile = "development"
//!
//! [interfacer]
//! private = false
//! date_time_format = "%Y-%m-%dT%H:%M:%S%:z"
//! validate = true
//! verify_references = true
//! ```

use crate::errors::{ComhonError, Result};
use crate::interfacer::{Format, InterfacerOptions, DEFAULT_DATE_TIME_FORMAT};
use crate::logging_facility::Profile;
use crate::provider::FsManifestProvider;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComhonConfig {
    /// Root of the manifest tree, relative paths resolve against the
    /// directory of the configuration file
    pub manifest_dir: PathBuf,
    pub manifest_file: String,
    /// Named regex patterns, relative to `manifest_dir`
    pub pattern_file: Option<String>,
    pub default_format: Format,
    pub log_profile: Profile,
    pub interfacer: InterfacerConfig,
}

impl Default for ComhonConfig {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("manifests"),
            manifest_file: "manifest.json".to_string(),
            pattern_file: Some("patterns.json".to_string()),
            default_format: Format::Json,
            log_profile: Profile::Development,
            interfacer: InterfacerConfig::default(),
        }
    }
}

/// Defaults of the import and export options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfacerConfig {
    pub private: bool,
    pub date_time_format: String,
    pub validate: bool,
    pub verify_references: bool,
}

impl Default for InterfacerConfig {
    fn default() -> Self {
        Self {
            private: false,
            date_time_format: DEFAULT_DATE_TIME_FORMAT.to_string(),
            validate: true,
            verify_references: true,
        }
    }
}

impl ComhonConfig {
    /// # Errors
    ///
    /// Returns `Config` for malformed documents and unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ComhonError::Config {
            message: e.to_string(),
        })
    }

    /// Read the configuration file at `path`
    ///
    /// # Errors
    ///
    /// Returns `Config` when the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ComhonError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.manifest_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.manifest_dir = parent.join(&config.manifest_dir);
            }
        }
        Ok(config)
    }

    pub fn interfacer_options(&self) -> InterfacerOptions {
        InterfacerOptions::default()
            .with_private(self.interfacer.private)
            .with_date_time_format(self.interfacer.date_time_format.clone())
            .with_validate(self.interfacer.validate)
            .with_verify_references(self.interfacer.verify_references)
    }

    pub fn manifest_provider(&self) -> FsManifestProvider {
        let provider = FsManifestProvider::new(&self.manifest_dir)
            .with_manifest_file(self.manifest_file.clone());
        match &self.pattern_file {
            Some(file) => provider.with_pattern_file(file.clone()),
            None => provider,
        }
    }
}
