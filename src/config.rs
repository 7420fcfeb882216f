//! Where the tag registry and the base model filter live.
//!
//! JSON shape:
//! {
//!   "tag_index": "tags/index.json",          // registry index, see tags::registry
//!   "base_model_filter": "filters/base.xml"  // filter every manifest must pass
//! }
//!
//! Relative paths resolve against the directory of the config file. Command
//! line overrides are taken as given (relative to the working directory).

use crate::Result;
use crate::diagnostics;
use crate::model::Filter;
use crate::tags::TagRegistry;
use crate::validate;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "mercury.json";

/// Config file as written; every field is optional so overrides can fill
/// the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub tag_index: Option<PathBuf>,

    #[serde(default)]
    pub base_model_filter: Option<PathBuf>,
}

/// Values supplied on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tag_index: Option<PathBuf>,
    pub base_model_filter: Option<PathBuf>,
}

/// Resolved configuration. The base model filter is only needed to validate
/// manifests, so it may stay unset for the other commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercuryConfig {
    pub tag_index: PathBuf,
    pub base_model_filter: Option<PathBuf>,
}

impl RawConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| {
            diagnostics::error_message(format!("failed to read config {}", path.display()))
        })?;
        let mut raw: RawConfig = serde_json::from_str(&text).with_context(|| {
            diagnostics::error_message(format!("failed to parse config {}", path.display()))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        raw.tag_index = raw.tag_index.map(|p| base_dir.join(p));
        raw.base_model_filter = raw.base_model_filter.map(|p| base_dir.join(p));
        Ok(raw)
    }

    /// Apply overrides and require the tag index to be known.
    pub fn validate_and_build(self, overrides: Overrides) -> Result<MercuryConfig> {
        let tag_index = overrides.tag_index.or(self.tag_index);
        let base_model_filter = overrides.base_model_filter.or(self.base_model_filter);

        let Some(tag_index) = tag_index else {
            bail!(
                "{}",
                diagnostics::error_message(
                    "no tag index configured (set tag_index or pass --tag-index)"
                )
            );
        };
        Ok(MercuryConfig {
            tag_index,
            base_model_filter,
        })
    }
}

impl MercuryConfig {
    /// Resolve the configuration from `path` and `overrides`.
    ///
    /// A missing file is only an error when `explicit` is set; otherwise the
    /// overrides alone must name the tag index.
    pub fn resolve(path: &Path, explicit: bool, overrides: Overrides) -> Result<Self> {
        let raw = if path.exists() || explicit {
            RawConfig::from_file(path)?
        } else {
            debug!(path = %path.display(), "no config file, using overrides only");
            RawConfig::default()
        };
        raw.validate_and_build(overrides)
    }

    pub fn load_registry(&self) -> Result<TagRegistry> {
        TagRegistry::load(&self.tag_index)
    }

    pub fn load_base_model_filter(&self, registry: &TagRegistry) -> Result<Filter> {
        let Some(path) = &self.base_model_filter else {
            bail!(
                "{}",
                diagnostics::error_message(
                    "no base model filter configured (set base_model_filter or pass --base-model-filter)"
                )
            );
        };
        validate::load_base_model_filter(path, registry)
    }
}
