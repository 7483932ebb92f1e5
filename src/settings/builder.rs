//! Builder for loading [`ProvisioningPaths`] from files and the environment.

use super::ProvisioningPaths;
use crate::error::{ProvisioningError, Result};
use config::{Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw settings before defaults are derived from the root.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPaths {
    root: Option<PathBuf>,
    datasources: Option<PathBuf>,
    plugins: Option<PathBuf>,
    notifiers: Option<PathBuf>,
    dashboards: Option<PathBuf>,
}

/// Builder for loading resource paths.
///
/// Settings are merged in order: the fallback root, then files in the order
/// they were added, then environment variables. Recognized keys are `root`,
/// `datasources`, `plugins`, `notifiers` and `dashboards`. Any path not set
/// explicitly is derived from `root`.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_provisioning::settings::ProvisioningPaths;
///
/// # fn example() -> hotswap_provisioning::error::Result<()> {
/// // APP_DASHBOARDS=/srv/dashboards overrides the file value
/// let paths = ProvisioningPaths::builder()
///     .with_root("/etc/app/provisioning")
///     .with_file("config/provisioning.yaml")
///     .with_env_overrides("APP", "__")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ProvisioningPathsBuilder {
    root: Option<PathBuf>,
    file_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
    env_separator: Option<String>,
}

impl ProvisioningPathsBuilder {
    /// Create a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback provisioning root.
    ///
    /// A `root` key in a file or the environment takes precedence.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Add a settings file. Supported formats: YAML, TOML, JSON.
    ///
    /// Later files override earlier ones.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_paths.push(path.into());
        self
    }

    /// Read overrides from environment variables with the given prefix.
    ///
    /// Variables are named `<PREFIX>_<KEY>`, e.g. `APP_DASHBOARDS`;
    /// `separator` splits nested keys. Environment variables have the
    /// highest priority.
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.env_separator = Some(separator.to_string());
        self
    }

    /// Load and resolve the paths.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ConfigError`] if:
    /// - A file has an unsupported extension or cannot be read
    /// - A value cannot be deserialized as a path
    /// - A path is neither set nor derivable from a root
    pub fn build(self) -> Result<ProvisioningPaths> {
        let mut builder = config::Config::builder();

        if let Some(root) = &self.root {
            builder = builder.set_default("root", root.to_string_lossy().into_owned())?;
        }

        for path in &self.file_paths {
            validate_extension(path)?;
            builder = builder.add_source(File::from(path.clone()).required(true));
        }

        if let (Some(prefix), Some(separator)) = (&self.env_prefix, &self.env_separator) {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(separator),
            );
        }

        let raw: RawPaths = builder.build()?.try_deserialize()?;
        resolve(raw)
    }
}

fn resolve(raw: RawPaths) -> Result<ProvisioningPaths> {
    let root = raw.root.as_deref();
    let pick = |explicit: Option<PathBuf>, name: &str| -> Result<PathBuf> {
        explicit.or_else(|| root.map(|r| r.join(name))).ok_or_else(|| {
            ProvisioningError::ConfigError(format!(
                "no path configured for {} and no provisioning root set",
                name
            ))
        })
    };

    Ok(ProvisioningPaths {
        datasources: pick(raw.datasources, "datasources")?,
        plugins: pick(raw.plugins, "plugins")?,
        notifiers: pick(raw.notifiers, "notifiers")?,
        dashboards: pick(raw.dashboards, "dashboards")?,
    })
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ProvisioningError::ConfigError(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(ProvisioningError::ConfigError(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}
