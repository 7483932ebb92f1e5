//! The four resource definition paths.

use super::ProvisioningPathsBuilder;
use std::path::{Path, PathBuf};

/// Where the definitions for each resource type live.
///
/// Supplied once when the service is built and read-only afterwards.
///
/// # Examples
///
/// ```rust
/// use hotswap_provisioning::settings::ProvisioningPaths;
/// use std::path::Path;
///
/// let paths = ProvisioningPaths::from_root("/etc/app/provisioning");
/// assert_eq!(paths.dashboards, Path::new("/etc/app/provisioning/dashboards"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPaths {
    /// Data source definitions.
    pub datasources: PathBuf,
    /// Plugin definitions.
    pub plugins: PathBuf,
    /// Alert notification channel definitions.
    pub notifiers: PathBuf,
    /// Dashboard definitions.
    pub dashboards: PathBuf,
}

impl ProvisioningPaths {
    /// Derive all four paths from a single provisioning root directory.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            datasources: root.join("datasources"),
            plugins: root.join("plugins"),
            notifiers: root.join("notifiers"),
            dashboards: root.join("dashboards"),
        }
    }

    /// Create a builder that loads paths from files and the environment.
    pub fn builder() -> ProvisioningPathsBuilder {
        ProvisioningPathsBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        let paths = ProvisioningPaths::from_root("conf/provisioning");
        assert_eq!(paths.datasources, Path::new("conf/provisioning/datasources"));
        assert_eq!(paths.plugins, Path::new("conf/provisioning/plugins"));
        assert_eq!(paths.notifiers, Path::new("conf/provisioning/notifiers"));
        assert_eq!(paths.dashboards, Path::new("conf/provisioning/dashboards"));
    }
}
