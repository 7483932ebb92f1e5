//! Integration tests for loading resource paths.

#![allow(unsafe_code)] // For env var manipulation in tests

use hotswap_provisioning::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_load_single_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("provisioning.yaml");

    fs::write(
        &settings,
        r#"
datasources: /etc/app/datasources
plugins: /etc/app/plugins
notifiers: /etc/app/alerting
dashboards: /var/lib/app/dashboards
"#,
    )
    .unwrap();

    let paths = ProvisioningPaths::builder().with_file(&settings).build().unwrap();

    assert_eq!(paths.datasources, Path::new("/etc/app/datasources"));
    assert_eq!(paths.plugins, Path::new("/etc/app/plugins"));
    assert_eq!(paths.notifiers, Path::new("/etc/app/alerting"));
    assert_eq!(paths.dashboards, Path::new("/var/lib/app/dashboards"));
}

#[test]
fn test_root_in_file_fills_missing_paths() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("provisioning.toml");
    fs::write(&settings, "root = \"/srv/provisioning\"\n").unwrap();

    let paths = ProvisioningPaths::builder()
        .with_root("/ignored")
        .with_file(&settings)
        .build()
        .unwrap();

    assert_eq!(paths, ProvisioningPaths::from_root("/srv/provisioning"));
}

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("provisioning.yaml");
    fs::write(&settings, "root: /etc/provisioning\ndashboards: /from/file\n").unwrap();

    unsafe {
        std::env::set_var("HSPTEST_OVERRIDE_DASHBOARDS", "/from/env");
    }

    let paths = ProvisioningPaths::builder()
        .with_file(&settings)
        .with_env_overrides("HSPTEST_OVERRIDE", "__")
        .build()
        .unwrap();

    unsafe {
        std::env::remove_var("HSPTEST_OVERRIDE_DASHBOARDS");
    }

    assert_eq!(paths.dashboards, Path::new("/from/env"));
    assert_eq!(paths.datasources, Path::new("/etc/provisioning/datasources"));
}

#[test]
fn test_unsupported_extension() {
    let result = ProvisioningPaths::builder()
        .with_root("/etc/provisioning")
        .with_file("provisioning.ini")
        .build();

    assert!(matches!(result, Err(ProvisioningError::ConfigError(_))));
}

#[test]
fn test_invalid_yaml_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("provisioning.yaml");
    fs::write(&settings, "dashboards: [unclosed\n").unwrap();

    let result = ProvisioningPaths::builder().with_file(&settings).build();
    assert!(result.is_err());
}
