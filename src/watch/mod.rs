//! File change detection for dashboard provisioners.
//!
//! The service itself never watches files. Dashboard provisioners that keep
//! their definitions on disk can use [`ChangeWatcher`] inside
//! [`poll_changes`](crate::provisioner::DashboardProvisioner::poll_changes).

mod change_watcher;

pub use change_watcher::ChangeWatcher;
