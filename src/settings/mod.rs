//! Resource path settings.

mod builder;
mod paths;

pub use builder::ProvisioningPathsBuilder;
pub use paths::ProvisioningPaths;
