//! The provisioning service and its builder.

mod builder;
mod provisioning;

pub use builder::ProvisioningServiceBuilder;
pub use provisioning::ProvisioningService;
