//! Cloud management backends.
//!
//! Agents talk to the cloud only through [`CloudInventory`] and
//! [`ResourceProvisioner`]. [`create_backend`] builds the configured
//! implementation; `snapshot` serves a JSON inventory file.

pub mod snapshot;
pub mod traits;

pub use snapshot::SnapshotCloud;
pub use traits::{
    AdminCredentials, CloudInventory, ResourceProvisioner, ResourceRecord, SqlSpec, StorageSpec,
    VirtualMachine, VmSecurityProfile, VmSpec,
};

use crate::config::CloudConfig;
use std::path::Path;
use std::sync::Arc;

/// Both halves of a cloud backend, shared by the agents.
#[derive(Clone)]
pub struct CloudBackend {
    pub inventory: Arc<dyn CloudInventory>,
    pub provisioner: Arc<dyn ResourceProvisioner>,
}

/// Build the backend named by `[cloud] backend`.
pub async fn create_backend(config: &CloudConfig, config_dir: &Path) -> anyhow::Result<CloudBackend> {
    match config.backend.trim() {
        "snapshot" => {
            let path = config.resolved_snapshot_path(config_dir);
            let mut cloud = SnapshotCloud::load(&path).await?;
            if let Some(subscription) = config.subscription_id.as_deref() {
                cloud = cloud.with_subscription(subscription);
            }
            let cloud = Arc::new(cloud);
            Ok(CloudBackend {
                inventory: cloud.clone(),
                provisioner: cloud,
            })
        }
        other => anyhow::bail!("Unknown cloud backend: {other}. Supported: snapshot."),
    }
}
