use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::{
    config::Config,
    deps::DependencyGraph,
    device::{udev::UdevRegistry, DeviceRegistry, UuidIndex, Volume},
    error::Error,
    fs::mount_table::{find_mount, mount_target, MountInfo, MountTable, SystemMountTable},
};

/// Everything an operation needs: the immutable configuration, the indexes
/// derived from it, and access to the live system.
pub struct Context {
    config: Config,
    graph: DependencyGraph,
    uuids: UuidIndex,
    registry: Box<dyn DeviceRegistry + Send + Sync>,
    mounts: Box<dyn MountTable + Send + Sync>,
}

impl Context {
    pub fn new(
        config: Config,
        registry: impl DeviceRegistry + Send + Sync + 'static,
        mounts: impl MountTable + Send + Sync + 'static,
    ) -> Self {
        let graph = DependencyGraph::build(&config);
        let uuids = UuidIndex::build(&config);
        tracing::debug!(
            "Using device registry {} and mount table {}",
            registry.source_debug_string(),
            mounts.source_debug_string()
        );
        Self {
            config,
            graph,
            uuids,
            registry: Box::new(registry),
            mounts: Box::new(mounts),
        }
    }

    /// A context backed by udev and the system mount table.
    pub fn with_system(config: Config) -> Self {
        Self::new(config, UdevRegistry, SystemMountTable)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn uuids(&self) -> &UuidIndex {
        &self.uuids
    }

    /// Find the live device behind the configured device `name`.
    ///
    /// Pseudo-devices resolve to their own name, as device path and label.
    pub async fn resolve(&self, name: &str) -> Result<Volume> {
        let not_found = || Error::DeviceNotFound {
            name: name.to_owned(),
        };
        let device = self.config.device(name).ok_or_else(not_found)?;

        if device.is_pseudo() {
            return Ok(Volume {
                name: name.to_owned(),
                config: device.clone(),
                devname: name.to_owned(),
                label: Some(name.to_owned()),
            });
        }

        let block_device = self
            .registry
            .block_devices()
            .await?
            .into_iter()
            .filter(|block_device| block_device.fs_type.is_some())
            .find(|block_device| {
                block_device
                    .uuid
                    .as_deref()
                    .and_then(|uuid| self.uuids.name_for(uuid))
                    == Some(name)
            })
            .ok_or_else(not_found)?;

        Ok(Volume {
            name: name.to_owned(),
            label: device.label.clone().or(block_device.label),
            config: device.clone(),
            devname: block_device.devname,
        })
    }

    pub fn mount_point(&self, volume: &Volume) -> PathBuf {
        mount_target(
            &self.config.defaults.media_dir,
            &volume.devname,
            volume.label.as_deref(),
        )
    }

    /// The mount table entry at the volume's mount point, `None` when it is not mounted.
    pub async fn mount_info(&self, volume: &Volume) -> Result<Option<MountInfo>> {
        let mount_point = self.mount_point(volume);
        let table = self
            .mounts
            .read()
            .await
            .with_context(|| format!("Failed to check if {mount_point:?} is mounted"))?;
        Ok(find_mount(&table, &mount_point))
    }
}
