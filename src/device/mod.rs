pub mod udev;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{Config, DeviceConfig};

/// A block device as reported by the live device registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockDevice {
    pub devname: String,
    pub fs_type: Option<String>,
    pub uuid: Option<String>,
    pub label: Option<String>,
}

#[async_trait]
pub trait DeviceRegistry {
    fn source_debug_string(&self) -> String;

    async fn block_devices(&self) -> Result<Vec<BlockDevice>>;
}

/// Maps filesystem UUIDs to configured device names.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UuidIndex(HashMap<String, String>);

impl UuidIndex {
    pub fn build(config: &Config) -> Self {
        Self(
            config
                .devices()
                .filter_map(|(name, device)| {
                    device
                        .uuid
                        .as_ref()
                        .map(|uuid| (uuid.to_owned(), name.to_owned()))
                })
                .collect(),
        )
    }

    pub fn name_for(&self, uuid: &str) -> Option<&str> {
        self.0.get(uuid).map(String::as_str)
    }
}

/// A configured device bound to the live device backing it, for the time of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub name: String,
    pub config: DeviceConfig,
    pub devname: String,
    pub label: Option<String>,
}
