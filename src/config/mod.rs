pub mod device;

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{error::Error, provider::password_manager::PasswordManagerConfig};

pub use device::{DeviceConfig, DeviceType};

pub const CONFIG_FILE_DEFAULT: &str = "config.toml";
pub const CONFIG_FILE_ENV: &str = "MOUNTPILOT_CONFIG";
pub const MOUNT_HELPER_DEFAULT: &str = "pmount";
pub const UMOUNT_HELPER_DEFAULT: &str = "pumount";
pub const MEDIA_DIR_DEFAULT: &str = "/media";

/// Device names starting with this prefix are templates and never acted upon.
pub const TEMPLATE_PREFIX: &str = "_";

pub fn is_template(name: &str) -> bool {
    name.starts_with(TEMPLATE_PREFIX)
}

/// Expand a leading `~` to the home directory of the current user.
pub fn expand_home(value: &str) -> String {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return value.to_owned(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => value.to_owned(),
    }
}

#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Directory for the symlinks of auto-mounted devices without an explicit `symlink`.
    #[serde(default)]
    pub base_link_dir: Option<String>,

    /// Command line of the password manager. The secret identifier is appended to it.
    #[serde(default)]
    pub password_manager: Option<String>,

    #[serde(default = "default_mount_helper")]
    pub mount_helper: String,

    #[serde(default = "default_umount_helper")]
    pub umount_helper: String,

    /// Directory the mount helper mounts below.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

fn default_mount_helper() -> String {
    MOUNT_HELPER_DEFAULT.to_owned()
}

fn default_umount_helper() -> String {
    UMOUNT_HELPER_DEFAULT.to_owned()
}

fn default_media_dir() -> PathBuf {
    PathBuf::from(MEDIA_DIR_DEFAULT)
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_link_dir: None,
            password_manager: None,
            mount_helper: default_mount_helper(),
            umount_helper: default_umount_helper(),
            media_dir: default_media_dir(),
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub devices: IndexMap<String, DeviceConfig>,
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from: {path:?}");

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {path:?}"))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config =
            toml::from_str::<Config>(content).context("Failed to parse content as TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut uuids = HashMap::<&str, &str>::new();

        for (name, device) in self.devices() {
            if let Some(parent) = &device.parent {
                if parent == name {
                    Err(Error::Config(format!("device `{name}` is its own parent")))?
                }
                if self.device(parent).is_none() {
                    Err(Error::Config(format!(
                        "device `{name}` refers to unknown parent `{parent}`"
                    )))?
                }
            }

            if let Some(uuid) = &device.uuid {
                if let Some(other) = uuids.insert(uuid, name) {
                    Err(Error::Config(format!(
                        "devices `{other}` and `{name}` share the uuid {uuid}"
                    )))?
                }
            }

            if device.key.is_some() && self.defaults.password_manager.is_none() {
                Err(Error::Config(format!(
                    "device `{name}` has a key but no `defaults.password_manager` is set"
                )))?
            }

            let mut seen = HashSet::from([name]);
            let mut current = device;
            while let Some(parent) = current.parent.as_deref() {
                if !seen.insert(parent) {
                    Err(Error::Config(format!(
                        "the parents of device `{name}` form a cycle"
                    )))?
                }
                match self.device(parent) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }

        Ok(())
    }

    /// Look up an actionable device. Templates are never returned.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        if is_template(name) {
            return None;
        }
        self.devices.get(name)
    }

    /// All actionable devices, in declaration order.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &DeviceConfig)> {
        self.devices
            .iter()
            .filter(|(name, _)| !is_template(name))
            .map(|(name, device)| (name.as_str(), device))
    }

    /// The symlink to maintain for a device, defaulted for auto-mounted devices.
    pub fn symlink_path(&self, name: &str, device: &DeviceConfig) -> Option<PathBuf> {
        match (&device.symlink, &self.defaults.base_link_dir) {
            (Some(symlink), _) => Some(PathBuf::from(expand_home(symlink))),
            (None, Some(base_link_dir)) if device.auto_mount => {
                Some(Path::new(&expand_home(base_link_dir)).join(name))
            }
            _ => None,
        }
    }

    pub fn password_manager_for(&self, device: &DeviceConfig) -> Option<PasswordManagerConfig> {
        let key = device.key.as_ref()?;
        let command = self.defaults.password_manager.as_ref()?;
        Some(PasswordManagerConfig {
            command: command.to_owned(),
            key: key.to_owned(),
        })
    }
}
