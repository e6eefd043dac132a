use indexmap::IndexMap;
use serde::Deserialize;

use crate::event::EventAction;

pub const DEFAULT_FS_TYPE: &str = "vfat";
const PSEUDO_DEVICE_TYPE: &str = "command";

/// What backs a configured device.
///
/// `"command"` marks a pseudo-device driven only by its custom commands, any
/// other value is the filesystem type handed to the mount helper.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DeviceType {
    Command,
    Filesystem(String),
}

impl DeviceType {
    pub fn fs_type(&self) -> Option<&str> {
        match self {
            DeviceType::Command => None,
            DeviceType::Filesystem(fs_type) => Some(fs_type),
        }
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Filesystem(DEFAULT_FS_TYPE.to_owned())
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        if value == PSEUDO_DEVICE_TYPE {
            DeviceType::Command
        } else {
            DeviceType::Filesystem(value)
        }
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Command => PSEUDO_DEVICE_TYPE.to_owned(),
            DeviceType::Filesystem(fs_type) => fs_type,
        }
    }
}

/// The configuration of one logical volume, keyed by its name under `[devices]`.
#[derive(Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// `"command"` for a pseudo-device, otherwise the filesystem type. The default value is "vfat".
    #[serde(default, rename = "type")]
    pub device_type: DeviceType,

    /// Filesystem UUID used to recognize the live block device.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Overrides the label reported by the device. Decides the mount point name.
    #[serde(default)]
    pub label: Option<String>,

    /// Name of the device that must be mounted before this one.
    #[serde(default)]
    pub parent: Option<String>,

    /// Mount the device as soon as it is plugged in.
    #[serde(default)]
    pub auto_mount: bool,

    /// Where to keep a symlink to the mount point.
    #[serde(default)]
    pub symlink: Option<String>,

    /// Secret identifier passed to the password manager.
    #[serde(default)]
    pub key: Option<String>,

    /// Mount with `--sync`.
    #[serde(default)]
    pub sync: bool,

    /// Extra environment variables for the hook commands.
    #[serde(default)]
    pub env: IndexMap<String, String>,

    #[serde(default)]
    pub mount_cmd: Option<String>,

    #[serde(default)]
    pub umount_cmd: Option<String>,

    #[serde(default)]
    pub post_mount_cmd: Option<String>,

    #[serde(default)]
    pub on_add: Option<String>,

    #[serde(default)]
    pub on_remove: Option<String>,
}

impl DeviceConfig {
    pub fn is_pseudo(&self) -> bool {
        self.device_type == DeviceType::Command
    }

    /// The hook configured for a hot-plug action, if any.
    pub fn hook_for(&self, action: &EventAction) -> Option<&str> {
        match action {
            EventAction::Add => self.on_add.as_deref(),
            EventAction::Remove => self.on_remove.as_deref(),
            EventAction::Other(_) => None,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("command", DeviceType::Command, None)]
    #[case("ext4", DeviceType::Filesystem("ext4".into()), Some("ext4"))]
    #[case("vfat", DeviceType::Filesystem("vfat".into()), Some("vfat"))]
    fn test_device_type(
        #[case] raw: &str,
        #[case] expected: DeviceType,
        #[case] fs_type: Option<&str>,
    ) {
        let device_type = DeviceType::from(raw.to_owned());
        assert_eq!(device_type, expected);
        assert_eq!(device_type.fs_type(), fs_type);
        assert_eq!(String::from(device_type), raw);
    }

    #[test]
    fn test_hook_for() {
        let device = DeviceConfig {
            on_add: Some("echo added".into()),
            ..Default::default()
        };
        assert_eq!(device.hook_for(&EventAction::Add), Some("echo added"));
        assert_eq!(device.hook_for(&EventAction::Remove), None);
        assert_eq!(device.hook_for(&EventAction::Other("change".into())), None);
        assert_eq!(device.device_type.fs_type(), Some(DEFAULT_FS_TYPE));
    }
}
