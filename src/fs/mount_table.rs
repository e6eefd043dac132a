use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::cmd::CheckCommandOutput as _;

/// One line of the live mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub options: String,
}

/// Source of the live mount table, in the `SOURCE on MOUNT_POINT type FSTYPE (OPTIONS)` format.
#[async_trait]
pub trait MountTable {
    fn source_debug_string(&self) -> String;

    async fn read(&self) -> Result<String>;
}

/// Reads the mount table by running `mount` without arguments.
pub struct SystemMountTable;

#[async_trait]
impl MountTable for SystemMountTable {
    fn source_debug_string(&self) -> String {
        "mount(8)".to_owned()
    }

    async fn read(&self) -> Result<String> {
        let stdout = Command::new("mount")
            .run()
            .await
            .context("Failed to list mounted filesystems")?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// The mount point the mount helper picks for a device.
pub fn mount_target(media_dir: &Path, devname: &str, label: Option<&str>) -> PathBuf {
    match label.filter(|label| !label.is_empty()) {
        Some(label) => media_dir.join(label),
        None => media_dir.join(
            Path::new(devname)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| devname.to_owned()),
        ),
    }
}

/// Parse `SOURCE on MOUNT_POINT type FSTYPE (OPTIONS)`.
///
/// The mount point is printed verbatim and may contain spaces, so it spans
/// from the first ` on ` to the last ` type `.
pub fn parse_line(line: &str) -> Option<MountInfo> {
    let (device, rest) = line.trim_end().split_once(" on ")?;
    let (mount_point, rest) = rest.rsplit_once(" type ")?;
    let (fs_type, options) = rest.split_once(' ')?;
    let options = options.strip_prefix('(')?.strip_suffix(')')?;

    if device.is_empty()
        || device.contains(char::is_whitespace)
        || mount_point.is_empty()
        || fs_type.is_empty()
        || options.is_empty()
    {
        return None;
    }

    Some(MountInfo {
        device: device.to_owned(),
        mount_point: PathBuf::from(mount_point),
        fs_type: fs_type.to_owned(),
        options: options.to_owned(),
    })
}

/// Find the entry mounted exactly at `mount_point`.
pub fn find_mount(table: &str, mount_point: &Path) -> Option<MountInfo> {
    table
        .lines()
        .filter_map(parse_line)
        .find(|info| info.mount_point == mount_point)
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use super::*;

    const TABLE: &str = "\
sysfs on /sys type sysfs (rw,nosuid,nodev,noexec,relatime)
/dev/sda2 on / type ext4 (rw,relatime,errors=remount-ro)
/dev/sdb1 on /media/sdb1 type vfat (rw,nosuid,nodev,relatime,uid=1000)
/dev/mapper/crypt on /media/BACKUP type ext4 (rw,nosuid,nodev,sync)
/dev/sdc1 on /media/NO NAME type vfat (rw,nosuid,nodev)
garbage line
";

    #[rstest]
    #[case("/dev/sdb1", None, "/media/sdb1")]
    #[case("/dev/sdb1", Some("BACKUP"), "/media/BACKUP")]
    #[case("/dev/sdb1", Some(""), "/media/sdb1")]
    #[case("crypt", Some("crypt"), "/media/crypt")]
    fn test_mount_target(
        #[case] devname: &str,
        #[case] label: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            mount_target(Path::new("/media"), devname, label),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case(
        "/dev/sdb1 on /media/sdb1 type vfat (rw,nosuid,nodev,relatime,uid=1000)",
        "/dev/sdb1",
        "/media/sdb1",
        "vfat",
        "rw,nosuid,nodev,relatime,uid=1000"
    )]
    #[case(
        "/dev/sdb1 on /media/MY USB type vfat (rw,nosuid,nodev)",
        "/dev/sdb1",
        "/media/MY USB",
        "vfat",
        "rw,nosuid,nodev"
    )]
    #[case(
        "/dev/sdc1 on /media/on type ext4 (rw)",
        "/dev/sdc1",
        "/media/on",
        "ext4",
        "rw"
    )]
    #[case(
        "/dev/sdd1 on /media/my type of disk type exfat (rw)\n",
        "/dev/sdd1",
        "/media/my type of disk",
        "exfat",
        "rw"
    )]
    fn test_parse_line(
        #[case] line: &str,
        #[case] device: &str,
        #[case] mount_point: &str,
        #[case] fs_type: &str,
        #[case] options: &str,
    ) {
        assert_eq!(
            parse_line(line),
            Some(MountInfo {
                device: device.into(),
                mount_point: mount_point.into(),
                fs_type: fs_type.into(),
                options: options.into(),
            })
        );
    }

    #[rstest]
    #[case("garbage line")]
    #[case("/dev/sdb1 /media/sdb1 vfat rw 0 0")]
    #[case("/dev/sdb1 on /media/sdb1 type vfat ()")]
    #[case("/dev/sdb1 on /media/sdb1 type vfat rw")]
    #[case(" on /media/sdb1 type vfat (rw)")]
    fn test_parse_line_rejects(#[case] line: &str) {
        assert_eq!(parse_line(line), None);
    }

    #[test]
    fn test_find_mount() {
        let info = find_mount(TABLE, Path::new("/media/BACKUP")).unwrap();
        assert_eq!(info.device, "/dev/mapper/crypt");
        assert_eq!(info.fs_type, "ext4");

        let info = find_mount(TABLE, Path::new("/media/NO NAME")).unwrap();
        assert_eq!(info.device, "/dev/sdc1");
        assert_eq!(info.fs_type, "vfat");

        assert!(find_mount(TABLE, Path::new("/media/sdc1")).is_none());
        // Only exact mount points match, not prefixes.
        assert!(find_mount(TABLE, Path::new("/media/sdb")).is_none());
    }
}
