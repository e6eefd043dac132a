// Shared fixtures: fake helpers, an in-memory device registry, a file-backed
// mount table and a scripted event source.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use mountpilot::{
    config::Config,
    device::{BlockDevice, DeviceRegistry},
    event::{DeviceEvent, EventAction, EventSource},
    fs::mount_table::MountTable,
    Context,
};
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub struct StaticRegistry(pub Vec<BlockDevice>);

#[async_trait]
impl DeviceRegistry for StaticRegistry {
    fn source_debug_string(&self) -> String {
        "in-memory test registry".to_owned()
    }

    async fn block_devices(&self) -> Result<Vec<BlockDevice>> {
        Ok(self.0.clone())
    }
}

/// Mount table kept in a file the fake helpers edit.
pub struct FileMountTable(pub PathBuf);

#[async_trait]
impl MountTable for FileMountTable {
    fn source_debug_string(&self) -> String {
        format!("file: {:?}", self.0)
    }

    async fn read(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.0).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct ScriptedEvents(pub VecDeque<DeviceEvent>);

#[async_trait(?Send)]
impl EventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Result<Option<DeviceEvent>> {
        Ok(self.0.pop_front())
    }
}

pub fn block_device(devname: &str, uuid: &str, label: Option<&str>) -> BlockDevice {
    BlockDevice {
        devname: devname.to_owned(),
        fs_type: Some("vfat".to_owned()),
        uuid: Some(uuid.to_owned()),
        label: label.map(str::to_owned),
    }
}

pub fn event(action: EventAction, devname: &str, uuid: &str) -> DeviceEvent {
    DeviceEvent {
        action,
        devname: devname.to_owned(),
        fs_type: Some("vfat".to_owned()),
        uuid: Some(uuid.to_owned()),
        label: None,
    }
}

/// A scratch directory with fake `pmount`/`pumount` helpers.
///
/// The helpers append their command line to `calls.log` and keep
/// `mounts` in the `SOURCE on MOUNT_POINT type FSTYPE (OPTIONS)` format.
/// When `-p` is given, `pmount` records the path and content of the secret file.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Result<Self> {
        Self::with_exit_codes(0, 0)
    }

    pub fn with_exit_codes(mount_code: i32, umount_code: i32) -> Result<Self> {
        let sandbox = Self {
            dir: tempfile::tempdir()?,
        };
        std::fs::create_dir(sandbox.links_dir())?;

        sandbox.write_script(
            "pmount",
            &format!(
                r#"#!/bin/sh
echo "pmount $*" >> {log}
secret=""
fstype=vfat
while [ $# -gt 0 ]; do
    case "$1" in
        -t) fstype="$2"; shift 2 ;;
        -p) secret="$2"; shift 2 ;;
        --sync) shift ;;
        *) break ;;
    esac
done
if [ -n "$secret" ]; then
    echo "secret-file $secret" >> {log}
    echo "secret $(cat "$secret")" >> {log}
fi
label="$2"
[ -n "$label" ] || label=$(basename "$1")
[ {code} -eq 0 ] && echo "$1 on /media/$label type $fstype (rw,nosuid,nodev)" >> {mounts}
exit {code}
"#,
                log = sandbox.calls_log().display(),
                mounts = sandbox.mounts_file().display(),
                code = mount_code,
            ),
        )?;

        sandbox.write_script(
            "pumount",
            &format!(
                r#"#!/bin/sh
echo "pumount $*" >> {log}
if [ {code} -eq 0 ] && [ -f {mounts} ]; then
    grep -v "^$1 on " {mounts} > {mounts}.new
    mv {mounts}.new {mounts}
fi
exit {code}
"#,
                log = sandbox.calls_log().display(),
                mounts = sandbox.mounts_file().display(),
                code = umount_code,
            ),
        )?;

        Ok(sandbox)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn calls_log(&self) -> PathBuf {
        self.path().join("calls.log")
    }

    pub fn mounts_file(&self) -> PathBuf {
        self.path().join("mounts")
    }

    pub fn links_dir(&self) -> PathBuf {
        self.path().join("links")
    }

    pub fn helper(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn write_script(&self, name: &str, content: &str) -> Result<()> {
        let path = self.helper(name);
        std::fs::write(&path, content)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.calls_log())
            .map(|log| log.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn add_mount(&self, line: &str) -> Result<()> {
        let mut mounts = std::fs::read_to_string(self.mounts_file()).unwrap_or_default();
        mounts.push_str(line);
        mounts.push('\n');
        std::fs::write(self.mounts_file(), mounts)?;
        Ok(())
    }

    /// `[defaults]` pointing at the fake helpers, followed by `devices`.
    pub fn config(&self, devices: &str) -> Config {
        let raw = format!(
            r#"
[defaults]
base_link_dir = "{links}"
mount_helper = "{pmount}"
umount_helper = "{pumount}"
{devices}
"#,
            links = self.links_dir().display(),
            pmount = self.helper("pmount").display(),
            pumount = self.helper("pumount").display(),
        );
        Config::from_toml(&raw).unwrap()
    }

    pub fn context(&self, devices: &str, registry: Vec<BlockDevice>) -> Context {
        Context::new(
            self.config(devices),
            StaticRegistry(registry),
            FileMountTable(self.mounts_file()),
        )
    }
}
