use std::{ffi::OsString, io::Write as _, path::Path};

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::{
    context::Context,
    device::Volume,
    error::{Error, ErrorPolicy},
    fs::{cmd::CheckCommandOutput as _, symlink},
    hook,
    provider::{IntoProvider as _, KeyProvider as _},
    types::Passphrase,
};

/// Performs the mount and unmount transitions of a single volume.
pub struct VolumeDriver<'a> {
    ctx: &'a Context,
}

impl<'a> VolumeDriver<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub async fn mount(&self, volume: &Volume, policy: ErrorPolicy) -> Result<()> {
        let config = self.ctx.config();
        let mount_point = self.ctx.mount_point(volume);

        let mut args: Vec<OsString> = vec![];
        if let Some(fs_type) = volume.config.device_type.fs_type() {
            args.push("-t".into());
            args.push(fs_type.into());
        }
        if volume.config.sync {
            args.push("--sync".into());
        }

        // Removed from disk when dropped, on every path out of this function.
        let secret_file = match config.password_manager_for(&volume.config) {
            Some(password_manager) => {
                let passphrase = match password_manager.into_provider().get_key().await {
                    Ok(passphrase) => passphrase,
                    Err(e) => {
                        tracing::warn!(
                            "Unable to get password for device {}: {e:#}",
                            volume.devname
                        );
                        return match policy {
                            ErrorPolicy::Strict => Err(e),
                            ErrorPolicy::Lenient => Ok(()),
                        };
                    }
                };
                let secret_file = write_secret_file(&passphrase)?;
                args.push("-p".into());
                args.push(secret_file.path().into());
                Some(secret_file)
            }
            None => None,
        };

        let env = hook_env(volume, &mount_point);

        match &volume.config.mount_cmd {
            Some(mount_cmd) => {
                let result = hook::run(config, &volume.name, mount_cmd, Some(&env)).await;
                check(policy, mount_cmd, result)?;
            }
            None => {
                tracing::info!("Mounting {} on {}", volume.devname, mount_point.display());
                let helper = &config.defaults.mount_helper;
                let mut cmd = Command::new(helper);
                cmd.args(&args).arg(&volume.devname);
                if let Some(label) = &volume.label {
                    cmd.arg(label);
                }
                let result = cmd.run_inherited().await;
                check(policy, &format!("{helper} {}", volume.devname), result)?;
            }
        }

        drop(secret_file);

        if let Some(post_mount_cmd) = &volume.config.post_mount_cmd {
            let result = hook::run(config, &volume.name, post_mount_cmd, Some(&env)).await;
            check(policy, post_mount_cmd, result)?;
        }

        if let Some(link) = config.symlink_path(&volume.name, &volume.config) {
            tolerate(policy, symlink::replace(&link, &mount_point).await)?;
        }

        Ok(())
    }

    /// Detach `device`, the source the mount table reports for the volume.
    pub async fn unmount(&self, volume: &Volume, device: &str, policy: ErrorPolicy) -> Result<()> {
        let config = self.ctx.config();
        let mount_point = self.ctx.mount_point(volume);

        match &volume.config.umount_cmd {
            Some(umount_cmd) => {
                let env = hook_env(volume, &mount_point);
                let result = hook::run(config, &volume.name, umount_cmd, Some(&env)).await;
                check(policy, umount_cmd, result)?;
            }
            None => {
                tracing::info!("Unmounting {device} from {}", mount_point.display());
                let helper = &config.defaults.umount_helper;
                let result = Command::new(helper).arg(device).run_inherited().await;
                check(policy, &format!("{helper} {device}"), result)?;
            }
        }

        if let Some(link) = config.symlink_path(&volume.name, &volume.config) {
            tolerate(policy, symlink::remove(&link).await)?;
        }

        Ok(())
    }
}

fn hook_env(volume: &Volume, mount_point: &Path) -> IndexMap<String, String> {
    let mut env = IndexMap::from([(
        "MOUNT_POINT".to_owned(),
        mount_point.display().to_string(),
    )]);
    env.extend(volume.config.env.clone());
    env
}

fn write_secret_file(passphrase: &Passphrase) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("mountpilot-")
        .tempfile()
        .context("Failed to create secret file")?;
    file.write_all(passphrase.as_bytes())
        .and_then(|_| file.flush())
        .context("Failed to write secret file")?;
    Ok(file)
}

/// Turn the outcome of an external command into the result the policy asks for.
fn check(policy: ErrorPolicy, command: &str, result: Result<i32>) -> Result<()> {
    match result {
        Ok(0) => Ok(()),
        Ok(code) => tolerate(
            policy,
            Err(Error::Helper {
                command: command.to_owned(),
                code,
            }
            .into()),
        ),
        Err(e) => tolerate(policy, Err(e)),
    }
}

fn tolerate(policy: ErrorPolicy, result: Result<()>) -> Result<()> {
    match (policy, result) {
        (ErrorPolicy::Lenient, Err(e)) => {
            tracing::warn!("{e:#}, ignored");
            Ok(())
        }
        (_, result) => result,
    }
}
