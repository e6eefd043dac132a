use anyhow::Result;
use async_trait::async_trait;

use crate::{cli::UmountOptions, context::Context, driver::VolumeDriver, error::ErrorPolicy};

pub struct UmountCommand {
    pub umount_options: UmountOptions,
}

#[async_trait(?Send)]
impl crate::cmd::Command for UmountCommand {
    async fn run(&self, ctx: &Context) -> Result<()> {
        umount_with_children(ctx, &self.umount_options.name, ErrorPolicy::Strict).await
    }
}

/// Unmount `name` after the devices nested inside it, innermost first.
pub async fn umount_with_children(ctx: &Context, name: &str, policy: ErrorPolicy) -> Result<()> {
    let mut volumes = vec![];
    for name in ctx.graph().unmount_order(name)? {
        volumes.push(ctx.resolve(&name).await?);
    }

    let driver = VolumeDriver::new(ctx);
    for volume in &volumes {
        match ctx.mount_info(volume).await? {
            Some(info) => driver.unmount(volume, &info.device, policy).await?,
            None => tracing::info!("The device {} is not mounted, nothing to do", volume.name),
        }
    }

    Ok(())
}
