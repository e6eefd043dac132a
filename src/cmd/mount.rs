use anyhow::Result;
use async_trait::async_trait;

use crate::{cli::MountOptions, context::Context, driver::VolumeDriver, error::ErrorPolicy};

pub struct MountCommand {
    pub mount_options: MountOptions,
}

#[async_trait(?Send)]
impl crate::cmd::Command for MountCommand {
    async fn run(&self, ctx: &Context) -> Result<()> {
        mount_with_parents(ctx, &self.mount_options.name, ErrorPolicy::Strict).await
    }
}

/// Mount `name` after all of its ancestors, outermost first.
///
/// Every device in the chain is resolved before anything is mounted, and
/// devices already mounted are left alone.
pub async fn mount_with_parents(ctx: &Context, name: &str, policy: ErrorPolicy) -> Result<()> {
    let mut volumes = vec![];
    for name in ctx.graph().mount_order(name)? {
        volumes.push(ctx.resolve(&name).await?);
    }

    let driver = VolumeDriver::new(ctx);
    for volume in &volumes {
        if let Some(info) = ctx.mount_info(volume).await? {
            tracing::info!(
                "The device {} is already mounted on {}",
                volume.name,
                info.mount_point.display()
            );
            continue;
        }
        driver.mount(volume, policy).await?;
    }

    Ok(())
}
