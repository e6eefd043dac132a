use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{context::Context, device::Volume, driver::VolumeDriver, error::ErrorPolicy, hook};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    Add,
    Remove,
    Other(String),
}

impl From<&str> for EventAction {
    fn from(value: &str) -> Self {
        match value {
            "add" => EventAction::Add,
            "remove" => EventAction::Remove,
            other => EventAction::Other(other.to_owned()),
        }
    }
}

impl Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Add => write!(f, "add"),
            EventAction::Remove => write!(f, "remove"),
            EventAction::Other(action) => write!(f, "{action}"),
        }
    }
}

/// A kernel hot-plug notification for a block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub action: EventAction,
    pub devname: String,
    pub fs_type: Option<String>,
    pub uuid: Option<String>,
    pub label: Option<String>,
}

#[async_trait(?Send)]
pub trait EventSource {
    /// Wait for the next event. `None` means the stream is closed.
    async fn next_event(&mut self) -> Result<Option<DeviceEvent>>;
}

/// Consume hot-plug events until the stream ends or `token` is cancelled.
///
/// Only events carrying filesystem metadata are handled. A failure while
/// handling one event is logged and never stops the loop, only a failing
/// event source does.
pub async fn watch(
    ctx: &Context,
    source: &mut dyn EventSource,
    token: &CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("Stop watching device events");
                return Ok(());
            }
            event = source.next_event() => event?,
        };

        let Some(event) = event else {
            tracing::info!("The device event stream is closed");
            return Ok(());
        };

        if event.fs_type.is_none() {
            tracing::trace!(?event, "skip event without filesystem");
            continue;
        }

        if let Err(e) = handle_event(ctx, &event).await {
            tracing::error!(
                "Failed to handle {} event for {}: {e:#}",
                event.action,
                event.devname
            );
        }
    }
}

/// Run hooks and mount or unmount the configured device an event refers to.
pub async fn handle_event(ctx: &Context, event: &DeviceEvent) -> Result<()> {
    let found = event
        .uuid
        .as_deref()
        .and_then(|uuid| ctx.uuids().name_for(uuid))
        .and_then(|name| ctx.config().device(name).map(|device| (name, device)));

    let label = found
        .and_then(|(_, device)| device.label.clone())
        .or_else(|| event.label.clone());

    tracing::info!(
        "Block device {} {} (name={}, label={}, uuid={}){}",
        event.action,
        event.devname,
        found.map(|(name, _)| name).unwrap_or("None"),
        label.as_deref().unwrap_or("None"),
        event.uuid.as_deref().unwrap_or("None"),
        if found.is_none() { " (nop)" } else { "" }
    );

    let Some((name, device)) = found else {
        return Ok(());
    };

    if let Some(command) = device.hook_for(&event.action) {
        tracing::info!("Running command: {command}");
        match hook::run(ctx.config(), name, command, None).await {
            Ok(0) => {}
            Ok(code) => tracing::warn!("Command `{command}` exited with code {code}"),
            Err(e) => tracing::warn!("Command `{command}` failed: {e:#}"),
        }
    }

    let volume = Volume {
        name: name.to_owned(),
        config: device.clone(),
        devname: event.devname.clone(),
        label,
    };
    let driver = VolumeDriver::new(ctx);

    match event.action {
        EventAction::Add if device.auto_mount => {
            driver.mount(&volume, ErrorPolicy::Lenient).await?;
        }
        EventAction::Remove => {
            if let Some(info) = ctx.mount_info(&volume).await? {
                driver
                    .unmount(&volume, &info.device, ErrorPolicy::Lenient)
                    .await?;
            }
        }
        _ => {}
    }

    Ok(())
}
