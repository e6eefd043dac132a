use std::ffi::OsStr;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tokio::io::unix::AsyncFd;

use crate::event::{DeviceEvent, EventAction, EventSource};

use super::{BlockDevice, DeviceRegistry};

/// Enumerates block devices through libudev.
pub struct UdevRegistry;

#[async_trait]
impl DeviceRegistry for UdevRegistry {
    fn source_debug_string(&self) -> String {
        "udev".to_owned()
    }

    async fn block_devices(&self) -> Result<Vec<BlockDevice>> {
        scan_block_devices().context("Failed to enumerate block devices")
    }
}

fn scan_block_devices() -> Result<Vec<BlockDevice>> {
    let mut enumerator = udev::Enumerator::new()?;
    enumerator.match_subsystem("block")?;

    Ok(enumerator
        .scan_devices()?
        .filter_map(|device| block_device(&device))
        .collect())
}

fn block_device(device: &udev::Device) -> Option<BlockDevice> {
    let devname = property(device, "DEVNAME")
        .or_else(|| device.devnode().map(|node| node.to_string_lossy().into_owned()))?;

    Some(BlockDevice {
        devname,
        fs_type: property(device, "ID_FS_TYPE"),
        uuid: property(device, "ID_FS_UUID"),
        label: property(device, "ID_FS_LABEL"),
    })
}

fn property(device: &udev::Device, name: &str) -> Option<String> {
    device
        .property_value(name)
        .and_then(OsStr::to_str)
        .map(str::to_owned)
}

/// Hot-plug events of the `block` subsystem, read from a udev netlink monitor.
pub struct UdevEventSource {
    socket: AsyncFd<udev::MonitorSocket>,
}

impl UdevEventSource {
    pub fn new() -> Result<Self> {
        let socket = udev::MonitorBuilder::new()
            .and_then(|builder| builder.match_subsystem("block"))
            .and_then(|builder| builder.listen())
            .context("Failed to listen on udev monitor")?;

        Ok(Self {
            socket: AsyncFd::new(socket).context("Failed to register udev monitor")?,
        })
    }
}

#[async_trait(?Send)]
impl EventSource for UdevEventSource {
    async fn next_event(&mut self) -> Result<Option<DeviceEvent>> {
        loop {
            let mut guard = self
                .socket
                .readable_mut()
                .await
                .context("Failed to wait on udev monitor")?;

            match guard.get_inner_mut().iter().next() {
                Some(event) => {
                    let action = event
                        .action()
                        .and_then(OsStr::to_str)
                        .map(EventAction::from)
                        .unwrap_or_else(|| EventAction::Other("change".to_owned()));

                    if let Some(device) = block_device(&event) {
                        return Ok(Some(DeviceEvent {
                            action,
                            devname: device.devname,
                            fs_type: device.fs_type,
                            uuid: device.uuid,
                            label: device.label,
                        }));
                    }
                }
                None => guard.clear_ready(),
            }
        }
    }
}
