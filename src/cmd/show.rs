use anyhow::Result;
use async_trait::async_trait;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, ContentArrangement, Table,
};
use serde::Serialize;

use crate::{cli::ShowOptions, context::Context, error::Error};

pub struct ShowCommand {
    pub show_options: ShowOptions,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub uuid: Option<String>,
    pub parent: Option<String>,
    pub auto_mount: bool,
    pub device: Option<String>,
    pub mount_point: Option<String>,
    pub mounted: bool,
}

#[async_trait(?Send)]
impl crate::cmd::Command for ShowCommand {
    async fn run(&self, ctx: &Context) -> Result<()> {
        let names = &self.show_options.name;
        for name in names {
            if ctx.config().device(name).is_none() {
                Err(Error::DeviceNotFound {
                    name: name.to_owned(),
                })?
            }
        }

        let mut statuses = vec![];
        for (name, _) in ctx.config().devices() {
            if names.is_empty() || names.iter().any(|n| n == name) {
                statuses.push(device_status(ctx, name).await?);
            }
        }

        if self.show_options.json {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        } else {
            statuses.print_as_table();
        }

        Ok(())
    }
}

/// Collect the configured and live state of one device. An unplugged device is not an error.
pub async fn device_status(ctx: &Context, name: &str) -> Result<DeviceStatus> {
    let device = ctx.config().device(name).ok_or_else(|| Error::DeviceNotFound {
        name: name.to_owned(),
    })?;

    let mut status = DeviceStatus {
        name: name.to_owned(),
        device_type: device.device_type.clone().into(),
        uuid: device.uuid.clone(),
        parent: device.parent.clone(),
        auto_mount: device.auto_mount,
        device: None,
        mount_point: None,
        mounted: false,
    };

    match ctx.resolve(name).await {
        Ok(volume) => {
            status.mount_point = Some(ctx.mount_point(&volume).display().to_string());
            status.mounted = ctx.mount_info(&volume).await?.is_some();
            status.device = Some(volume.devname);
        }
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::DeviceNotFound { .. })) => {
            tracing::debug!("The device {name} is not present");
        }
        Err(e) => return Err(e),
    }

    Ok(status)
}

pub trait PrintAsTable {
    fn print_as_table(&self);
}

impl PrintAsTable for [DeviceStatus] {
    fn print_as_table(&self) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                "Name",
                "Type",
                "UUID",
                "Parent",
                "Auto Mount",
                "Device",
                "Mount Point",
                "Mounted",
            ]);

        let optional = |value: &Option<String>| match value {
            Some(value) => Cell::new(value),
            None => Cell::new("<none>").fg(Color::DarkGrey),
        };

        for status in self {
            table.add_row(vec![
                Cell::new(&status.name),
                Cell::new(&status.device_type),
                optional(&status.uuid),
                optional(&status.parent),
                Cell::new(status.auto_mount),
                match &status.device {
                    Some(device) => Cell::new(device),
                    None => Cell::new("Absent").fg(Color::Yellow),
                },
                optional(&status.mount_point),
                if status.mounted {
                    Cell::new("True").fg(Color::Green)
                } else {
                    Cell::new("False").fg(Color::Yellow)
                },
            ]);
        }

        println!("{table}");
    }
}
