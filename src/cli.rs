use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{CONFIG_FILE_DEFAULT, CONFIG_FILE_ENV};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: MountpilotSubcommand,

    /// Path to the configuration file.
    #[clap(long, short = 'c', global = true, env = CONFIG_FILE_ENV, default_value = CONFIG_FILE_DEFAULT)]
    pub config: PathBuf,

    /// Show debug logs. Ignored when RUST_LOG is set.
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum MountpilotSubcommand {
    /// Mount a device, after its parents.
    #[command(name = "mount")]
    Mount(MountOptions),

    /// Unmount a device, after its children.
    #[command(name = "umount")]
    Umount(UmountOptions),

    /// Handle device plug events until interrupted.
    #[command(name = "watch")]
    Watch(WatchOptions),

    /// Show status about configured devices.
    #[command(name = "show")]
    Show(ShowOptions),
}

#[derive(Parser, Debug)]
pub struct MountOptions {
    /// Name of the device to mount.
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct UmountOptions {
    /// Name of the device to unmount.
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct WatchOptions {}

#[derive(Parser, Debug)]
pub struct ShowOptions {
    /// Name of the device(s) to show. If not specified, show all devices.
    #[arg(num_args=0..)]
    pub name: Vec<String>,

    /// Output as JSON format instead of table
    #[clap(long)]
    pub json: bool,
}
