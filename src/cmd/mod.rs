pub mod mount;
pub mod show;
pub mod umount;
pub mod watch;

use anyhow::Result;
use async_trait::async_trait;

use crate::{cli::MountpilotSubcommand, context::Context};
use mount::MountCommand;
use show::ShowCommand;
use umount::UmountCommand;
use watch::WatchCommand;

#[async_trait(?Send)]
pub trait Command {
    async fn run(&self, ctx: &Context) -> Result<()>;
}

pub trait IntoCommand {
    fn into_command(self) -> Box<dyn Command>;
}

impl IntoCommand for MountpilotSubcommand {
    fn into_command(self) -> Box<dyn Command> {
        match self {
            MountpilotSubcommand::Mount(mount_options) => Box::new(MountCommand { mount_options }),
            MountpilotSubcommand::Umount(umount_options) => {
                Box::new(UmountCommand { umount_options })
            }
            MountpilotSubcommand::Watch(watch_options) => Box::new(WatchCommand { watch_options }),
            MountpilotSubcommand::Show(show_options) => Box::new(ShowCommand { show_options }),
        }
    }
}
