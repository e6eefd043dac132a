use anyhow::Result;
use async_trait::async_trait;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::{build, cli::WatchOptions, context::Context, device::udev::UdevEventSource, event};

pub struct WatchCommand {
    pub watch_options: WatchOptions,
}

#[async_trait(?Send)]
impl crate::cmd::Command for WatchCommand {
    async fn run(&self, ctx: &Context) -> Result<()> {
        tracing::info!(
            "mountpilot version: v{}  commit: {}  buildtime: {}",
            build::PKG_VERSION,
            build::COMMIT_HASH,
            build::BUILD_TIME
        );

        let mut source = UdevEventSource::new()?;
        let token = CancellationToken::new();

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        tracing::info!("Watching block device events");
        let watching = event::watch(ctx, &mut source, &token);
        tokio::pin!(watching);

        tokio::select! {
            result = &mut watching => return result,
            _ = interrupt.recv() => tracing::info!("Received SIGINT, shutting down"),
            _ = terminate.recv() => tracing::info!("Received SIGTERM, shutting down"),
        }

        // Let the event being handled run to completion.
        token.cancel();
        watching.await
    }
}
