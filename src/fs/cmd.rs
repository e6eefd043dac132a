use std::{
    marker::{Send, Sync},
    process::Stdio,
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait CheckCommandOutput {
    async fn run(&mut self) -> Result<Vec<u8>>;

    async fn run_with_status_checker<R>(
        &mut self,
        f: impl Fn(i32, Vec<u8>, Vec<u8>) -> Result<R> + Send + Sync,
    ) -> Result<R>;

    /// Run with the standard streams of the current process and return the exit code.
    async fn run_inherited(&mut self) -> Result<i32>;
}

#[async_trait]
impl CheckCommandOutput for Command {
    async fn run(&mut self) -> Result<Vec<u8>> {
        self.run_with_status_checker(|code, stdout, _| {
            if code != 0 {
                bail!("Bad exit code")
            } else {
                Ok(stdout)
            }
        })
        .await
    }

    async fn run_with_status_checker<R>(
        &mut self,
        f: impl Fn(i32, Vec<u8>, Vec<u8>) -> Result<R> + Send + Sync,
    ) -> Result<R> {
        // reset all locale settings for this command
        self.env("LC_ALL", "C");

        tracing::trace!(cmd=?self.as_std(), "run external cmd");

        async {
            // Spawn the command and get output
            let output = async {
                self.stdin(Stdio::null());
                self.stdout(Stdio::piped());
                self.stderr(Stdio::piped());

                let child = self.kill_on_drop(true).spawn()?;

                child.wait_with_output().await.map_err(anyhow::Error::from)
            }
            .await
            .with_context(|| format!("cmd: {:?}", self.as_std()))?;

            // Handle the output
            let stdout = output.stdout;
            let stderr = output.stderr;
            let code = output.status.code();

            match code {
                Some(code) => f(code, stdout.clone(), stderr.clone()),
                None => Err(anyhow!("killed by signal")),
            }
            .with_context(|| {
                let stdout = String::from_utf8_lossy(&stdout);
                let stderr = String::from_utf8_lossy(&stderr);
                format!(
                    "\ncmd: {:?}\nexit code: {}\nstdout: {}\nstderr: {}",
                    self.as_std(),
                    code.map(|code| code.to_string())
                        .unwrap_or("unknown".to_string()),
                    if stdout.contains('\n') {
                        format!("(multi-line)\n\t{}", stdout.replace('\n', "\n\t"))
                    } else {
                        stdout.into()
                    },
                    if stderr.contains('\n') {
                        format!("(multi-line)\n\t{}", stderr.replace('\n', "\n\t"))
                    } else {
                        stderr.into()
                    },
                )
            })
        }
        .await
        .context("Failed to execute external command")
    }

    async fn run_inherited(&mut self) -> Result<i32> {
        tracing::trace!(cmd=?self.as_std(), "run external cmd");

        let status = self
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to execute external command: {:?}", self.as_std()))?;

        match status.code() {
            Some(code) => Ok(code),
            None => {
                tracing::warn!(cmd=?self.as_std(), "killed by signal");
                Ok(1)
            }
        }
    }
}
