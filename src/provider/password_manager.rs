use anyhow::{Context as _, Result};
use tokio::process::Command;
use zeroize::Zeroize as _;

use crate::{error::Error, fs::cmd::CheckCommandOutput as _, types::Passphrase};

use super::{IntoProvider, KeyProvider};

/// Password manager key provider (reads the secret from the command output)
#[derive(Debug, PartialEq, Clone)]
pub struct PasswordManagerConfig {
    /// Command line of the password manager, interpreted by the shell
    pub command: String,

    /// Secret identifier appended to the command line
    pub key: String,
}

impl PasswordManagerConfig {
    pub fn command_line(&self) -> String {
        format!("{} {}", self.command, self.key)
    }
}

pub struct PasswordManagerProvider {
    options: PasswordManagerConfig,
}

impl IntoProvider for PasswordManagerConfig {
    type Provider = PasswordManagerProvider;

    fn into_provider(self) -> Self::Provider {
        PasswordManagerProvider { options: self }
    }
}

impl KeyProvider for PasswordManagerProvider {
    async fn get_key(&self) -> Result<Passphrase> {
        let key = &self.options.key;
        let mut output = Command::new("sh")
            .arg("-c")
            .arg(self.options.command_line())
            .run_with_status_checker(|code, stdout, _| {
                if code != 0 {
                    Err(Error::SecretRetrieval {
                        key: key.to_owned(),
                        code,
                    })?
                }
                Ok(stdout)
            })
            .await
            .with_context(|| format!("Failed to query password manager for key `{key}`"))?;

        // Only the first line holds the secret, `pass` prints metadata below it.
        let secret = output
            .split(|byte| *byte == b'\n')
            .next()
            .unwrap_or_default()
            .trim_ascii()
            .to_vec();
        output.zeroize();

        Ok(Passphrase::from(secret))
    }
}
