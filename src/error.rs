use thiserror::Error;

/// Failures that decide the exit status of an explicit command.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Device \"{name}\" not found.")]
    DeviceNotFound { name: String },

    #[error("Unable to get password for key `{key}` (exit code: {code})")]
    SecretRetrieval { key: String, code: i32 },

    #[error("Command `{command}` exited with code {code}")]
    Helper { command: String, code: i32 },

    #[error("Bad command template `{template}`: {reason}")]
    Template { template: String, reason: String },
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::DeviceNotFound { .. } | Error::Template { .. } => 1,
            Error::SecretRetrieval { code, .. } | Error::Helper { code, .. } => *code,
        }
    }
}

/// How a failing external command affects the surrounding operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// The first failure aborts the operation and becomes the exit status.
    Strict,
    /// Failures are logged and the operation carries on.
    Lenient,
}

/// Exit status for an error bubbling up to the top-level command handler.
pub fn exit_code_of(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_code)
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
