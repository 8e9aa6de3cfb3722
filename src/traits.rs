use crate::executor::CommandLine;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Command not found: '{program}'")]
    NotFound { program: String },
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}")]
    NonZeroExit {
        command: String,
        status: String,
        code: Option<i32>,
    },
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion. A non-zero exit is an error.
    async fn run(&self, command: &CommandLine) -> Result<(), ProcessError>;
}
