//! Test doubles shared by the packaging tests.

use crate::executor::CommandLine;
use crate::model::ArchiveKind;
use crate::packaging::traits::{ArtifactFetcher, FetchError, ReleaseSource};
use crate::traits::{CommandRunner, ProcessError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered log of calls made across all mocks of one test.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Records every command and fails those whose program matches
/// `fail_program` with exit code 128.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<CommandLine>>,
    fail_program: Option<String>,
    journal: Journal,
}

impl RecordingRunner {
    pub fn failing(program: &str) -> Self {
        Self {
            fail_program: Some(program.to_string()),
            ..Self::default()
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandLine) -> Result<(), ProcessError> {
        self.commands.lock().unwrap().push(command.clone());
        self.journal.record(format!(
            "{}:{}",
            command.program,
            command.args.last().map(String::as_str).unwrap_or("")
        ));

        if self.fail_program.as_deref() == Some(command.program.as_str()) {
            return Err(ProcessError::NonZeroExit {
                command: command.to_string(),
                status: "exit status: 128".to_string(),
                code: Some(128),
            });
        }
        Ok(())
    }
}

pub struct MockReleases {
    pub tags: Vec<String>,
    pub journal: Journal,
}

impl MockReleases {
    pub fn new(tags: &[&str], journal: Journal) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            journal,
        }
    }
}

#[async_trait]
impl ReleaseSource for MockReleases {
    async fn fetch_release_list(&self, endpoint_url: &str) -> Result<Vec<String>, FetchError> {
        self.journal.record(format!("releases:{endpoint_url}"));
        Ok(self.tags.clone())
    }
}

#[derive(Default)]
pub struct MockFetcher {
    pub journal: Journal,
    pub delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            delay: None,
        }
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn download_and_extract(
        &self,
        url: &str,
        destination_dir: &Path,
        kind: ArchiveKind,
    ) -> Result<(), FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.journal.record(format!("fetch:{kind}:{url}"));
        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(FetchError::io(destination_dir))
    }
}
