use crate::executor::CommandLine;
use crate::traits::{CommandRunner, ProcessError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Resets a directory inside the project checkout by deleting every file and
/// directory git does not track, ignored ones included.
pub struct WorkspaceCleaner<R> {
    runner: Arc<R>,
    vcs_program: String,
    project_root: PathBuf,
}

impl<R: CommandRunner> WorkspaceCleaner<R> {
    pub fn new(runner: Arc<R>, vcs_program: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            vcs_program: vcs_program.into(),
            project_root: project_root.into(),
        }
    }

    /// `git -C <root> clean -f -d -x <dir>`
    pub fn command(&self, dir: &Path) -> CommandLine {
        CommandLine::new(&self.vcs_program)
            .arg("-C")
            .path_arg(&self.project_root)
            .args(["clean", "-f", "-d", "-x"])
            .path_arg(dir)
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn clean(&self, dir: &Path) -> Result<(), ProcessError> {
        let command = self.command(dir);
        info!("Cleaning '{}' by running '{}'", dir.display(), command);
        self.runner.run(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packaging::testing::RecordingRunner;

    #[test]
    fn test_clean_command() {
        let cleaner = WorkspaceCleaner::new(Arc::new(RecordingRunner::default()), "git", "/src/ext");
        let cmd = cleaner.command(Path::new("/src/ext/lib"));
        assert_eq!(cmd.program, "git");
        assert_eq!(cmd.args, ["-C", "/src/ext", "clean", "-f", "-d", "-x", "/src/ext/lib"]);
    }

    #[tokio::test]
    async fn test_clean_runs_command() {
        let runner = Arc::new(RecordingRunner::default());
        let cleaner = WorkspaceCleaner::new(runner.clone(), "git", "/src/ext");

        cleaner.clean(Path::new("/src/ext/lib")).await.unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].to_string(),
            "git -C /src/ext clean -f -d -x /src/ext/lib"
        );
    }

    #[tokio::test]
    async fn test_clean_failure_propagates() {
        let runner = Arc::new(RecordingRunner::failing("git"));
        let cleaner = WorkspaceCleaner::new(runner, "git", "/src/ext");

        let err = cleaner.clean(Path::new("/src/ext/lib")).await.unwrap_err();
        assert!(matches!(err, ProcessError::NonZeroExit { code: Some(128), .. }));
    }
}
