use crate::traits::{CommandRunner, ProcessError};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// A program invocation: program, arguments and an explicit working
/// directory. Rendered shell-quoted by `Display` for logs and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quotes `word` for a POSIX shell unless it only contains safe characters.
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));

    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r#"'"'"'"#)))
    }
}

/// Runs commands as child processes, inheriting stdio so tool output shows
/// up on the console.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    #[instrument(skip(self, command), fields(command = %command))]
    async fn run(&self, command: &CommandLine) -> Result<(), ProcessError> {
        let mut process = tokio::process::Command::new(&command.program);
        process.args(&command.args);
        if let Some(dir) = &command.current_dir {
            process.current_dir(dir);
        }

        let status = process.status().await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: command.program.clone(),
                }
            } else {
                ProcessError::Spawn {
                    command: command.to_string(),
                    source,
                }
            }
        })?;

        debug!(%status, "Command finished");

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::NonZeroExit {
                command: command.to_string(),
                status: status.to_string(),
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("vsce"), "vsce");
        assert_eq!(shell_quote("/tmp/lib"), "/tmp/lib");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
    }

    #[test]
    fn test_command_line_display() {
        let cmd = CommandLine::new("vsce")
            .args(["package", "-o"])
            .arg("vscode-ltex-5.0.0-offline-linux-x64.vsix");
        assert_eq!(
            cmd.to_string(),
            "vsce package -o vscode-ltex-5.0.0-offline-linux-x64.vsix"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success() {
        let cmd = CommandLine::new("sh").args(["-c", "exit 0"]);
        assert!(SystemCommandRunner::new().run(&cmd).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_non_zero_exit() {
        let cmd = CommandLine::new("sh").args(["-c", "exit 3"]);
        let err = SystemCommandRunner::new().run(&cmd).await.unwrap_err();
        match err {
            ProcessError::NonZeroExit { code, command, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(command, "sh -c 'exit 3'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let cmd = CommandLine::new("definitely-not-a-real-program-4f1c");
        let err = SystemCommandRunner::new().run(&cmd).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_uses_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandLine::new("sh")
            .args(["-c", "touch marker"])
            .current_dir(dir.path());
        SystemCommandRunner::new().run(&cmd).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
