use crate::executor::CommandLine;
use crate::model::TargetSpec;
use crate::traits::{CommandRunner, ProcessError};
use semver::Version;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// File name of a package.
///
/// Without a target this is the generic package `{name}-{version}.{ext}`;
/// with one it is the offline package
/// `{name}-{version}-offline-{platform}-{arch}.{ext}`.
pub fn package_file_name(
    name: &str,
    extension: &str,
    version: &Version,
    target: Option<TargetSpec>,
) -> String {
    match target {
        None => format!("{name}-{version}.{extension}"),
        Some(t) => format!(
            "{name}-{version}-offline-{}-{}.{extension}",
            t.platform, t.arch
        ),
    }
}

/// Produces packages by running the external packaging tool in the project
/// root.
pub struct PackageBuilder<R> {
    runner: Arc<R>,
    program: String,
    args: Vec<String>,
    project_root: PathBuf,
    package_name: String,
    package_extension: String,
}

impl<R: CommandRunner> PackageBuilder<R> {
    pub fn new(
        runner: Arc<R>,
        program: impl Into<String>,
        args: Vec<String>,
        project_root: impl Into<PathBuf>,
        package_name: impl Into<String>,
        package_extension: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
            project_root: project_root.into(),
            package_name: package_name.into(),
            package_extension: package_extension.into(),
        }
    }

    pub fn file_name(&self, version: &Version, target: Option<TargetSpec>) -> String {
        package_file_name(&self.package_name, &self.package_extension, version, target)
    }

    pub fn command(&self, file_name: &str) -> CommandLine {
        CommandLine::new(&self.program)
            .args(self.args.iter().cloned())
            .arg(file_name)
            .current_dir(&self.project_root)
    }

    /// Builds the package for `target` (or the generic one) and returns its
    /// path.
    #[instrument(skip(self, version), fields(version = %version))]
    pub async fn build(
        &self,
        version: &Version,
        target: Option<TargetSpec>,
    ) -> Result<PathBuf, ProcessError> {
        let file_name = self.file_name(version, target);
        let command = self.command(&file_name);

        info!("Creating package by running '{}'", command);
        self.runner.run(&command).await?;

        Ok(self.project_root.join(file_name))
    }
}
