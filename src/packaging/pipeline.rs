//! Multi-target packaging orchestrator.
//!
//! [`PackagingPipeline`] builds one offline package per configured target,
//! strictly one after another. Each target runs the same sequence of stages:
//! 1. **Clean**: reset the working directory to its tracked contents
//! 2. **Resolve**: fetch the release listing and pick the companion version
//! 3. **Fetch companion**: download and unpack the companion archive
//! 4. **Fetch runtime**: drop the legacy runtime layout, download and unpack
//!    the runtime for the target
//! 5. **Build**: run the packaging tool
//!
//! Every stage is bounded by the configured stage timeout. The first failure
//! aborts the run with a [`PipelineError`] naming the target and stage;
//! later targets are not attempted.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use semver::Version;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::config::PackagerConfig;
use crate::executor::SystemCommandRunner;
use crate::model::TargetSpec;
use crate::packaging::builder::PackageBuilder;
use crate::packaging::clean::WorkspaceCleaner;
use crate::packaging::fetch::{remove_legacy_runtime, HttpFetcher};
use crate::packaging::traits::{
    ArtifactFetcher, FetchError, ManifestError, ReleaseSource, ResolveError,
};
use crate::packaging::version::{read_extension_version, select_compatible_version};
use crate::traits::{CommandRunner, ProcessError};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Step of a target's packaging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Resolve,
    FetchCompanion,
    FetchRuntime,
    Build,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Resolve => "resolve",
            Stage::FetchCompanion => "fetch-companion",
            Stage::FetchRuntime => "fetch-runtime",
            Stage::Build => "build",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notification sent to the channel set with
/// [`PackagingPipeline::with_progress`].
///
/// `target` is `None` for the generic (non-offline) package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagingEvent {
    TargetStarted {
        target: TargetSpec,
    },
    StageStarted {
        target: Option<TargetSpec>,
        stage: Stage,
    },
    CompanionResolved {
        target: TargetSpec,
        version: Version,
    },
    LegacyRuntimeRemoved {
        path: PathBuf,
    },
    PackageBuilt {
        target: Option<TargetSpec>,
        path: PathBuf,
    },
}

/// Outcome of a successful [`PackagingPipeline::run`].
#[derive(Debug)]
pub struct RunSummary {
    /// Version read from the extension manifest
    pub extension_version: Version,

    /// Produced packages in target order
    pub packages: Vec<PathBuf>,

    pub stats: RunStats,
}

#[derive(Debug, Default, Clone)]
pub struct RunStats {
    /// Wall time of the whole run (milliseconds)
    pub total_duration_ms: u64,

    /// Wall time per target (milliseconds), in build order
    pub target_durations_ms: Vec<(TargetSpec, u64)>,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Underlying cause of a failed stage.
#[derive(thiserror::Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Failed to determine extension version: {0}")]
    Manifest(#[from] ManifestError),

    #[error("{}: stage '{stage}' failed: {source}", target_label(.target))]
    Stage {
        target: Option<TargetSpec>,
        stage: Stage,
        #[source]
        source: StageFailure,
    },

    #[error("{}: stage '{stage}' timed out after {timeout_secs}s", target_label(.target))]
    StageTimeout {
        target: Option<TargetSpec>,
        stage: Stage,
        timeout_secs: u64,
    },
}

fn target_label(target: &Option<TargetSpec>) -> String {
    match target {
        Some(t) => format!("Target '{t}'"),
        None => "Generic package".to_string(),
    }
}

// ============================================================================
// Pipeline Executor
// ============================================================================

pub struct PackagingPipeline<S, F, R>
where
    S: ReleaseSource,
    F: ArtifactFetcher,
    R: CommandRunner,
{
    config: PackagerConfig,
    releases: S,
    fetcher: F,
    cleaner: WorkspaceCleaner<R>,
    builder: PackageBuilder<R>,
    progress: Option<mpsc::UnboundedSender<PackagingEvent>>,
}

impl PackagingPipeline<HttpFetcher, HttpFetcher, SystemCommandRunner> {
    /// Pipeline talking to the network and spawning real processes.
    pub fn with_defaults(config: PackagerConfig) -> Result<Self, FetchError> {
        let http = HttpFetcher::new(&config.user_agent, config.http_timeout)?;
        Ok(Self::new(
            config,
            http.clone(),
            http,
            Arc::new(SystemCommandRunner::new()),
        ))
    }
}

impl<S, F, R> PackagingPipeline<S, F, R>
where
    S: ReleaseSource,
    F: ArtifactFetcher,
    R: CommandRunner,
{
    pub fn new(config: PackagerConfig, releases: S, fetcher: F, runner: Arc<R>) -> Self {
        let cleaner = WorkspaceCleaner::new(
            runner.clone(),
            config.vcs_program.clone(),
            config.project_root.clone(),
        );
        let builder = PackageBuilder::new(
            runner,
            config.package_program.clone(),
            config.package_args.clone(),
            config.project_root.clone(),
            config.package_name.clone(),
            config.package_extension.clone(),
        );

        Self {
            config,
            releases,
            fetcher,
            cleaner,
            builder,
            progress: None,
        }
    }

    /// Sends a [`PackagingEvent`] to `tx` for every step. Sending is best
    /// effort; a dropped receiver does not affect the run.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<PackagingEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn config(&self) -> &PackagerConfig {
        &self.config
    }

    /// Builds the offline package of every configured target, in order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Manifest`] if the extension version cannot be
    /// read, otherwise the error of the first failing stage.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let extension_version = read_extension_version(&self.config.manifest_path)?;

        info!(
            version = %extension_version,
            targets = self.config.targets.len(),
            "Creating offline packages"
        );

        let mut packages = Vec::with_capacity(self.config.targets.len());
        let mut stats = RunStats::default();

        for &target in &self.config.targets {
            let target_start = Instant::now();
            let path = self.process_target(target, &extension_version).await?;
            let duration_ms = target_start.elapsed().as_millis() as u64;

            info!(
                %target,
                duration_ms,
                package = %path.display(),
                "Target completed"
            );
            stats.target_durations_ms.push((target, duration_ms));
            packages.push(path);
        }

        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        Ok(RunSummary {
            extension_version,
            packages,
            stats,
        })
    }

    /// Builds the generic package, which bundles neither the companion
    /// component nor a runtime.
    pub async fn build_generic(&self) -> Result<PathBuf, PipelineError> {
        let extension_version = read_extension_version(&self.config.manifest_path)?;
        let path = self
            .stage(None, Stage::Build, self.builder.build(&extension_version, None))
            .await?;

        self.emit(PackagingEvent::PackageBuilt {
            target: None,
            path: path.clone(),
        });
        Ok(path)
    }

    #[instrument(skip(self, extension_version), fields(platform = %target.platform, arch = %target.arch))]
    async fn process_target(
        &self,
        target: TargetSpec,
        extension_version: &Version,
    ) -> Result<PathBuf, PipelineError> {
        info!(
            "Processing platform '{}' and architecture '{}'",
            target.platform, target.arch
        );
        self.emit(PackagingEvent::TargetStarted { target });

        let working_dir = &self.config.working_dir;
        let t = Some(target);

        self.stage(t, Stage::Clean, self.cleaner.clean(working_dir))
            .await?;

        let companion_version = self
            .stage(t, Stage::Resolve, self.resolve_companion(extension_version))
            .await?;
        info!("Latest compatible release is '{}'", companion_version);

        let companion_url = self.config.companion_url(&companion_version);
        self.emit(PackagingEvent::CompanionResolved {
            target,
            version: companion_version,
        });

        self.stage(
            t,
            Stage::FetchCompanion,
            self.fetcher.download_and_extract(
                &companion_url,
                working_dir,
                self.config.companion_archive_kind(),
            ),
        )
        .await?;

        self.stage(t, Stage::FetchRuntime, self.fetch_runtime(target))
            .await?;

        let path = self
            .stage(t, Stage::Build, self.builder.build(extension_version, t))
            .await?;

        self.emit(PackagingEvent::PackageBuilt {
            target: t,
            path: path.clone(),
        });
        Ok(path)
    }

    async fn resolve_companion(&self, extension_version: &Version) -> Result<Version, StageFailure> {
        let tags = self
            .releases
            .fetch_release_list(&self.config.releases_url)
            .await?;
        debug!(releases = tags.len(), "Fetched release list");

        Ok(select_compatible_version(&tags, extension_version)?)
    }

    async fn fetch_runtime(&self, target: TargetSpec) -> Result<(), StageFailure> {
        for path in remove_legacy_runtime(self.config.legacy_runtime_paths()).await? {
            self.emit(PackagingEvent::LegacyRuntimeRemoved { path });
        }

        let url = self.config.runtime_url(target);
        self.fetcher
            .download_and_extract(
                &url,
                &self.config.working_dir,
                target.platform.runtime_archive_kind(),
            )
            .await?;
        Ok(())
    }

    async fn stage<T, E, Fut>(
        &self,
        target: Option<TargetSpec>,
        stage: Stage,
        work: Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Into<StageFailure>,
    {
        self.emit(PackagingEvent::StageStarted { target, stage });
        let started = Instant::now();

        let output = timeout(self.config.stage_timeout, work)
            .await
            .map_err(|_| PipelineError::StageTimeout {
                target,
                stage,
                timeout_secs: self.config.stage_timeout.as_secs(),
            })?
            .map_err(|e| PipelineError::Stage {
                target,
                stage,
                source: e.into(),
            })?;

        debug!(
            %stage,
            duration_ms = started.elapsed().as_millis() as u64,
            "Stage completed"
        );
        Ok(output)
    }

    fn emit(&self, event: PackagingEvent) {
        if let Some(tx) = &self.progress {
            if tx.send(event).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
