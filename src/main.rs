use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vsix_offline_packager::packaging::PackagingPipeline;
use vsix_offline_packager::PackagerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let project_root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Cannot determine current directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match PackagingPipeline::with_defaults(PackagerConfig::for_project(project_root)) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run().await {
        Ok(summary) => {
            for package in &summary.packages {
                info!("Created '{}'", package.display());
            }
            info!(
                version = %summary.extension_version,
                duration_ms = summary.stats.total_duration_ms,
                "Created {} offline packages",
                summary.packages.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
