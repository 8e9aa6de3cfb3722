//! Packaging module - offline package creation for every target platform.
//!
//! This module provides the building blocks of a packaging run:
//! - **Version**: extension version lookup and companion release selection
//! - **Fetch**: release listing, archive download and extraction
//! - **Clean**: reset of the working directory between targets
//! - **Builder**: package naming and invocation of the packaging tool
//! - **Pipeline**: sequential orchestrator via [`pipeline::PackagingPipeline`]

pub mod builder;
pub mod clean;
pub mod fetch;
pub mod pipeline;
pub mod traits;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use traits::{ArtifactFetcher, FetchError, ManifestError, ReleaseSource, ResolveError};

pub use builder::{package_file_name, PackageBuilder};
pub use clean::WorkspaceCleaner;
pub use fetch::HttpFetcher;
pub use pipeline::{
    PackagingEvent, PackagingPipeline, PipelineError, RunStats, RunSummary, Stage, StageFailure,
};
pub use version::{read_extension_version, select_compatible_version};
