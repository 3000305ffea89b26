use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::install::{BuildPhase, InstallState};
use crate::layout::ToolchainFamily;
use crate::pipeline::Stage;
use crate::process::CommandFailure;

/// Failure of a single pipeline step. All of these are fatal to the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unable to retrieve {family}")]
    Acquisition {
        family: ToolchainFamily,
        #[source]
        source: CommandFailure,
    },

    #[error("unable to apply patch '{}' to {family}", .patch.display())]
    Patch {
        family: ToolchainFamily,
        patch: PathBuf,
        #[source]
        source: CommandFailure,
    },

    #[error("unable to build {family} ({phase})")]
    Build {
        family: ToolchainFamily,
        phase: BuildPhase,
        #[source]
        source: CommandFailure,
    },

    #[error("unable to fetch libraries")]
    LibraryFetch {
        #[source]
        source: CommandFailure,
    },

    #[error("library fetch finished but bundle directory '{}' is missing", .path.display())]
    LibraryBundleMissing { path: PathBuf },

    #[error(
        "{family} install at '{}' is {found}, expected {expected}; remove it and rerun",
        .path.display()
    )]
    UnexpectedState {
        family: ToolchainFamily,
        path: PathBuf,
        found: InstallState,
        expected: InstallState,
    },

    #[error("creating directory '{}'", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("accessing install state '{}'", .path.display())]
    Stamp {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collecting artifacts under '{}'", .path.display())]
    Collect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} expected artifact(s) missing: {}", .missing.len(), join_paths(.missing))]
    MissingArtifacts { missing: Vec<PathBuf> },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A pipeline run halted in `stage`.
#[derive(Debug, Error)]
#[error("{} failed", .stage.label())]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}
