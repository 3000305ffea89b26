//! Idempotent acquisition of a toolchain source tree.

use std::fs;
use std::io;

use crate::error::PipelineError;
use crate::install::{record_state, InstallState, ToolchainSpec};
use crate::process::{run_checked, CommandRunner, ExternalCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The install path already existed; nothing was touched.
    AlreadyPresent,
    /// The source tree was cloned during this call.
    Cloned,
}

/// Clone `spec.repository` into the install path unless that path exists.
///
/// A failed clone is not cleaned up. Whatever it left behind has no state
/// stamp and is reported as untracked on the next run.
pub fn fetch_source(
    runner: &dyn CommandRunner,
    spec: &ToolchainSpec,
) -> Result<FetchOutcome, PipelineError> {
    if spec.install_dir.exists() {
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let (Some(parent), Some(dest)) = (spec.install_dir.parent(), spec.install_dir.file_name())
    else {
        return Err(PipelineError::Prepare {
            path: spec.install_dir.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "install path has no parent"),
        });
    };
    let parent = parent.to_path_buf();
    fs::create_dir_all(&parent).map_err(|source| PipelineError::Prepare {
        path: parent.clone(),
        source,
    })?;

    println!(
        "[bundle:{}] cloning {} into {}",
        spec.family,
        spec.repository,
        spec.install_dir.display()
    );
    // Destination is relative to the clone's working directory.
    let clone = ExternalCommand::new("git", &parent)
        .arg("clone")
        .arg(&spec.repository)
        .arg(dest);
    run_checked(runner, &clone).map_err(|source| PipelineError::Acquisition {
        family: spec.family,
        source,
    })?;

    record_state(&spec.install_dir, InstallState::Fetched)?;
    Ok(FetchOutcome::Cloned)
}
