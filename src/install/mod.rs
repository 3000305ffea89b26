//! Toolchain installs: acquisition, patching and building.
//!
//! An install moves through `Absent -> Fetched -> Patched -> Built` (the
//! patch step is skipped for toolchains without a patch file). Each
//! successful transition is recorded in a state stamp inside the install, so
//! the state can be recovered by probing the filesystem on the next run:
//!
//! - [`fetch`] - clone the source tree if the install path is absent
//! - [`patch`] - apply the stored patch to a freshly fetched tree
//! - [`build`] - run the toolchain's build steps in order
//!
//! [`ensure_toolchain`] chains the three and decides what to do with an
//! install left behind by an earlier run.

pub mod build;
pub mod fetch;
pub mod patch;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Validation;
use crate::error::PipelineError;
use crate::layout::{ToolchainFamily, MAIN_BINARY};
use crate::process::{CommandRunner, ExternalCommand};

pub use build::build_toolchain;
pub use fetch::{fetch_source, FetchOutcome};
pub use patch::apply_patch;

/// Name of the state stamp written inside every install this crate creates.
pub const STATE_STAMP_FILENAME: &str = ".fuzzer-bundle-state.json";

/// Everything needed to acquire and build one toolchain family.
#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    pub family: ToolchainFamily,
    pub install_dir: PathBuf,
    pub repository: String,
    pub patch_file: Option<PathBuf>,
    pub build_steps: Vec<BuildStep>,
}

impl ToolchainSpec {
    /// State the install must be in before its build steps may run.
    pub fn state_before_build(&self) -> InstallState {
        if self.patch_file.is_some() {
            InstallState::Patched
        } else {
            InstallState::Fetched
        }
    }
}

/// One external build invocation, labelled for error reporting.
#[derive(Debug, Clone)]
pub struct BuildStep {
    pub phase: BuildPhase,
    pub command: ExternalCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// `build.sh` over every supported architecture.
    MultiArch,
    /// Plain parallel `make`.
    Make,
    /// QEMU emulation support for the tracer.
    QemuSupport,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildPhase::MultiArch => "multi-arch build",
            BuildPhase::Make => "make",
            BuildPhase::QemuSupport => "qemu support",
        })
    }
}

/// Install state recovered from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallState {
    /// Install path does not exist.
    Absent,
    /// Path exists but carries no state stamp.
    Untracked,
    Fetched,
    Patched,
    Built,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            InstallState::Absent => "absent",
            InstallState::Untracked => "untracked",
            InstallState::Fetched => "fetched",
            InstallState::Patched => "patched",
            InstallState::Built => "built",
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateStamp {
    state: InstallState,
    updated_at_unix: u64,
}

/// Outcome of [`ensure_toolchain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    AlreadyInstalled,
    InstalledNow,
}

pub fn stamp_path(install_dir: &Path) -> PathBuf {
    install_dir.join(STATE_STAMP_FILENAME)
}

/// Probe the state of an install directory.
pub fn probe_state(install_dir: &Path) -> Result<InstallState, PipelineError> {
    if !install_dir.exists() {
        return Ok(InstallState::Absent);
    }
    let path = stamp_path(install_dir);
    if !path.is_file() {
        return Ok(InstallState::Untracked);
    }

    let stamp_error = |source: io::Error| PipelineError::Stamp {
        path: path.clone(),
        source,
    };
    let bytes = fs::read(&path).map_err(stamp_error)?;
    let stamp: StateStamp = serde_json::from_slice(&bytes).map_err(|err| stamp_error(err.into()))?;
    match stamp.state {
        InstallState::Absent | InstallState::Untracked => Err(stamp_error(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("stamp records non-persistent state '{}'", stamp.state),
        ))),
        state => Ok(state),
    }
}

/// Record `state` in the install's stamp.
pub fn record_state(install_dir: &Path, state: InstallState) -> Result<(), PipelineError> {
    let path = stamp_path(install_dir);
    let stamp_error = |source: io::Error| PipelineError::Stamp {
        path: path.clone(),
        source,
    };

    let stamp = StateStamp {
        state,
        updated_at_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };
    let bytes = serde_json::to_vec_pretty(&stamp).map_err(|err| stamp_error(err.into()))?;

    let tmp = install_dir.join(format!("{STATE_STAMP_FILENAME}.tmp"));
    fs::write(&tmp, bytes).map_err(stamp_error)?;
    fs::rename(&tmp, &path).map_err(stamp_error)?;
    Ok(())
}

/// Fail unless the install is currently in `expected`.
pub(crate) fn require_state(
    spec: &ToolchainSpec,
    expected: InstallState,
) -> Result<(), PipelineError> {
    let found = probe_state(&spec.install_dir)?;
    if found == expected {
        return Ok(());
    }
    Err(PipelineError::UnexpectedState {
        family: spec.family,
        path: spec.install_dir.clone(),
        found,
        expected,
    })
}

/// Bring a toolchain install to the built state.
///
/// A fresh install is cloned, patched and built. An existing install is never
/// patched or rebuilt: a completed one is accepted, and an interrupted one is
/// rejected under strict validation so the operator can remove it.
pub fn ensure_toolchain(
    runner: &dyn CommandRunner,
    spec: &ToolchainSpec,
    validation: Validation,
) -> Result<SetupOutcome, PipelineError> {
    let found = probe_state(&spec.install_dir)?;
    match found {
        InstallState::Absent => {
            fetch_source(runner, spec)?;
            apply_patch(runner, spec)?;
            build_toolchain(runner, spec)?;
            Ok(SetupOutcome::InstalledNow)
        }
        InstallState::Built => Ok(SetupOutcome::AlreadyInstalled),
        InstallState::Untracked => {
            if validation.is_strict() && !spec.install_dir.join(MAIN_BINARY).is_file() {
                return Err(PipelineError::UnexpectedState {
                    family: spec.family,
                    path: spec.install_dir.clone(),
                    found,
                    expected: InstallState::Built,
                });
            }
            Ok(SetupOutcome::AlreadyInstalled)
        }
        InstallState::Fetched | InstallState::Patched => {
            if validation.is_strict() {
                return Err(PipelineError::UnexpectedState {
                    family: spec.family,
                    path: spec.install_dir.clone(),
                    found,
                    expected: InstallState::Built,
                });
            }
            eprintln!(
                "warning: {} install at '{}' was left {} by an earlier run; using it as is",
                spec.family,
                spec.install_dir.display(),
                found
            );
            Ok(SetupOutcome::AlreadyInstalled)
        }
    }
}
