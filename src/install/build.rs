//! Build dispatch for a fetched (and, where applicable, patched) install.

use crate::error::PipelineError;
use crate::install::{record_state, require_state, InstallState, ToolchainSpec};
use crate::process::{run_checked, CommandRunner};

/// Run every build step of `spec` in order, stopping at the first failure.
///
/// Output of a partially successful build is left in place; the install keeps
/// its pre-build state and is rejected as interrupted on the next strict run.
pub fn build_toolchain(
    runner: &dyn CommandRunner,
    spec: &ToolchainSpec,
) -> Result<(), PipelineError> {
    require_state(spec, spec.state_before_build())?;

    for step in &spec.build_steps {
        println!("[bundle:{}] {}: {}", spec.family, step.phase, step.command);
        run_checked(runner, &step.command).map_err(|source| PipelineError::Build {
            family: spec.family,
            phase: step.phase,
            source,
        })?;
    }

    record_state(&spec.install_dir, InstallState::Built)
}
