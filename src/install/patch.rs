//! One-shot patch application on a freshly fetched tree.

use crate::error::PipelineError;
use crate::install::{record_state, require_state, InstallState, ToolchainSpec};
use crate::process::{run_checked, CommandRunner, ExternalCommand};

/// Feed the toolchain's patch file to `patch -p0` inside the install.
///
/// Only valid on a `Fetched` install. Re-applying a patch to patched sources
/// is undefined for the patch tool, so any other state is refused.
pub fn apply_patch(
    runner: &dyn CommandRunner,
    spec: &ToolchainSpec,
) -> Result<(), PipelineError> {
    let Some(patch) = &spec.patch_file else {
        return Ok(());
    };
    require_state(spec, InstallState::Fetched)?;

    println!("[bundle:{}] applying {}", spec.family, patch.display());
    let command = ExternalCommand::new("patch", &spec.install_dir)
        .arg("-p0")
        .stdin_file(patch);
    run_checked(runner, &command).map_err(|source| PipelineError::Patch {
        family: spec.family,
        patch: patch.clone(),
        source,
    })?;

    record_state(&spec.install_dir, InstallState::Patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundleConfig;
    use crate::install::probe_state;
    use crate::layout::{BundleLayout, ToolchainFamily};
    use crate::testing::FakeRunner;
    use std::fs;
    use tempfile::TempDir;

    fn fetched_general(root: &std::path::Path) -> ToolchainSpec {
        let spec =
            BundleLayout::new(root).toolchain(ToolchainFamily::General, &BundleConfig::default());
        fs::create_dir_all(&spec.install_dir).unwrap();
        record_state(&spec.install_dir, InstallState::Fetched).unwrap();
        spec
    }

    #[test]
    fn patch_runs_in_install_with_patch_on_stdin() {
        let tmp = TempDir::new().unwrap();
        let spec = fetched_general(tmp.path());
        let runner = FakeRunner::new();

        apply_patch(&runner, &spec).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].cwd, spec.install_dir);
        assert_eq!(calls[0].stdin, spec.patch_file);
        assert_eq!(probe_state(&spec.install_dir).unwrap(), InstallState::Patched);
    }

    #[test]
    fn already_patched_tree_is_refused() {
        let tmp = TempDir::new().unwrap();
        let spec = fetched_general(tmp.path());
        record_state(&spec.install_dir, InstallState::Patched).unwrap();
        let runner = FakeRunner::new();

        let err = apply_patch(&runner, &spec).unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedState { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn failing_patch_keeps_fetched_state() {
        let tmp = TempDir::new().unwrap();
        let spec = fetched_general(tmp.path());
        let runner = FakeRunner::new().failing("patch", 1);

        let err = apply_patch(&runner, &spec).unwrap_err();
        assert!(matches!(err, PipelineError::Patch { .. }));
        assert_eq!(probe_state(&spec.install_dir).unwrap(), InstallState::Fetched);
    }

    #[test]
    fn toolchain_without_patch_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let spec = BundleLayout::new(tmp.path())
            .toolchain(ToolchainFamily::Specialized, &BundleConfig::default());
        let runner = FakeRunner::new();

        apply_patch(&runner, &spec).unwrap();
        assert!(runner.calls().is_empty());
        assert!(!spec.install_dir.exists());
    }
}
