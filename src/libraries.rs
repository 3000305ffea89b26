//! Per-architecture runtime library bundle.
//!
//! The bundle is fetched as a unit by an external script; there is no
//! per-architecture granularity and nothing is re-fetched once the bundle
//! directory exists.

use crate::config::Validation;
use crate::error::PipelineError;
use crate::layout::BundleLayout;
use crate::process::{run_checked, CommandRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryOutcome {
    AlreadyPresent,
    FetchedNow,
}

/// Run the library fetch script unless the bundle directory already exists.
pub fn ensure_libraries(
    runner: &dyn CommandRunner,
    layout: &BundleLayout,
    validation: Validation,
) -> Result<LibraryOutcome, PipelineError> {
    let bundle = layout.library_bundle_dir();
    if bundle.exists() {
        return Ok(LibraryOutcome::AlreadyPresent);
    }

    let command = layout.library_fetch_command();
    println!("[bundle:libraries] {}", command);
    run_checked(runner, &command).map_err(|source| PipelineError::LibraryFetch { source })?;

    if validation.is_strict() && !bundle.is_dir() {
        return Err(PipelineError::LibraryBundleMissing { path: bundle });
    }
    Ok(LibraryOutcome::FetchedNow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fetch_runs_once_from_root_without_args() {
        let tmp = TempDir::new().unwrap();
        let layout = BundleLayout::new(tmp.path());
        let runner = FakeRunner::healthy(tmp.path());

        let first = ensure_libraries(&runner, &layout, Validation::Strict).unwrap();
        let second = ensure_libraries(&runner, &layout, Validation::Strict).unwrap();

        assert_eq!(first, LibraryOutcome::FetchedNow);
        assert_eq!(second, LibraryOutcome::AlreadyPresent);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].cwd, tmp.path());
        assert!(calls[0].args.is_empty());
    }

    #[test]
    fn existing_bundle_is_not_refetched() {
        let tmp = TempDir::new().unwrap();
        let layout = BundleLayout::new(tmp.path());
        fs::create_dir_all(layout.library_bundle_dir()).unwrap();
        let runner = FakeRunner::healthy(tmp.path());

        let outcome = ensure_libraries(&runner, &layout, Validation::Strict).unwrap();
        assert_eq!(outcome, LibraryOutcome::AlreadyPresent);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn script_failure_is_a_library_fetch_error() {
        let tmp = TempDir::new().unwrap();
        let layout = BundleLayout::new(tmp.path());
        let runner = FakeRunner::new().failing("fetchlibs.sh", 1);

        let err = ensure_libraries(&runner, &layout, Validation::Strict).unwrap_err();
        assert!(matches!(err, PipelineError::LibraryFetch { .. }));
    }

    #[test]
    fn silent_script_is_caught_only_when_strict() {
        let tmp = TempDir::new().unwrap();
        let layout = BundleLayout::new(tmp.path());
        let runner = FakeRunner::new();

        let strict = ensure_libraries(&runner, &layout, Validation::Strict);
        assert!(matches!(
            strict,
            Err(PipelineError::LibraryBundleMissing { .. })
        ));
        let lenient = ensure_libraries(&runner, &layout, Validation::Lenient).unwrap();
        assert_eq!(lenient, LibraryOutcome::FetchedNow);
    }
}
