//! Build orchestration for a redistributable bundle of prebuilt fuzzing
//! toolchains.
//!
//! The crate does not fuzz. It acquires, patches and builds two external AFL
//! toolchains (a multi-architecture one and one for the CGC binary format),
//! fetches their runtime libraries, and produces the manifest of files a
//! packaging step has to ship:
//!
//! - **Installs** - clone, patch and build with explicit on-disk state
//! - **Libraries** - one-shot fetch of the per-architecture library bundle
//! - **Manifest** - deterministic walk producing (destination, sources) pairs
//! - **Pipeline** - sequences the stages and fails fast with a stage label
//! - **Process** - the narrow interface every external tool is invoked through
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     │
//!     ├── FetchGeneral      install::ensure_toolchain(afl-other-arch)
//!     │                         fetch -> patch -> build.sh <arches>
//!     ├── FetchSpecialized  install::ensure_toolchain(afl-cgc)
//!     │                         fetch -> make -j -> qemu_mode/build_qemu_support.sh
//!     ├── FetchLibraries    libraries::ensure_libraries (fetchlibs.sh)
//!     └── CollectArtifacts  manifest::collect_artifacts + verify
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use fuzzer_bundle::{BundleConfig, BundleLayout, HostRunner, Pipeline};
//!
//! let layout = BundleLayout::new(".");
//! let config = BundleConfig::load(layout.root())?;
//! let manifest = Pipeline::new(layout, config, &HostRunner).run()?;
//! println!("{}", manifest.to_json()?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod install;
pub mod layout;
pub mod libraries;
pub mod lock;
pub mod manifest;
pub mod pipeline;
pub mod preflight;
pub mod process;

#[cfg(test)]
mod testing;

pub use config::{BundleConfig, Validation};
pub use error::{PipelineError, StageFailure};
pub use install::{InstallState, ToolchainSpec};
pub use layout::{BundleLayout, ToolchainFamily, SUPPORTED_ARCHES};
pub use manifest::{ArtifactKind, ArtifactManifest, ManifestEntry};
pub use pipeline::{Pipeline, PipelineState, Stage};
pub use process::{CommandRunner, ExternalCommand, HostRunner};
