//! Sequencing of the whole bundle build.
//!
//! ```text
//! FetchGeneral -> FetchSpecialized -> FetchLibraries -> CollectArtifacts -> Done
//!       \               \                  \                  \
//!        +---------------+------------------+------------------+--> Failed(stage)
//! ```
//!
//! The run is all-or-nothing: the first failing stage stops the pipeline and
//! no manifest is returned. Re-running starts from the top and relies on each
//! stage's own state checks to skip finished work.

use std::fmt;

use crate::config::{BundleConfig, Validation};
use crate::error::{PipelineError, StageFailure};
use crate::install::{ensure_toolchain, SetupOutcome};
use crate::layout::{BundleLayout, ToolchainFamily};
use crate::libraries::{ensure_libraries, LibraryOutcome};
use crate::manifest::{collect_artifacts, ArtifactManifest};
use crate::process::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchGeneral,
    FetchSpecialized,
    FetchLibraries,
    CollectArtifacts,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::FetchGeneral,
        Stage::FetchSpecialized,
        Stage::FetchLibraries,
        Stage::CollectArtifacts,
    ];

    /// Human-readable label used in progress output and errors.
    pub fn label(self) -> &'static str {
        match self {
            Stage::FetchGeneral => "Setting up AFL-other-arch",
            Stage::FetchSpecialized => "Setting up AFL-cgc",
            Stage::FetchLibraries => "Getting libraries",
            Stage::CollectArtifacts => "Collecting artifacts",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Stage::FetchGeneral => "general",
            Stage::FetchSpecialized => "specialized",
            Stage::FetchLibraries => "libraries",
            Stage::CollectArtifacts => "manifest",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// Drives the stages against one bundle root.
pub struct Pipeline<'a> {
    layout: BundleLayout,
    config: BundleConfig,
    runner: &'a dyn CommandRunner,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(layout: BundleLayout, config: BundleConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            layout,
            config,
            runner,
            state: PipelineState::Pending,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn layout(&self) -> &BundleLayout {
        &self.layout
    }

    /// Run every stage in order and return the manifest on success.
    pub fn run(&mut self) -> Result<ArtifactManifest, StageFailure> {
        let mut manifest = None;
        for stage in Stage::ORDER {
            self.state = PipelineState::Running(stage);
            println!("[bundle:{}] {}", stage.slug(), stage.label());
            match self.run_stage(stage) {
                Ok(collected) => {
                    if collected.is_some() {
                        manifest = collected;
                    }
                }
                Err(source) => {
                    self.state = PipelineState::Failed(stage);
                    return Err(StageFailure { stage, source });
                }
            }
        }

        self.state = PipelineState::Done;
        Ok(manifest.unwrap_or_default())
    }

    fn run_stage(&self, stage: Stage) -> Result<Option<ArtifactManifest>, PipelineError> {
        let validation = self.config.validation;
        match stage {
            Stage::FetchGeneral => {
                self.setup_toolchain(stage, ToolchainFamily::General, validation)?;
                Ok(None)
            }
            Stage::FetchSpecialized => {
                self.setup_toolchain(stage, ToolchainFamily::Specialized, validation)?;
                Ok(None)
            }
            Stage::FetchLibraries => {
                match ensure_libraries(self.runner, &self.layout, validation)? {
                    LibraryOutcome::AlreadyPresent => {
                        println!("[bundle:{}] library bundle already present", stage.slug())
                    }
                    LibraryOutcome::FetchedNow => {
                        println!("[bundle:{}] library bundle fetched", stage.slug())
                    }
                }
                Ok(None)
            }
            Stage::CollectArtifacts => {
                let manifest = collect_artifacts(&self.layout)?;
                manifest.verify(self.layout.root(), validation)?;
                println!(
                    "[bundle:{}] {} manifest entries",
                    stage.slug(),
                    manifest.len()
                );
                Ok(Some(manifest))
            }
        }
    }

    fn setup_toolchain(
        &self,
        stage: Stage,
        family: ToolchainFamily,
        validation: Validation,
    ) -> Result<(), PipelineError> {
        let spec = self.layout.toolchain(family, &self.config);
        match ensure_toolchain(self.runner, &spec, validation)? {
            SetupOutcome::AlreadyInstalled => {
                println!("[bundle:{}] {family} already installed", stage.slug())
            }
            SetupOutcome::InstalledNow => {
                println!("[bundle:{}] {family} installed", stage.slug())
            }
        }
        Ok(())
    }
}
