//! Fixed on-disk layout of the bundle, relative to the pipeline root.
//!
//! Every path the pipeline reads or writes is derived here, so the stages
//! and the artifact collector agree on where things live.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::BundleConfig;
use crate::install::{BuildPhase, BuildStep, ToolchainSpec};
use crate::process::ExternalCommand;

/// Architectures the general-purpose toolchain is built for, in build order.
pub const SUPPORTED_ARCHES: &[&str] = &[
    "aarch64", "x86_64", "i386", "arm", "ppc", "ppc64", "mips", "mipsel", "mips64",
];

/// Architecture of the single tracer produced by the CGC toolchain.
pub const SPECIALIZED_TRACER_ARCH: &str = "i386";

pub const GENERAL_INSTALL_DIR: &str = "bin/afl-unix";
pub const GENERAL_PATCH_FILE: &str = "patches/afl-patch.diff";
pub const SPECIALIZED_INSTALL_DIR: &str = "bin/afl-cgc";
pub const LIBRARY_BUNDLE_DIR: &str = "bin/fuzzer-libs";
pub const MANIFEST_FILE: &str = "bin/data-files.json";
pub const LOCK_FILE: &str = "bin/.fuzzer-bundle.lock";

pub const MAIN_BINARY: &str = "afl-fuzz";
pub const TRACER_BINARY: &str = "afl-qemu-trace";
pub const TRACERS_DIR: &str = "tracers";
pub const LIBRARY_OUTPUT_DIR: &str = "lib";

const GENERAL_BUILD_SCRIPT: &str = "build.sh";
const QEMU_MODE_DIR: &str = "qemu_mode";
const QEMU_SUPPORT_SCRIPT: &str = "build_qemu_support.sh";
const FETCH_LIBS_SCRIPT: &str = "fetchlibs.sh";

/// The two independent toolchain setups the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainFamily {
    /// Multi-architecture AFL with QEMU tracers.
    General,
    /// AFL variant for the CGC binary format.
    Specialized,
}

impl ToolchainFamily {
    pub const ALL: [ToolchainFamily; 2] = [ToolchainFamily::General, ToolchainFamily::Specialized];

    pub fn name(self) -> &'static str {
        match self {
            ToolchainFamily::General => "afl-other-arch",
            ToolchainFamily::Specialized => "afl-cgc",
        }
    }

    /// Install directory relative to the pipeline root.
    pub fn install_dir(self) -> &'static str {
        match self {
            ToolchainFamily::General => GENERAL_INSTALL_DIR,
            ToolchainFamily::Specialized => SPECIALIZED_INSTALL_DIR,
        }
    }
}

impl fmt::Display for ToolchainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Paths of a bundle rooted at a single directory.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    root: PathBuf,
}

impl BundleLayout {
    /// A relative `root` is anchored to the current directory, so commands
    /// that change directory still see the same paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative path. Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let candidate = path.as_ref();
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    pub fn install_dir(&self, family: ToolchainFamily) -> PathBuf {
        self.resolve(family.install_dir())
    }

    pub fn library_bundle_dir(&self) -> PathBuf {
        self.resolve(LIBRARY_BUNDLE_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(MANIFEST_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.resolve(LOCK_FILE)
    }

    pub fn fetch_libs_script(&self) -> PathBuf {
        self.resolve(FETCH_LIBS_SCRIPT)
    }

    /// Command that populates the library bundle.
    pub fn library_fetch_command(&self) -> ExternalCommand {
        ExternalCommand::new(self.fetch_libs_script(), &self.root)
    }

    /// Full description of how a toolchain family is acquired and built.
    pub fn toolchain(&self, family: ToolchainFamily, config: &BundleConfig) -> ToolchainSpec {
        let install_dir = self.install_dir(family);
        match family {
            ToolchainFamily::General => ToolchainSpec {
                family,
                repository: config.sources.general.clone(),
                patch_file: Some(self.resolve(GENERAL_PATCH_FILE)),
                build_steps: vec![BuildStep {
                    phase: BuildPhase::MultiArch,
                    command: ExternalCommand::new(
                        install_dir.join(GENERAL_BUILD_SCRIPT),
                        &install_dir,
                    )
                    .args(SUPPORTED_ARCHES.iter().copied()),
                }],
                install_dir,
            },
            ToolchainFamily::Specialized => {
                let qemu_dir = install_dir.join(QEMU_MODE_DIR);
                ToolchainSpec {
                    family,
                    repository: config.sources.specialized.clone(),
                    patch_file: None,
                    build_steps: vec![
                        BuildStep {
                            phase: BuildPhase::Make,
                            command: ExternalCommand::new("make", &install_dir).arg("-j"),
                        },
                        BuildStep {
                            phase: BuildPhase::QemuSupport,
                            command: ExternalCommand::new(
                                qemu_dir.join(QEMU_SUPPORT_SCRIPT),
                                &qemu_dir,
                            ),
                        },
                    ],
                    install_dir,
                }
            }
        }
    }
}

/// Root-relative directory holding the tracer for `arch` under an install.
pub fn tracer_dir(family: ToolchainFamily, arch: &str) -> PathBuf {
    Path::new(family.install_dir()).join(TRACERS_DIR).join(arch)
}

/// Root-relative path of the main fuzzer binary of an install.
pub fn main_binary(family: ToolchainFamily) -> PathBuf {
    Path::new(family.install_dir()).join(MAIN_BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_build_passes_every_arch_in_order() {
        let layout = BundleLayout::new("/work");
        let spec = layout.toolchain(ToolchainFamily::General, &BundleConfig::default());

        assert_eq!(spec.install_dir, PathBuf::from("/work/bin/afl-unix"));
        assert_eq!(spec.patch_file, Some(PathBuf::from("/work/patches/afl-patch.diff")));
        assert_eq!(spec.build_steps.len(), 1);
        let command = &spec.build_steps[0].command;
        assert_eq!(command.program, PathBuf::from("/work/bin/afl-unix/build.sh"));
        assert_eq!(command.cwd, PathBuf::from("/work/bin/afl-unix"));
        let args: Vec<_> = command.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, SUPPORTED_ARCHES);
    }

    #[test]
    fn specialized_build_runs_make_then_qemu_support() {
        let layout = BundleLayout::new("/work");
        let spec = layout.toolchain(ToolchainFamily::Specialized, &BundleConfig::default());

        assert!(spec.patch_file.is_none());
        let phases: Vec<_> = spec.build_steps.iter().map(|s| s.phase).collect();
        assert_eq!(phases, [BuildPhase::Make, BuildPhase::QemuSupport]);
        assert_eq!(
            spec.build_steps[1].command.cwd,
            PathBuf::from("/work/bin/afl-cgc/qemu_mode")
        );
    }

    #[test]
    fn relative_root_is_anchored_to_current_dir() {
        let layout = BundleLayout::new("bundle-root");
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(layout.root(), cwd.join("bundle-root"));
        let spec = layout.toolchain(ToolchainFamily::Specialized, &BundleConfig::default());
        let qemu = &spec.build_steps[1].command;
        assert!(qemu.program.is_absolute());
        assert!(qemu.cwd.is_absolute());
        assert_eq!(
            qemu.program,
            cwd.join("bundle-root/bin/afl-cgc/qemu_mode/build_qemu_support.sh")
        );
    }

    #[test]
    fn tracer_paths_are_keyed_by_arch() {
        assert_eq!(
            tracer_dir(ToolchainFamily::General, "mipsel"),
            PathBuf::from("bin/afl-unix/tracers/mipsel")
        );
        assert_eq!(
            main_binary(ToolchainFamily::Specialized),
            PathBuf::from("bin/afl-cgc/afl-fuzz")
        );
    }
}
