//! Artifact manifest: every file that must ship with the package.
//!
//! The manifest is a pure function of the filesystem. It is rebuilt on every
//! call, holds root-relative paths, and keeps the walk order so build logs are
//! reproducible. Directory listings are sorted by file name.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Validation;
use crate::error::PipelineError;
use crate::layout::{
    main_binary, tracer_dir, BundleLayout, ToolchainFamily, LIBRARY_BUNDLE_DIR, LIBRARY_OUTPUT_DIR,
    SPECIALIZED_TRACER_ARCH, SUPPORTED_ARCHES, TRACER_BINARY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ToolchainBinary,
    Tracer,
    Library,
}

/// Install `sources` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub destination: PathBuf,
    pub sources: Vec<PathBuf>,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactManifest {
    entries: Vec<ManifestEntry>,
}

impl ArtifactManifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// All source files, in manifest order.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .flat_map(|e| e.sources.iter().map(PathBuf::as_path))
    }

    fn push(&mut self, kind: ArtifactKind, destination: PathBuf, source: PathBuf) {
        self.entries.push(ManifestEntry {
            destination,
            sources: vec![source],
            kind,
        });
    }

    /// Check that every source exists as a file under `root`.
    ///
    /// Lenient validation skips the check entirely.
    pub fn verify(&self, root: &Path, validation: Validation) -> Result<(), PipelineError> {
        if !validation.is_strict() {
            return Ok(());
        }
        let missing: Vec<PathBuf> = self
            .sources()
            .filter(|source| !root.join(source).is_file())
            .map(Path::to_path_buf)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingArtifacts { missing })
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the manifest as JSON via a temporary file and rename.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }
}

/// Walk the installs and the library bundle and list every shippable file.
///
/// Fixed subpaths (main binaries, tracers) are listed without checking that
/// they exist; see [`ArtifactManifest::verify`].
pub fn collect_artifacts(layout: &BundleLayout) -> Result<ArtifactManifest, PipelineError> {
    let mut manifest = ArtifactManifest::default();

    for family in ToolchainFamily::ALL {
        manifest.push(
            ArtifactKind::ToolchainBinary,
            PathBuf::from(family.install_dir()),
            main_binary(family),
        );
    }

    for arch in SUPPORTED_ARCHES {
        let dir = tracer_dir(ToolchainFamily::General, arch);
        let tracer = dir.join(TRACER_BINARY);
        manifest.push(ArtifactKind::Tracer, dir, tracer);
    }

    collect_libraries(layout, &mut manifest)?;

    let dir = tracer_dir(ToolchainFamily::Specialized, SPECIALIZED_TRACER_ARCH);
    let tracer = dir.join(TRACER_BINARY);
    manifest.push(ArtifactKind::Tracer, dir, tracer);

    Ok(manifest)
}

/// Architecture directories in the library bundle, sorted by name.
pub fn library_arches(layout: &BundleLayout) -> Result<Vec<String>, PipelineError> {
    let bundle = layout.library_bundle_dir();
    let collect_error = |source: io::Error| PipelineError::Collect {
        path: bundle.clone(),
        source,
    };

    let mut arches = Vec::new();
    for entry in fs::read_dir(&bundle).map_err(collect_error)? {
        let entry = entry.map_err(collect_error)?;
        if !entry.path().is_dir() {
            continue;
        }
        arches.push(entry.file_name().to_string_lossy().into_owned());
    }
    arches.sort();
    Ok(arches)
}

fn collect_libraries(
    layout: &BundleLayout,
    manifest: &mut ArtifactManifest,
) -> Result<(), PipelineError> {
    let arches = library_arches(layout)?;
    if arches.is_empty() {
        eprintln!(
            "warning: library bundle '{}' is empty; package will ship without runtime libraries",
            layout.library_bundle_dir().display()
        );
    }

    for arch in &arches {
        if !SUPPORTED_ARCHES.contains(&arch.as_str()) {
            eprintln!("warning: library bundle has unsupported architecture '{arch}'");
        }

        let lib_dir = Path::new(LIBRARY_BUNDLE_DIR).join(arch).join(LIBRARY_OUTPUT_DIR);
        let walker = WalkDir::new(layout.resolve(&lib_dir))
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let path = match entry {
                Ok(entry) if entry.file_type().is_dir() => continue,
                Ok(entry) => entry.into_path(),
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| layout.resolve(&lib_dir));
                    // Shipped as is; strict verification reports it as missing.
                    if !is_dangling_link(&path) {
                        return Err(PipelineError::Collect {
                            path,
                            source: err.into(),
                        });
                    }
                    path
                }
            };

            let relative = path
                .strip_prefix(layout.root())
                .unwrap_or(&path)
                .to_path_buf();
            let destination = relative
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| lib_dir.clone());
            manifest.push(ArtifactKind::Library, destination, relative);
        }
    }
    Ok(())
}

fn is_dangling_link(path: &Path) -> bool {
    let is_link = fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    is_link && fs::metadata(path).is_err()
}
