use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fuzzer_bundle::install::probe_state;
use fuzzer_bundle::lock::BundleLock;
use fuzzer_bundle::manifest::collect_artifacts;
use fuzzer_bundle::{
    preflight, ArtifactKind, BundleConfig, BundleLayout, HostRunner, Pipeline, ToolchainFamily,
    Validation,
};

const ROOT_ENV: &str = "FUZZER_BUNDLE_ROOT";

fn usage() -> &'static str {
    "Usage:\n  fuzzer-bundle build [--root <dir>] [--lenient]\n  fuzzer-bundle manifest [--root <dir>] [--lenient]\n  fuzzer-bundle status [--root <dir>]"
}

#[derive(Debug, Default)]
struct Options {
    root: Option<PathBuf>,
    lenient: bool,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(usage());
    };
    let options = parse_options(rest)?;

    match command.as_str() {
        "build" => build(&options),
        "manifest" => print_manifest(&options),
        "status" => status(&options),
        _ => bail!(usage()),
    }
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--lenient" => options.lenient = true,
            "--root" => {
                let Some(dir) = iter.next() else {
                    bail!("--root requires a directory\n{}", usage());
                };
                options.root = Some(PathBuf::from(dir));
            }
            other => bail!("unexpected argument '{}'\n{}", other, usage()),
        }
    }
    Ok(options)
}

fn resolve_root(options: &Options) -> Result<PathBuf> {
    if let Some(root) = &options.root {
        return Ok(root.clone());
    }
    if let Ok(root) = std::env::var(ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    std::env::current_dir().context("resolving current directory")
}

fn load(options: &Options) -> Result<(BundleLayout, BundleConfig)> {
    let root = resolve_root(options)?;
    if !root.is_dir() {
        bail!("bundle root '{}' is not a directory", root.display());
    }
    let root = fs::canonicalize(&root)
        .with_context(|| format!("resolving bundle root '{}'", root.display()))?;
    let mut config = BundleConfig::load(&root)?;
    if options.lenient {
        config.validation = Validation::Lenient;
    }
    Ok((BundleLayout::new(root), config))
}

fn build(options: &Options) -> Result<()> {
    let (layout, config) = load(options)?;
    preflight::check_host_tools(&layout).context("preflight check failed")?;
    let _lock = BundleLock::acquire(&layout)?;

    let manifest_path = layout.manifest_path();
    if manifest_path.exists() {
        fs::remove_file(&manifest_path).with_context(|| {
            format!("removing stale manifest '{}'", manifest_path.display())
        })?;
    }

    let manifest = Pipeline::new(layout, config, &HostRunner).run()?;
    manifest
        .write_json(&manifest_path)
        .with_context(|| format!("writing manifest '{}'", manifest_path.display()))?;

    println!(
        "[bundle:done] {} toolchain binaries, {} tracers, {} libraries; manifest at {}",
        manifest.count(ArtifactKind::ToolchainBinary),
        manifest.count(ArtifactKind::Tracer),
        manifest.count(ArtifactKind::Library),
        manifest_path.display()
    );
    Ok(())
}

fn print_manifest(options: &Options) -> Result<()> {
    let (layout, config) = load(options)?;
    let manifest = collect_artifacts(&layout)?;
    manifest.verify(layout.root(), config.validation)?;
    println!("{}", manifest.to_json().context("serializing manifest")?);
    Ok(())
}

fn status(options: &Options) -> Result<()> {
    let (layout, _) = load(options)?;
    for family in ToolchainFamily::ALL {
        let dir = layout.install_dir(family);
        let state = probe_state(&dir)?;
        println!("{:<16} {:<10} {}", family, state, dir.display());
    }
    let bundle = layout.library_bundle_dir();
    let libraries = if bundle.is_dir() { "present" } else { "absent" };
    println!("{:<16} {:<10} {}", "fuzzer-libs", libraries, bundle.display());
    Ok(())
}
