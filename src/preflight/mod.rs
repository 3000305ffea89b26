//! Preflight checks for bundle builds.
//!
//! Validates that the host has the tools the pending stages will invoke, so a
//! missing `git` or `make` is reported up front instead of halfway through a
//! toolchain build.
//!
//! # Example
//!
//! ```rust,no_run
//! use fuzzer_bundle::preflight::{check_required_tools, required_tools};
//! use fuzzer_bundle::BundleLayout;
//!
//! let layout = BundleLayout::new(".");
//! let tools = required_tools(&layout);
//! if let Err(e) = check_required_tools(&tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

use crate::layout::{BundleLayout, ToolchainFamily};

/// Check if a command exists on the host's PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools needed by the stages that will actually run for `layout`.
///
/// Each tuple is (command_name, package_name). Installs that already exist
/// are skipped by the pipeline, so they need nothing.
pub fn required_tools(layout: &BundleLayout) -> Vec<(&'static str, &'static str)> {
    let general_absent = !layout.install_dir(ToolchainFamily::General).exists();
    let specialized_absent = !layout.install_dir(ToolchainFamily::Specialized).exists();

    let mut tools = Vec::new();
    if general_absent || specialized_absent {
        tools.push(("git", "git"));
    }
    if general_absent {
        tools.push(("patch", "patch"));
    }
    if specialized_absent {
        tools.push(("make", "make"));
    }
    tools
}

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check every tool the pending stages for `layout` need.
pub fn check_host_tools(layout: &BundleLayout) -> Result<()> {
    check_required_tools(&required_tools(layout))
}
