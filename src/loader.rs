//! Populate an index from a generated `implementors/` tree.
//!
//! Every `trait.<Name>.js` script below the root is one capability file. Files
//! are registered in sorted path order so repeated loads produce the same
//! index regardless of directory iteration order.

use crate::index::{CapabilityName, ImplementorIndex};
use crate::script::{parse_script, render_script};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name the generator writes implementor scripts into.
pub const IMPLEMENTORS_DIR: &str = "implementors";

/// Collect every `.js` script under `root`, recursively, sorted.
pub fn collect_scripts(root: &Path) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();
    collect_from_dir(root, &mut scripts)?;
    scripts.sort();
    Ok(scripts)
}

fn collect_from_dir(root: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_from_dir(&path, acc)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("js") {
            acc.push(path);
        }
    }
    Ok(())
}

/// Parse and register every capability script under `root`.
///
/// Returns the number of scripts registered. Scripts that are not named
/// `trait.<Name>.js` are skipped; a script that fails to parse aborts the
/// load with the offending path in the error.
pub fn load_directory(index: &mut ImplementorIndex, root: &Path) -> Result<usize> {
    let mut registered = 0;
    for script in collect_scripts(root)? {
        let capability = match CapabilityName::from_script_path(root, &script) {
            Ok(name) => name,
            Err(err) => {
                debug!(path = %script.display(), "skipping: {err}");
                continue;
            }
        };
        let source =
            fs::read_to_string(&script).with_context(|| format!("reading {}", script.display()))?;
        let groups =
            parse_script(&source).with_context(|| format!("parsing {}", script.display()))?;
        if groups.is_empty() && !source.contains("implementors") {
            warn!(path = %script.display(), "no implementor table found in script");
        }
        index.register(capability, groups);
        registered += 1;
    }
    info!(root = %root.display(), registered, "loaded implementor scripts");
    Ok(registered)
}

/// Load `<doc_root>/implementors` into a fresh index.
pub fn load_doc_root(doc_root: &Path) -> Result<ImplementorIndex> {
    let root = doc_root.join(IMPLEMENTORS_DIR);
    if !root.is_dir() {
        bail!("no {IMPLEMENTORS_DIR}/ directory under {}", doc_root.display());
    }
    let mut index = ImplementorIndex::new();
    load_directory(&mut index, &root)?;
    Ok(index)
}

/// Where the script for `capability` lives under an `implementors/` root.
pub fn script_path(root: &Path, capability: &CapabilityName) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in capability.module_segments() {
        path.push(segment);
    }
    path.push(format!("trait.{}.js", capability.short_name()));
    path
}

/// Write one script per registered capability under `root`.
///
/// Returns the written paths in capability order.
pub fn write_scripts(index: &ImplementorIndex, root: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for capability in index.capabilities() {
        let Some(groups) = index.implementors(&capability.name) else {
            continue;
        };
        let path = script_path(root, &capability.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, render_script(groups))
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "wrote implementor script");
        written.push(path);
    }
    Ok(written)
}
