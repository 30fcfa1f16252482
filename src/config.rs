//! Environment-driven configuration shared by the helper binaries.
//!
//! Flags always win; these variables supply defaults:
//! - `IMPLEMENTORS_DOC_ROOT`: documentation root containing `implementors/`.
//! - `IMPLEMENTORS_SCHEMA`: snapshot schema path.
//! - `IMPLEMENTORS_PACKAGES`: comma/space separated package filter.

use crate::index::PackageName;
use crate::loader::IMPLEMENTORS_DIR;
use anyhow::{Result, bail};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DOC_ROOT_ENV: &str = "IMPLEMENTORS_DOC_ROOT";
pub const SCHEMA_ENV: &str = "IMPLEMENTORS_SCHEMA";
pub const PACKAGES_ENV: &str = "IMPLEMENTORS_PACKAGES";

/// Returns true when `candidate` holds a generated `implementors/` tree.
fn is_doc_root(candidate: &Path) -> bool {
    candidate.join(IMPLEMENTORS_DIR).is_dir()
}

/// Verifies that an explicit hint points at a documentation root.
pub fn doc_root_from_hint(hint: &str) -> Option<PathBuf> {
    if hint.trim().is_empty() {
        return None;
    }
    let hint_path = PathBuf::from(hint);
    if !is_doc_root(&hint_path) {
        return None;
    }
    fs::canonicalize(hint_path).ok()
}

/// Walk up from `start` looking for `implementors/` or `target/doc/implementors/`.
pub fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        if is_doc_root(&dir) {
            return Some(dir);
        }
        let built = dir.join("target").join("doc");
        if is_doc_root(&built) {
            return Some(built);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the documentation root: `IMPLEMENTORS_DOC_ROOT`, then upward from
/// the current directory.
pub fn find_doc_root() -> Result<PathBuf> {
    if let Ok(hint) = env::var(DOC_ROOT_ENV) {
        if let Some(root) = doc_root_from_hint(&hint) {
            return Ok(root);
        }
        bail!("{DOC_ROOT_ENV}={hint} does not contain an {IMPLEMENTORS_DIR}/ directory");
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(root) = search_upwards(&cwd) {
            return Ok(root);
        }
    }

    bail!(
        "Unable to locate generated documentation. Pass --doc-root or set {DOC_ROOT_ENV} to the directory containing {IMPLEMENTORS_DIR}/."
    )
}

/// Snapshot schema override from `IMPLEMENTORS_SCHEMA`, if set and non-empty.
pub fn schema_override() -> Option<PathBuf> {
    env::var_os(SCHEMA_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Package filter from `IMPLEMENTORS_PACKAGES`; empty means no filtering.
pub fn package_filter_from_env() -> Vec<PackageName> {
    env::var(PACKAGES_ENV)
        .map(|value| parse_package_list(&value))
        .unwrap_or_default()
}

pub fn parse_package_list(value: &str) -> Vec<PackageName> {
    split_list(value).into_iter().map(PackageName).collect()
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn split_list_handles_commas_and_spaces() {
        assert_eq!(
            split_list(" wasmer_wasi, wasmer_runtime  ,,core "),
            vec!["wasmer_wasi", "wasmer_runtime", "core"]
        );
        assert!(split_list(" , ").is_empty());
        assert_eq!(
            parse_package_list("a,b"),
            vec![PackageName::from("a"), PackageName::from("b")]
        );
    }

    #[test]
    fn search_upwards_finds_direct_and_built_roots() {
        let dir = TempDir::new().unwrap();
        let workspace = dir.path().join("workspace");
        let nested = workspace.join("crates").join("api");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(workspace.join("target/doc/implementors")).unwrap();

        let found = search_upwards(&nested).unwrap();
        assert_eq!(
            found,
            fs::canonicalize(workspace.join("target/doc")).unwrap()
        );

        let direct = dir.path().join("site");
        fs::create_dir_all(direct.join("implementors")).unwrap();
        assert_eq!(
            search_upwards(&direct).unwrap(),
            fs::canonicalize(&direct).unwrap()
        );
    }

    #[test]
    fn hint_must_contain_implementors() {
        let dir = TempDir::new().unwrap();
        assert!(doc_root_from_hint("").is_none());
        assert!(doc_root_from_hint(dir.path().to_str().unwrap()).is_none());
        fs::create_dir_all(dir.path().join("implementors")).unwrap();
        assert_eq!(
            doc_root_from_hint(dir.path().to_str().unwrap()),
            Some(fs::canonicalize(dir.path()).unwrap())
        );
    }
}
