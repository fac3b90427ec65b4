//! Workspace scanning (§4.8).
//!
//! A synchronous, recursive walk of the workspace root for `.vbs`, `.asp`,
//! and `.inc` files, run once at startup before the dispatcher begins
//! serving requests so the symbol index and include graph are populated
//! for files the editor hasn't opened yet.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never descended into.
const EXCLUDED_DIR_NAMES: &[&str] = &["node_modules", "Backup", "bin", "obj"];

/// Above this many discovered files, a warning is logged — the scan still
/// runs to completion, this is advisory only.
const SCAN_SIZE_WARNING_THRESHOLD: usize = 1000;

fn is_source_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| {
        let ext = ext.to_string_lossy();
        ext.eq_ignore_ascii_case("vbs") || ext.eq_ignore_ascii_case("asp") || ext.eq_ignore_ascii_case("inc")
    })
}

fn is_excluded_dir(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIR_NAMES.iter().any(|ex| ex.eq_ignore_ascii_case(name))
}

/// Recursively find every `.vbs`/`.asp`/`.inc` file under `root`, skipping
/// hidden directories and the usual build/backup noise.
pub fn scan(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.file_type().is_dir() {
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| entry.depth() == 0 || !is_excluded_dir(name))
        } else {
            true
        }
    });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("workspace scan error: {}", err);
                continue;
            }
        };
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            found.push(entry.path().to_path_buf());
        }
    }

    tracing::info!("Found {} source files in {}", found.len(), root.display());
    if found.len() > SCAN_SIZE_WARNING_THRESHOLD {
        tracing::warn!(
            "workspace scan found {} files, above the {}-file advisory threshold; indexing may be slow",
            found.len(),
            SCAN_SIZE_WARNING_THRESHOLD
        );
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_finds_source_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.asp"), "").unwrap();
        fs::write(dir.path().join("lib.inc"), "").unwrap();
        fs::write(dir.path().join("util.vbs"), "").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();

        let found = scan(dir.path());
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let dir = tempdir().unwrap();
        let node_modules = dir.path().join("node_modules");
        fs::create_dir(&node_modules).unwrap();
        fs::write(node_modules.join("dep.vbs"), "").unwrap();
        fs::write(dir.path().join("main.vbs"), "").unwrap();

        let found = scan(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name().unwrap(), "main.vbs");
    }

    #[test]
    fn test_scan_skips_hidden_dirs() {
        let dir = tempdir().unwrap();
        let hidden = dir.path().join(".git");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("hooks.vbs"), "").unwrap();
        fs::write(dir.path().join("main.vbs"), "").unwrap();

        let found = scan(dir.path());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("pages").join("admin");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("index.asp"), "").unwrap();

        let found = scan(dir.path());
        assert_eq!(found.len(), 1);
    }
}
