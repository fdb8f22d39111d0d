// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Input directory scanning

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::Result;

/// Extensions recognized as evaluable images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Check a path's extension against a list, ignoring case
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Keep only the paths with one of the wanted extensions
pub fn filter_by_extension<I>(paths: I, extensions: &[&str]) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    paths
        .into_iter()
        .filter(|p| has_extension(p, extensions))
        .collect()
}

/// Recursively list candidate images under `dir`, sorted by path
pub fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        debug!("Scan directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut images = filter_by_extension(files, IMAGE_EXTENSIONS);
    images.sort();
    debug!("Scanned {} images under {:?}", images.len(), dir);
    Ok(images)
}

/// Scan several directories, listing a file reachable from two of them once
pub fn scan_roots(dirs: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for dir in dirs {
        for path in scan_images(dir)? {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(key) {
                images.push(path);
            }
        }
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        for name in ["a.jpg", "b.JPEG", "notes.txt", "nested/c.png", "nested/deeper/d.webp", "nested/e.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = scan_images(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.JPEG", "nested/c.png", "nested/deeper/d.webp"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_images(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_filter_by_extension() {
        let paths = vec![PathBuf::from("1_a.json"), PathBuf::from("x.jpg"), PathBuf::from("noext")];
        assert_eq!(filter_by_extension(paths, &["json"]), vec![PathBuf::from("1_a.json")]);
    }

    #[test]
    fn test_scan_roots_lists_nested_roots_once() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("bank");
        let inner = outer.join("Quality/1_a");
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join("new.png"), b"x").unwrap();
        fs::write(inner.join("old.jpg"), b"x").unwrap();

        let missing = dir.path().join("missing");
        let found = scan_roots(&[outer.as_path(), inner.as_path(), missing.as_path()]).unwrap();
        assert_eq!(found, vec![inner.join("old.jpg"), outer.join("new.png")]);
    }
}
