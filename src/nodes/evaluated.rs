// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! An image with its categories, marks and physical location

use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{CategoryPath, Mark, NodeId, Ranks};
use crate::config::{OutputConfig, OUTPUT_EXTENSION};
use crate::transcode::transcode;
use crate::{EvalBankError, Result};

/// Image under evaluation
#[derive(Debug, Clone)]
pub struct EvaluatedImage {
    path: PathBuf,
    categories: Vec<String>,
    marks: BTreeMap<String, Mark>,
    resize_requested: bool,
    pub(crate) owner: Option<NodeId>,
}

impl EvaluatedImage {
    /// A freshly scanned, unevaluated image
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            categories: Vec::new(),
            marks: BTreeMap::new(),
            resize_requested: true,
            owner: None,
        }
    }

    /// Rebuild an image from persisted fields
    pub fn from_parts(
        path: PathBuf,
        categories: Vec<String>,
        marks: BTreeMap<String, Mark>,
        resize_requested: bool,
    ) -> Self {
        Self {
            path,
            categories,
            marks,
            resize_requested,
            owner: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn marks(&self) -> &BTreeMap<String, Mark> {
        &self.marks
    }

    pub fn resize_requested(&self) -> bool {
        self.resize_requested
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Assign a category, keeping the list in priority order
    pub fn add_category(&mut self, name: &str, priority: &[String]) {
        if self.has_category(name) {
            return;
        }
        self.categories.push(name.to_string());
        self.sort_categories(priority);
    }

    /// Drop a category together with its mark
    pub fn remove_category(&mut self, name: &str) {
        self.categories.retain(|c| c != name);
        self.marks.remove(name);
    }

    /// Priority categories first in priority order, the rest in their current order
    pub fn sort_categories(&mut self, priority: &[String]) {
        let mut sorted: Vec<String> = priority
            .iter()
            .filter(|p| self.categories.contains(p))
            .cloned()
            .collect();
        let rest: Vec<String> = self
            .categories
            .iter()
            .filter(|c| !priority.contains(c))
            .cloned()
            .collect();
        sorted.extend(rest);
        self.categories = sorted;
    }

    /// Set or overwrite the mark for `category`
    pub fn evaluate(&mut self, category: &str, mark: Mark) {
        self.marks.insert(category.to_string(), mark);
    }

    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    /// Marks of the assigned categories, in category order
    pub fn rank_tuple(&self) -> Result<Ranks> {
        self.categories
            .iter()
            .map(|category| {
                self.marks.get(category).copied().ok_or_else(|| EvalBankError::MissingMark {
                    category: category.clone(),
                    path: self.path.clone(),
                })
            })
            .collect()
    }

    pub fn category_path(&self) -> CategoryPath {
        CategoryPath::new(self.categories.clone())
    }

    /// Move the file into `output.root/<categories>/<node_name>/`.
    ///
    /// The file is re-encoded as JPEG and, when resizing is requested, shrunk to
    /// `output.max_edge`. A name already taken by another file gets a timestamp
    /// suffix. Does nothing when the image already sits at its target and no
    /// resize is pending. `path` changes only after the new file is written and
    /// the old one removed.
    pub fn place(&mut self, node_name: &str, output: &OutputConfig) -> Result<()> {
        let dir = self.category_path().dir_under(&output.root).join(node_name);
        fs::create_dir_all(&dir)?;

        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut target = dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION));
        if target.exists() && !same_file(&target, &self.path) {
            let renamed = unique_target(&dir, &stem);
            warn!("{:?} already exists, placing {:?} as {:?}", target, self.path, renamed);
            target = renamed;
        }

        if !self.resize_requested && same_file(&target, &self.path) {
            debug!("{:?} already placed", self.path);
            return Ok(());
        }

        let max_edge = self.resize_requested.then_some(output.max_edge);
        transcode(&self.path, &target, max_edge, output.jpeg_quality)?;

        if !same_file(&target, &self.path) {
            if let Err(e) = fs::remove_file(&self.path) {
                let _ = fs::remove_file(&target);
                return Err(e.into());
            }
        }

        info!("Placed {:?} -> {:?}", self.path, target);
        self.path = target;
        self.resize_requested = false;
        Ok(())
    }
}

/// Whether two paths name the same file
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `stem_<timestamp>.jpg`, with a counter if that is taken as well
fn unique_target(dir: &Path, stem: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let candidate = dir.join(format!("{}_{}.{}", stem, stamp, OUTPUT_EXTENSION));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| dir.join(format!("{}_{}_{}.{}", stem, stamp, n, OUTPUT_EXTENSION)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn priority(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn make_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::new(width, height).save(path).unwrap();
    }

    fn output(root: &Path) -> OutputConfig {
        OutputConfig {
            root: root.to_path_buf(),
            max_edge: 64,
            jpeg_quality: 90,
        }
    }

    #[test]
    fn test_priority_categories_come_first() {
        let order = priority(&["Quality", "Portrait", "Landscape"]);
        let mut img = EvaluatedImage::new("x.jpg");
        img.add_category("Extra", &order);
        img.add_category("Other", &order);
        img.add_category("Landscape", &order);
        img.add_category("Quality", &order);

        assert_eq!(img.categories(), ["Quality", "Landscape", "Extra", "Other"]);
    }

    #[test]
    fn test_add_category_is_idempotent() {
        let order = priority(&["Quality"]);
        let mut img = EvaluatedImage::new("x.jpg");
        img.add_category("Quality", &order);
        img.add_category("Quality", &order);
        assert_eq!(img.categories(), ["Quality"]);
    }

    #[test]
    fn test_remove_category_drops_mark() {
        let order = priority(&["Quality", "Portrait"]);
        let mut img = EvaluatedImage::new("x.jpg");
        img.add_category("Portrait", &order);
        img.add_category("Quality", &order);
        img.evaluate("Portrait", 1);
        img.remove_category("Portrait");

        assert_eq!(img.categories(), ["Quality"]);
        assert!(img.marks().get("Portrait").is_none());
    }

    #[test]
    fn test_rank_tuple_follows_category_order() {
        let order = priority(&["Quality", "Portrait"]);
        let mut img = EvaluatedImage::new("x.jpg");
        img.add_category("Portrait", &order);
        img.add_category("Quality", &order);
        img.evaluate("Portrait", 2);
        img.evaluate("Quality", 1);
        img.evaluate("Sharpness", 5);

        assert_eq!(img.rank_tuple().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_rank_tuple_reports_missing_mark() {
        let mut img = EvaluatedImage::new("x.jpg");
        img.add_category("Quality", &[]);
        match img.rank_tuple() {
            Err(EvalBankError::MissingMark { category, .. }) => assert_eq!(category, "Quality"),
            other => panic!("expected missing mark, got {:?}", other),
        }
    }

    #[test]
    fn test_place_moves_and_converts() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in/photo.png");
        make_png(&src, 32, 16);

        let mut img = EvaluatedImage::new(&src);
        img.add_category("Quality", &[]);
        img.evaluate("Quality", 1);
        img.place("1_a", &output(&dir.path().join("out"))).unwrap();

        let expected = dir.path().join("out/Quality/1_a/photo.jpg");
        assert_eq!(img.path(), expected);
        assert!(expected.exists());
        assert!(!src.exists());
        assert!(!img.resize_requested());
    }

    #[test]
    fn test_place_resizes_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in/big.png");
        make_png(&src, 128, 32);

        let mut img = EvaluatedImage::new(&src);
        img.place("a", &output(&dir.path().join("out"))).unwrap();

        assert_eq!(img.path(), dir.path().join("out/uncategorized/a/big.jpg"));
        assert_eq!(image::open(img.path()).unwrap().dimensions(), (64, 16));
    }

    #[test]
    fn test_place_keeps_size_without_resize() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in/big.png");
        make_png(&src, 128, 32);

        let mut img = EvaluatedImage::from_parts(src, Vec::new(), BTreeMap::new(), false);
        img.place("a", &output(&dir.path().join("out"))).unwrap();
        assert_eq!(image::open(img.path()).unwrap().dimensions(), (128, 32));
    }

    #[test]
    fn test_place_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in/photo.png");
        make_png(&src, 16, 16);
        let out = output(&dir.path().join("out"));

        let mut img = EvaluatedImage::new(&src);
        img.place("a", &out).unwrap();
        let first = img.path().to_path_buf();
        let modified = fs::metadata(&first).unwrap().modified().unwrap();

        img.place("a", &out).unwrap();
        assert_eq!(img.path(), first);
        assert_eq!(fs::metadata(&first).unwrap().modified().unwrap(), modified);
        assert_eq!(fs::read_dir(first.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_place_suffixes_colliding_name() {
        let dir = tempfile::tempdir().unwrap();
        let first_src = dir.path().join("in/one/x.png");
        let second_src = dir.path().join("in/two/x.png");
        make_png(&first_src, 8, 8);
        make_png(&second_src, 8, 8);
        let out = output(&dir.path().join("out"));

        let mut first = EvaluatedImage::new(&first_src);
        let mut second = EvaluatedImage::new(&second_src);
        first.place("a", &out).unwrap();
        second.place("a", &out).unwrap();

        assert_eq!(first.path().parent(), second.path().parent());
        assert_ne!(first.path(), second.path());
        assert!(first.path().exists());
        assert!(second.path().exists());
        let name = second.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("x_"), "unexpected name {}", name);
    }

    #[test]
    fn test_failed_place_leaves_path_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in/broken.png");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"garbage").unwrap();

        let mut img = EvaluatedImage::new(&src);
        assert!(img.place("a", &output(&dir.path().join("out"))).is_err());
        assert_eq!(img.path(), src);
        assert!(img.resize_requested());
        assert!(src.exists());
    }
}
