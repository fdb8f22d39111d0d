// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON manifests: one file per node under `root/<categories>/<node>.json`
//!
//! Placement moves files before manifests are written. A crash between the two
//! leaves a file at its new location while its manifest still lists the old
//! one; the next session's reconciliation treats it as a new, unevaluated image.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{DatabankConfig, OutputConfig};
use crate::nodes::storage::parse_node_name;
use crate::nodes::{CategoryPath, EvaluatedImage, Mark, NodeRegistry, StorageNode};
use crate::scan::has_extension;
use crate::{EvalBankError, Result};

const JSON_INDENT: &[u8] = b"    ";

/// How manifests already on disk are treated by [`JsonDatabank::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestMode {
    /// The registry was read from the whole databank; files are replaced
    Overwrite,
    /// The registry only holds freshly scanned images; existing records are kept
    Append,
}

/// One image entry of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub marks: BTreeMap<String, Mark>,
    #[serde(default)]
    pub resize: bool,
}

impl From<&EvaluatedImage> for ImageRecord {
    fn from(image: &EvaluatedImage) -> Self {
        Self {
            path: image.path().to_path_buf(),
            categories: image.categories().to_vec(),
            marks: image.marks().clone(),
            resize: image.resize_requested(),
        }
    }
}

impl From<ImageRecord> for EvaluatedImage {
    fn from(record: ImageRecord) -> Self {
        EvaluatedImage::from_parts(record.path, record.categories, record.marks, record.resize)
    }
}

/// Databank stored as a directory tree of JSON manifests
#[derive(Debug, Clone)]
pub struct JsonDatabank {
    root: PathBuf,
    extension: String,
}

impl JsonDatabank {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &DatabankConfig) -> Self {
        Self::new(config.root.clone(), config.manifest_extension.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the manifest of `node` under `key` lives
    pub fn manifest_path(&self, key: &CategoryPath, node: &StorageNode) -> PathBuf {
        key.dir_under(&self.root)
            .join(format!("{}.{}", node.name(), self.extension))
    }

    /// Rebuild a registry from every manifest under the root
    pub fn read(&self, output: OutputConfig) -> Result<NodeRegistry> {
        let mut registry = NodeRegistry::new(output);
        if !self.root.exists() {
            info!("Databank {:?} does not exist yet, starting empty", self.root);
            return Ok(registry);
        }

        let extensions = [self.extension.as_str()];
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !has_extension(entry.path(), &extensions) {
                continue;
            }
            self.read_manifest(entry.path(), &mut registry)?;
        }

        info!(
            "Read {} images in {} nodes from {:?}",
            registry.list_images().len(),
            registry.node_count(),
            self.root
        );
        Ok(registry)
    }

    fn read_manifest(&self, path: &Path, registry: &mut NodeRegistry) -> Result<()> {
        let corrupt = |reason: String| EvalBankError::CorruptManifest {
            path: path.to_path_buf(),
            reason,
        };

        let relative = path
            .parent()
            .and_then(|dir| dir.strip_prefix(&self.root).ok())
            .unwrap_or_else(|| Path::new(""));
        let key = CategoryPath::from_components(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let node = StorageNode::from_name(&stem).map_err(|e| corrupt(e.to_string()))?;
        if node.ranks().len() != key.len() {
            return Err(corrupt(format!(
                "{} ranks for {} categories ({})",
                node.ranks().len(),
                key.len(),
                key
            )));
        }

        let records = read_records(path)?;
        debug!("Manifest {:?}: {} records", path, records.len());

        let node_id = registry.insert_node(key.clone(), node);
        for record in records {
            if record.categories != key.categories() {
                warn!("{:?} in {:?} lists categories {:?}", record.path, path, record.categories);
            }
            registry.adopt(node_id, record.into());
        }
        Ok(())
    }

    /// Manifest of the node whose directory holds the placed file `image`
    fn manifest_of_placed(&self, output_root: &Path, image: &Path) -> Option<PathBuf> {
        let node_dir = image.strip_prefix(output_root).ok()?.parent()?;
        let node_name = node_dir.file_name()?.to_str()?;
        parse_node_name(node_name).ok()?;
        let key_dir = node_dir.parent()?;
        Some(
            self.root
                .join(key_dir)
                .join(format!("{}.{}", node_name, self.extension)),
        )
    }

    /// Write one manifest per node; returns how many were written.
    ///
    /// In append mode, records for locations the registry's images moved away
    /// from are dropped, including from manifests of nodes the registry does not
    /// hold.
    pub fn save(&self, registry: &NodeRegistry, mode: ManifestMode) -> Result<usize> {
        let stale = match mode {
            ManifestMode::Append => stale_paths(registry),
            ManifestMode::Overwrite => HashSet::new(),
        };
        let mut saved = HashSet::new();
        let mut written = 0;
        for (key, siblings) in registry.nodes_by_path() {
            let dir = key.dir_under(&self.root);
            fs::create_dir_all(&dir)?;

            for id in siblings {
                let node = registry.node(*id);
                let path = self.manifest_path(key, node);
                let mut records: Vec<ImageRecord> = node
                    .images()
                    .iter()
                    .map(|image| ImageRecord::from(registry.image(*image)))
                    .collect();

                if mode == ManifestMode::Append && path.exists() {
                    records = merge_records(read_records(&path)?, records, &stale);
                }

                write_records(&path, &records)?;
                saved.insert(path);
                written += 1;
            }
        }

        if mode == ManifestMode::Append {
            written += self.prune(registry.output(), &stale, &saved)?;
        }

        info!("Saved {} manifests to {:?} ({:?})", written, self.root, mode);
        Ok(written)
    }

    /// Remove stale records from manifests that were not just saved
    fn prune(&self, output: &OutputConfig, stale: &HashSet<&Path>, saved: &HashSet<PathBuf>) -> Result<usize> {
        let manifests: BTreeSet<PathBuf> = stale
            .iter()
            .filter_map(|image| self.manifest_of_placed(&output.root, image))
            .filter(|manifest| !saved.contains(manifest) && manifest.is_file())
            .collect();

        let mut rewritten = 0;
        for manifest in manifests {
            let records = read_records(&manifest)?;
            let count = records.len();
            let kept = merge_records(records, Vec::new(), stale);
            if kept.len() != count {
                debug!("Dropping {} moved records from {:?}", count - kept.len(), manifest);
                write_records(&manifest, &kept)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }
}

/// Locations images moved away from that no placed image occupies now
fn stale_paths(registry: &NodeRegistry) -> HashSet<&Path> {
    let live: HashSet<&Path> = registry
        .list_images()
        .into_iter()
        .map(|id| registry.image(id).path())
        .collect();
    registry
        .vacated()
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| !live.contains(path))
        .collect()
}

fn read_records(path: &Path) -> Result<Vec<ImageRecord>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| EvalBankError::CorruptManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_records(path: &Path, records: &[ImageRecord]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    records.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}

/// Existing records neither superseded by `fresh` nor `stale`, followed by `fresh`
fn merge_records(existing: Vec<ImageRecord>, fresh: Vec<ImageRecord>, stale: &HashSet<&Path>) -> Vec<ImageRecord> {
    let replaced: HashSet<&Path> = fresh.iter().map(|r| r.path.as_path()).collect();
    let mut merged: Vec<ImageRecord> = existing
        .into_iter()
        .filter(|r| !replaced.contains(r.path.as_path()) && !stale.contains(r.path.as_path()))
        .collect();
    merged.extend(fresh.iter().cloned());
    merged
}
