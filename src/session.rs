// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evaluation session: the list of images being worked through and its cursor
//!
//! This is the surface a front end drives: move the cursor, evaluate the current
//! image, persist it, persist the manifests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::databank::{JsonDatabank, ManifestMode};
use crate::nodes::{EvaluatedImage, ImageId, Mark, NodeId, NodeRegistry};
use crate::scan::{scan_images, scan_roots};
use crate::schema::EvaluationSchema;
use crate::{EvalBankError, Result};

/// Cursor that wraps around a list of fixed length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCursor {
    limit: usize,
    position: usize,
}

impl ListCursor {
    pub fn new(limit: usize) -> Self {
        Self { limit, position: 0 }
    }

    pub fn shift(&mut self, amount: isize) {
        if self.limit == 0 {
            return;
        }
        let limit = self.limit as isize;
        self.position = (self.position as isize + amount).rem_euclid(limit) as usize;
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Images being evaluated plus the registry they are posted into
pub struct Session {
    registry: NodeRegistry,
    schema: EvaluationSchema,
    databank: JsonDatabank,
    images: Vec<ImageId>,
    cursor: ListCursor,
    mode: ManifestMode,
}

impl Session {
    /// Scan for images and line them up with `registry`.
    ///
    /// With a registry read from the whole databank, both the input directory
    /// and the placed image tree are scanned: tracked images whose files are gone
    /// are dropped, untracked files are added and posted, and manifests will be
    /// overwritten. Without one, every file of the input directory starts
    /// unevaluated and manifests will be appended to.
    pub fn open(config: &AppConfig, schema: EvaluationSchema, registry: Option<NodeRegistry>) -> Result<Self> {
        let databank = JsonDatabank::from_config(&config.databank);

        let (registry, images, mode) = match registry {
            Some(mut registry) => {
                let scanned = scan_roots(&[config.input_path.as_path(), config.output.root.as_path()])?;
                let images = reconcile(&mut registry, &scanned)?;
                (registry, images, ManifestMode::Overwrite)
            }
            None => {
                let scanned = scan_images(&config.input_path)?;
                let mut registry = NodeRegistry::new(config.output.clone());
                let images = scanned
                    .into_iter()
                    .map(|path| registry.insert_image(EvaluatedImage::new(path)))
                    .collect();
                (registry, images, ManifestMode::Append)
            }
        };

        info!("Session opened with {} images ({:?} mode)", images.len(), mode);
        let cursor = ListCursor::new(images.len());
        Ok(Self {
            registry,
            schema,
            databank,
            images,
            cursor,
            mode,
        })
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &EvaluationSchema {
        &self.schema
    }

    pub fn mode(&self) -> ManifestMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn current(&self) -> Option<ImageId> {
        self.images.get(self.cursor.position()).copied()
    }

    pub fn current_image(&self) -> Option<&EvaluatedImage> {
        self.current().map(|id| self.registry.image(id))
    }

    pub fn next(&mut self) -> Option<ImageId> {
        self.cursor.shift(1);
        self.current()
    }

    pub fn previous(&mut self) -> Option<ImageId> {
        self.cursor.shift(-1);
        self.current()
    }

    fn current_mut(&mut self) -> Result<&mut EvaluatedImage> {
        let id = self.current().ok_or(EvalBankError::NoCurrentImage)?;
        Ok(self.registry.image_mut(id))
    }

    /// Assign or unassign a schema category; returns whether it is now assigned
    pub fn toggle_category(&mut self, name: &str) -> Result<bool> {
        if !self.schema.is_category(name) {
            return Err(EvalBankError::UnknownCategory(name.to_string()));
        }
        let priority = self.schema.prioritized_categories().to_vec();
        let image = self.current_mut()?;
        if image.has_category(name) {
            image.remove_category(name);
            Ok(false)
        } else {
            image.add_category(name, &priority);
            Ok(true)
        }
    }

    /// Record a mark for the current image; schema categories are assigned too
    pub fn evaluate_current(&mut self, name: &str, mark: Mark) -> Result<()> {
        self.schema.validate_mark(name, mark)?;
        let priority = self.schema.prioritized_categories().to_vec();
        let is_category = self.schema.is_category(name);

        let image = self.current_mut()?;
        if is_category {
            image.add_category(name, &priority);
        }
        image.evaluate(name, mark);
        Ok(())
    }

    pub fn request_resize(&mut self) -> Result<()> {
        self.current_mut()?.request_resize();
        Ok(())
    }

    /// Post the current image into its node, moving the file if needed
    pub fn save_current(&mut self) -> Result<NodeId> {
        let id = self.current().ok_or(EvalBankError::NoCurrentImage)?;
        self.registry.post(id)
    }

    /// Write every manifest in the mode matching how the session was opened
    pub fn save_manifest(&self) -> Result<usize> {
        self.databank.save(&self.registry, self.mode)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Align a registry read from disk with the files actually present
fn reconcile(registry: &mut NodeRegistry, scanned: &[PathBuf]) -> Result<Vec<ImageId>> {
    let physical: HashSet<PathBuf> = scanned.iter().map(|p| canonical(p)).collect();
    let mut tracked = HashSet::new();
    let mut images = Vec::new();

    for id in registry.list_images() {
        let path = canonical(registry.image(id).path());
        if physical.contains(&path) {
            debug!("Tracking {:?}", path);
            tracked.insert(path);
            images.push(id);
        } else {
            warn!("{:?} from databank does not exist, dropping it", registry.image(id).path());
            registry.detach(id)?;
        }
    }

    for path in scanned {
        if tracked.contains(&canonical(path)) {
            continue;
        }
        warn!("Found {:?}, not present in databank", path);
        let id = registry.insert_image(EvaluatedImage::new(path.clone()));
        images.push(id);
        if let Err(e) = registry.post(id) {
            warn!("Could not place {:?}: {}", path, e);
        }
    }

    Ok(images)
}
