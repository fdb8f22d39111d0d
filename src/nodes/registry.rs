// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Top-level index of nodes and the placement algorithm

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::evaluated::same_file;
use super::{Bucket, CategoryPath, EvaluatedImage, ImageId, NodeId, StorageNode};
use crate::config::OutputConfig;
use crate::{EvalBankError, Result};

/// Owner of every image and node of a session
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    images: Vec<EvaluatedImage>,
    nodes: Vec<StorageNode>,
    nodes_by_path: BTreeMap<CategoryPath, Vec<NodeId>>,
    vacated: Vec<PathBuf>,
    output: OutputConfig,
}

impl NodeRegistry {
    /// Empty registry placing images under `output.root`
    pub fn new(output: OutputConfig) -> Self {
        Self {
            images: Vec::new(),
            nodes: Vec::new(),
            nodes_by_path: BTreeMap::new(),
            vacated: Vec::new(),
            output,
        }
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    pub fn image(&self, id: ImageId) -> &EvaluatedImage {
        &self.images[id.0]
    }

    pub fn image_mut(&mut self, id: ImageId) -> &mut EvaluatedImage {
        &mut self.images[id.0]
    }

    pub fn node(&self, id: NodeId) -> &StorageNode {
        &self.nodes[id.0]
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CategoryPath> {
        self.nodes_by_path.keys()
    }

    /// Sibling nodes under `key`; empty when the key is unknown
    pub fn siblings(&self, key: &CategoryPath) -> &[NodeId] {
        self.nodes_by_path.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes_by_path(&self) -> impl Iterator<Item = (&CategoryPath, &[NodeId])> {
        self.nodes_by_path.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Locations images were moved away from during this session, oldest first
    pub fn vacated(&self) -> &[PathBuf] {
        &self.vacated
    }

    /// Track an image that has not been placed yet
    pub fn insert_image(&mut self, image: EvaluatedImage) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    /// Register an already persisted node under `key`
    pub(crate) fn insert_node(&mut self, key: CategoryPath, node: StorageNode) -> NodeId {
        self.nodes.push(node);
        let id = NodeId(self.nodes.len() - 1);
        self.nodes_by_path.entry(key).or_default().push(id);
        id
    }

    /// Attach a persisted image to its node without touching the file
    pub(crate) fn adopt(&mut self, node: NodeId, mut image: EvaluatedImage) -> ImageId {
        image.owner = Some(node);
        let id = self.insert_image(image);
        self.nodes[node.0].push(id);
        id
    }

    /// Every image held by a node, key by key
    pub fn list_images(&self) -> Vec<ImageId> {
        self.nodes_by_path
            .values()
            .flatten()
            .flat_map(|node| self.nodes[node.0].images().iter().copied())
            .collect()
    }

    /// Find a tracked image by its file location
    pub fn find_by_path(&self, path: &Path) -> Option<ImageId> {
        self.images
            .iter()
            .position(|img| img.path() == path)
            .or_else(|| self.images.iter().position(|img| same_file(img.path(), path)))
            .map(ImageId)
    }

    /// Remove an image from its node, leaving it unplaced
    pub fn detach(&mut self, image: ImageId) -> Result<()> {
        if let Some(owner) = self.images[image.0].owner {
            self.pop_image(owner, image)?;
            self.images[image.0].owner = None;
        }
        Ok(())
    }

    /// Offer `image` to `node`.
    ///
    /// Returns `Ok(false)` when the node is full. An image already owned by the
    /// node is only re-placed when a resize is pending. A move between nodes
    /// places the file first and updates membership only once that succeeded.
    pub fn add_image(&mut self, node: NodeId, image: ImageId) -> Result<bool> {
        let name = self.nodes[node.0].name().to_string();

        if self.images[image.0].owner == Some(node) {
            if self.images[image.0].resize_requested() {
                self.place(image, &name)?;
            }
            return Ok(true);
        }

        if self.nodes[node.0].is_full() {
            debug!("Node {} is full", name);
            return Ok(false);
        }

        if let Some(previous) = self.images[image.0].owner {
            if !self.nodes[previous.0].contains(image) {
                return Err(self.ownership_violation(previous, image));
            }
        }

        self.place(image, &name)?;

        if let Some(previous) = self.images[image.0].owner.take() {
            self.pop_image(previous, image)?;
        }
        self.nodes[node.0].push(image);
        self.images[image.0].owner = Some(node);
        Ok(true)
    }

    /// Route an image to the node matching its categories and ranks.
    ///
    /// Matching siblings are tried in order; when none accepts, a node with the
    /// next bucket code is opened. The image's categories must already be in
    /// priority order.
    pub fn post(&mut self, image: ImageId) -> Result<NodeId> {
        let key = self.images[image.0].category_path();
        let ranks = self.images[image.0].rank_tuple()?;

        let matching: Vec<NodeId> = self
            .siblings(&key)
            .iter()
            .copied()
            .filter(|id| self.nodes[id.0].ranks() == ranks.as_slice())
            .collect();

        for node in &matching {
            if self.add_image(*node, image)? {
                return Ok(*node);
            }
        }

        let bucket = matching
            .iter()
            .map(|id| self.nodes[id.0].bucket())
            .max()
            .map(Bucket::next)
            .unwrap_or_else(Bucket::first);

        self.nodes.push(StorageNode::new(ranks, bucket));
        let node = NodeId(self.nodes.len() - 1);
        // An empty node always has room, so only a failed placement can stop this
        if let Err(e) = self.add_image(node, image) {
            self.nodes.pop();
            return Err(e);
        }

        info!("Opened node {} under {}", self.nodes[node.0].name(), key);
        self.nodes_by_path.entry(key).or_default().push(node);
        Ok(node)
    }

    fn place(&mut self, image: ImageId, node_name: &str) -> Result<()> {
        let img = &mut self.images[image.0];
        let previous = img.path().to_path_buf();
        img.place(node_name, &self.output).map_err(|e| EvalBankError::Placement {
            path: img.path().to_path_buf(),
            source: Box::new(e),
        })?;
        if img.path() != previous.as_path() {
            self.vacated.push(previous);
        }
        Ok(())
    }

    fn pop_image(&mut self, node: NodeId, image: ImageId) -> Result<()> {
        if !self.nodes[node.0].contains(image) {
            return Err(self.ownership_violation(node, image));
        }
        self.nodes[node.0].pop_image(image)
    }

    fn ownership_violation(&self, node: NodeId, image: ImageId) -> EvalBankError {
        EvalBankError::OwnershipViolation {
            path: self.images[image.0].path().to_path_buf(),
            node: self.nodes[node.0].name().to_string(),
        }
    }
}
