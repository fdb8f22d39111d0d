// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-memory databank model
//!
//! Images and nodes live in arenas owned by [`NodeRegistry`] and refer to each
//! other through [`ImageId`] and [`NodeId`] handles. A node lists the images it
//! owns; an image records at most one owning node.

pub mod bucket;
pub mod evaluated;
pub mod registry;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub use bucket::Bucket;
pub use evaluated::EvaluatedImage;
pub use registry::NodeRegistry;
pub use storage::StorageNode;

/// Numerical evaluation of an image in one category
pub type Mark = u32;

/// Marks of an image's categories, in category order
pub type Ranks = Vec<Mark>;

/// Maximum number of images a single node holds
pub const NODE_CAPACITY: usize = 1000;

/// Directory name used for images without categories
pub const UNCATEGORIZED: &str = "uncategorized";

/// Handle of an image inside a [`NodeRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub(crate) usize);

/// Handle of a storage node inside a [`NodeRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Ordered category names of an image; empty means uncategorized
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn new(categories: Vec<String>) -> Self {
        Self(categories)
    }

    pub fn uncategorized() -> Self {
        Self(Vec::new())
    }

    /// Rebuild a key from directory components relative to the databank root
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = components.into_iter().map(Into::into).collect();
        if parts.is_empty() || (parts.len() == 1 && parts[0] == UNCATEGORIZED) {
            Self::uncategorized()
        } else {
            Self(parts)
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.0.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Relative directory holding this key's files
    pub fn relative_dir(&self) -> PathBuf {
        if self.0.is_empty() {
            PathBuf::from(UNCATEGORIZED)
        } else {
            self.0.iter().collect()
        }
    }

    /// `root/<category>/<subcategory>/...`
    pub fn dir_under(&self, root: &Path) -> PathBuf {
        root.join(self.relative_dir())
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "{}", UNCATEGORIZED)
        } else {
            write!(f, "{}", self.0.join("/"))
        }
    }
}
