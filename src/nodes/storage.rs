// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Bounded group of images sharing one rank tuple and bucket

use std::cell::OnceCell;

use super::{Bucket, ImageId, Mark, Ranks, NODE_CAPACITY};
use crate::{EvalBankError, Result};

/// Separator between ranks and bucket in a node name
pub const NAME_SEPARATOR: &str = "_";

/// A node of the databank, persisted as one manifest file
#[derive(Debug, Clone)]
pub struct StorageNode {
    ranks: Ranks,
    bucket: Bucket,
    name: OnceCell<String>,
    images: Vec<ImageId>,
}

impl StorageNode {
    pub fn new(ranks: Ranks, bucket: Bucket) -> Self {
        Self {
            ranks,
            bucket,
            name: OnceCell::new(),
            images: Vec::new(),
        }
    }

    /// Build an empty node from its name, e.g. `1_2_a`
    pub fn from_name(name: &str) -> Result<Self> {
        let (ranks, bucket) = parse_node_name(name)?;
        let node = Self::new(ranks, bucket);
        let _ = node.name.set(name.to_string());
        Ok(node)
    }

    pub fn ranks(&self) -> &[Mark] {
        &self.ranks
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Ranks joined with the bucket: `1_2_a`; just the bucket when there are no ranks
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| {
            let mut parts: Vec<String> = self.ranks.iter().map(|r| r.to_string()).collect();
            parts.push(self.bucket.to_string());
            parts.join(NAME_SEPARATOR)
        })
    }

    pub fn images(&self) -> &[ImageId] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= NODE_CAPACITY
    }

    pub fn contains(&self, image: ImageId) -> bool {
        self.images.contains(&image)
    }

    pub(crate) fn push(&mut self, image: ImageId) {
        self.images.push(image);
    }

    /// Remove a resident image; a missing image means the ownership links are broken
    pub(crate) fn pop_image(&mut self, image: ImageId) -> Result<()> {
        match self.images.iter().position(|i| *i == image) {
            Some(index) => {
                self.images.remove(index);
                Ok(())
            }
            None => Err(EvalBankError::OwnershipViolation {
                path: format!("image #{}", image.0).into(),
                node: self.name().to_string(),
            }),
        }
    }
}

/// Split a node name into ranks and bucket
pub fn parse_node_name(name: &str) -> Result<(Ranks, Bucket)> {
    let mut tokens: Vec<&str> = name.split(NAME_SEPARATOR).collect();
    let bucket = match tokens.pop() {
        Some(code) => Bucket::parse(code)
            .map_err(|_| EvalBankError::InvalidNodeName(format!("'{}' has no bucket", name)))?,
        None => return Err(EvalBankError::InvalidNodeName(name.to_string())),
    };
    // Ranks must be written the way `name` writes them, so `01_a` is not `1_a`
    let ranks = tokens
        .iter()
        .map(|t| match t.parse::<Mark>() {
            Ok(mark) if mark.to_string() == *t => Ok(mark),
            _ => Err(EvalBankError::InvalidNodeName(format!("'{}' has bad rank '{}'", name, t))),
        })
        .collect::<Result<Ranks>>()?;
    Ok((ranks, bucket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_ranks_and_bucket() {
        let node = StorageNode::new(vec![1, 2], Bucket::first());
        assert_eq!(node.name(), "1_2_a");
        assert_eq!(StorageNode::new(Vec::new(), Bucket::first()).name(), "a");
    }

    #[test]
    fn test_parse_name() {
        let node = StorageNode::from_name("3_0_ab").unwrap();
        assert_eq!(node.ranks(), [3, 0]);
        assert_eq!(node.bucket().as_str(), "ab");
        assert_eq!(node.name(), "3_0_ab");

        assert_eq!(StorageNode::from_name("0_10_a").unwrap().ranks(), [0, 10]);

        let (ranks, bucket) = parse_node_name("b").unwrap();
        assert!(ranks.is_empty());
        assert_eq!(bucket.as_str(), "b");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "1_2", "x_a", "1__a", "-1_a", "01_a", "+1_a", "1_00_b"] {
            assert!(parse_node_name(bad).is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_pop_missing_image_is_violation() {
        let mut node = StorageNode::new(vec![1], Bucket::first());
        node.push(ImageId(0));
        node.pop_image(ImageId(0)).unwrap();
        assert!(matches!(
            node.pop_image(ImageId(0)),
            Err(EvalBankError::OwnershipViolation { .. })
        ));
    }

    #[test]
    fn test_capacity() {
        let mut node = StorageNode::new(vec![1], Bucket::first());
        for i in 0..NODE_CAPACITY {
            assert!(!node.is_full());
            node.push(ImageId(i));
        }
        assert!(node.is_full());
    }
}
