// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use evalbank::nodes::storage::{parse_node_name, StorageNode};
use libfuzzer_sys::fuzz_target;

// Manifest file names come straight from disk
fuzz_target!(|name: &str| {
    if let Ok((ranks, bucket)) = parse_node_name(name) {
        let node = StorageNode::new(ranks, bucket.clone());
        let (reparsed, rebucket) = parse_node_name(node.name()).expect("canonical name must parse");
        assert_eq!(reparsed, node.ranks());
        assert_eq!(rebucket, bucket);
        assert!(bucket.next() > bucket);
    }
});
