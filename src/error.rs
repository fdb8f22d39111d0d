// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the evaluation databank

use std::path::PathBuf;
use thiserror::Error;

use crate::nodes::Mark;

/// Result type alias for databank operations
pub type Result<T> = std::result::Result<T, EvalBankError>;

/// Databank error types
#[derive(Error, Debug)]
pub enum EvalBankError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image {path:?} has category '{category}' without a mark")]
    MissingMark { category: String, path: PathBuf },

    #[error("Mark {mark} for '{category}' is out of range 0..={max}")]
    InvalidMark { category: String, mark: Mark, max: Mark },

    #[error("No image is selected")]
    NoCurrentImage,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid node name: {0}")]
    InvalidNodeName(String),

    #[error("Corrupt manifest {path:?}: {reason}")]
    CorruptManifest { path: PathBuf, reason: String },

    #[error("Image {path:?} is not resident in node '{node}'")]
    OwnershipViolation { path: PathBuf, node: String },

    #[error("Failed to place {path:?}: {source}")]
    Placement {
        path: PathBuf,
        #[source]
        source: Box<EvalBankError>,
    },
}
