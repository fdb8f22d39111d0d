// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evalbank: category and mark based image databank
//!
//! Images are assigned categories and marks, grouped into bounded nodes that
//! share a category path and rank tuple, moved into a matching folder tree and
//! listed in one JSON manifest per node.

pub mod config;
pub mod databank;
pub mod error;
pub mod nodes;
pub mod scan;
pub mod schema;
pub mod session;
pub mod transcode;

pub use config::AppConfig;
pub use databank::{JsonDatabank, ManifestMode};
pub use error::{EvalBankError, Result};
pub use nodes::{EvaluatedImage, NodeRegistry};
pub use session::Session;
