// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evaluation schema: which categories exist, their priority and mark ranges
//!
//! The schema is loaded once and passed explicitly to whatever sorts
//! categories or validates marks.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::nodes::{Mark, UNCATEGORIZED};
use crate::{EvalBankError, Result};

/// Maximum mark for entries that do not declare one
pub const DEFAULT_MAX_MARK: Mark = 2;

/// One schema entry, either a bare name or a name with its maximum mark
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SchemaEntry {
    Name(String),
    Ranged { name: String, max_mark: Mark },
}

impl SchemaEntry {
    fn name(&self) -> &str {
        match self {
            SchemaEntry::Name(name) => name,
            SchemaEntry::Ranged { name, .. } => name,
        }
    }

    fn max_mark(&self) -> Mark {
        match self {
            SchemaEntry::Name(_) => DEFAULT_MAX_MARK,
            SchemaEntry::Ranged { max_mark, .. } => *max_mark,
        }
    }
}

/// Name to maximum mark map, kept in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeMap(pub Vec<(String, Mark)>);

impl<'de> Deserialize<'de> for RangeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RangeMapVisitor;

        impl<'de> Visitor<'de> for RangeMapVisitor {
            type Value = RangeMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category names to maximum marks")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RangeMap, A::Error> {
                let mut ranges = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Mark>()? {
                    ranges.push(entry);
                }
                Ok(RangeMap(ranges))
            }
        }

        deserializer.deserialize_map(RangeMapVisitor)
    }
}

impl Serialize for RangeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, max_mark) in &self.0 {
            map.serialize_entry(name, max_mark)?;
        }
        map.end()
    }
}

/// A schema section, written either as a list of entries or as a
/// `{"name": max_mark}` map
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SchemaSection {
    List(Vec<SchemaEntry>),
    Ranges(RangeMap),
}

impl Default for SchemaSection {
    fn default() -> Self {
        SchemaSection::List(Vec::new())
    }
}

impl SchemaSection {
    /// Names with their maximum marks, in file order
    pub fn entries(&self) -> Vec<(&str, Mark)> {
        match self {
            SchemaSection::List(entries) => entries.iter().map(|e| (e.name(), e.max_mark())).collect(),
            SchemaSection::Ranges(RangeMap(ranges)) => {
                ranges.iter().map(|(name, max)| (name.as_str(), *max)).collect()
            }
        }
    }
}

/// On-disk layout of the schema file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemaFile {
    /// Categories in priority order; they shape the databank hierarchy
    #[serde(default)]
    pub categories: SchemaSection,
    /// Mark-only axes that never affect placement
    #[serde(default)]
    pub evaluations: SchemaSection,
}

/// Validated evaluation schema
#[derive(Debug, Clone)]
pub struct EvaluationSchema {
    prioritized: Vec<String>,
    ranges: HashMap<String, Mark>,
}

impl EvaluationSchema {
    /// Load and validate a schema file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SchemaFile = serde_json::from_str(&content)
            .map_err(|e| EvalBankError::Schema(format!("Failed to parse {:?}: {}", path, e)))?;
        Self::from_file(file)
    }

    /// Validate an already parsed schema
    pub fn from_file(file: SchemaFile) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut ranges = HashMap::new();

        let categories = file.categories.entries();
        let evaluations = file.evaluations.entries();
        for (name, max_mark) in categories.iter().chain(evaluations.iter()).copied() {
            if name.trim().is_empty() {
                return Err(EvalBankError::Schema("Empty category name".to_string()));
            }
            if name == UNCATEGORIZED {
                return Err(EvalBankError::Schema(format!("'{}' is a reserved name", UNCATEGORIZED)));
            }
            if name.contains(['/', '\\']) {
                return Err(EvalBankError::Schema(format!("'{}' cannot be used as a directory name", name)));
            }
            if !seen.insert(name.to_string()) {
                return Err(EvalBankError::Schema(format!("Duplicate category '{}'", name)));
            }
            ranges.insert(name.to_string(), max_mark);
        }

        let prioritized = categories.iter().map(|(name, _)| name.to_string()).collect();
        Ok(Self { prioritized, ranges })
    }

    /// Categories in priority order
    pub fn prioritized_categories(&self) -> &[String] {
        &self.prioritized
    }

    pub fn is_category(&self, name: &str) -> bool {
        self.prioritized.iter().any(|c| c == name)
    }

    pub fn max_mark(&self, name: &str) -> Option<Mark> {
        self.ranges.get(name).copied()
    }

    /// Check that `mark` is a valid evaluation for `name`
    pub fn validate_mark(&self, name: &str, mark: Mark) -> Result<()> {
        let max = self
            .max_mark(name)
            .ok_or_else(|| EvalBankError::UnknownCategory(name.to_string()))?;
        if mark > max {
            return Err(EvalBankError::InvalidMark {
                category: name.to_string(),
                mark,
                max,
            });
        }
        Ok(())
    }

    /// Sample schema written by `init`
    pub fn sample() -> SchemaFile {
        SchemaFile {
            categories: SchemaSection::List(vec![
                SchemaEntry::Ranged { name: "Quality".to_string(), max_mark: 3 },
                SchemaEntry::Name("Portrait".to_string()),
                SchemaEntry::Name("Landscape".to_string()),
            ]),
            evaluations: SchemaSection::List(vec![SchemaEntry::Ranged {
                name: "Sharpness".to_string(),
                max_mark: 5,
            }]),
        }
    }
}
