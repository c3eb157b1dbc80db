//! Canonical foods mapping file
//!
//! A YAML document keyed by canonical id:
//!
//! ```yaml
//! apple_raw:
//!   usda_food_id: 1001
//!   name: Apple, raw
//! ```
//!
//! JSON is valid YAML, so a JSON object of the same shape also loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub usda_food_id: i64,
    pub name: String,
}

/// Canonical id → USDA food, iterated in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalMapping {
    entries: BTreeMap<String, MappingEntry>,
}

impl CanonicalMapping {
    /// Load the mapping file
    ///
    /// A missing, empty, or malformed file yields an empty mapping; the
    /// problem is logged, never returned.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Mapping file {} not readable ({}); no canonical foods", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok(mapping) => {
                info!("Loaded {} canonical food mappings from {}", mapping.len(), path.display());
                mapping
            }
            Err(e) => {
                warn!("Mapping file {} is malformed ({}); no canonical foods", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse mapping text; an empty or null document is an empty mapping
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: Option<BTreeMap<String, MappingEntry>> = serde_yaml::from_str(text)?;
        Ok(Self {
            entries: entries.unwrap_or_default(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MappingEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }
}

impl FromIterator<(String, MappingEntry)> for CanonicalMapping {
    fn from_iter<I: IntoIterator<Item = (String, MappingEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
