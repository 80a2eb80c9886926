//! Run configuration: identifier ranges and save behaviour.
//!
//! Stored as JSON.  Any key left out falls back to [`CodecConfig::default`].
//!
//! ```json
//! {
//!   "id_ranges": {
//!     "area_table": [{ "start": 6000 }],
//!     "area_bit":   [{ "start": 3800, "end": 4095 }]
//!   },
//!   "sort_before_save": true
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{IdAllocator, IdAllocators, IdError, IdRange};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Id(#[from] IdError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Allocator name → ranges, consumed in order.
    pub id_ranges:        BTreeMap<String, Vec<IdRange>>,
    /// Sort rows by their sort keys before each batch save.
    pub sort_before_save: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let open = |start| vec![IdRange::from_start(start)];
        let mut id_ranges = BTreeMap::new();
        id_ranges.insert("area_table".to_owned(),     open(6000));
        // AreaBit is a 12-bit client field.
        id_ranges.insert("area_bit".to_owned(),       vec![IdRange { start: 3800, end: 4095 }]);
        id_ranges.insert("map".to_owned(),            open(750));
        id_ranges.insert("map_difficulty".to_owned(), open(800));
        id_ranges.insert("loading_screen".to_owned(), open(255));
        id_ranges.insert("wmo".to_owned(),            open(7000));
        id_ranges.insert("wmo_group".to_owned(),      open(30000));
        id_ranges.insert("wmo_area_table".to_owned(), open(52000));
        Self { id_ranges, sort_before_save: false }
    }
}

impl CodecConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// One locked allocator per configured name, fresh for this run.
    pub fn build_allocators(&self) -> Result<IdAllocators, ConfigError> {
        let mut registry = IdAllocators::new();
        for (name, ranges) in &self.id_ranges {
            registry.register(IdAllocator::new(name.clone(), ranges.clone())?)?;
        }
        Ok(registry)
    }
}
