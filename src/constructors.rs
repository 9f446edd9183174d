//! Constructor side table.
//!
//! The primary mapping format has no name slot for constructors (their
//! internal marker name is fixed), yet constructor *arguments* still get
//! stable names, and those names must survive across versions. This side
//! table records, per (owner class, descriptor), the method-style name
//! generated for argument-scoping purposes plus the resolved argument names.
//! It is persisted as an independent JSON file and the prior version's file
//! is required when correlating constructors.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::atomic_write;

/// One constructor's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorRecord {
    /// Internal name of the owning class.
    pub owner: String,
    /// Constructor descriptor.
    pub desc: String,
    /// Method-style name used for argument scoping (`method_N`).
    pub deobf_name: String,
    /// Argument position -> assigned argument name.
    #[serde(default)]
    pub args: BTreeMap<usize, String>,
}

/// All constructor records of one artifact version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructorTable {
    records: Vec<ConstructorRecord>,
}

impl ConstructorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a prior version's side file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Serialize and overwrite atomically. Callers must skip this on
    /// simulated runs.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    /// Find the record for a constructor.
    pub fn get(&self, owner: &str, desc: &str) -> Option<&ConstructorRecord> {
        self.records
            .iter()
            .find(|r| r.owner == owner && r.desc == desc)
    }

    /// Record a constructor processed in this run.
    pub fn insert(&mut self, record: ConstructorRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
