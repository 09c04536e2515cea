//! Municipality name → IBGE code lookup.
//!
//! The table is keyed by the lower-cased, trimmed municipality name and is
//! never mutated once built. A process-wide instance is loaded lazily from the
//! embedded dataset, or explicitly at startup with [`init_municipalities`].

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::MunicipalityError;
use crate::models::RawValue;

/// Dataset shipped with the binary.
const EMBEDDED_DATASET: &str = include_str!("../../data/municipios.json");

static GLOBAL_TABLE: OnceCell<MunicipalityTable> = OnceCell::new();

/// One entry of the reference dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Municipality {
    /// Municipality name as published by IBGE.
    pub nome: String,
    /// State abbreviation (informational).
    #[serde(default)]
    pub uf: Option<String>,
    /// Seven-digit IBGE code.
    pub codigo_ibge: u32,
}

/// Read-only name → code table.
#[derive(Debug, Clone, Default)]
pub struct MunicipalityTable {
    by_name: HashMap<String, u32>,
}

impl MunicipalityTable {
    /// Build a table. When two entries share a normalized name the first one wins.
    pub fn new(entries: impl IntoIterator<Item = Municipality>) -> Self {
        let mut by_name = HashMap::new();
        for entry in entries {
            by_name.entry(normalize_name(&entry.nome)).or_insert(entry.codigo_ibge);
        }
        Self { by_name }
    }

    /// Table built from the embedded dataset.
    pub fn embedded() -> Self {
        Self::from_json(EMBEDDED_DATASET).expect("Invalid embedded municipality dataset")
    }

    /// Parse a JSON array of `{nome, codigo_ibge}` objects.
    pub fn from_json(json: &str) -> Result<Self, MunicipalityError> {
        let entries: Vec<Municipality> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MunicipalityError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// IBGE code for a name (case and surrounding whitespace ignored).
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.by_name.get(&normalize_name(name)).copied()
    }

    /// Replace a municipality name by its code; anything unknown passes
    /// through unchanged.
    pub fn resolve(&self, value: &RawValue) -> RawValue {
        match value {
            RawValue::Text(name) => match self.lookup(name) {
                Some(code) => RawValue::Text(code.to_string()),
                None => value.clone(),
            },
            _ => value.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Install the process-wide table. Must run before the first lookup.
pub fn init_municipalities(table: MunicipalityTable) -> Result<(), MunicipalityError> {
    GLOBAL_TABLE
        .set(table)
        .map_err(|_| MunicipalityError::AlreadyLoaded)
}

/// Process-wide table (embedded dataset unless [`init_municipalities`] ran first).
pub fn municipalities() -> &'static MunicipalityTable {
    GLOBAL_TABLE.get_or_init(MunicipalityTable::embedded)
}

/// Resolve a municipality against the process-wide table.
pub fn resolve_municipality(value: &RawValue) -> RawValue {
    municipalities().resolve(value)
}
