//! Domain models for the cadastro conversion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RecordType`] - The five cadastro registrations (driver, vehicle, ...)
//! - [`RawValue`] - Closed scalar union for one spreadsheet cell
//! - [`RawRow`] - One flat spreadsheet row, keyed by column name
//! - [`MappedRecord`] - Ordered nested structure produced by the row mapper
//! - [`Auth`] - Batch authentication block
//! - [`catalog`] - Expected input columns per record type

pub mod auth;
pub mod catalog;
pub mod record;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RecordTypeError;

pub use auth::{digits_only, format_cnpj, Auth};
pub use catalog::{column_coverage, expected_fields, ColumnCoverage};
pub use record::{Field, MappedRecord};

// =============================================================================
// Record Type
// =============================================================================

/// Kind of cadastro being converted.
///
/// Selects the expected-field catalog, the mapping function, the XML
/// envelope tag and the upstream route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    /// Motorista
    Driver,
    /// Veículo
    Vehicle,
    /// Transportador (proprietário)
    Carrier,
    /// Pessoa física
    Individual,
    /// Pessoa jurídica
    Company,
}

impl RecordType {
    /// Every record type, in selector order.
    pub const ALL: [RecordType; 5] = [
        RecordType::Driver,
        RecordType::Vehicle,
        RecordType::Carrier,
        RecordType::Individual,
        RecordType::Company,
    ];

    /// Canonical lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Vehicle => "vehicle",
            Self::Carrier => "carrier",
            Self::Individual => "individual",
            Self::Company => "company",
        }
    }

    /// Human-readable label, as shown by the upstream system.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Driver => "Motorista",
            Self::Vehicle => "Veículo",
            Self::Carrier => "Transportador",
            Self::Individual => "Pessoa Física",
            Self::Company => "Pessoa Jurídica",
        }
    }

    /// Root element of the generated XML document.
    pub fn envelope_tag(&self) -> &'static str {
        match self {
            Self::Driver => "envMoto",
            Self::Vehicle => "envVeic",
            Self::Carrier => "envProprietario",
            Self::Individual | Self::Company => "envParticipante",
        }
    }

    /// Upstream endpoint path (relative to the API base URL).
    pub fn route(&self) -> &'static str {
        match self {
            Self::Driver => "webapi/cadastro/motorista",
            Self::Vehicle => "webapi/cadastro/veiculo",
            Self::Carrier | Self::Individual | Self::Company => "webapi/cadastro/participante",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = RecordTypeError;

    /// Accepts English names and the Portuguese identifiers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "driver" | "motorista" => Ok(Self::Driver),
            "vehicle" | "veiculo" | "veículo" => Ok(Self::Vehicle),
            "carrier" | "transportador" | "proprietario" => Ok(Self::Carrier),
            "individual" | "pessoa_fisica" | "pf" => Ok(Self::Individual),
            "company" | "pessoa_juridica" | "pj" => Ok(Self::Company),
            _ => Err(RecordTypeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = RecordTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

// =============================================================================
// Raw Value
// =============================================================================

/// One spreadsheet cell.
///
/// Cells are either text, a number (spreadsheet numeric cell) or absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

static EMPTY: RawValue = RawValue::Empty;

impl RawValue {
    /// Convert a JSON value. Never fails: booleans and nested values are
    /// kept as their string form.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .unwrap_or_else(|| Self::Text(n.to_string())),
            Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }

    /// A cell with nothing in it (absent or empty text).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, if this is a number cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used for XML text content.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Empty => String::new(),
        }
    }
}

/// Spreadsheet-style number rendering: integral values without a fraction.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Empty => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// Raw Row
// =============================================================================

/// One flat spreadsheet row. Missing columns read as [`RawValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawRow {
    fields: HashMap<String, RawValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Value for a column; absent columns are `Empty`.
    pub fn get(&self, key: &str) -> &RawValue {
        self.fields.get(key).unwrap_or(&EMPTY)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a row from a JSON object. Returns `None` for non-objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(
            obj.iter()
                .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
                .collect(),
        )
    }
}

impl FromIterator<(String, RawValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_type_aliases() {
        assert_eq!("driver".parse::<RecordType>().unwrap(), RecordType::Driver);
        assert_eq!("Motorista".parse::<RecordType>().unwrap(), RecordType::Driver);
        assert_eq!("pessoa-juridica".parse::<RecordType>().unwrap(), RecordType::Company);
        assert_eq!(" transportador ".parse::<RecordType>().unwrap(), RecordType::Carrier);
        assert!("boat".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_envelope_tags() {
        assert_eq!(RecordType::Driver.envelope_tag(), "envMoto");
        assert_eq!(RecordType::Vehicle.envelope_tag(), "envVeic");
        assert_eq!(RecordType::Carrier.envelope_tag(), "envProprietario");
        assert_eq!(RecordType::Individual.envelope_tag(), "envParticipante");
        assert_eq!(RecordType::Company.envelope_tag(), "envParticipante");
    }

    #[test]
    fn test_participant_types_share_route() {
        assert_eq!(RecordType::Carrier.route(), RecordType::Company.route());
        assert_eq!(RecordType::Individual.route(), "webapi/cadastro/participante");
        assert_eq!(RecordType::Vehicle.route(), "webapi/cadastro/veiculo");
    }

    #[test]
    fn test_record_type_serde() {
        let rt: RecordType = serde_json::from_value(json!("veiculo")).unwrap();
        assert_eq!(rt, RecordType::Vehicle);
        assert_eq!(serde_json::to_value(rt).unwrap(), json!("vehicle"));
    }

    #[test]
    fn test_raw_value_from_json() {
        assert_eq!(RawValue::from_json(&json!(null)), RawValue::Empty);
        assert_eq!(RawValue::from_json(&json!("abc")), RawValue::Text("abc".into()));
        assert_eq!(RawValue::from_json(&json!(45000)), RawValue::Number(45000.0));
        assert_eq!(RawValue::from_json(&json!(true)), RawValue::Text("true".into()));
    }

    #[test]
    fn test_number_text_has_no_fraction() {
        assert_eq!(RawValue::Number(1.0).to_text(), "1");
        assert_eq!(RawValue::Number(12345678901.0).to_text(), "12345678901");
        assert_eq!(RawValue::Number(2.5).to_text(), "2.5");
        assert_eq!(RawValue::Number(-0.0).to_text(), "0");
    }

    #[test]
    fn test_missing_column_is_empty() {
        let row = RawRow::new().with("xNome", "Ana");
        assert_eq!(row.get("xNome"), &RawValue::Text("Ana".into()));
        assert!(row.get("CPF").is_empty());
        assert!(RawValue::Text(String::new()).is_empty());
        assert!(!RawValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_row_from_json() {
        let row = RawRow::from_json(&json!({"tipoPessoa": 1, "xNome": "Ana"})).unwrap();
        assert_eq!(row.get("tipoPessoa"), &RawValue::Number(1.0));
        assert_eq!(row.len(), 2);
        assert!(RawRow::from_json(&json!([1, 2])).is_none());
    }
}
