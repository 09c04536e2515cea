//! Nested record produced by the row mapper.
//!
//! A [`MappedRecord`] is an ordered list of named fields. Each field is a
//! scalar or a nested group (`Ender`, `Cartao`, `pFisica`, ...). Insertion
//! order is the natural emission order of the XML serializer.

use super::RawValue;

/// One field of a mapped record.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Leaf element.
    Value(RawValue),
    /// Nested element with its own children.
    Group(MappedRecord),
}

impl Field {
    /// True when the serializer would emit nothing for this field.
    pub fn is_blank(&self) -> bool {
        match self {
            Field::Value(v) => v.is_empty(),
            Field::Group(g) => g.is_blank(),
        }
    }
}

/// Ordered nested mapping of element name to [`Field`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedRecord {
    entries: Vec<(String, Field)>,
}

impl MappedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scalar field. A key that is already present is replaced in place.
    pub fn push_value(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.push(key.into(), Field::Value(value.into()));
    }

    /// Append a nested group.
    pub fn push_group(&mut self, key: impl Into<String>, group: MappedRecord) {
        self.push(key.into(), Field::Group(group));
    }

    fn push(&mut self, key: String, field: Field) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = field,
            None => self.entries.push((key, field)),
        }
    }

    /// Builder-style [`push_value`](Self::push_value).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push_value(key, value);
        self
    }

    /// Builder-style [`push_group`](Self::push_group).
    pub fn with_group(mut self, key: impl Into<String>, group: MappedRecord) -> Self {
        self.push_group(key, group);
        self
    }

    pub fn entries(&self) -> &[(String, Field)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    /// Scalar value of a top-level field.
    pub fn value(&self, key: &str) -> Option<&RawValue> {
        match self.get(key)? {
            Field::Value(v) => Some(v),
            Field::Group(_) => None,
        }
    }

    /// Nested group by name.
    pub fn group(&self, key: &str) -> Option<&MappedRecord> {
        match self.get(key)? {
            Field::Group(g) => Some(g),
            Field::Value(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every field, recursively, is empty or absent.
    pub fn is_blank(&self) -> bool {
        self.entries.iter().all(|(_, f)| f.is_blank())
    }
}
