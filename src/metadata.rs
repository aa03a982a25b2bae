//! Typed, ordered representation of a parsed MTL metadata file.

use crate::types::{MtlError, MtlResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::ops::Index;

/// Kinds of scalar a metadata value can be coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
    Date,
    DateTime,
    Time,
    Boolean,
    String,
}

/// A scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Boolean(bool),
    String(String),
}

impl MetadataValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            MetadataValue::Integer(_) => ValueKind::Integer,
            MetadataValue::Float(_) => ValueKind::Float,
            MetadataValue::Date(_) => ValueKind::Date,
            MetadataValue::DateTime(_) => ValueKind::DateTime,
            MetadataValue::Time(_) => ValueKind::Time,
            MetadataValue::Boolean(_) => ValueKind::Boolean,
            MetadataValue::String(_) => ValueKind::String,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as f64; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            MetadataValue::Date(d) => Some(*d),
            MetadataValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            MetadataValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            MetadataValue::Time(t) => Some(*t),
            MetadataValue::DateTime(dt) => Some(dt.time()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Writes the value the way it appears on the right-hand side of an MTL line
impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Integer(v) => write!(f, "{}", v),
            // Debug formatting always keeps a decimal point or exponent
            MetadataValue::Float(v) => write!(f, "{:?}", v),
            MetadataValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            MetadataValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.fZ")),
            MetadataValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            MetadataValue::Boolean(true) => write!(f, "TRUE"),
            MetadataValue::Boolean(false) => write!(f, "FALSE"),
            MetadataValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Boolean(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

impl From<NaiveDate> for MetadataValue {
    fn from(v: NaiveDate) -> Self {
        MetadataValue::Date(v)
    }
}

impl From<NaiveDateTime> for MetadataValue {
    fn from(v: NaiveDateTime) -> Self {
        MetadataValue::DateTime(v)
    }
}

impl From<NaiveTime> for MetadataValue {
    fn from(v: NaiveTime) -> Self {
        MetadataValue::Time(v)
    }
}

/// Either a scalar or a nested group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataEntry {
    Value(MetadataValue),
    Group(MetadataGroup),
}

impl MetadataEntry {
    pub fn as_value(&self) -> Option<&MetadataValue> {
        match self {
            MetadataEntry::Value(v) => Some(v),
            MetadataEntry::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&MetadataGroup> {
        match self {
            MetadataEntry::Group(g) => Some(g),
            MetadataEntry::Value(_) => None,
        }
    }
}

impl From<MetadataValue> for MetadataEntry {
    fn from(v: MetadataValue) -> Self {
        MetadataEntry::Value(v)
    }
}

impl From<MetadataGroup> for MetadataEntry {
    fn from(g: MetadataGroup) -> Self {
        MetadataEntry::Group(g)
    }
}

/// Panics when the entry is a scalar or the key is absent, like `HashMap`
impl Index<&str> for MetadataEntry {
    type Output = MetadataEntry;

    fn index(&self, key: &str) -> &MetadataEntry {
        match self {
            MetadataEntry::Group(g) => &g[key],
            MetadataEntry::Value(v) => panic!("cannot index scalar value {} with '{}'", v, key),
        }
    }
}

/// Ordered key/value mapping. Keys are unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataGroup {
    entries: Vec<(String, MetadataEntry)>,
}

impl MetadataGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Insert an entry. An existing key keeps its position and the old
    /// entry is returned.
    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<MetadataEntry>) -> Option<MetadataEntry> {
        let key = key.into();
        let entry = entry.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, entry)),
            None => {
                self.entries.push((key, entry));
                None
            }
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<MetadataEntry>) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataEntry> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn value(&self, key: &str) -> Option<&MetadataValue> {
        self.get(key).and_then(MetadataEntry::as_value)
    }

    pub fn group(&self, key: &str) -> Option<&MetadataGroup> {
        self.get(key).and_then(MetadataEntry::as_group)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Follow a path of group names; the last element may name a scalar
    pub fn lookup(&self, path: &[&str]) -> Option<&MetadataEntry> {
        let (first, rest) = path.split_first()?;
        let entry = self.get(first)?;
        if rest.is_empty() {
            Some(entry)
        } else {
            entry.as_group()?.lookup(rest)
        }
    }

    /// Nested group, or `MissingKey`
    pub fn require_group(&self, key: &str) -> MtlResult<&MetadataGroup> {
        self.group(key)
            .ok_or_else(|| MtlError::MissingKey(key.to_string()))
    }

    /// Scalar value, or `MissingKey`
    pub fn require_value(&self, key: &str) -> MtlResult<&MetadataValue> {
        self.value(key)
            .ok_or_else(|| MtlError::MissingKey(key.to_string()))
    }

    pub fn f64_value(&self, key: &str) -> MtlResult<f64> {
        let value = self.require_value(key)?;
        value.as_f64().ok_or_else(|| MtlError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a number, found {}", value),
        })
    }

    pub fn str_value(&self, key: &str) -> MtlResult<&str> {
        let value = self.require_value(key)?;
        value.as_str().ok_or_else(|| MtlError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a string, found {}", value),
        })
    }

    pub fn date_value(&self, key: &str) -> MtlResult<NaiveDate> {
        let value = self.require_value(key)?;
        value.as_date().ok_or_else(|| MtlError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a date, found {}", value),
        })
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for (key, entry) in &self.entries {
            match entry {
                MetadataEntry::Value(v) => writeln!(f, "{}{} = {}", indent, key, v)?,
                MetadataEntry::Group(g) => {
                    writeln!(f, "{}GROUP = {}", indent, key)?;
                    g.write_indented(f, depth + 1)?;
                    writeln!(f, "{}END_GROUP = {}", indent, key)?;
                }
            }
        }
        Ok(())
    }
}

impl Index<&str> for MetadataGroup {
    type Output = MetadataEntry;

    fn index(&self, key: &str) -> &MetadataEntry {
        self.get(key)
            .unwrap_or_else(|| panic!("no metadata entry named '{}'", key))
    }
}

impl Serialize for MetadataGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// A parsed MTL file: one root group, immutable once built
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataDocument {
    root: MetadataGroup,
}

impl MetadataDocument {
    pub fn new(root: MetadataGroup) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &MetadataGroup {
        &self.root
    }

    pub fn into_root(self) -> MetadataGroup {
        self.root
    }

    pub fn get(&self, key: &str) -> Option<&MetadataEntry> {
        self.root.get(key)
    }

    pub fn lookup(&self, path: &[&str]) -> Option<&MetadataEntry> {
        self.root.lookup(path)
    }

    /// The file-level group (e.g. `L1_METADATA_FILE`), when the root holds
    /// exactly one entry and it is a group
    pub fn top_group(&self) -> Option<(&str, &MetadataGroup)> {
        if self.root.len() != 1 {
            return None;
        }
        let (name, entry) = self.root.iter().next()?;
        entry.as_group().map(|g| (name, g))
    }
}

impl Index<&str> for MetadataDocument {
    type Output = MetadataEntry;

    fn index(&self, key: &str) -> &MetadataEntry {
        &self.root[key]
    }
}

/// Block keywords that cannot be written as keys
const RESERVED_KEYS: &[&str] = &["GROUP", "END_GROUP", "OBJECT", "END_OBJECT"];

fn check_writable_key(key: &str) -> MtlResult<()> {
    let mut chars = key.chars();
    let identifier = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !identifier {
        return Err(MtlError::InvalidValue {
            key: key.to_string(),
            reason: "key is not an MTL identifier".to_string(),
        });
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(MtlError::InvalidValue {
            key: key.to_string(),
            reason: "key is an MTL block keyword".to_string(),
        });
    }
    Ok(())
}

impl MetadataDocument {
    /// MTL text that parses back into this document.
    ///
    /// Fails with `InvalidValue` for keys that are not identifiers or are
    /// block keywords, and for strings spanning several lines. `Display`
    /// writes the same text without these checks.
    pub fn to_mtl_string(&self) -> MtlResult<String> {
        let mut pending = vec![&self.root];
        while let Some(group) = pending.pop() {
            for (key, entry) in group.iter() {
                check_writable_key(key)?;
                match entry {
                    MetadataEntry::Group(g) => pending.push(g),
                    MetadataEntry::Value(MetadataValue::String(s)) if s.contains(&['\n', '\r'][..]) => {
                        return Err(MtlError::InvalidValue {
                            key: key.to_string(),
                            reason: "string spans several lines".to_string(),
                        });
                    }
                    MetadataEntry::Value(_) => {}
                }
            }
        }
        Ok(self.to_string())
    }
}

/// Serializes back to MTL text, terminated by `END`
impl fmt::Display for MetadataDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_indented(f, 0)?;
        writeln!(f, "END")
    }
}
