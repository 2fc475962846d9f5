use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reference to a stored file, e.g. a vote schema's image.
/// The file itself lives in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRef {
    pub file_id: u64,
    pub path: String,
}

/// A single extension attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(String),
    File(FileRef),
    /// Anything else, carried through untouched.
    Opaque(Value),
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u64> for PropValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Self::Int(value),
            Err(_) => Self::UInt(value),
        }
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FileRef> for PropValue {
    fn from(value: FileRef) -> Self {
        Self::File(value)
    }
}

impl PropValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Any non-negative integer value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(value) => u64::try_from(*value).ok(),
            Self::UInt(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

/// String-keyed extension attributes owned by a single entity.
/// Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(IndexMap<String, PropValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a key, keeping the order of the others.
    pub fn unset(&mut self, key: &str) -> Option<PropValue> {
        self.0.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Uniform attribute lookup: a few well-known attribute names are answered by
/// the entity itself, everything else falls through to its property bag.
pub trait KeyedValues {
    /// Attribute names answered directly by the entity.
    const KNOWN_KEYS: &'static [&'static str];

    /// The entity's property bag.
    fn props(&self) -> &PropertyBag;

    /// Value of a well-known attribute. Only called for [`Self::KNOWN_KEYS`].
    fn known_value(&self, key: &str) -> Option<PropValue>;

    fn has_value_key(&self, key: &str) -> bool {
        Self::KNOWN_KEYS.contains(&key) || self.props().contains(key)
    }

    fn value_by_key(&self, key: &str) -> Option<PropValue> {
        if Self::KNOWN_KEYS.contains(&key) {
            self.known_value(key)
        } else {
            self.props().get(key).cloned()
        }
    }

    /// Does the entity carry `key` with exactly this value?
    fn assert_value_by_key(&self, key: &str, value: &PropValue) -> bool {
        self.has_value_key(key) && self.value_by_key(key).as_ref() == Some(value)
    }
}
