//! Tag collection types.
//!
//! Servers carry a set of opaque labels while volumes carry key/value pairs.
//! Both shapes implement [`TagCollection`] so a single diff engine and
//! reconciler can drive either of them.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Desired state of the requested tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Every requested tag must exist on the resource.
    #[default]
    Present,
    /// Requested tags are removed if present; others are left alone.
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// A resource's tag collection.
pub trait TagCollection:
    Clone + fmt::Debug + Default + PartialEq + Serialize + Send + Sync
{
    /// Unit that a single removal call acts on.
    type Entry: Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync;

    /// Returns every entry in iteration order.
    fn entries(&self) -> Vec<Self::Entry>;

    /// Returns true if the collection holds the key that `entry` names.
    fn holds_key_of(&self, entry: &Self::Entry) -> bool;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Returns true if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A scalar read where a tag string is expected.
///
/// Task files may write `port: 8080` or `- 2024`; these become `"8080"` and
/// `"2024"` rather than a type error.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagScalar {
    Text(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<TagScalar> for String {
    fn from(scalar: TagScalar) -> Self {
        match scalar {
            TagScalar::Text(s) => s,
            TagScalar::Bool(b) => b.to_string(),
            TagScalar::Int(i) => i.to_string(),
            TagScalar::UInt(u) => u.to_string(),
            TagScalar::Float(f) => f.to_string(),
        }
    }
}

/// Server tags: an unordered set of labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServerTags(BTreeSet<String>);

impl ServerTags {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Iterates the labels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the labels as an owned list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ServerTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for ServerTags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tags = Vec::<TagScalar>::deserialize(deserializer)?;
        Ok(tags.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for ServerTags {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl TagCollection for ServerTags {
    type Entry = String;

    fn entries(&self) -> Vec<String> {
        self.to_vec()
    }

    fn holds_key_of(&self, entry: &String) -> bool {
        self.0.contains(entry)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// A single volume tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl VolumeTag {
    /// Creates a tag from a key and value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for VolumeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for VolumeTag {
    type Err = ConfigError;

    /// Parses `KEY=VALUE`. The value may itself contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(ConfigError::validation(
                format!("Invalid volume tag '{s}', expected KEY=VALUE"),
                "tags",
            )),
        }
    }
}

/// Volume tags: a map from key to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VolumeTags(BTreeMap<String, String>);

impl VolumeTags {
    /// Creates an empty tag map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'de> Deserialize<'de> for VolumeTags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = VolumeTags;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tag keys to scalar values")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<VolumeTags, M::Error> {
                let mut tags = BTreeMap::new();
                while let Some((key, value)) = map.next_entry::<TagScalar, TagScalar>()? {
                    tags.insert(String::from(key), String::from(value));
                }
                Ok(VolumeTags(tags))
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

impl FromIterator<VolumeTag> for VolumeTags {
    fn from_iter<I: IntoIterator<Item = VolumeTag>>(iter: I) -> Self {
        Self(iter.into_iter().map(|t| (t.key, t.value)).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VolumeTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl TagCollection for VolumeTags {
    type Entry = VolumeTag;

    fn entries(&self) -> Vec<VolumeTag> {
        self.0
            .iter()
            .map(|(k, v)| VolumeTag::new(k.clone(), v.clone()))
            .collect()
    }

    fn holds_key_of(&self, entry: &VolumeTag) -> bool {
        self.0.contains_key(&entry.key)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}
