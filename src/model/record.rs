use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-tag entities: one tag, one origin. The predicate library matches
/// them by tag equality or strict descendant.
pub trait TagRecord {
    fn tag(&self) -> &str;
    fn origin(&self) -> &str;
}

/// A tag record: display metadata for a hierarchical tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub tag: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// A plugin registration: behavior attached to a tag. The config payload is
/// opaque here; schema validation happens at the plugin layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Plugin {
    pub tag: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// A template registration: applies to its tag and all descendants, which
/// is why template matching runs upward in the filter module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Template {
    /// Blank tag denotes the distinguished root/default template.
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub defaults: Option<serde_json::Value>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl TagRecord for Tag {
    fn tag(&self) -> &str {
        &self.tag
    }
    fn origin(&self) -> &str {
        &self.origin
    }
}

impl TagRecord for Plugin {
    fn tag(&self) -> &str {
        &self.tag
    }
    fn origin(&self) -> &str {
        &self.origin
    }
}

impl TagRecord for Template {
    fn tag(&self) -> &str {
        &self.tag
    }
    fn origin(&self) -> &str {
        &self.origin
    }
}
