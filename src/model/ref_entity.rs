use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmarked item: the only multi-tag entity. "Has a selector" means the
/// selector's tag is in the tag set and the selector's origin matches the
/// ref's origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ref {
    pub url: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl Ref {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
