use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::TagRecord;

/// A user record. The four access lists hold unparsed selector tokens;
/// they are parsed lazily per request by the policy engine.
/// `tag_read_access`/`tag_write_access` govern adding or removing a tag on
/// an entity; `read_access`/`write_access` govern reading or writing an
/// entity that already carries a tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Identity tag, `+user/<name>` or `_user/<name>`. A user always has
    /// full access to this tag.
    pub tag: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub read_access: Vec<String>,
    #[serde(default)]
    pub write_access: Vec<String>,
    #[serde(default)]
    pub tag_read_access: Vec<String>,
    #[serde(default)]
    pub tag_write_access: Vec<String>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl User {
    /// The storage key for user lookup: identity tag plus origin.
    pub fn qualified_tag(&self) -> String {
        format!("{}{}", self.tag, self.origin)
    }
}

impl TagRecord for User {
    fn tag(&self) -> &str {
        &self.tag
    }
    fn origin(&self) -> &str {
        &self.origin
    }
}
