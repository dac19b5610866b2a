use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::selector::QualifiedTag;

/// A federated tenant record. Origin records carry no tag, which is why
/// the predicate library refuses tag-bearing selectors for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OriginRecord {
    /// `@name` form; the local tenant is the empty string and has no record.
    pub origin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// Federation scope configuration: which origins we push to, pull from and
/// watch, each as a list of selector tokens. Matching goes through the
/// selector's origin component only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FederationScope {
    #[serde(default)]
    pub push: Vec<String>,
    #[serde(default)]
    pub pull: Vec<String>,
    #[serde(default)]
    pub watch: Vec<String>,
}

impl FederationScope {
    pub fn pushes_to(&self, origin: &str) -> bool {
        scoped(&self.push, origin)
    }

    pub fn pulls_from(&self, origin: &str) -> bool {
        scoped(&self.pull, origin)
    }

    pub fn watches(&self, origin: &str) -> bool {
        scoped(&self.watch, origin)
    }
}

fn scoped(selectors: &[String], origin: &str) -> bool {
    selectors.iter().any(|token| match QualifiedTag::parse(token) {
        Ok(sel) => sel.origin_covers(origin),
        Err(e) => {
            // Config is validated at load time; a bad token here only
            // narrows scope.
            warn!("skipping malformed federation selector {:?}: {}", token, e);
            false
        }
    })
}

/// Cron/script tag-trigger registration: does a registered selector capture
/// the locally configured tag-at-origin.
pub fn trigger_matches(token: &str, tag: &str, origin: &str) -> bool {
    match QualifiedTag::parse(token) {
        Ok(sel) => sel.captures(tag, origin),
        Err(e) => {
            warn!("skipping malformed trigger selector {:?}: {}", token, e);
            false
        }
    }
}
