//! Qualified-tag query compiler. A query string like `a:(b|c)|d@remote` is
//! parsed once into a three-level normal form (bare alternatives, AND
//! groups, AND-of-OR nested groups) and compiled into entity-specific
//! predicates via the filter module. Compilation is pure, so results are
//! cached process-wide by raw query string.

pub mod filter;
mod parse;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;

use crate::error::AppResult;
use crate::selector::{QualifiedTag, ORIGIN_PATTERN, TAG_PATTERN};

pub use filter::{OriginPredicate, RecordPredicate, RefPredicate};
pub use parse::MAX_GROUP_DEPTH;

/// Published grammar for whole query strings: selectors joined by `:`/`|`,
/// grouped by up to [`MAX_GROUP_DEPTH`] levels of parentheses. The API
/// boundary rejects anything that fails this before the compiler runs.
pub static QUERY_REGEX: Lazy<Regex> = Lazy::new(|| {
    let sel = format!(
        "!?(?:{t}(?:{o})?|{o})",
        t = TAG_PATTERN,
        o = ORIGIN_PATTERN
    );
    let mut part = sel.clone();
    for _ in 1..MAX_GROUP_DEPTH {
        part = format!("(?:{sel}|\\((?:{part})(?:[|:](?:{part}))*\\))");
    }
    Regex::new(&format!("^(?:{part})(?:[|:](?:{part}))*$")).expect("query regex")
});

/// Upper bound on cached compilations. Raw query strings arrive from the
/// API boundary, so the key space is attacker-controlled; the cache is
/// flushed wholesale at the cap rather than growing without bound.
const PARSE_CACHE_CAP: usize = 4096;

// Compiled queries keyed by raw string.
static PARSE_CACHE: Lazy<RwLock<HashMap<String, TagQuery>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A parsed boolean tag expression in normal form. The compiled predicate
/// is always `OR(or_selectors, and_groups, nested_groups)`; an empty query
/// matches nothing here, and call sites that want "empty means everything"
/// check [`TagQuery::is_empty`] first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagQuery {
    /// Bare alternatives: OR across single selectors.
    pub or_selectors: Vec<QualifiedTag>,
    /// OR across groups; every selector in a group must capture.
    pub and_groups: Vec<Vec<QualifiedTag>>,
    /// OR across groups; each group is an AND of OR-subgroups.
    pub nested_groups: Vec<Vec<Vec<QualifiedTag>>>,
}

impl TagQuery {
    /// Compile a raw query string, consulting the process-wide cache.
    pub fn compile(raw: &str) -> AppResult<TagQuery> {
        if let Some(q) = PARSE_CACHE.read().get(raw) {
            return Ok(q.clone());
        }
        let q = parse::parse_query(raw)?;
        let mut cache = PARSE_CACHE.write();
        if cache.len() >= PARSE_CACHE_CAP {
            cache.clear();
        }
        cache.insert(raw.to_string(), q.clone());
        Ok(q)
    }

    pub fn is_empty(&self) -> bool {
        self.or_selectors.is_empty() && self.and_groups.is_empty() && self.nested_groups.is_empty()
    }

    /// All selectors in the query, across every normal form.
    pub fn selectors(&self) -> impl Iterator<Item = &QualifiedTag> {
        self.or_selectors
            .iter()
            .chain(self.and_groups.iter().flatten())
            .chain(self.nested_groups.iter().flatten().flatten())
    }

    /// Filter for multi-tag ref entities.
    pub fn ref_predicate(&self) -> RefPredicate {
        self.predicate_with(filter::ref_has)
    }

    /// Filter for single-tag records (tags, plugins, users).
    pub fn record_predicate(&self) -> RecordPredicate {
        self.predicate_with(filter::record_is)
    }

    /// Filter for template records (upward/ancestor matching).
    pub fn template_predicate(&self) -> RecordPredicate {
        self.predicate_with(filter::template_applies)
    }

    /// Filter for origin records. Fails with `UnsupportedSelector` when any
    /// selector carries a tag or a wildcard origin.
    pub fn origin_predicate(&self) -> AppResult<OriginPredicate> {
        let mut alts: Vec<OriginPredicate> = Vec::new();
        let flat: AppResult<Vec<OriginPredicate>> =
            self.or_selectors.iter().map(filter::origin_is).collect();
        if let Some(p) = filter::any_of(flat?) {
            alts.push(p);
        }
        for group in &self.and_groups {
            let preds: AppResult<Vec<OriginPredicate>> =
                group.iter().map(filter::origin_is).collect();
            if let Some(p) = filter::all_of(preds?) {
                alts.push(p);
            }
        }
        for nested in &self.nested_groups {
            let mut inner: Vec<OriginPredicate> = Vec::new();
            for sub in nested {
                let preds: AppResult<Vec<OriginPredicate>> =
                    sub.iter().map(filter::origin_is).collect();
                if let Some(p) = filter::any_of(preds?) {
                    inner.push(p);
                }
            }
            if let Some(p) = filter::all_of(inner) {
                alts.push(p);
            }
        }
        Ok(filter::any_of(alts).unwrap_or_else(|| Box::new(|_| false)))
    }

    /// OR the three normal forms together using a per-selector builder.
    fn predicate_with<T: ?Sized + 'static>(
        &self,
        build: impl Fn(&QualifiedTag) -> Box<dyn Fn(&T) -> bool + Send + Sync>,
    ) -> Box<dyn Fn(&T) -> bool + Send + Sync> {
        let mut alts: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>> = Vec::new();
        if let Some(p) = filter::any_of(self.or_selectors.iter().map(&build).collect()) {
            alts.push(p);
        }
        for group in &self.and_groups {
            if let Some(p) = filter::all_of(group.iter().map(&build).collect()) {
                alts.push(p);
            }
        }
        for nested in &self.nested_groups {
            let inner: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>> = nested
                .iter()
                .filter_map(|sub| filter::any_of(sub.iter().map(&build).collect()))
                .collect();
            if let Some(p) = filter::all_of(inner) {
                alts.push(p);
            }
        }
        filter::any_of(alts).unwrap_or_else(|| Box::new(|_| false))
    }
}
