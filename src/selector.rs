//! Qualified-tag selector: the atomic matching primitive of the platform.
//! A selector is a `[!]tag[@origin]` token. The same `captures` primitive
//! backs query filtering, federation scope checks, tag-trigger registration
//! and every access-policy rule, so its semantics must not drift.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::{AppError, AppResult};

/// Tag grammar: optional `_` (private) or `+` (protected) prefix, lowercase
/// segments separated by `/`.
pub const TAG_PATTERN: &str = "[_+]?[a-z]+(?:/[a-z]+)*";
/// Origin grammar: `@` followed by lowercase segments separated by `.`, or
/// the wildcard `@*`. A blank origin denotes the local tenant.
pub const ORIGIN_PATTERN: &str = "@(?:[a-z]+(?:\\.[a-z]+)*|\\*)";

/// Anchored tag validator, published for API-boundary checks.
pub static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", TAG_PATTERN)).expect("tag regex"));

/// Anchored origin validator, published for API-boundary checks.
pub static ORIGIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", ORIGIN_PATTERN)).expect("origin regex"));

/// Anchored full-selector validator: optional `!`, then a tag, an origin, or
/// a tag followed by an origin.
pub static SELECTOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^!?(?:{t}(?:{o})?|{o})$",
        t = TAG_PATTERN,
        o = ORIGIN_PATTERN
    ))
    .expect("selector regex")
});

/// An immutable `[!]tag[@origin]` selector. `tag == ""` means "any tag";
/// `origin == "@*"` means "any origin"; `origin == ""` means the local
/// tenant. Selectors never reference a living entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedTag {
    pub negated: bool,
    pub tag: String,
    pub origin: String,
}

impl QualifiedTag {
    /// Parse a selector token. Fails when the token is empty after stripping
    /// an optional leading `!`, or when an `@` is present with nothing after
    /// it (an origin segment must be non-empty).
    pub fn parse(token: &str) -> AppResult<Self> {
        let negated = token.starts_with('!');
        let rest = if negated { &token[1..] } else { token };
        if rest.is_empty() {
            return Err(AppError::malformed_selector(format!(
                "empty selector: {:?}",
                token
            )));
        }
        let (tag, origin) = match rest.find('@') {
            None => (rest.to_string(), String::new()),
            Some(i) => {
                // The origin keeps its leading `@`; "tag@" is malformed.
                if rest.len() == i + 1 {
                    return Err(AppError::malformed_selector(format!(
                        "selector {:?} has an empty origin",
                        token
                    )));
                }
                (rest[..i].to_string(), rest[i..].to_string())
            }
        };
        Ok(QualifiedTag { negated, tag, origin })
    }

    /// The capture law. Negation is over the full (tag AND origin)
    /// conjunction: `!foo` captures anything except `foo` at the local
    /// origin, including `foo@other`.
    pub fn captures(&self, tag: &str, origin: &str) -> bool {
        let tag_match = self.tag.is_empty() || self.tag == tag;
        let origin_match = self.origin == "@*" || self.origin == origin;
        (tag_match && origin_match) != self.negated
    }

    /// Does this selector's origin component cover the given origin,
    /// ignoring the tag component. Used for federation scope checks, where
    /// the question is "do I push/pull/watch this origin at all".
    pub fn origin_covers(&self, origin: &str) -> bool {
        (self.origin == "@*" || self.origin == origin) != self.negated
    }

    /// True when the selector addresses the local tenant.
    pub fn is_local(&self) -> bool {
        self.origin.is_empty()
    }
}

impl Display for QualifiedTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        write!(f, "{}{}", self.tag, self.origin)
    }
}

impl std::str::FromStr for QualifiedTag {
    type Err = AppError;
    fn from_str(s: &str) -> AppResult<Self> {
        QualifiedTag::parse(s)
    }
}

/// Tag with a `_` prefix: visible only to users holding explicit access.
pub fn is_private_tag(tag: &str) -> bool {
    tag.starts_with('_')
}

/// Tag with a `+` prefix: writable only by users holding explicit access.
pub fn is_protected_tag(tag: &str) -> bool {
    tag.starts_with('+')
}

/// Tag with no visibility prefix.
pub fn is_public_tag(tag: &str) -> bool {
    !is_private_tag(tag) && !is_protected_tag(tag)
}

/// Strip the visibility prefix, if any. `_user/alice` and `+user/alice`
/// both name the identity `user/alice`.
pub fn local_tag(tag: &str) -> &str {
    tag.strip_prefix('_')
        .or_else(|| tag.strip_prefix('+'))
        .unwrap_or(tag)
}

/// Split a possibly qualified tag string into (tag, origin) without
/// validating either part. The origin keeps its leading `@`.
pub fn split_qualified(qualified: &str) -> (&str, &str) {
    match qualified.find('@') {
        Some(i) => (&qualified[..i], &qualified[i..]),
        None => (qualified, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(token: &str) -> QualifiedTag {
        QualifiedTag::parse(token).expect(token)
    }

    #[test]
    fn parse_forms() {
        assert_eq!(sel("science"), QualifiedTag { negated: false, tag: "science".into(), origin: "".into() });
        assert_eq!(sel("science@remote"), QualifiedTag { negated: false, tag: "science".into(), origin: "@remote".into() });
        assert_eq!(sel("@remote"), QualifiedTag { negated: false, tag: "".into(), origin: "@remote".into() });
        assert_eq!(sel("!_secret"), QualifiedTag { negated: true, tag: "_secret".into(), origin: "".into() });
        assert_eq!(sel("@*").origin, "@*");
    }

    #[test]
    fn parse_rejects_empty_and_dangling_origin() {
        assert!(QualifiedTag::parse("").is_err());
        assert!(QualifiedTag::parse("!").is_err());
        assert!(QualifiedTag::parse("science@").is_err());
    }

    #[test]
    fn captures_xor_law() {
        // !foo does NOT capture foo at the local origin, but DOES capture
        // foo@other and bar@anything: negation spans the full conjunction.
        let not_foo = sel("!foo");
        assert!(!not_foo.captures("foo", ""));
        assert!(not_foo.captures("foo", "@other"));
        assert!(not_foo.captures("bar", "@anything"));
    }

    #[test]
    fn wildcard_identities() {
        assert!(sel("@*").captures("x", "@anything"));
        assert!(sel("@*").captures("x", ""));
        assert!(sel("foo").captures("foo", ""));
        assert!(!sel("foo").captures("foo", "@other"));
        assert!(sel("foo@*").captures("foo", "@other"));
        assert!(!sel("foo@*").captures("bar", "@other"));
    }

    #[test]
    fn origin_only_selector_matches_any_tag_in_origin() {
        let s = sel("@remote");
        assert!(s.captures("anything", "@remote"));
        assert!(!s.captures("anything", ""));
        assert!(s.origin_covers("@remote"));
        assert!(!s.origin_covers("@other"));
    }

    #[test]
    fn display_round_trip() {
        for token in ["science", "!science", "science@remote", "@remote", "!@*", "_secret@a.b", "+plugin/mail"] {
            let s = sel(token);
            assert_eq!(format!("{}", s), token);
            assert_eq!(QualifiedTag::parse(&format!("{}", s)).unwrap(), s, "reparse of {}", token);
        }
    }

    #[test]
    fn visibility_helpers() {
        assert!(is_public_tag("science"));
        assert!(is_private_tag("_secret"));
        assert!(is_protected_tag("+locked/edit"));
        assert!(!is_public_tag("_secret"));
        assert_eq!(local_tag("_user/alice"), "user/alice");
        assert_eq!(local_tag("+user/alice"), "user/alice");
        assert_eq!(local_tag("user/alice"), "user/alice");
    }

    #[test]
    fn published_grammar_regexes() {
        assert!(TAG_REGEX.is_match("a/b/c"));
        assert!(TAG_REGEX.is_match("_a"));
        assert!(TAG_REGEX.is_match("+a/b"));
        assert!(!TAG_REGEX.is_match("A"));
        assert!(!TAG_REGEX.is_match("a//b"));
        assert!(!TAG_REGEX.is_match("a/"));

        assert!(ORIGIN_REGEX.is_match("@remote"));
        assert!(ORIGIN_REGEX.is_match("@a.b.c"));
        assert!(ORIGIN_REGEX.is_match("@*"));
        assert!(!ORIGIN_REGEX.is_match("remote"));
        assert!(!ORIGIN_REGEX.is_match("@"));

        assert!(SELECTOR_REGEX.is_match("!science@remote"));
        assert!(SELECTOR_REGEX.is_match("@*"));
        assert!(SELECTOR_REGEX.is_match("_secret"));
        assert!(!SELECTOR_REGEX.is_match(""));
        assert!(!SELECTOR_REGEX.is_match("science@"));
    }

    #[test]
    fn split_qualified_keeps_origin_marker() {
        assert_eq!(split_qualified("+user/alice@remote"), ("+user/alice", "@remote"));
        assert_eq!(split_qualified("science"), ("science", ""));
    }
}
