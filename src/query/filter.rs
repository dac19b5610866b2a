//! Predicate library: per-entity translation of selectors into composable
//! boxed filters. Each entity kind has its own matching semantics and they
//! are deliberately distinct; in particular the template filter matches
//! upward (a template registered at `a` applies to tag `a/b`), the inverse
//! of the record filter's descendant match.

use crate::error::{AppError, AppResult};
use crate::model::{OriginRecord, Ref, TagRecord};
use crate::selector::QualifiedTag;

pub type RefPredicate = Box<dyn Fn(&Ref) -> bool + Send + Sync>;
pub type RecordPredicate = Box<dyn Fn(&(dyn TagRecord + 'static)) -> bool + Send + Sync>;
pub type OriginPredicate = Box<dyn Fn(&OriginRecord) -> bool + Send + Sync>;

/// Multi-tag entity filter (refs): the tag collection contains the
/// selector's tag (no tag constraint when the selector tag is blank) and
/// the origin matches exactly unless the selector origin is the wildcard.
pub fn ref_has(sel: &QualifiedTag) -> RefPredicate {
    let sel = sel.clone();
    Box::new(move |r: &Ref| {
        let tag_ok = sel.tag.is_empty() || r.tags.iter().any(|t| t == &sel.tag);
        let origin_ok = sel.origin == "@*" || sel.origin == r.origin;
        (tag_ok && origin_ok) != sel.negated
    })
}

/// Single-tag record filter (tag/plugin/user records): exact tag equality
/// or a strict descendant (`tag/...`).
pub fn record_is(sel: &QualifiedTag) -> RecordPredicate {
    let sel = sel.clone();
    let child_prefix = format!("{}/", sel.tag);
    Box::new(move |e: &(dyn TagRecord + 'static)| {
        let tag_ok =
            sel.tag.is_empty() || e.tag() == sel.tag || e.tag().starts_with(&child_prefix);
        let origin_ok = sel.origin == "@*" || sel.origin == e.origin();
        (tag_ok && origin_ok) != sel.negated
    })
}

/// Template filter. A blank selector tag matches only the root template
/// (blank tag); otherwise any template whose tag is NOT a strict
/// descendant of the selector tag matches, so a template at `a` applies to
/// `a/b`. Do not "normalize" this to look like [`record_is`].
pub fn template_applies(sel: &QualifiedTag) -> RecordPredicate {
    let sel = sel.clone();
    let child_prefix = format!("{}/", sel.tag);
    Box::new(move |e: &(dyn TagRecord + 'static)| {
        let tag_ok = if sel.tag.is_empty() {
            e.tag().is_empty()
        } else {
            !e.tag().starts_with(&child_prefix)
        };
        let origin_ok = sel.origin == "@*" || sel.origin == e.origin();
        (tag_ok && origin_ok) != sel.negated
    })
}

/// Origin record filter. Origin records carry no tag, so a selector with a
/// tag cannot apply, and a wildcard origin would match every record; both
/// are caller bugs, not user input errors.
pub fn origin_is(sel: &QualifiedTag) -> AppResult<OriginPredicate> {
    if !sel.tag.is_empty() {
        return Err(AppError::unsupported_selector(format!(
            "origin filter cannot carry a tag: {}",
            sel
        )));
    }
    if sel.origin == "@*" {
        return Err(AppError::unsupported_selector(
            "wildcard origin filter is meaningless for origin records",
        ));
    }
    let sel = sel.clone();
    Ok(Box::new(move |o: &OriginRecord| {
        (sel.origin == o.origin) != sel.negated
    }))
}

/// OR-combine predicates. Empty input means "no constraint" and returns
/// None so callers never receive a vacuous filter.
pub fn any_of<T: ?Sized + 'static>(
    preds: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>>,
) -> Option<Box<dyn Fn(&T) -> bool + Send + Sync>> {
    if preds.is_empty() {
        return None;
    }
    Some(Box::new(move |e: &T| preds.iter().any(|p| p(e))))
}

/// AND-combine predicates. An empty AND-group must never silently match
/// everything, so empty input returns None and is filtered out upstream.
pub fn all_of<T: ?Sized + 'static>(
    preds: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>>,
) -> Option<Box<dyn Fn(&T) -> bool + Send + Sync>> {
    if preds.is_empty() {
        return None;
    }
    Some(Box::new(move |e: &T| preds.iter().all(|p| p(e))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Plugin, Template};

    fn sel(token: &str) -> QualifiedTag {
        QualifiedTag::parse(token).unwrap()
    }

    fn ref_with(tags: &[&str], origin: &str) -> Ref {
        Ref {
            url: "https://example.com".into(),
            origin: origin.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn template(tag: &str) -> Template {
        Template { tag: tag.into(), ..Default::default() }
    }

    #[test]
    fn ref_filter_is_membership_not_equality() {
        let p = ref_has(&sel("science"));
        assert!(p(&ref_with(&["news", "science"], "")));
        assert!(!p(&ref_with(&["news"], "")));
        // origin must match exactly for a non-wildcard selector
        assert!(!p(&ref_with(&["science"], "@remote")));
        let p = ref_has(&sel("science@*"));
        assert!(p(&ref_with(&["science"], "@remote")));
    }

    #[test]
    fn ref_filter_blank_tag_is_origin_only() {
        let p = ref_has(&sel("@remote"));
        assert!(p(&ref_with(&["anything"], "@remote")));
        assert!(!p(&ref_with(&["anything"], "")));
    }

    #[test]
    fn ref_filter_negation_covers_the_conjunction() {
        let p = ref_has(&sel("!science"));
        assert!(!p(&ref_with(&["science"], "")));
        assert!(p(&ref_with(&["science"], "@remote")));
        assert!(p(&ref_with(&["news"], "")));
    }

    #[test]
    fn record_filter_matches_descendants() {
        let p = record_is(&sel("plugin"));
        let exact = Plugin { tag: "plugin".into(), ..Default::default() };
        let child = Plugin { tag: "plugin/mail".into(), ..Default::default() };
        let sibling = Plugin { tag: "pluginx".into(), ..Default::default() };
        assert!(p(&exact));
        assert!(p(&child));
        assert!(!p(&sibling));
    }

    #[test]
    fn template_filter_matches_upward() {
        // Selecting templates for tag a/b: the ancestor template a applies,
        // the deeper template a/b/c does not. The record filter would give
        // the opposite answer; the asymmetry is load-bearing.
        let p = template_applies(&sel("a/b"));
        assert!(p(&template("a")));
        assert!(p(&template("a/b")));
        assert!(!p(&template("a/b/c")));
    }

    #[test]
    fn blank_selector_matches_only_root_template() {
        let p = template_applies(&sel("@other"));
        assert!(p(&Template { tag: "".into(), origin: "@other".into(), ..Default::default() }));
        assert!(!p(&Template { tag: "a".into(), origin: "@other".into(), ..Default::default() }));
    }

    #[test]
    fn origin_filter_rejects_misuse() {
        assert!(origin_is(&sel("tag@remote")).is_err());
        assert!(origin_is(&sel("@*")).is_err());
        let p = origin_is(&sel("@remote")).unwrap();
        assert!(p(&OriginRecord { origin: "@remote".into(), ..Default::default() }));
        assert!(!p(&OriginRecord { origin: "@other".into(), ..Default::default() }));
    }

    #[test]
    fn empty_combinations_are_no_constraint() {
        assert!(any_of::<Ref>(Vec::new()).is_none());
        assert!(all_of::<Ref>(Vec::new()).is_none());
    }

    #[test]
    fn all_of_requires_every_capture() {
        let p = all_of(vec![ref_has(&sel("a")), ref_has(&sel("b"))]).unwrap();
        assert!(p(&ref_with(&["a", "b"], "")));
        assert!(!p(&ref_with(&["a"], "")));
    }
}
