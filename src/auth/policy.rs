//! The capability rules. Each check is a pure function of the request
//! context, an entity snapshot and the stored access lists; the storage
//! layer loads entities up front and the API layer turns `false` into an
//! access-denied response.

use tracing::debug;

use super::context::Auth;
use crate::model::{Ref, User};
use crate::selector::{is_public_tag, split_qualified};

/// Tag marking a ref readable by anyone.
pub const TAG_PUBLIC: &str = "public";
/// Tag freezing a ref against non-moderator edits.
pub const TAG_LOCKED: &str = "locked";

impl Auth<'_> {
    pub fn can_read_ref(&self, r: &Ref) -> bool {
        if self.has_role("MOD") {
            return true;
        }
        if r.has_tag(TAG_PUBLIC) {
            return true;
        }
        if !self.has_role("USER") {
            return false;
        }
        if self.owns_ref(r) {
            return true;
        }
        self.read_access()
            .iter()
            .any(|s| r.tags.iter().any(|t| s.captures(t, &r.origin)))
    }

    /// Write gate against the entity as it exists now. `None` means the url
    /// has no entity yet: creation is allowed so writes stay idempotent.
    pub fn can_write_ref_existing(&self, existing: Option<&Ref>) -> bool {
        if self.has_role("MOD") {
            return true;
        }
        if !self.has_role("USER") {
            return false;
        }
        let Some(r) = existing else { return true };
        if r.has_tag(TAG_LOCKED) {
            debug!("write denied: {} is locked", r.url);
            return false;
        }
        if self.owns_ref(r) {
            return true;
        }
        self.write_access()
            .iter()
            .any(|s| r.tags.iter().any(|t| s.captures(t, &r.origin)))
    }

    /// Full write check: the existing-state gate plus `can_add_tag` for
    /// every tag the update introduces.
    pub fn can_write_ref(&self, updated: &Ref, existing: Option<&Ref>) -> bool {
        if !self.can_write_ref_existing(existing) {
            return false;
        }
        let current: &[String] = existing.map(|r| r.tags.as_slice()).unwrap_or(&[]);
        updated
            .tags
            .iter()
            .filter(|t| !current.contains(t))
            .all(|t| self.can_add_tag(t))
    }

    /// May the caller put this tag on an entity. Public tags are always
    /// addable; private/protected tags need the caller's own identity tag
    /// or a capturing entry in tagReadAccess ∪ readAccess.
    pub fn can_add_tag(&self, tag: &str) -> bool {
        let (name, origin) = split_qualified(tag);
        if is_public_tag(name) {
            return true;
        }
        if self.has_role("MOD") {
            return true;
        }
        if !self.has_role("USER") {
            return false;
        }
        if origin.is_empty() && name == self.user_tag() {
            return true;
        }
        self.tag_read_access().iter().any(|s| s.captures(name, origin))
    }

    pub fn can_read_tag(&self, tag: &str) -> bool {
        let (name, _) = split_qualified(tag);
        if is_public_tag(name) {
            return true;
        }
        self.can_add_tag(tag)
    }

    pub fn can_write_tag(&self, tag: &str) -> bool {
        if self.has_role("MOD") {
            return true;
        }
        let (name, origin) = split_qualified(tag);
        if is_public_tag(name) {
            return self.has_role("EDITOR");
        }
        if !self.has_role("USER") {
            return false;
        }
        if origin.is_empty() && name == self.user_tag() {
            return true;
        }
        self.tag_write_access().iter().any(|s| s.captures(name, origin))
    }

    /// May the caller apply `tag` to the ref currently stored as
    /// `existing`. The distinguished `public`/`locked` tags are never
    /// taggable through this path.
    pub fn can_tag(&self, tag: &str, existing: Option<&Ref>) -> bool {
        let (name, _) = split_qualified(tag);
        if name == TAG_PUBLIC || name == TAG_LOCKED {
            return false;
        }
        if self.has_role("EDITOR") && is_public_tag(name) {
            if let Some(r) = existing {
                if self.can_read_ref(r) {
                    return true;
                }
            }
        }
        self.can_read_tag(tag) && self.can_write_ref_existing(existing)
    }

    /// May the caller run this query. Private-tag literals are extracted
    /// lexically from the same raw string the compiler consumes, so
    /// selectors inside parentheses and combinators are still seen.
    pub fn can_read_query(&self, raw: &str) -> bool {
        if self.has_role("MOD") {
            return true;
        }
        let privates: Vec<&str> = raw
            .split(|c: char| matches!(c, '!' | ':' | '|' | '(' | ')') || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .filter(|t| split_qualified(t).0.starts_with('_'))
            .filter(|t| {
                let (name, origin) = split_qualified(t);
                !(name == self.user_tag() && origin.is_empty())
            })
            .collect();
        if privates.is_empty() {
            return true;
        }
        if !self.has_role("USER") {
            debug!("query denied: private tags {:?} without USER role", privates);
            return false;
        }
        privates.iter().all(|t| {
            let (name, origin) = split_qualified(t);
            self.tag_read_access().iter().any(|s| s.captures(name, origin))
        })
    }

    /// May the caller store this user record. Enforces the delegation
    /// invariant: every access-list entry being newly granted must already
    /// be grantable by the caller, so nobody hands out access they do not
    /// hold.
    pub fn can_write_user(&self, target: &User, existing: Option<&User>) -> bool {
        if self.has_role("MOD") {
            return true;
        }
        if !self.can_write_tag(&target.qualified_tag()) {
            return false;
        }
        // Public tags grant nothing through writeAccess; storing one there
        // is always a mistake.
        if target.write_access.iter().any(|t| {
            let (name, _) = split_qualified(t.trim_start_matches('!'));
            is_public_tag(name)
        }) {
            debug!("user write denied: public tag in writeAccess");
            return false;
        }
        let added = |list: fn(&User) -> &Vec<String>| -> Vec<&String> {
            let before = existing.map(list);
            list(target)
                .iter()
                .filter(move |t| before.map(|b| !b.contains(*t)).unwrap_or(true))
                .collect()
        };
        for token in added(|u| &u.read_access)
            .into_iter()
            .chain(added(|u| &u.tag_read_access))
        {
            if !self.can_read_tag(token.trim_start_matches('!')) {
                return false;
            }
        }
        for token in added(|u| &u.write_access)
            .into_iter()
            .chain(added(|u| &u.tag_write_access))
        {
            if !self.can_write_tag(token.trim_start_matches('!')) {
                return false;
            }
        }
        true
    }

    fn owns_ref(&self, r: &Ref) -> bool {
        !self.user_tag().is_empty() && r.has_tag(self.user_tag())
    }
}
