use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::roles::RoleHierarchy;
use crate::model::User;
use crate::selector::QualifiedTag;

/// User lookup collaborator supplied by the persistence layer. Synchronous
/// by contract; `None` is the normal "no such user" result and means "no
/// access-list grants", never a fault.
pub trait UserStore {
    fn find_by_qualified_tag(&self, qualified_tag: &str) -> Option<User>;
}

/// Empty store for anonymous-only contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUsers;

impl UserStore for NoUsers {
    fn find_by_qualified_tag(&self, _qualified_tag: &str) -> Option<User> {
        None
    }
}

/// In-memory store keyed by qualified tag.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: HashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.qualified_tag(), u)).collect(),
        }
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_qualified_tag(&self, qualified_tag: &str) -> Option<User> {
        self.users.get(qualified_tag).cloned()
    }
}

/// Per-request principal: identity tag plus granted (unexpanded) roles.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    /// `+user/<name>` or `_user/<name>`; empty for anonymous callers.
    pub user_tag: String,
    /// Origin the caller authenticated against; empty for local.
    pub origin: String,
    pub roles: Vec<String>,
}

/// Request-scoped policy evaluator. Exactly one logical request owns one
/// instance; it is never shared across requests. The memoized cells are
/// write-once-then-read, so a request fanned out across cooperating tasks
/// at worst recomputes, it never observes a torn value.
pub struct Auth<'a> {
    principal: Principal,
    hierarchy: &'a dyn RoleHierarchy,
    users: &'a dyn UserStore,
    roles: OnceCell<HashSet<String>>,
    user: OnceCell<Option<User>>,
    read_access: OnceCell<Vec<QualifiedTag>>,
    write_access: OnceCell<Vec<QualifiedTag>>,
    tag_read_access: OnceCell<Vec<QualifiedTag>>,
    tag_write_access: OnceCell<Vec<QualifiedTag>>,
}

impl<'a> Auth<'a> {
    pub fn new(
        principal: Principal,
        hierarchy: &'a dyn RoleHierarchy,
        users: &'a dyn UserStore,
    ) -> Self {
        Self {
            principal,
            hierarchy,
            users,
            roles: OnceCell::new(),
            user: OnceCell::new(),
            read_access: OnceCell::new(),
            write_access: OnceCell::new(),
            tag_read_access: OnceCell::new(),
            tag_write_access: OnceCell::new(),
        }
    }

    /// `has_role("MOD")` checks `ROLE_MOD` membership in the expanded
    /// closure.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles().contains(&format!("ROLE_{}", role))
    }

    pub fn user_tag(&self) -> &str {
        &self.principal.user_tag
    }

    pub fn qualified_user_tag(&self) -> String {
        format!("{}{}", self.principal.user_tag, self.principal.origin)
    }

    fn roles(&self) -> &HashSet<String> {
        self.roles.get_or_init(|| {
            let granted: HashSet<String> = self.principal.roles.iter().cloned().collect();
            self.hierarchy.expand(&granted)
        })
    }

    /// The caller's stored user record, resolved at most once per request.
    pub(super) fn user(&self) -> Option<&User> {
        self.user
            .get_or_init(|| {
                if self.principal.user_tag.is_empty() {
                    return None;
                }
                self.users.find_by_qualified_tag(&self.qualified_user_tag())
            })
            .as_ref()
    }

    /// Selectors governing reads of entities that already carry a tag.
    pub(super) fn read_access(&self) -> &[QualifiedTag] {
        self.read_access.get_or_init(|| {
            parse_tokens(self.user().map(|u| u.read_access.as_slice()).unwrap_or(&[]))
        })
    }

    /// Selectors governing writes of entities that already carry a tag.
    pub(super) fn write_access(&self) -> &[QualifiedTag] {
        self.write_access.get_or_init(|| {
            parse_tokens(self.user().map(|u| u.write_access.as_slice()).unwrap_or(&[]))
        })
    }

    /// tagReadAccess ∪ readAccess: governs adding a tag and reading
    /// private tags.
    pub(super) fn tag_read_access(&self) -> &[QualifiedTag] {
        self.tag_read_access.get_or_init(|| {
            let mut tokens: Vec<&String> = Vec::new();
            if let Some(u) = self.user() {
                tokens.extend(u.tag_read_access.iter());
                tokens.extend(u.read_access.iter());
            }
            parse_token_refs(&tokens)
        })
    }

    /// tagWriteAccess ∪ writeAccess: governs writing tag records.
    pub(super) fn tag_write_access(&self) -> &[QualifiedTag] {
        self.tag_write_access.get_or_init(|| {
            let mut tokens: Vec<&String> = Vec::new();
            if let Some(u) = self.user() {
                tokens.extend(u.tag_write_access.iter());
                tokens.extend(u.write_access.iter());
            }
            parse_token_refs(&tokens)
        })
    }
}

fn parse_tokens(tokens: &[String]) -> Vec<QualifiedTag> {
    let refs: Vec<&String> = tokens.iter().collect();
    parse_token_refs(&refs)
}

// Stored lists are validated on write; anything malformed that slips
// through simply grants nothing.
fn parse_token_refs(tokens: &[&String]) -> Vec<QualifiedTag> {
    tokens
        .iter()
        .filter_map(|t| match QualifiedTag::parse(t) {
            Ok(sel) => Some(sel),
            Err(e) => {
                debug!("skipping malformed access selector {:?}: {}", t, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::{DefaultRoleHierarchy, ROLE_USER};
    use std::cell::Cell;

    struct CountingStore {
        inner: MemoryUserStore,
        lookups: Cell<usize>,
    }

    impl UserStore for CountingStore {
        fn find_by_qualified_tag(&self, qualified_tag: &str) -> Option<User> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.find_by_qualified_tag(qualified_tag)
        }
    }

    fn principal(tag: &str) -> Principal {
        Principal { user_tag: tag.into(), origin: "".into(), roles: vec![ROLE_USER.into()] }
    }

    #[test]
    fn user_lookup_is_memoized_per_request() {
        let store = CountingStore {
            inner: MemoryUserStore::new([User {
                tag: "+user/alice".into(),
                read_access: vec!["science".into()],
                ..Default::default()
            }]),
            lookups: Cell::new(0),
        };
        let auth = Auth::new(principal("+user/alice"), &DefaultRoleHierarchy, &store);
        assert_eq!(auth.read_access().len(), 1);
        assert_eq!(auth.tag_read_access().len(), 1);
        assert!(auth.write_access().is_empty());
        assert_eq!(store.lookups.get(), 1, "all lists resolve from one lookup");
    }

    #[test]
    fn anonymous_principal_never_hits_the_store() {
        let store = CountingStore {
            inner: MemoryUserStore::default(),
            lookups: Cell::new(0),
        };
        let auth = Auth::new(Principal::default(), &DefaultRoleHierarchy, &store);
        assert!(auth.user().is_none());
        assert_eq!(store.lookups.get(), 0);
    }

    #[test]
    fn malformed_access_tokens_grant_nothing() {
        let store = MemoryUserStore::new([User {
            tag: "+user/bob".into(),
            read_access: vec!["@".into(), "ok".into()],
            ..Default::default()
        }]);
        let auth = Auth::new(principal("+user/bob"), &DefaultRoleHierarchy, &store);
        assert_eq!(auth.read_access().len(), 1);
    }

    #[test]
    fn has_role_uses_expanded_closure() {
        let store = NoUsers;
        let auth = Auth::new(principal("+user/alice"), &DefaultRoleHierarchy, &store);
        assert!(auth.has_role("USER"));
        assert!(auth.has_role("VIEWER"));
        assert!(!auth.has_role("MOD"));
    }
}
