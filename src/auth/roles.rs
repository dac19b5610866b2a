use std::collections::HashSet;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_MOD: &str = "ROLE_MOD";
pub const ROLE_EDITOR: &str = "ROLE_EDITOR";
pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_VIEWER: &str = "ROLE_VIEWER";
pub const ROLE_ANONYMOUS: &str = "ROLE_ANONYMOUS";

/// Role hierarchy collaborator: maps a set of granted roles to its
/// transitive closure. Kept behind a trait so the concrete table is
/// swappable and testable independent of the policy engine.
pub trait RoleHierarchy: Send + Sync {
    fn expand(&self, granted: &HashSet<String>) -> HashSet<String>;
}

/// The default linear chain:
/// ADMIN > MOD > EDITOR > USER > VIEWER > ANONYMOUS.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRoleHierarchy;

const CHAIN: [&str; 6] = [
    ROLE_ADMIN,
    ROLE_MOD,
    ROLE_EDITOR,
    ROLE_USER,
    ROLE_VIEWER,
    ROLE_ANONYMOUS,
];

impl RoleHierarchy for DefaultRoleHierarchy {
    fn expand(&self, granted: &HashSet<String>) -> HashSet<String> {
        let mut out: HashSet<String> = granted.clone();
        for (i, role) in CHAIN.iter().enumerate() {
            if granted.contains(*role) {
                out.extend(CHAIN[i..].iter().map(|r| r.to_string()));
            }
        }
        out
    }
}
