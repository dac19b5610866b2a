//! Access policy engine: a request-scoped evaluator combining the role
//! hierarchy, the caller's stored access-control lists and selector capture
//! to answer capability questions. Every check returns a plain boolean;
//! access denial is not an error, and absence of a grant is denial.

mod context;
mod policy;
mod roles;

pub use context::{Auth, MemoryUserStore, NoUsers, Principal, UserStore};
pub use policy::{TAG_LOCKED, TAG_PUBLIC};
pub use roles::{
    DefaultRoleHierarchy, RoleHierarchy, ROLE_ADMIN, ROLE_ANONYMOUS, ROLE_EDITOR, ROLE_MOD,
    ROLE_USER, ROLE_VIEWER,
};
