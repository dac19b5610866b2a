//! Entity snapshots consumed by the query compiler and the policy engine.
//! These are plain data carriers; loading and persistence live elsewhere.

mod origin;
mod record;
mod ref_entity;
mod user;

pub use origin::{FederationScope, OriginRecord};
pub use record::{Plugin, Tag, TagRecord, Template};
pub use ref_entity::Ref;
pub use user::User;
