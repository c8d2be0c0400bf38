//! Lexical scoping: declaration hoisting and occurrence resolution.

pub mod domain;
pub mod infrastructure;

pub use domain::{Binding, BindingId, BindingKind, OccurrenceRoles, ScopeId, ScopeKind, ScopeTree};
pub use infrastructure::{identifier_position, resolve_scopes, IdentPosition};
