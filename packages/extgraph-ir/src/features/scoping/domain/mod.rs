pub mod scope;

pub use scope::{
    Binding, BindingId, BindingKind, OccurrenceRoles, Scope, ScopeId, ScopeKind, ScopeTree,
};
