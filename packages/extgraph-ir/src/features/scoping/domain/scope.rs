//! Lexical scopes, bindings, and resolved occurrences.

use crate::features::ast::domain::NodeId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Catch,
    /// The one-name scope wrapping a named function expression; the name
    /// is visible only inside the expression itself.
    FunctionExpressionName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Class,
    Function,
    Parameter,
    CatchParam,
    FunctionExpressionName,
    Import,
    /// No visible declaration; created on demand at the program root.
    ImplicitGlobal,
}

impl BindingKind {
    /// Whether the declaration itself hoists to the enclosing
    /// function/script scope.
    pub fn hoists(&self) -> bool {
        matches!(self, BindingKind::Var | BindingKind::Function)
    }
}

/// A declaration entry a name can resolve to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub name: String,
    pub kind: BindingKind,
    /// The declaring identifier node; the program root for implicit
    /// globals.
    pub declaration: NodeId,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The AST node that introduced the scope.
    pub owner: NodeId,
    pub bindings: FxHashMap<String, BindingId>,
}

/// Role bitflags on one identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OccurrenceRoles(pub u8);

impl OccurrenceRoles {
    pub const DECLARATION: u8 = 1;
    pub const READ: u8 = 2;
    pub const WRITE: u8 = 4;

    pub fn declaration() -> Self {
        Self(Self::DECLARATION)
    }

    pub fn read() -> Self {
        Self(Self::READ)
    }

    pub fn write() -> Self {
        Self(Self::WRITE)
    }

    pub fn read_write() -> Self {
        Self(Self::READ | Self::WRITE)
    }

    pub fn add(&mut self, bits: u8) {
        self.0 |= bits;
    }

    pub fn is_declaration(&self) -> bool {
        self.0 & Self::DECLARATION != 0
    }

    pub fn is_read(&self) -> bool {
        self.0 & Self::READ != 0
    }

    pub fn is_write(&self) -> bool {
        self.0 & Self::WRITE != 0
    }

    /// Definition endpoints for the data-dependence overlay.
    pub fn defines(&self) -> bool {
        self.0 & (Self::DECLARATION | Self::WRITE) != 0
    }
}

/// The resolved scope structure of one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    /// Identifier occurrence → its binding. Every value-position
    /// identifier appears here exactly once.
    pub resolutions: FxHashMap<NodeId, BindingId>,
    /// Roles per occurrence.
    pub roles: FxHashMap<NodeId, OccurrenceRoles>,
    /// Function subtrees skipped after a resolution inconsistency.
    pub skipped_subtrees: Vec<NodeId>,
}

impl ScopeTree {
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    pub fn resolution(&self, occurrence: NodeId) -> Option<BindingId> {
        self.resolutions.get(&occurrence).copied()
    }

    pub fn roles_of(&self, occurrence: NodeId) -> OccurrenceRoles {
        self.roles.get(&occurrence).copied().unwrap_or_default()
    }

    /// Walk the scope chain for `name`, innermost first.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(from);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if let Some(&binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }

    /// All occurrences of one binding, unordered; callers sort by span/id.
    pub fn occurrences_of(&self, binding: BindingId) -> Vec<NodeId> {
        self.resolutions
            .iter()
            .filter(|(_, &b)| b == binding)
            .map(|(&occurrence, _)| occurrence)
            .collect()
    }
}
