//! Occurrence resolution (pass 2 of scope resolution).
//!
//! Re-walks the tree entering the scopes built by pass 1 and resolves
//! every value-position identifier to the nearest enclosing binding.
//! Occurrences with no visible declaration resolve to an implicit-global
//! binding keyed by name at the program root, so every occurrence ends up
//! with exactly one binding.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::scoping::domain::{
    BindingId, BindingKind, OccurrenceRoles, ScopeId, ScopeTree,
};
use crate::shared::models::{AnalysisError, AnalysisResult};

use super::hoist::{collect_declarations, Declarations};
use super::position::{identifier_position, IdentPosition};

pub fn resolve_scopes(tree: &SyntaxTree) -> AnalysisResult<ScopeTree> {
    let declarations = collect_declarations(tree);
    if declarations.scopes.is_empty() {
        return Err(AnalysisError::resolve("no scopes could be built"));
    }
    let mut resolver = Resolver {
        tree,
        declarations,
        resolutions: FxHashMap::default(),
        roles: FxHashMap::default(),
        implicit: FxHashMap::default(),
        skipped: Vec::new(),
        extra_bindings: Vec::new(),
    };
    resolver.visit(tree.root, ScopeId(0));
    let Resolver {
        mut declarations,
        resolutions,
        roles,
        skipped,
        extra_bindings,
        ..
    } = resolver;
    declarations.bindings.extend(extra_bindings);
    Ok(ScopeTree {
        scopes: declarations.scopes,
        bindings: declarations.bindings,
        resolutions,
        roles,
        skipped_subtrees: skipped,
    })
}

struct Resolver<'t> {
    tree: &'t SyntaxTree,
    declarations: Declarations,
    resolutions: FxHashMap<NodeId, BindingId>,
    roles: FxHashMap<NodeId, OccurrenceRoles>,
    /// Implicit globals created on demand, keyed by name.
    implicit: FxHashMap<String, BindingId>,
    skipped: Vec<NodeId>,
    extra_bindings: Vec<crate::features::scoping::domain::Binding>,
}

impl Resolver<'_> {
    fn visit(&mut self, node: NodeId, scope: ScopeId) {
        match self.tree.kind(node) {
            NodeKind::Identifier { .. } => self.resolve_identifier(node, scope),
            NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionExpression { .. }
            | NodeKind::ArrowFunctionExpression { .. } => self.visit_function(node, scope),
            NodeKind::ClassExpression {
                ident,
                super_class,
                body,
            } => {
                let inner = self
                    .declarations
                    .name_scope_of
                    .get(&node)
                    .copied()
                    .unwrap_or(scope);
                if let Some(ident) = *ident {
                    self.resolve_identifier(ident, inner);
                }
                if let Some(super_class) = *super_class {
                    self.visit(super_class, inner);
                }
                self.visit(*body, inner);
            }
            _ => {
                let inner = self
                    .declarations
                    .scope_of_owner
                    .get(&node)
                    .copied()
                    .unwrap_or(scope);
                for child in self.tree.children(node) {
                    self.visit(child, inner);
                }
            }
        }
    }

    fn visit_function(&mut self, node: NodeId, outer: ScopeId) {
        let Some(&function_scope) = self.declarations.scope_of_owner.get(&node) else {
            warn!(node = %node, "function without a collected scope; skipping subtree");
            self.skipped.push(node);
            return;
        };

        let (ident, params, body) = match self.tree.kind(node) {
            NodeKind::FunctionDeclaration {
                ident,
                params,
                body,
                ..
            }
            | NodeKind::FunctionExpression {
                ident,
                params,
                body,
                ..
            } => (*ident, params.clone(), *body),
            NodeKind::ArrowFunctionExpression { params, body, .. } => {
                (None, params.clone(), *body)
            }
            _ => unreachable!("visit_function on a non-function node"),
        };

        if let Some(ident) = ident {
            // Declaration names resolve where pass 1 bound them: the hoist
            // scope for declarations, the self-name scope for expressions.
            let name_scope = self
                .declarations
                .name_scope_of
                .get(&node)
                .copied()
                .unwrap_or(outer);
            self.resolve_identifier(ident, name_scope);
        }

        for &param in &params {
            self.visit_param(param, function_scope, outer);
        }
        match self.tree.kind(body) {
            NodeKind::BlockStatement { body } => {
                for child in body.clone() {
                    self.visit(child, function_scope);
                }
            }
            _ => self.visit(body, function_scope),
        }
    }

    /// Parameter leaves declare in the function scope; default-value
    /// expressions are uses of the outer scope.
    fn visit_param(&mut self, param: NodeId, function_scope: ScopeId, outer: ScopeId) {
        match self.tree.kind(param) {
            NodeKind::Identifier { .. } => self.resolve_identifier(param, function_scope),
            NodeKind::AssignmentPattern { left, right } => {
                let (left, right) = (*left, *right);
                self.visit_param(left, function_scope, outer);
                self.visit(right, outer);
            }
            NodeKind::ObjectPattern { properties } => {
                for property in properties.clone() {
                    match self.tree.kind(property) {
                        NodeKind::Property {
                            key,
                            value,
                            computed,
                            ..
                        } => {
                            let (key, value, computed) = (*key, *value, *computed);
                            if computed {
                                self.visit(key, outer);
                            }
                            self.visit_param(value, function_scope, outer);
                        }
                        NodeKind::RestElement { argument } => {
                            self.visit_param(*argument, function_scope, outer)
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::ArrayPattern { elements } => {
                for element in elements.clone().into_iter().flatten() {
                    self.visit_param(element, function_scope, outer);
                }
            }
            NodeKind::RestElement { argument } => {
                self.visit_param(*argument, function_scope, outer)
            }
            _ => self.visit(param, function_scope),
        }
    }

    fn resolve_identifier(&mut self, node: NodeId, scope: ScopeId) {
        let position = identifier_position(self.tree, node);
        let roles = match position {
            IdentPosition::NotAnOccurrence => return,
            IdentPosition::Declaration => OccurrenceRoles::declaration(),
            IdentPosition::Read => OccurrenceRoles::read(),
            IdentPosition::Write => OccurrenceRoles::write(),
            IdentPosition::ReadWrite => OccurrenceRoles::read_write(),
        };

        let binding = if position == IdentPosition::Declaration {
            match self.declarations.decl_binding.get(&node) {
                Some(&binding) => binding,
                None => {
                    // Pass 1 and pass 2 disagree on this subtree.
                    let function = self
                        .tree
                        .enclosing_function(node)
                        .unwrap_or(self.tree.root);
                    warn!(node = %node, "declaration without a collected binding");
                    if !self.skipped.contains(&function) {
                        self.skipped.push(function);
                    }
                    self.implicit_global(node)
                }
            }
        } else {
            let name = self
                .tree
                .node(node)
                .identifier_name()
                .unwrap_or_default()
                .to_owned();
            match self.lookup(scope, &name) {
                Some(binding) => binding,
                None => self.implicit_global(node),
            }
        };

        self.resolutions.insert(node, binding);
        self.roles.insert(node, roles);
    }

    fn lookup(&self, from: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(from);
        while let Some(scope_id) = current {
            let scope = &self.declarations.scopes[scope_id.index()];
            if let Some(&binding) = scope.bindings.get(name) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }

    fn implicit_global(&mut self, occurrence: NodeId) -> BindingId {
        let name = self
            .tree
            .node(occurrence)
            .identifier_name()
            .unwrap_or_default()
            .to_owned();
        if let Some(&binding) = self.implicit.get(&name) {
            return binding;
        }
        let id = BindingId((self.declarations.bindings.len() + self.extra_bindings.len()) as u32);
        self.extra_bindings
            .push(crate::features::scoping::domain::Binding {
                id,
                name: name.clone(),
                kind: BindingKind::ImplicitGlobal,
                declaration: self.tree.root,
                scope: ScopeId(0),
            });
        self.declarations.scopes[0].bindings.insert(name.clone(), id);
        self.implicit.insert(name, id);
        id
    }
}
