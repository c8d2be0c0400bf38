//! Declaration collection (pass 1 of scope resolution).
//!
//! Builds the scope tree and binds every declared name before any
//! occurrence is resolved: `var` and `function` hoist to the enclosing
//! function/script scope, `let`/`const`/`class` stay block-scoped,
//! parameters populate the function scope, a named function expression
//! gets a one-name scope of its own, and `catch (e)` opens a fresh scope
//! for `e`.

use rustc_hash::FxHashMap;

use crate::features::ast::domain::{DeclKind, NodeId, NodeKind, SyntaxTree};
use crate::features::scoping::domain::{
    Binding, BindingId, BindingKind, Scope, ScopeId, ScopeKind,
};

#[derive(Debug, Default)]
pub struct Declarations {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    /// Scope introduced by a node (program, function, block, loop, switch,
    /// catch clause).
    pub scope_of_owner: FxHashMap<NodeId, ScopeId>,
    /// Self-name scope of a named function/class expression, keyed by the
    /// expression node.
    pub name_scope_of: FxHashMap<NodeId, ScopeId>,
    /// Declaring identifier node → its binding.
    pub decl_binding: FxHashMap<NodeId, BindingId>,
}

pub fn collect_declarations(tree: &SyntaxTree) -> Declarations {
    let mut collector = Collector {
        tree,
        out: Declarations::default(),
    };
    let global = collector.new_scope(ScopeKind::Global, None, tree.root);
    collector.out.scope_of_owner.insert(tree.root, global);
    for child in tree.children(tree.root) {
        collector.visit(child, global, global);
    }
    collector.out
}

struct Collector<'t> {
    tree: &'t SyntaxTree,
    out: Declarations,
}

impl Collector<'_> {
    fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.out.scopes.len() as u32);
        self.out.scopes.push(Scope {
            id,
            kind,
            parent,
            owner,
            bindings: FxHashMap::default(),
        });
        id
    }

    /// Bind `name` in `scope`, reusing an existing same-name binding
    /// (repeated `var`, or a function declaration shadowing one).
    fn bind(&mut self, scope: ScopeId, name: &str, kind: BindingKind, decl: NodeId) -> BindingId {
        if let Some(&existing) = self.out.scopes[scope.index()].bindings.get(name) {
            self.out.decl_binding.insert(decl, existing);
            return existing;
        }
        let id = BindingId(self.out.bindings.len() as u32);
        self.out.bindings.push(Binding {
            id,
            name: name.to_owned(),
            kind,
            declaration: decl,
            scope,
        });
        self.out.scopes[scope.index()]
            .bindings
            .insert(name.to_owned(), id);
        self.out.decl_binding.insert(decl, id);
        id
    }

    /// Bind every leaf identifier of a declaration pattern.
    fn bind_pattern(&mut self, pattern: NodeId, scope: ScopeId, kind: BindingKind) {
        match self.tree.kind(pattern) {
            NodeKind::Identifier { name } => {
                let name = name.clone();
                self.bind(scope, &name, kind, pattern);
            }
            NodeKind::ObjectPattern { properties } => {
                for &property in properties {
                    match self.tree.kind(property) {
                        NodeKind::Property { value, .. } => {
                            self.bind_pattern(*value, scope, kind)
                        }
                        NodeKind::RestElement { argument } => {
                            self.bind_pattern(*argument, scope, kind)
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::ArrayPattern { elements } => {
                for element in elements.iter().flatten() {
                    self.bind_pattern(*element, scope, kind);
                }
            }
            NodeKind::RestElement { argument } => self.bind_pattern(*argument, scope, kind),
            NodeKind::AssignmentPattern { left, .. } => self.bind_pattern(*left, scope, kind),
            _ => {}
        }
    }

    /// Walk one node. `scope` is the innermost lexical scope, `hoist` the
    /// nearest function/script scope that `var`/`function` land in.
    fn visit(&mut self, node: NodeId, scope: ScopeId, hoist: ScopeId) {
        match self.tree.kind(node).clone() {
            NodeKind::FunctionDeclaration {
                ident,
                params,
                body,
                ..
            } => {
                if let Some(ident) = ident {
                    if let Some(name) = self.tree.node(ident).identifier_name() {
                        let name = name.to_owned();
                        self.bind(hoist, &name, BindingKind::Function, ident);
                    }
                }
                self.enter_function(node, scope, &params, body);
            }
            NodeKind::FunctionExpression {
                ident,
                params,
                body,
                ..
            } => {
                let mut outer = scope;
                if let Some(ident) = ident {
                    if let Some(name) = self.tree.node(ident).identifier_name() {
                        let name = name.to_owned();
                        let name_scope =
                            self.new_scope(ScopeKind::FunctionExpressionName, Some(scope), ident);
                        self.bind(
                            name_scope,
                            &name,
                            BindingKind::FunctionExpressionName,
                            ident,
                        );
                        self.out.name_scope_of.insert(node, name_scope);
                        outer = name_scope;
                    }
                }
                self.enter_function(node, outer, &params, body);
            }
            NodeKind::ArrowFunctionExpression { params, body, .. } => {
                self.enter_function(node, scope, &params, body);
            }
            NodeKind::ClassDeclaration {
                ident,
                super_class,
                body,
            } => {
                if let Some(ident) = ident {
                    if let Some(name) = self.tree.node(ident).identifier_name() {
                        let name = name.to_owned();
                        self.bind(scope, &name, BindingKind::Class, ident);
                    }
                }
                if let Some(super_class) = super_class {
                    self.visit(super_class, scope, hoist);
                }
                self.visit(body, scope, hoist);
            }
            NodeKind::ClassExpression {
                ident,
                super_class,
                body,
            } => {
                let mut inner = scope;
                if let Some(ident) = ident {
                    if let Some(name) = self.tree.node(ident).identifier_name() {
                        let name = name.to_owned();
                        let name_scope =
                            self.new_scope(ScopeKind::FunctionExpressionName, Some(scope), ident);
                        self.bind(name_scope, &name, BindingKind::Class, ident);
                        self.out.name_scope_of.insert(node, name_scope);
                        inner = name_scope;
                    }
                }
                if let Some(super_class) = super_class {
                    self.visit(super_class, inner, hoist);
                }
                self.visit(body, inner, hoist);
            }
            NodeKind::BlockStatement { body } => {
                let block = self.new_scope(ScopeKind::Block, Some(scope), node);
                self.out.scope_of_owner.insert(node, block);
                for child in body {
                    self.visit(child, block, hoist);
                }
            }
            NodeKind::CatchClause { param, body } => {
                let catch = self.new_scope(ScopeKind::Catch, Some(scope), node);
                self.out.scope_of_owner.insert(node, catch);
                if let Some(param) = param {
                    self.bind_pattern(param, catch, BindingKind::CatchParam);
                    self.visit(param, catch, hoist);
                }
                self.visit(body, catch, hoist);
            }
            NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. }
            | NodeKind::ForOfStatement { .. }
            | NodeKind::SwitchStatement { .. } => {
                // Holds `let`/`const` introduced by the header or case list.
                let block = self.new_scope(ScopeKind::Block, Some(scope), node);
                self.out.scope_of_owner.insert(node, block);
                for child in self.tree.children(node) {
                    self.visit(child, block, hoist);
                }
            }
            NodeKind::VariableDeclaration { kind, declarations } => {
                let (binding_kind, target) = match kind {
                    DeclKind::Var => (BindingKind::Var, hoist),
                    DeclKind::Let => (BindingKind::Let, scope),
                    DeclKind::Const => (BindingKind::Const, scope),
                };
                for declarator in declarations {
                    if let NodeKind::VariableDeclarator { id, init } =
                        self.tree.kind(declarator).clone()
                    {
                        self.bind_pattern(id, target, binding_kind);
                        self.visit(id, scope, hoist);
                        if let Some(init) = init {
                            self.visit(init, scope, hoist);
                        }
                    }
                }
            }
            NodeKind::ImportSpecifier { local } => {
                if let Some(name) = self.tree.node(local).identifier_name() {
                    let name = name.to_owned();
                    let global = ScopeId(0);
                    self.bind(global, &name, BindingKind::Import, local);
                }
            }
            _ => {
                for child in self.tree.children(node) {
                    self.visit(child, scope, hoist);
                }
            }
        }
    }

    /// Create the function scope, bind parameters, and walk the body
    /// directly in it (the body block shares the function scope).
    fn enter_function(&mut self, node: NodeId, outer: ScopeId, params: &[NodeId], body: NodeId) {
        let function = self.new_scope(ScopeKind::Function, Some(outer), node);
        self.out.scope_of_owner.insert(node, function);
        for &param in params {
            self.bind_pattern(param, function, BindingKind::Parameter);
            self.visit(param, function, function);
        }
        match self.tree.kind(body).clone() {
            NodeKind::BlockStatement { body } => {
                for child in body {
                    self.visit(child, function, function);
                }
            }
            // Arrow with a bare expression body.
            _ => self.visit(body, function, function),
        }
    }
}
