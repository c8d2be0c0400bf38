//! Call edges: call site → locally resolvable callee.
//!
//! Resolution is local and syntactic: a direct name bound to a function,
//! an immediately invoked function expression, or a method of an object
//! literal bound to a known name. Everything else stays unresolved and is
//! treated as a pass-through by the data-dependence overlay.

use rustc_hash::FxHashMap;

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::ast::infrastructure::dotted::property_name;
use crate::features::scoping::domain::{BindingKind, ScopeTree};

/// Call edges of one file, built eagerly in one pass.
#[derive(Debug, Default)]
pub struct CallGraph {
    /// Call expression → resolved callee function node.
    pub callee_of: FxHashMap<NodeId, NodeId>,
    /// Function node → call expressions resolved to it, in source order.
    pub call_sites_of: FxHashMap<NodeId, Vec<NodeId>>,
    /// Function node → its return statements, in source order.
    pub returns_of: FxHashMap<NodeId, Vec<NodeId>>,
}

impl CallGraph {
    pub fn build(tree: &SyntaxTree, scopes: &ScopeTree) -> Self {
        let mut graph = CallGraph::default();

        for id in tree.ids() {
            match tree.kind(id) {
                NodeKind::CallExpression { callee, .. } => {
                    if let Some(function) = resolve_callee(tree, scopes, *callee) {
                        graph.callee_of.insert(id, function);
                        graph.call_sites_of.entry(function).or_default().push(id);
                    }
                }
                NodeKind::ReturnStatement { .. } => {
                    if let Some(function) = tree.enclosing_function(id) {
                        graph.returns_of.entry(function).or_default().push(id);
                    }
                }
                NodeKind::ArrowFunctionExpression {
                    body, expression, ..
                } if *expression => {
                    // A bare-expression arrow returns its body.
                    graph.returns_of.entry(id).or_default().push(*body);
                }
                _ => {}
            }
        }
        graph
    }

    pub fn callee(&self, call: NodeId) -> Option<NodeId> {
        self.callee_of.get(&call).copied()
    }

    pub fn call_sites(&self, function: NodeId) -> &[NodeId] {
        self.call_sites_of
            .get(&function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn returns(&self, function: NodeId) -> &[NodeId] {
        self.returns_of
            .get(&function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Positional parameter patterns of a function node.
pub fn params_of(tree: &SyntaxTree, function: NodeId) -> Vec<NodeId> {
    match tree.kind(function) {
        NodeKind::FunctionDeclaration { params, .. }
        | NodeKind::FunctionExpression { params, .. }
        | NodeKind::ArrowFunctionExpression { params, .. } => params.clone(),
        _ => Vec::new(),
    }
}

/// Leaf identifier nodes of a parameter pattern, in source order.
pub fn pattern_leaves(tree: &SyntaxTree, pattern: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    collect_leaves(tree, pattern, &mut leaves);
    leaves
}

fn collect_leaves(tree: &SyntaxTree, pattern: NodeId, out: &mut Vec<NodeId>) {
    match tree.kind(pattern) {
        NodeKind::Identifier { .. } => out.push(pattern),
        NodeKind::ObjectPattern { properties } => {
            for &property in properties {
                match tree.kind(property) {
                    NodeKind::Property { value, .. } => collect_leaves(tree, *value, out),
                    NodeKind::RestElement { argument } => collect_leaves(tree, *argument, out),
                    _ => {}
                }
            }
        }
        NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                collect_leaves(tree, *element, out);
            }
        }
        NodeKind::RestElement { argument } => collect_leaves(tree, *argument, out),
        NodeKind::AssignmentPattern { left, .. } => collect_leaves(tree, *left, out),
        _ => {}
    }
}

fn resolve_callee(tree: &SyntaxTree, scopes: &ScopeTree, callee: NodeId) -> Option<NodeId> {
    match tree.kind(callee) {
        // Immediately invoked function expression.
        NodeKind::FunctionExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => {
            Some(callee)
        }
        NodeKind::ChainExpression { expression } => resolve_callee(tree, scopes, *expression),
        NodeKind::Identifier { .. } => {
            let binding_id = scopes.resolution(callee)?;
            function_of_binding(tree, scopes, binding_id)
        }
        // Method on a known object literal: `handlers.save()`.
        NodeKind::MemberExpression {
            object,
            property,
            computed: _,
        } => {
            let method = property_name(tree, *property)?;
            let binding_id = match tree.kind(*object) {
                NodeKind::Identifier { .. } => scopes.resolution(*object)?,
                _ => return None,
            };
            let binding = scopes.binding(binding_id);
            let object_literal = declarator_init(tree, binding.declaration)?;
            if let NodeKind::ObjectExpression { properties } = tree.kind(object_literal) {
                for &prop in properties {
                    if let NodeKind::Property { key, value, .. } = tree.kind(prop) {
                        if property_name(tree, *key).as_deref() == Some(method.as_str())
                            && tree.kind(*value).is_function()
                        {
                            return Some(*value);
                        }
                    }
                }
            }
            None
        }
        _ => None,
    }
}

/// The function a binding names: a function declaration's own node, a
/// function-expression self-name, or a `const f = () => {}` initializer.
pub fn function_of_binding(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    binding_id: crate::features::scoping::domain::BindingId,
) -> Option<NodeId> {
    let binding = scopes.binding(binding_id);
    match binding.kind {
        BindingKind::Function | BindingKind::FunctionExpressionName => {
            tree.parent(binding.declaration)
        }
        BindingKind::Var | BindingKind::Let | BindingKind::Const => {
            let init = declarator_init(tree, binding.declaration)?;
            tree.kind(init).is_function().then_some(init)
        }
        _ => None,
    }
}

/// The initializer behind a plain `let x = <init>` declaration leaf.
fn declarator_init(tree: &SyntaxTree, declaration: NodeId) -> Option<NodeId> {
    let parent = tree.parent(declaration)?;
    match tree.kind(parent) {
        NodeKind::VariableDeclarator { id, init } if *id == declaration => *init,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::infrastructure::ingest::ingest_document;
    use crate::features::ast::test_support::estree;
    use crate::features::scoping::infrastructure::resolver::resolve_scopes;

    fn build(doc: serde_json::Value) -> (SyntaxTree, ScopeTree, CallGraph) {
        let tree = ingest_document("t.js", &doc).unwrap();
        let scopes = resolve_scopes(&tree).unwrap();
        let calls = CallGraph::build(&tree, &scopes);
        (tree, scopes, calls)
    }

    fn first_call(tree: &SyntaxTree) -> NodeId {
        tree.ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::CallExpression { .. }))
            .unwrap()
    }

    #[test]
    fn direct_name_resolves_to_the_function_declaration() {
        let (tree, _, calls) = build(estree::program(vec![
            estree::function_decl("greet", vec![estree::ident("who")], vec![]),
            estree::expr_stmt(estree::call(
                estree::ident("greet"),
                vec![estree::literal_str("hi")],
            )),
        ]));
        let call = tree
            .ids()
            .filter(|&id| matches!(tree.kind(id), NodeKind::CallExpression { .. }))
            .last()
            .unwrap();
        let function = calls.callee(call).unwrap();
        assert!(tree.kind(function).is_function());
        assert_eq!(calls.call_sites(function), &[call]);
    }

    #[test]
    fn iife_resolves_to_itself() {
        let (tree, _, calls) = build(estree::program(vec![estree::expr_stmt(estree::call(
            estree::function_expr(None, vec![], vec![]),
            vec![],
        ))]));
        let call = first_call(&tree);
        let callee = calls.callee(call).unwrap();
        assert!(matches!(
            tree.kind(callee),
            NodeKind::FunctionExpression { .. }
        ));
    }

    #[test]
    fn const_arrow_binding_resolves() {
        let (tree, _, calls) = build(estree::program(vec![
            estree::const_decl(
                "double",
                estree::arrow_expr(
                    vec![estree::ident("n")],
                    estree::binary("*", estree::ident("n"), estree::literal_num(2.0)),
                ),
            ),
            estree::expr_stmt(estree::call(
                estree::ident("double"),
                vec![estree::literal_num(3.0)],
            )),
        ]));
        let call = tree
            .ids()
            .filter(|&id| matches!(tree.kind(id), NodeKind::CallExpression { .. }))
            .last()
            .unwrap();
        let callee = calls.callee(call).unwrap();
        assert!(matches!(
            tree.kind(callee),
            NodeKind::ArrowFunctionExpression { .. }
        ));
        // The bare-expression arrow registers its body as a return.
        assert_eq!(calls.returns(callee).len(), 1);
    }

    #[test]
    fn method_on_object_literal_resolves() {
        let (tree, _, calls) = build(estree::program(vec![
            estree::const_decl(
                "handlers",
                estree::object(vec![estree::property(
                    "save",
                    estree::function_expr(None, vec![estree::ident("data")], vec![]),
                )]),
            ),
            estree::expr_stmt(estree::call(
                estree::member(estree::ident("handlers"), "save"),
                vec![estree::ident("payload")],
            )),
        ]));
        let call = tree
            .ids()
            .filter(|&id| matches!(tree.kind(id), NodeKind::CallExpression { .. }))
            .last()
            .unwrap();
        assert!(calls.callee(call).is_some());
    }

    #[test]
    fn unknown_callees_stay_unresolved() {
        let (tree, _, calls) = build(estree::program(vec![estree::expr_stmt(estree::call(
            estree::member(estree::ident("chrome"), "whatever"),
            vec![],
        ))]));
        let call = first_call(&tree);
        assert!(calls.callee(call).is_none());
    }
}
