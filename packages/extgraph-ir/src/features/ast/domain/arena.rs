//! Per-file node arena.
//!
//! Nodes are stored flat and addressed by `NodeId`; the tree shape lives in
//! the kind fields. Ids are assigned in document order during ingest, which
//! makes them a stable tie-break for every deterministic ordering the
//! analysis promises.

use super::node::{Node, NodeId, NodeKind};
use crate::shared::models::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Path of the analyzed file, as given by the caller.
    pub file: String,
    pub root: NodeId,
    nodes: Vec<Node>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(file: String, root: NodeId, nodes: Vec<Node>) -> Self {
        Self { file, root, nodes }
    }

    pub(crate) fn set_span(
        &mut self,
        id: NodeId,
        span: Span,
        range: crate::shared::models::ByteRange,
    ) {
        let node = &mut self.nodes[id.index()];
        node.span = span;
        node.range = range;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Direct children in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        children_of(&self.node(id).kind)
    }

    /// `id` and every ancestor up to the program root.
    pub fn ancestors(&self, id: NodeId) -> AncestorIter<'_> {
        AncestorIter {
            tree: self,
            next: Some(id),
        }
    }

    /// Nearest enclosing function node, if the node sits inside one.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .skip(1)
            .find(|&a| self.kind(a).is_function())
    }

    /// Nearest ancestor (or `id` itself) that is a statement; falls back to
    /// the root for top-level expressions of malformed trees.
    pub fn enclosing_statement(&self, id: NodeId) -> NodeId {
        self.ancestors(id)
            .find(|&a| self.kind(a).is_statement())
            .unwrap_or(self.root)
    }

    /// Depth-first pre-order walk of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.children(current);
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }
}

pub struct AncestorIter<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for AncestorIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Source-order children of a node kind.
pub fn children_of(kind: &NodeKind) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut push = |id: NodeId| out.push(id);
    match kind {
        NodeKind::Program { body } | NodeKind::BlockStatement { body } => {
            body.iter().copied().for_each(push)
        }
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
        } => {
            ident.iter().copied().for_each(&mut push);
            params.iter().copied().for_each(&mut push);
            push(*body);
        }
        NodeKind::ArrowFunctionExpression { params, body, .. } => {
            params.iter().copied().for_each(&mut push);
            push(*body);
        }
        NodeKind::VariableDeclaration { declarations, .. } => {
            declarations.iter().copied().for_each(push)
        }
        NodeKind::VariableDeclarator { id, init } => {
            push(*id);
            init.iter().copied().for_each(push);
        }
        NodeKind::Identifier { .. }
        | NodeKind::PrivateIdentifier { .. }
        | NodeKind::Literal { .. }
        | NodeKind::TemplateElement { .. }
        | NodeKind::EmptyStatement
        | NodeKind::DebuggerStatement
        | NodeKind::ThisExpression
        | NodeKind::Super => {}
        NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } => {
            // Interleave by construction order: quasi, expr, quasi, ...
            let mut qs = quasis.iter().copied();
            let mut es = expressions.iter().copied();
            loop {
                match (qs.next(), es.next()) {
                    (Some(q), Some(e)) => {
                        push(q);
                        push(e);
                    }
                    (Some(q), None) => push(q),
                    (None, Some(e)) => push(e),
                    (None, None) => break,
                }
            }
        }
        NodeKind::TaggedTemplateExpression { tag, quasi } => {
            push(*tag);
            push(*quasi);
        }
        NodeKind::MemberExpression {
            object, property, ..
        } => {
            push(*object);
            push(*property);
        }
        NodeKind::CallExpression { callee, arguments }
        | NodeKind::NewExpression { callee, arguments } => {
            push(*callee);
            arguments.iter().copied().for_each(push);
        }
        NodeKind::AssignmentExpression { left, right, .. }
        | NodeKind::BinaryExpression { left, right, .. }
        | NodeKind::LogicalExpression { left, right, .. }
        | NodeKind::AssignmentPattern { left, right } => {
            push(*left);
            push(*right);
        }
        NodeKind::UpdateExpression { argument, .. }
        | NodeKind::UnaryExpression { argument, .. }
        | NodeKind::SpreadElement { argument }
        | NodeKind::RestElement { argument }
        | NodeKind::ThrowStatement { argument }
        | NodeKind::AwaitExpression { argument } => push(*argument),
        NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            push(*test);
            push(*consequent);
            push(*alternate);
        }
        NodeKind::SequenceExpression { expressions } => {
            expressions.iter().copied().for_each(push)
        }
        NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } => {
            push(*test);
            push(*consequent);
            alternate.iter().copied().for_each(push);
        }
        NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } => {
            init.iter().copied().for_each(&mut push);
            test.iter().copied().for_each(&mut push);
            update.iter().copied().for_each(&mut push);
            push(*body);
        }
        NodeKind::ForInStatement { left, right, body }
        | NodeKind::ForOfStatement { left, right, body } => {
            push(*left);
            push(*right);
            push(*body);
        }
        NodeKind::WhileStatement { test, body } => {
            push(*test);
            push(*body);
        }
        NodeKind::DoWhileStatement { body, test } => {
            push(*body);
            push(*test);
        }
        NodeKind::SwitchStatement {
            discriminant,
            cases,
        } => {
            push(*discriminant);
            cases.iter().copied().for_each(push);
        }
        NodeKind::SwitchCase { test, consequent } => {
            test.iter().copied().for_each(&mut push);
            consequent.iter().copied().for_each(push);
        }
        NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => {
            label.iter().copied().for_each(push)
        }
        NodeKind::LabeledStatement { label, body } => {
            push(*label);
            push(*body);
        }
        NodeKind::ReturnStatement { argument } => argument.iter().copied().for_each(push),
        NodeKind::TryStatement {
            block,
            handler,
            finalizer,
        } => {
            push(*block);
            handler.iter().copied().for_each(&mut push);
            finalizer.iter().copied().for_each(push);
        }
        NodeKind::CatchClause { param, body } => {
            param.iter().copied().for_each(&mut push);
            push(*body);
        }
        NodeKind::ExpressionStatement { expression } | NodeKind::ChainExpression { expression } => {
            push(*expression)
        }
        NodeKind::WithStatement { object, body } => {
            push(*object);
            push(*body);
        }
        NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
            properties.iter().copied().for_each(push)
        }
        NodeKind::Property { key, value, .. } => {
            push(*key);
            push(*value);
        }
        NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
            elements.iter().flatten().copied().for_each(push)
        }
        NodeKind::ClassDeclaration {
            ident,
            super_class,
            body,
        }
        | NodeKind::ClassExpression {
            ident,
            super_class,
            body,
        } => {
            ident.iter().copied().for_each(&mut push);
            super_class.iter().copied().for_each(&mut push);
            push(*body);
        }
        NodeKind::ClassBody { body } => body.iter().copied().for_each(push),
        NodeKind::MethodDefinition { key, value, .. } => {
            push(*key);
            push(*value);
        }
        NodeKind::PropertyDefinition { key, value, .. } => {
            push(*key);
            value.iter().copied().for_each(push);
        }
        NodeKind::YieldExpression { argument, .. } => argument.iter().copied().for_each(push),
        NodeKind::ImportDeclaration {
            specifiers,
            source,
        } => {
            specifiers.iter().copied().for_each(&mut push);
            push(*source);
        }
        NodeKind::ImportSpecifier { local } => push(*local),
        NodeKind::ExportNamedDeclaration { declaration } => {
            declaration.iter().copied().for_each(push)
        }
        NodeKind::ExportDefaultDeclaration { declaration } => push(*declaration),
        NodeKind::Unknown { children, .. } => children.iter().copied().for_each(push),
    }
    out
}
