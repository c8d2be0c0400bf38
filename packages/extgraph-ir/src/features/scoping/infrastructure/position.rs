//! Classification of identifier occurrences.
//!
//! Decides, from the surrounding syntax alone, whether an Identifier node
//! is a variable occurrence at all, and if so whether it declares, reads,
//! or writes its binding. Property names, object-literal keys, and labels
//! are names, not occurrences.

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentPosition {
    NotAnOccurrence,
    Declaration,
    Read,
    Write,
    ReadWrite,
}

pub fn identifier_position(tree: &SyntaxTree, id: NodeId) -> IdentPosition {
    debug_assert!(matches!(tree.kind(id), NodeKind::Identifier { .. }));
    let Some(parent) = tree.parent(id) else {
        return IdentPosition::NotAnOccurrence;
    };

    match tree.kind(parent) {
        NodeKind::MemberExpression {
            property, computed, ..
        } if *property == id && !computed => IdentPosition::NotAnOccurrence,
        NodeKind::MemberExpression { object, .. } if *object == id => {
            member_chain_position(tree, parent)
        }
        NodeKind::Property { key, computed, .. } if *key == id && !computed => {
            IdentPosition::NotAnOccurrence
        }
        NodeKind::MethodDefinition { key, computed, .. }
        | NodeKind::PropertyDefinition { key, computed, .. }
            if *key == id && !computed =>
        {
            IdentPosition::NotAnOccurrence
        }
        NodeKind::BreakStatement { .. }
        | NodeKind::ContinueStatement { .. } => IdentPosition::NotAnOccurrence,
        NodeKind::LabeledStatement { label, .. } if *label == id => IdentPosition::NotAnOccurrence,
        NodeKind::FunctionDeclaration { ident, .. }
        | NodeKind::FunctionExpression { ident, .. }
        | NodeKind::ClassDeclaration { ident, .. }
        | NodeKind::ClassExpression { ident, .. }
            if *ident == Some(id) =>
        {
            IdentPosition::Declaration
        }
        NodeKind::ImportSpecifier { .. } => IdentPosition::Declaration,
        NodeKind::CatchClause { param, .. } if *param == Some(id) => IdentPosition::Declaration,
        NodeKind::FunctionDeclaration { .. }
        | NodeKind::FunctionExpression { .. }
        | NodeKind::ArrowFunctionExpression { .. } => {
            // Direct child that is not the name or body: a parameter leaf.
            IdentPosition::Declaration
        }
        NodeKind::VariableDeclarator { id: target, .. } if *target == id => {
            IdentPosition::Declaration
        }
        NodeKind::AssignmentExpression {
            left, operator, ..
        } if *left == id => {
            if operator == "=" {
                IdentPosition::Write
            } else {
                IdentPosition::ReadWrite
            }
        }
        NodeKind::UpdateExpression { .. } => IdentPosition::ReadWrite,
        NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. }
            if *left == id =>
        {
            IdentPosition::Write
        }
        // Pattern interior: climb to the pattern anchor.
        NodeKind::ObjectPattern { .. } | NodeKind::ArrayPattern { .. } => {
            pattern_anchor_position(tree, parent)
        }
        NodeKind::RestElement { .. } => pattern_anchor_position(tree, parent),
        NodeKind::AssignmentPattern { left, .. } => {
            if *left == id {
                pattern_anchor_position(tree, parent)
            } else {
                IdentPosition::Read
            }
        }
        NodeKind::Property { value, .. } if *value == id => {
            // Either an object-literal value (read) or a destructuring
            // target; decided by the pattern anchor above the property.
            match tree.parent(parent).map(|gp| tree.kind(gp)) {
                Some(NodeKind::ObjectPattern { .. }) => pattern_anchor_position(tree, parent),
                _ => IdentPosition::Read,
            }
        }
        _ => IdentPosition::Read,
    }
}

/// Position of the root identifier of a member chain: writing through
/// `o.p` both reads and redefines `o`.
fn member_chain_position(tree: &SyntaxTree, mut member: NodeId) -> IdentPosition {
    while let Some(parent) = tree.parent(member) {
        match tree.kind(parent) {
            NodeKind::MemberExpression { object, .. } if *object == member => member = parent,
            NodeKind::ChainExpression { .. } => member = parent,
            NodeKind::AssignmentExpression { left, .. } if *left == member => {
                return IdentPosition::ReadWrite
            }
            NodeKind::UpdateExpression { .. } => return IdentPosition::ReadWrite,
            _ => break,
        }
    }
    IdentPosition::Read
}

/// Climb out of a destructuring pattern and classify by what anchors it.
fn pattern_anchor_position(tree: &SyntaxTree, mut node: NodeId) -> IdentPosition {
    while let Some(parent) = tree.parent(node) {
        match tree.kind(parent) {
            NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::RestElement { .. } => node = parent,
            NodeKind::Property { value, .. } if *value == node => node = parent,
            NodeKind::AssignmentPattern { left, .. } if *left == node => node = parent,
            NodeKind::VariableDeclarator { .. } => return IdentPosition::Declaration,
            NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionExpression { .. }
            | NodeKind::ArrowFunctionExpression { .. } => return IdentPosition::Declaration,
            NodeKind::CatchClause { .. } => return IdentPosition::Declaration,
            NodeKind::AssignmentExpression { .. } => return IdentPosition::Write,
            NodeKind::ForInStatement { .. } | NodeKind::ForOfStatement { .. } => {
                return IdentPosition::Write
            }
            _ => break,
        }
    }
    IdentPosition::Read
}
