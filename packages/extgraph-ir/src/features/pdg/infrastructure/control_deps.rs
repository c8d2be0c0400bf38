//! Control dependence.
//!
//! Structural form: a node is control-dependent on the chain of guarding
//! conditions between it and its function unit: `if`/ternary tests,
//! short-circuit left operands, loop tests, and switch discriminants.
//! The detector walks this chain to find sender guards in front of a
//! sink; the chain stops at the unit boundary, control dependence never
//! crosses a function.

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    IfTest,
    TernaryTest,
    /// Left operand of `&&` / `||` guarding the right.
    LogicalGuard,
    LoopTest,
    SwitchDiscriminant,
    SwitchCaseTest,
}

/// One guarding condition over a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    /// The boolean expression that decides.
    pub test: NodeId,
    /// The statement or expression owning the test.
    pub owner: NodeId,
    pub kind: GuardKind,
}

/// Guarding conditions over `node`, innermost first.
pub fn guarding_conditions(tree: &SyntaxTree, node: NodeId) -> Vec<Guard> {
    let mut guards = Vec::new();
    let mut child = node;
    for parent in tree.ancestors(node).skip(1) {
        match tree.kind(parent) {
            NodeKind::FunctionDeclaration { .. }
            | NodeKind::FunctionExpression { .. }
            | NodeKind::ArrowFunctionExpression { .. }
            | NodeKind::Program { .. } => break,
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } if child == *consequent || Some(child) == *alternate => {
                guards.push(Guard {
                    test: *test,
                    owner: parent,
                    kind: GuardKind::IfTest,
                });
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } if child == *consequent || child == *alternate => {
                guards.push(Guard {
                    test: *test,
                    owner: parent,
                    kind: GuardKind::TernaryTest,
                });
            }
            NodeKind::LogicalExpression { left, right, .. } if child == *right => {
                guards.push(Guard {
                    test: *left,
                    owner: parent,
                    kind: GuardKind::LogicalGuard,
                });
            }
            NodeKind::WhileStatement { test, body }
            | NodeKind::DoWhileStatement { test, body } => {
                if child == *body {
                    guards.push(Guard {
                        test: *test,
                        owner: parent,
                        kind: GuardKind::LoopTest,
                    });
                }
            }
            NodeKind::ForStatement {
                test: Some(test),
                body,
                ..
            } if child == *body => {
                guards.push(Guard {
                    test: *test,
                    owner: parent,
                    kind: GuardKind::LoopTest,
                });
            }
            NodeKind::SwitchCase {
                test: Some(test), ..
            } if child != *test => {
                guards.push(Guard {
                    test: *test,
                    owner: parent,
                    kind: GuardKind::SwitchCaseTest,
                });
            }
            NodeKind::SwitchStatement { discriminant, .. } if child != *discriminant => {
                guards.push(Guard {
                    test: *discriminant,
                    owner: parent,
                    kind: GuardKind::SwitchDiscriminant,
                });
            }
            _ => {}
        }
        child = parent;
    }
    guards
}

/// The statements a guard statement dominates structurally, for one
/// statement node: its guarding statement ancestors inside the unit.
pub fn control_parents(tree: &SyntaxTree, node: NodeId) -> Vec<NodeId> {
    let mut parents: Vec<NodeId> = guarding_conditions(tree, node)
        .into_iter()
        .map(|guard| guard.owner)
        .collect();
    parents.dedup();
    parents
}
