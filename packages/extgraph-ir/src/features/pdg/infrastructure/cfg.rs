//! Intra-procedural control flow.
//!
//! One graph per function unit (the program root and every function
//! node). CFG nodes are statement nodes plus synthetic entry/exit; blocks
//! are transparent. Loops produce back-edges, `try` routes every enclosed
//! statement into its catch handler, and `break`/`continue` resolve
//! against an explicit target stack.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rustc_hash::FxHashMap;

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgNode {
    Entry,
    Exit,
    Statement(NodeId),
}

/// A CFG predecessor: either a statement or the unit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgPoint {
    Entry,
    Exit,
    Statement(NodeId),
}

#[derive(Debug)]
pub struct UnitCfg {
    /// The program root or function node this graph belongs to.
    pub unit: NodeId,
    graph: DiGraph<CfgNode, ()>,
    entry: NodeIndex,
    exit: NodeIndex,
    index_of: FxHashMap<NodeId, NodeIndex>,
}

impl UnitCfg {
    pub fn contains(&self, statement: NodeId) -> bool {
        self.index_of.contains_key(&statement)
    }

    pub fn statement_count(&self) -> usize {
        self.index_of.len()
    }

    pub fn predecessors(&self, statement: NodeId) -> Vec<CfgPoint> {
        self.neighbors(statement, Direction::Incoming)
    }

    pub fn successors(&self, statement: NodeId) -> Vec<CfgPoint> {
        self.neighbors(statement, Direction::Outgoing)
    }

    /// Successors of the synthetic entry node.
    pub fn entry_successors(&self) -> Vec<CfgPoint> {
        self.points(self.graph.neighbors_directed(self.entry, Direction::Outgoing))
    }

    fn neighbors(&self, statement: NodeId, direction: Direction) -> Vec<CfgPoint> {
        match self.index_of.get(&statement) {
            Some(&index) => self.points(self.graph.neighbors_directed(index, direction)),
            None => Vec::new(),
        }
    }

    fn points(&self, neighbors: petgraph::graph::Neighbors<'_, ()>) -> Vec<CfgPoint> {
        let mut out: Vec<CfgPoint> = neighbors
            .map(|index| match self.graph[index] {
                CfgNode::Entry => CfgPoint::Entry,
                CfgNode::Exit => CfgPoint::Exit,
                CfgNode::Statement(ast) => CfgPoint::Statement(ast),
            })
            .collect();
        // petgraph yields reverse insertion order; pin down source order.
        out.sort_by_key(|point| match point {
            CfgPoint::Entry => (0, 0),
            CfgPoint::Statement(ast) => (1, ast.0),
            CfgPoint::Exit => (2, 0),
        });
        out.dedup();
        out
    }
}

/// All unit graphs of one file.
#[derive(Debug)]
pub struct ControlFlow {
    units: FxHashMap<NodeId, UnitCfg>,
}

impl ControlFlow {
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut units = FxHashMap::default();
        units.insert(tree.root, build_unit(tree, tree.root));
        for id in tree.ids() {
            if tree.kind(id).is_function() {
                units.insert(id, build_unit(tree, id));
            }
        }
        Self { units }
    }

    pub fn unit(&self, unit: NodeId) -> Option<&UnitCfg> {
        self.units.get(&unit)
    }

    /// The unit a node belongs to: nearest enclosing function, else root.
    pub fn unit_of(tree: &SyntaxTree, node: NodeId) -> NodeId {
        tree.enclosing_function(node).unwrap_or(tree.root)
    }

    /// The CFG statement carrying `node` inside its unit: the nearest
    /// ancestor with a node of its own.
    pub fn statement_of(&self, tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
        let unit = Self::unit_of(tree, node);
        let cfg = self.unit(unit)?;
        tree.ancestors(node).find(|&a| cfg.contains(a))
    }
}

fn build_unit(tree: &SyntaxTree, unit: NodeId) -> UnitCfg {
    let mut graph = DiGraph::new();
    let entry = graph.add_node(CfgNode::Entry);
    let exit = graph.add_node(CfgNode::Exit);
    let mut builder = Builder {
        tree,
        graph,
        exit,
        index_of: FxHashMap::default(),
        break_stack: Vec::new(),
        continue_stack: Vec::new(),
        catch_stack: Vec::new(),
    };

    let body: Vec<NodeId> = match tree.kind(unit) {
        NodeKind::Program { body } => body.clone(),
        NodeKind::FunctionDeclaration { body, .. }
        | NodeKind::FunctionExpression { body, .. }
        | NodeKind::ArrowFunctionExpression { body, .. } => match tree.kind(*body) {
            NodeKind::BlockStatement { body } => body.clone(),
            // Bare-expression arrow: the body is the unit's one statement.
            _ => vec![*body],
        },
        _ => Vec::new(),
    };

    let head = builder.seq(&body, exit);
    builder.graph.add_edge(entry, head, ());

    UnitCfg {
        unit,
        graph: builder.graph,
        entry,
        exit,
        index_of: builder.index_of,
    }
}

struct Builder<'t> {
    tree: &'t SyntaxTree,
    graph: DiGraph<CfgNode, ()>,
    exit: NodeIndex,
    index_of: FxHashMap<NodeId, NodeIndex>,
    /// `(label, jump target)`; unlabeled entries carry `None`.
    break_stack: Vec<(Option<String>, NodeIndex)>,
    continue_stack: Vec<(Option<String>, NodeIndex)>,
    catch_stack: Vec<NodeIndex>,
}

impl Builder<'_> {
    /// Chain `statements`, returning the head; an empty list is `next`.
    fn seq(&mut self, statements: &[NodeId], next: NodeIndex) -> NodeIndex {
        let mut follow = next;
        for &statement in statements.iter().rev() {
            follow = self.statement(statement, follow);
        }
        follow
    }

    /// Node creation; statements inside a `try` may raise into the
    /// innermost handler.
    fn node(&mut self, ast: NodeId) -> NodeIndex {
        if let Some(&existing) = self.index_of.get(&ast) {
            return existing;
        }
        let index = self.graph.add_node(CfgNode::Statement(ast));
        self.index_of.insert(ast, index);
        if let Some(&handler) = self.catch_stack.last() {
            self.graph.add_edge(index, handler, ());
        }
        index
    }

    fn statement(&mut self, statement: NodeId, next: NodeIndex) -> NodeIndex {
        match self.tree.kind(statement).clone() {
            NodeKind::BlockStatement { body } => self.seq(&body, next),
            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                let node = self.node(statement);
                let then_head = self.statement(consequent, next);
                self.graph.add_edge(node, then_head, ());
                match alternate {
                    Some(alternate) => {
                        let else_head = self.statement(alternate, next);
                        self.graph.add_edge(node, else_head, ());
                    }
                    None => {
                        self.graph.add_edge(node, next, ());
                    }
                }
                node
            }
            NodeKind::WhileStatement { body, .. }
            | NodeKind::ForStatement { body, .. }
            | NodeKind::ForInStatement { body, .. }
            | NodeKind::ForOfStatement { body, .. } => {
                let node = self.node(statement);
                self.break_stack.push((None, next));
                self.continue_stack.push((None, node));
                let body_head = self.statement(body, node);
                self.continue_stack.pop();
                self.break_stack.pop();
                self.graph.add_edge(node, body_head, ());
                self.graph.add_edge(node, next, ());
                node
            }
            NodeKind::DoWhileStatement { body, .. } => {
                let node = self.node(statement);
                self.break_stack.push((None, next));
                self.continue_stack.push((None, node));
                let body_head = self.statement(body, node);
                self.continue_stack.pop();
                self.break_stack.pop();
                // Test true loops back into the body; false exits.
                self.graph.add_edge(node, body_head, ());
                self.graph.add_edge(node, next, ());
                body_head
            }
            NodeKind::SwitchStatement { cases, .. } => {
                let node = self.node(statement);
                self.break_stack.push((None, next));
                let mut follow = next;
                let mut has_default = false;
                for &case in cases.iter().rev() {
                    if let NodeKind::SwitchCase { test, consequent } = self.tree.kind(case).clone()
                    {
                        has_default |= test.is_none();
                        let body_head = self.seq(&consequent, follow);
                        let case_node = self.node(case);
                        self.graph.add_edge(case_node, body_head, ());
                        self.graph.add_edge(node, case_node, ());
                        // Fallthrough target for the previous case's body.
                        follow = body_head;
                    }
                }
                if !has_default {
                    self.graph.add_edge(node, next, ());
                }
                self.break_stack.pop();
                node
            }
            NodeKind::BreakStatement { label } => {
                let node = self.node(statement);
                let name = self.label_name(label);
                let target = self.jump_target(&name, &self.break_stack);
                self.graph.add_edge(node, target, ());
                node
            }
            NodeKind::ContinueStatement { label } => {
                let node = self.node(statement);
                let name = self.label_name(label);
                let target = self.jump_target(&name, &self.continue_stack);
                self.graph.add_edge(node, target, ());
                node
            }
            NodeKind::LabeledStatement { label, body } => {
                let name = self.tree.node(label).identifier_name().map(str::to_owned);
                self.break_stack.push((name, next));
                let head = self.statement(body, next);
                self.break_stack.pop();
                head
            }
            NodeKind::ReturnStatement { .. } => {
                let node = self.node(statement);
                self.graph.add_edge(node, self.exit, ());
                node
            }
            NodeKind::ThrowStatement { .. } => {
                let node = self.node(statement);
                let target = self.catch_stack.last().copied().unwrap_or(self.exit);
                self.graph.add_edge(node, target, ());
                node
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let after = match finalizer {
                    Some(finalizer) => self.statement(finalizer, next),
                    None => next,
                };
                let handler_head = handler.and_then(|clause| {
                    if let NodeKind::CatchClause { body, .. } = self.tree.kind(clause).clone() {
                        let clause_node = self.node(clause);
                        let body_head = self.statement(body, after);
                        self.graph.add_edge(clause_node, body_head, ());
                        Some(clause_node)
                    } else {
                        None
                    }
                });
                if let Some(handler_head) = handler_head {
                    self.catch_stack.push(handler_head);
                }
                let try_head = self.statement(block, after);
                if handler_head.is_some() {
                    self.catch_stack.pop();
                }
                try_head
            }
            NodeKind::WithStatement { body, .. } => {
                let node = self.node(statement);
                let body_head = self.statement(body, next);
                self.graph.add_edge(node, body_head, ());
                node
            }
            // Plain statements, declarations, and anything unknown fall
            // straight through.
            _ => {
                let node = self.node(statement);
                self.graph.add_edge(node, next, ());
                node
            }
        }
    }

    fn label_name(&self, label: Option<NodeId>) -> Option<String> {
        label.and_then(|l| self.tree.node(l).identifier_name().map(str::to_owned))
    }

    fn jump_target(
        &self,
        label: &Option<String>,
        stack: &[(Option<String>, NodeIndex)],
    ) -> NodeIndex {
        match label {
            Some(name) => stack
                .iter()
                .rev()
                .find(|(entry, _)| entry.as_deref() == Some(name))
                .map(|(_, target)| *target),
            None => stack.last().map(|(_, target)| *target),
        }
        .unwrap_or(self.exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::infrastructure::ingest::ingest_document;
    use crate::features::ast::test_support::estree;
    use serde_json::json;

    fn stmt_ids(tree: &SyntaxTree, cfg: &UnitCfg) -> Vec<NodeId> {
        tree.ids().filter(|&id| cfg.contains(id)).collect()
    }

    #[test]
    fn straight_line_statements_chain() {
        let tree = ingest_document(
            "t.js",
            &estree::program(vec![
                estree::let_decl("a", estree::literal_num(1.0)),
                estree::let_decl("b", estree::ident("a")),
            ]),
        )
        .unwrap();
        let cfg = ControlFlow::build(&tree);
        let unit = cfg.unit(tree.root).unwrap();
        let statements = stmt_ids(&tree, unit);
        assert_eq!(statements.len(), 2);
        assert_eq!(
            unit.predecessors(statements[1]),
            vec![CfgPoint::Statement(statements[0])]
        );
        assert_eq!(unit.predecessors(statements[0]), vec![CfgPoint::Entry]);
        assert_eq!(unit.successors(statements[1]), vec![CfgPoint::Exit]);
    }

    #[test]
    fn if_statement_forks_and_joins() {
        // if (c) { a = 1; } else { a = 2; } done();
        let tree = ingest_document(
            "t.js",
            &estree::program(vec![
                estree::if_stmt(
                    estree::ident("c"),
                    estree::block(vec![estree::expr_stmt(estree::assign(
                        estree::ident("a"),
                        estree::literal_num(1.0),
                    ))]),
                    Some(estree::block(vec![estree::expr_stmt(estree::assign(
                        estree::ident("a"),
                        estree::literal_num(2.0),
                    ))])),
                ),
                estree::expr_stmt(estree::call(estree::ident("done"), vec![])),
            ]),
        )
        .unwrap();
        let cfg = ControlFlow::build(&tree);
        let unit = cfg.unit(tree.root).unwrap();
        let if_node = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::IfStatement { .. }))
            .unwrap();
        let succs = unit.successors(if_node);
        assert_eq!(succs.len(), 2);
        let done = tree
            .ids()
            .filter(|&id| matches!(tree.kind(id), NodeKind::ExpressionStatement { .. }))
            .last()
            .unwrap();
        // Both branch tails join at the statement after the if.
        assert_eq!(unit.predecessors(done).len(), 2);
    }

    #[test]
    fn while_loop_has_a_back_edge() {
        // while (c) { step(); } after();
        let tree = ingest_document(
            "t.js",
            &estree::program(vec![
                json!({
                    "type": "WhileStatement",
                    "test": estree::ident("c"),
                    "body": estree::block(vec![estree::expr_stmt(estree::call(
                        estree::ident("step"),
                        vec![],
                    ))]),
                }),
                estree::expr_stmt(estree::call(estree::ident("after"), vec![])),
            ]),
        )
        .unwrap();
        let cfg = ControlFlow::build(&tree);
        let unit = cfg.unit(tree.root).unwrap();
        let while_node = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::WhileStatement { .. }))
            .unwrap();
        let step = tree
            .ids()
            .find(|&id| {
                matches!(tree.kind(id), NodeKind::ExpressionStatement { .. })
                    && tree.is_ancestor(while_node, id)
            })
            .unwrap();
        // Body loops back into the test; the test also exits.
        assert!(unit
            .successors(step)
            .contains(&CfgPoint::Statement(while_node)));
        assert!(unit.predecessors(while_node).contains(&CfgPoint::Entry));
        assert_eq!(unit.successors(while_node).len(), 2);
    }

    #[test]
    fn try_statements_route_into_the_handler() {
        // try { risky(); } catch (e) { recover(); }
        let tree = ingest_document(
            "t.js",
            &estree::program(vec![json!({
                "type": "TryStatement",
                "block": estree::block(vec![estree::expr_stmt(estree::call(
                    estree::ident("risky"),
                    vec![],
                ))]),
                "handler": {
                    "type": "CatchClause",
                    "param": estree::ident("e"),
                    "body": estree::block(vec![estree::expr_stmt(estree::call(
                        estree::ident("recover"),
                        vec![],
                    ))]),
                },
                "finalizer": null,
            })]),
        )
        .unwrap();
        let cfg = ControlFlow::build(&tree);
        let unit = cfg.unit(tree.root).unwrap();
        let risky_stmt = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::ExpressionStatement { .. }))
            .unwrap();
        let clause = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::CatchClause { .. }))
            .unwrap();
        assert!(unit
            .successors(risky_stmt)
            .contains(&CfgPoint::Statement(clause)));
    }

    #[test]
    fn each_function_gets_its_own_unit() {
        let tree = ingest_document(
            "t.js",
            &estree::program(vec![estree::function_decl(
                "f",
                vec![],
                vec![estree::ret(Some(estree::literal_num(1.0)))],
            )]),
        )
        .unwrap();
        let cfg = ControlFlow::build(&tree);
        let function = tree
            .ids()
            .find(|&id| tree.kind(id).is_function())
            .unwrap();
        let unit = cfg.unit(function).unwrap();
        let ret = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::ReturnStatement { .. }))
            .unwrap();
        assert!(unit.contains(ret));
        assert_eq!(unit.successors(ret), vec![CfgPoint::Exit]);
        // The return does not appear in the root unit.
        assert!(!cfg.unit(tree.root).unwrap().contains(ret));
    }
}
