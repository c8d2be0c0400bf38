//! Lazy data-dependence overlay.
//!
//! Direct def-use edges are computed per queried occurrence and memoized:
//! a use's parents are its reaching definitions (backward CFG walk, first
//! definition per path), a definition's parents are the value sources of
//! its right-hand side, and the symmetric children queries run forward.
//! Call edges extend both directions across function boundaries:
//! argument → parameter, return argument → call-site consumers, and
//! unknown callees pass arguments through to the call result.
//!
//! Ordering is deterministic everywhere: results are sorted by source
//! position with node-id tie-breaks.

use std::cell::{Cell, RefCell};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::scoping::domain::{BindingId, BindingKind, ScopeTree};

use super::calls::{params_of, pattern_leaves, CallGraph};
use super::cfg::{CfgPoint, ControlFlow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Forward,
}

/// Lazy, memoized direct-edge provider over one file's PDG.
pub struct DataDeps<'a> {
    tree: &'a SyntaxTree,
    scopes: &'a ScopeTree,
    cfg: &'a ControlFlow,
    calls: &'a CallGraph,
    memo: RefCell<FxHashMap<(NodeId, Direction), Vec<NodeId>>>,
    in_progress: RefCell<FxHashSet<(NodeId, Direction)>>,
    /// Occurrences per binding, in source order.
    by_binding: FxHashMap<BindingId, Vec<NodeId>>,
    edge_budget: Cell<usize>,
    truncated: Cell<bool>,
}

impl<'a> DataDeps<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        scopes: &'a ScopeTree,
        cfg: &'a ControlFlow,
        calls: &'a CallGraph,
        max_edges: usize,
    ) -> Self {
        let mut by_binding: FxHashMap<BindingId, Vec<NodeId>> = FxHashMap::default();
        for (&occurrence, &binding) in &scopes.resolutions {
            by_binding.entry(binding).or_default().push(occurrence);
        }
        for occurrences in by_binding.values_mut() {
            occurrences.sort_by_key(|&occ| (tree.span(occ).start, occ));
        }
        Self {
            tree,
            scopes,
            cfg,
            calls,
            memo: RefCell::new(FxHashMap::default()),
            in_progress: RefCell::new(FxHashSet::default()),
            by_binding,
            edge_budget: Cell::new(max_edges),
            truncated: Cell::new(false),
        }
    }

    /// Whether any query ran into the edge budget.
    pub fn truncated(&self) -> bool {
        self.truncated.get()
    }

    /// Direct data-dependence parents of an occurrence.
    pub fn parents_of(&self, occurrence: NodeId) -> Vec<NodeId> {
        self.query(occurrence, Direction::Backward)
    }

    /// Direct data-dependence children of an occurrence.
    pub fn children_of(&self, occurrence: NodeId) -> Vec<NodeId> {
        self.query(occurrence, Direction::Forward)
    }

    /// Definition occurrences consuming the value of an arbitrary
    /// expression node. Seeds flows at API call results, which are not
    /// identifier occurrences themselves.
    pub fn consumers_of_expression(&self, expr: NodeId) -> Vec<NodeId> {
        let mut visited_functions = FxHashSet::default();
        let mut out = Vec::new();
        self.climb(expr, &mut visited_functions, &mut out);
        self.order(&mut out);
        out
    }

    fn query(&self, occurrence: NodeId, direction: Direction) -> Vec<NodeId> {
        let key = (occurrence, direction);
        if let Some(cached) = self.memo.borrow().get(&key) {
            return cached.clone();
        }
        if !self.in_progress.borrow_mut().insert(key) {
            return Vec::new();
        }
        let roles = self.scopes.roles_of(occurrence);
        let mut result = Vec::new();
        match direction {
            Direction::Backward => {
                if roles.is_read() {
                    result.extend(self.reaching_defs(occurrence));
                }
                if roles.defines() {
                    result.extend(self.value_sources_of_def(occurrence));
                }
            }
            Direction::Forward => {
                if roles.defines() {
                    result.extend(self.reached_uses(occurrence));
                }
                if roles.is_read() {
                    result.extend(self.value_destinations(occurrence));
                }
            }
        }
        self.order(&mut result);
        self.spend_edges(result.len());
        self.in_progress.borrow_mut().remove(&key);
        self.memo.borrow_mut().insert(key, result.clone());
        result
    }

    fn order(&self, occurrences: &mut Vec<NodeId>) {
        occurrences.sort_by_key(|&occ| (self.tree.span(occ).start, occ));
        occurrences.dedup();
    }

    fn spend_edges(&self, count: usize) {
        let budget = self.edge_budget.get();
        if count >= budget {
            self.edge_budget.set(0);
            self.truncated.set(true);
        } else {
            self.edge_budget.set(budget - count);
        }
    }

    fn binding_of(&self, occurrence: NodeId) -> Option<BindingId> {
        self.scopes.resolution(occurrence)
    }

    /// All defining occurrences of a binding, in source order.
    fn all_defs(&self, binding: BindingId) -> Vec<NodeId> {
        self.by_binding
            .get(&binding)
            .map(|occurrences| {
                occurrences
                    .iter()
                    .copied()
                    .filter(|&occ| self.scopes.roles_of(occ).defines())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_uses(&self, binding: BindingId) -> Vec<NodeId> {
        self.by_binding
            .get(&binding)
            .map(|occurrences| {
                occurrences
                    .iter()
                    .copied()
                    .filter(|&occ| self.scopes.roles_of(occ).is_read())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Reaching definitions (use → defs, backward over the CFG)
    // ------------------------------------------------------------------

    fn reaching_defs(&self, use_occ: NodeId) -> Vec<NodeId> {
        let Some(binding_id) = self.binding_of(use_occ) else {
            return Vec::new();
        };
        let binding = self.scopes.binding(binding_id);
        let unit = ControlFlow::unit_of(self.tree, use_occ);

        let binding_unit = if binding.kind == BindingKind::ImplicitGlobal {
            self.tree.root
        } else {
            ControlFlow::unit_of(self.tree, binding.declaration)
        };
        if binding_unit != unit {
            // Closure read of an outer binding: the closure's call timing
            // is unknown, so every definition in the owning unit reaches.
            let defs = self.all_defs(binding_id);
            if !defs.is_empty() {
                return defs;
            }
            return self.declaration_def(binding_id);
        }

        let Some(statement) = self.cfg.statement_of(self.tree, use_occ) else {
            return self.all_defs(binding_id);
        };
        let Some(cfg) = self.cfg.unit(unit) else {
            return self.all_defs(binding_id);
        };

        // A definition earlier in the same statement wins outright.
        let use_start = self.tree.span(use_occ).start;
        let same_statement = self
            .defs_in_statement(statement, binding_id, unit)
            .into_iter()
            .filter(|&def| def != use_occ && self.effective_def_end(def) <= use_start)
            .max_by_key(|&def| (self.effective_def_end(def), def));
        if let Some(def) = same_statement {
            return vec![def];
        }

        let mut result = Vec::new();
        let mut visited = FxHashSet::default();
        visited.insert(statement);
        let mut queue: Vec<CfgPoint> = cfg.predecessors(statement);
        let mut reached_entry = false;
        while let Some(point) = queue.pop() {
            match point {
                CfgPoint::Entry => reached_entry = true,
                CfgPoint::Exit => {}
                CfgPoint::Statement(pred) => {
                    if !visited.insert(pred) {
                        continue;
                    }
                    let defs = self.defs_in_statement(pred, binding_id, unit);
                    match defs
                        .into_iter()
                        .filter(|&def| def != use_occ)
                        .max_by_key(|&def| (self.effective_def_end(def), def))
                    {
                        // First definition on this path; stop here.
                        Some(def) => result.push(def),
                        None => queue.extend(cfg.predecessors(pred)),
                    }
                }
            }
        }
        if (reached_entry || result.is_empty()) && binding_unit == unit {
            // Hoisted names, parameters, and catch bindings define at the
            // unit entry.
            result.extend(self.declaration_def(binding_id));
        }
        result
    }

    /// The declaration occurrence of a binding, when it is a real
    /// identifier (implicit globals point at the program root).
    fn declaration_def(&self, binding_id: BindingId) -> Vec<NodeId> {
        let binding = self.scopes.binding(binding_id);
        if matches!(
            self.tree.kind(binding.declaration),
            NodeKind::Identifier { .. }
        ) {
            vec![binding.declaration]
        } else {
            Vec::new()
        }
    }

    /// Defining occurrences of `binding` inside one CFG statement,
    /// excluding nested functions and nested statements with their own
    /// CFG node.
    fn defs_in_statement(&self, statement: NodeId, binding: BindingId, unit: NodeId) -> Vec<NodeId> {
        let mut defs = Vec::new();
        self.scan_statement(statement, statement, binding, unit, true, &mut defs);
        defs
    }

    fn uses_in_statement(&self, statement: NodeId, binding: BindingId, unit: NodeId) -> Vec<NodeId> {
        let mut uses = Vec::new();
        self.scan_statement(statement, statement, binding, unit, false, &mut uses);
        uses
    }

    fn scan_statement(
        &self,
        node: NodeId,
        statement: NodeId,
        binding: BindingId,
        unit: NodeId,
        defs: bool,
        out: &mut Vec<NodeId>,
    ) {
        if node != statement {
            if self.tree.kind(node).is_function() {
                return;
            }
            if let Some(cfg) = self.cfg.unit(unit) {
                if cfg.contains(node) {
                    return;
                }
            }
        }
        if self.binding_of(node) == Some(binding) {
            let roles = self.scopes.roles_of(node);
            if (defs && roles.defines()) || (!defs && roles.is_read()) {
                out.push(node);
            }
        }
        for child in self.tree.children(node) {
            self.scan_statement(child, statement, binding, unit, defs, out);
        }
    }

    /// Where a definition takes effect: the end of its assignment,
    /// declarator, or update expression.
    fn effective_def_end(&self, def: NodeId) -> crate::shared::models::Location {
        let mut child = def;
        for parent in self.tree.ancestors(def).skip(1) {
            match self.tree.kind(parent) {
                NodeKind::AssignmentExpression { left, .. } => {
                    if self.contains_node(*left, child) {
                        return self.tree.span(parent).end;
                    }
                    break;
                }
                NodeKind::UpdateExpression { .. } => return self.tree.span(parent).end,
                NodeKind::VariableDeclarator { id, .. } => {
                    if self.contains_node(*id, child) {
                        return self.tree.span(parent).end;
                    }
                    break;
                }
                NodeKind::ObjectPattern { .. }
                | NodeKind::ArrayPattern { .. }
                | NodeKind::RestElement { .. }
                | NodeKind::AssignmentPattern { .. }
                | NodeKind::Property { .. }
                | NodeKind::MemberExpression { .. }
                | NodeKind::ChainExpression { .. } => {
                    child = parent;
                }
                _ => break,
            }
        }
        self.tree.span(def).end
    }

    fn contains_node(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.tree.is_ancestor(ancestor, node)
    }

    // ------------------------------------------------------------------
    // Reached uses (def → uses, forward over the CFG)
    // ------------------------------------------------------------------

    fn reached_uses(&self, def_occ: NodeId) -> Vec<NodeId> {
        let Some(binding_id) = self.binding_of(def_occ) else {
            return Vec::new();
        };
        let binding = self.scopes.binding(binding_id);
        let roles = self.scopes.roles_of(def_occ);

        // Hoisted declarations are visible from everywhere in the unit;
        // uses from closures may also run at any time. Both get the whole
        // use set of the binding.
        if roles.is_declaration()
            && matches!(
                binding.kind,
                BindingKind::Function
                    | BindingKind::FunctionExpressionName
                    | BindingKind::Class
                    | BindingKind::Import
            )
        {
            return self.all_uses(binding_id);
        }

        let unit = ControlFlow::unit_of(self.tree, def_occ);
        let mut result: Vec<NodeId> = Vec::new();

        // Uses in other units (closures over this binding).
        for &use_occ in self
            .all_uses(binding_id)
            .iter()
            .filter(|&&u| ControlFlow::unit_of(self.tree, u) != unit)
        {
            result.push(use_occ);
        }

        let Some(cfg) = self.cfg.unit(unit) else {
            return self.all_uses(binding_id);
        };

        let (start_points, same_statement): (Vec<CfgPoint>, Vec<NodeId>) =
            if roles.is_declaration() && matches!(binding.kind, BindingKind::Parameter) {
                // Parameters define at entry.
                (cfg.entry_successors(), Vec::new())
            } else {
                match self.cfg.statement_of(self.tree, def_occ) {
                    Some(statement) => {
                        let def_end = self.effective_def_end(def_occ);
                        let later_defs: Vec<_> = self
                            .defs_in_statement(statement, binding_id, unit)
                            .into_iter()
                            .filter(|&d| d != def_occ && self.effective_def_end(d) > def_end)
                            .collect();
                        let stop = later_defs
                            .iter()
                            .map(|&d| self.effective_def_end(d))
                            .min();
                        let same: Vec<NodeId> = self
                            .uses_in_statement(statement, binding_id, unit)
                            .into_iter()
                            .filter(|&u| u != def_occ)
                            .filter(|&u| {
                                let pos = self.tree.span(u).start;
                                pos >= def_end && stop.map_or(true, |s| pos < s)
                            })
                            .collect();
                        if later_defs.is_empty() {
                            (cfg.successors(statement), same)
                        } else {
                            (Vec::new(), same)
                        }
                    }
                    None => (Vec::new(), Vec::new()),
                }
            };
        result.extend(same_statement);

        let mut visited = FxHashSet::default();
        let mut queue = start_points;
        while let Some(point) = queue.pop() {
            let CfgPoint::Statement(next) = point else {
                continue;
            };
            if !visited.insert(next) {
                continue;
            }
            let defs = self.defs_in_statement(next, binding_id, unit);
            let stop = defs
                .iter()
                .map(|&d| self.effective_def_end(d))
                .min();
            for use_occ in self.uses_in_statement(next, binding_id, unit) {
                let pos = self.tree.span(use_occ).start;
                if stop.map_or(true, |s| pos < s) {
                    result.push(use_occ);
                }
            }
            if defs.is_empty() {
                queue.extend(cfg.successors(next));
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Value sources (def → the uses feeding it)
    // ------------------------------------------------------------------

    fn value_sources_of_def(&self, def_occ: NodeId) -> Vec<NodeId> {
        let mut visited_functions = FxHashSet::default();
        let mut sources = Vec::new();
        match self.def_anchor(def_occ) {
            DefAnchor::Declarator(declarator) => {
                if let NodeKind::VariableDeclarator {
                    init: Some(init), ..
                } = self.tree.kind(declarator)
                {
                    self.expr_sources(*init, &mut visited_functions, &mut sources);
                }
            }
            DefAnchor::Assignment(assignment) => {
                if let NodeKind::AssignmentExpression { right, .. } = self.tree.kind(assignment) {
                    self.expr_sources(*right, &mut visited_functions, &mut sources);
                }
            }
            DefAnchor::ForLoop(for_node) => {
                if let NodeKind::ForInStatement { right, .. }
                | NodeKind::ForOfStatement { right, .. } = self.tree.kind(for_node)
                {
                    self.expr_sources(*right, &mut visited_functions, &mut sources);
                }
            }
            DefAnchor::Parameter { function, index } => {
                for &call in self.calls.call_sites(function) {
                    if let NodeKind::CallExpression { arguments, .. } = self.tree.kind(call) {
                        if let Some(&argument) = arguments.get(index) {
                            self.expr_sources(argument, &mut visited_functions, &mut sources);
                        }
                    }
                }
            }
            DefAnchor::Plain => {}
        }
        sources
    }

    fn def_anchor(&self, def_occ: NodeId) -> DefAnchor {
        let mut child = def_occ;
        for parent in self.tree.ancestors(def_occ).skip(1) {
            match self.tree.kind(parent) {
                NodeKind::VariableDeclarator { id, .. } if self.contains_node(*id, child) => {
                    return DefAnchor::Declarator(parent)
                }
                NodeKind::AssignmentExpression { left, .. }
                    if self.contains_node(*left, child) =>
                {
                    return DefAnchor::Assignment(parent)
                }
                NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. }
                    if self.contains_node(*left, child) =>
                {
                    return DefAnchor::ForLoop(parent)
                }
                NodeKind::FunctionDeclaration { params, .. }
                | NodeKind::FunctionExpression { params, .. }
                | NodeKind::ArrowFunctionExpression { params, .. } => {
                    if let Some(index) = params
                        .iter()
                        .position(|&param| self.contains_node(param, child))
                    {
                        return DefAnchor::Parameter {
                            function: parent,
                            index,
                        };
                    }
                    return DefAnchor::Plain;
                }
                NodeKind::ObjectPattern { .. }
                | NodeKind::ArrayPattern { .. }
                | NodeKind::RestElement { .. }
                | NodeKind::AssignmentPattern { .. }
                | NodeKind::Property { .. }
                | NodeKind::MemberExpression { .. }
                | NodeKind::ChainExpression { .. }
                | NodeKind::UpdateExpression { .. } => {
                    child = parent;
                }
                _ => break,
            }
        }
        DefAnchor::Plain
    }

    /// Identifier uses feeding the value of `expr`.
    fn expr_sources(
        &self,
        expr: NodeId,
        visited_functions: &mut FxHashSet<NodeId>,
        out: &mut Vec<NodeId>,
    ) {
        match self.tree.kind(expr) {
            NodeKind::Identifier { .. } => {
                if self.scopes.roles_of(expr).is_read() {
                    out.push(expr);
                }
            }
            NodeKind::MemberExpression { object, .. } => {
                self.expr_sources(*object, visited_functions, out)
            }
            NodeKind::ChainExpression { expression } => {
                self.expr_sources(*expression, visited_functions, out)
            }
            NodeKind::ObjectExpression { properties } => {
                for &property in properties {
                    match self.tree.kind(property) {
                        NodeKind::Property { value, .. } => {
                            self.expr_sources(*value, visited_functions, out)
                        }
                        NodeKind::SpreadElement { argument } => {
                            self.expr_sources(*argument, visited_functions, out)
                        }
                        _ => {}
                    }
                }
            }
            NodeKind::ArrayExpression { elements } => {
                for element in elements.iter().flatten() {
                    self.expr_sources(*element, visited_functions, out);
                }
            }
            NodeKind::SpreadElement { argument }
            | NodeKind::UnaryExpression { argument, .. }
            | NodeKind::UpdateExpression { argument, .. }
            | NodeKind::AwaitExpression { argument } => {
                self.expr_sources(*argument, visited_functions, out)
            }
            NodeKind::YieldExpression {
                argument: Some(argument),
                ..
            } => self.expr_sources(*argument, visited_functions, out),
            NodeKind::BinaryExpression { left, right, .. }
            | NodeKind::LogicalExpression { left, right, .. } => {
                self.expr_sources(*left, visited_functions, out);
                self.expr_sources(*right, visited_functions, out);
            }
            NodeKind::ConditionalExpression {
                consequent,
                alternate,
                ..
            } => {
                self.expr_sources(*consequent, visited_functions, out);
                self.expr_sources(*alternate, visited_functions, out);
            }
            NodeKind::AssignmentExpression { right, .. } => {
                self.expr_sources(*right, visited_functions, out)
            }
            NodeKind::SequenceExpression { expressions } => {
                if let Some(&last) = expressions.last() {
                    self.expr_sources(last, visited_functions, out);
                }
            }
            NodeKind::TemplateLiteral { expressions, .. } => {
                for &expression in expressions {
                    self.expr_sources(expression, visited_functions, out);
                }
            }
            NodeKind::TaggedTemplateExpression { quasi, .. } => {
                self.expr_sources(*quasi, visited_functions, out)
            }
            NodeKind::CallExpression { callee, arguments } => {
                match self.calls.callee(expr) {
                    Some(function) => {
                        // The call's value is whatever the callee returns.
                        if visited_functions.insert(function) {
                            for &ret in self.calls.returns(function) {
                                match self.tree.kind(ret) {
                                    NodeKind::ReturnStatement {
                                        argument: Some(argument),
                                    } => self.expr_sources(
                                        *argument,
                                        visited_functions,
                                        out,
                                    ),
                                    NodeKind::ReturnStatement { argument: None } => {}
                                    _ => self.expr_sources(ret, visited_functions, out),
                                }
                            }
                        }
                    }
                    None => {
                        // Unknown callee: arguments pass through, and a
                        // method call carries its receiver's taint.
                        for &argument in arguments {
                            self.expr_sources(argument, visited_functions, out);
                        }
                        if let NodeKind::MemberExpression { object, .. } = self.tree.kind(*callee)
                        {
                            self.expr_sources(*object, visited_functions, out);
                        }
                    }
                }
            }
            NodeKind::NewExpression { arguments, .. } => {
                for &argument in arguments {
                    self.expr_sources(argument, visited_functions, out);
                }
            }
            NodeKind::Unknown { children, .. } => {
                for &child in children {
                    self.expr_sources(child, visited_functions, out);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Value destinations (use → the defs it feeds)
    // ------------------------------------------------------------------

    fn value_destinations(&self, use_occ: NodeId) -> Vec<NodeId> {
        let mut visited_functions = FxHashSet::default();
        let mut destinations = Vec::new();
        self.climb(use_occ, &mut visited_functions, &mut destinations);
        destinations
    }

    fn climb(
        &self,
        node: NodeId,
        visited_functions: &mut FxHashSet<NodeId>,
        out: &mut Vec<NodeId>,
    ) {
        let Some(parent) = self.tree.parent(node) else {
            return;
        };
        match self.tree.kind(parent) {
            NodeKind::MemberExpression {
                object, computed, ..
            } => {
                if *object == node {
                    self.climb(parent, visited_functions, out);
                } else if *computed {
                    // Computed keys do not taint the member value.
                }
            }
            NodeKind::ChainExpression { .. }
            | NodeKind::SpreadElement { .. }
            | NodeKind::ArrayExpression { .. }
            | NodeKind::BinaryExpression { .. }
            | NodeKind::LogicalExpression { .. }
            | NodeKind::UnaryExpression { .. }
            | NodeKind::UpdateExpression { .. }
            | NodeKind::AwaitExpression { .. }
            | NodeKind::YieldExpression { .. }
            | NodeKind::TemplateLiteral { .. }
            | NodeKind::ObjectExpression { .. } => self.climb(parent, visited_functions, out),
            NodeKind::TaggedTemplateExpression { quasi, .. } => {
                if *quasi == node {
                    self.climb(parent, visited_functions, out);
                }
            }
            NodeKind::Property { value, .. } => {
                if *value == node {
                    self.climb(parent, visited_functions, out);
                }
            }
            NodeKind::SequenceExpression { expressions } => {
                if expressions.last() == Some(&node) {
                    self.climb(parent, visited_functions, out);
                }
            }
            NodeKind::ConditionalExpression {
                consequent,
                alternate,
                ..
            } => {
                if *consequent == node || *alternate == node {
                    self.climb(parent, visited_functions, out);
                }
            }
            NodeKind::CallExpression { callee, arguments } => {
                if *callee == node {
                    // A callee identifier's flow ends at the call, but a
                    // method call passes its receiver's taint through to
                    // the call result.
                    let is_member = matches!(
                        self.tree.kind(node),
                        NodeKind::MemberExpression { .. } | NodeKind::ChainExpression { .. }
                    );
                    if is_member && self.calls.callee(parent).is_none() {
                        self.climb(parent, visited_functions, out);
                    }
                    return;
                }
                if let Some(position) = arguments.iter().position(|&arg| arg == node) {
                    match self.calls.callee(parent) {
                        Some(function) => {
                            if let Some(&param) = params_of(self.tree, function).get(position) {
                                out.extend(pattern_leaves(self.tree, param));
                            }
                        }
                        None => self.climb(parent, visited_functions, out),
                    }
                }
            }
            NodeKind::NewExpression { .. } => self.climb(parent, visited_functions, out),
            NodeKind::AssignmentExpression { left, right, .. } => {
                if *right == node {
                    self.assignment_targets(*left, out);
                }
            }
            NodeKind::AssignmentPattern { left, right } => {
                // Default value feeding a destructured binding.
                if *right == node {
                    out.extend(pattern_leaves(self.tree, *left));
                }
            }
            NodeKind::VariableDeclarator { id, init } => {
                if *init == Some(node) {
                    out.extend(pattern_leaves(self.tree, *id));
                }
            }
            NodeKind::ForInStatement { left, right, .. }
            | NodeKind::ForOfStatement { left, right, .. } => {
                if *right == node {
                    self.assignment_targets(*left, out);
                }
            }
            NodeKind::ReturnStatement { .. } => {
                if let Some(function) = self.tree.enclosing_function(parent) {
                    self.climb_call_sites(function, visited_functions, out);
                }
            }
            NodeKind::ArrowFunctionExpression {
                body, expression, ..
            } => {
                // A bare-expression arrow body is its return value.
                if *expression && *body == node {
                    self.climb_call_sites(parent, visited_functions, out);
                }
            }
            _ => {}
        }
    }

    fn climb_call_sites(
        &self,
        function: NodeId,
        visited_functions: &mut FxHashSet<NodeId>,
        out: &mut Vec<NodeId>,
    ) {
        if !visited_functions.insert(function) {
            return;
        }
        for &call in self.calls.call_sites(function) {
            self.climb(call, visited_functions, out);
        }
    }

    /// Defining occurrences targeted by an assignment left-hand side.
    fn assignment_targets(&self, left: NodeId, out: &mut Vec<NodeId>) {
        match self.tree.kind(left) {
            NodeKind::Identifier { .. } => out.push(left),
            NodeKind::MemberExpression { .. } | NodeKind::ChainExpression { .. } => {
                let root = crate::features::ast::infrastructure::dotted::member_root(
                    self.tree, left,
                );
                if matches!(self.tree.kind(root), NodeKind::Identifier { .. }) {
                    out.push(root);
                }
            }
            NodeKind::VariableDeclaration { declarations, .. } => {
                // `for (let x of xs)` carries its declaration inline.
                for &declarator in declarations {
                    if let NodeKind::VariableDeclarator { id, .. } = self.tree.kind(declarator) {
                        out.extend(pattern_leaves(self.tree, *id));
                    }
                }
            }
            _ => out.extend(pattern_leaves(self.tree, left)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefAnchor {
    Declarator(NodeId),
    Assignment(NodeId),
    ForLoop(NodeId),
    Parameter { function: NodeId, index: usize },
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::test_support::{estree, ingest_positioned};
    use crate::features::scoping::infrastructure::resolver::resolve_scopes;

    struct Fixture {
        tree: SyntaxTree,
        scopes: ScopeTree,
        cfg: ControlFlow,
        calls: CallGraph,
    }

    impl Fixture {
        fn new(doc: serde_json::Value) -> Self {
            let tree = ingest_positioned("t.js", &doc);
            let scopes = resolve_scopes(&tree).unwrap();
            let cfg = ControlFlow::build(&tree);
            let calls = CallGraph::build(&tree, &scopes);
            Self {
                tree,
                scopes,
                cfg,
                calls,
            }
        }

        fn deps(&self) -> DataDeps<'_> {
            DataDeps::new(&self.tree, &self.scopes, &self.cfg, &self.calls, 100_000)
        }

        fn idents(&self, name: &str) -> Vec<NodeId> {
            self.tree
                .ids()
                .filter(|&id| self.tree.node(id).identifier_name() == Some(name))
                .collect()
        }
    }

    #[test]
    fn use_reaches_back_to_its_definition() {
        // let a = 1; use(a);
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("a", estree::literal_num(1.0)),
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("a")])),
        ]));
        let deps = fixture.deps();
        let a_nodes = fixture.idents("a");
        assert_eq!(deps.parents_of(a_nodes[1]), vec![a_nodes[0]]);
        assert!(deps.children_of(a_nodes[0]).contains(&a_nodes[1]));
    }

    #[test]
    fn self_referencing_assignment_reads_the_prior_definition() {
        // let x = 1; x = x + 1;
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("x", estree::literal_num(1.0)),
            estree::expr_stmt(estree::assign(
                estree::ident("x"),
                estree::binary("+", estree::ident("x"), estree::literal_num(1.0)),
            )),
        ]));
        let deps = fixture.deps();
        let xs = fixture.idents("x");
        // xs: [decl, lhs write, rhs read]
        assert_eq!(deps.parents_of(xs[2]), vec![xs[0]]);
        // The write's value comes from the read.
        assert_eq!(deps.parents_of(xs[1]), vec![xs[2]]);
    }

    #[test]
    fn assignment_chain_keeps_taint_with_the_object_root() {
        // const db = x; db.get("Alice").age = 42;
        let fixture = Fixture::new(estree::program(vec![
            estree::const_decl("db", estree::ident("x")),
            estree::expr_stmt(estree::assign(
                estree::member(
                    estree::call(
                        estree::member(estree::ident("db"), "get"),
                        vec![estree::literal_str("Alice")],
                    ),
                    "age",
                ),
                estree::literal_num(42.0),
            )),
        ]));
        let deps = fixture.deps();
        let dbs = fixture.idents("db");
        assert_eq!(dbs.len(), 2);
        let children = deps.children_of(dbs[0]);
        assert!(
            children.contains(&dbs[1]),
            "declarator children must include the db inside the written chain"
        );
    }

    #[test]
    fn branch_definitions_both_reach_the_join() {
        // let a = 0; if (c) { a = 1; } else { a = 2; } use(a);
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("a", estree::literal_num(0.0)),
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
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("a")])),
        ]));
        let deps = fixture.deps();
        let a_nodes = fixture.idents("a");
        // [decl, then-write, else-write, use]
        let parents = deps.parents_of(a_nodes[3]);
        assert_eq!(parents, vec![a_nodes[1], a_nodes[2]]);
    }

    #[test]
    fn destructuring_propagates_from_the_root() {
        // const {a} = o; use(a);
        let fixture = Fixture::new(estree::program(vec![
            estree::var_decl(
                "const",
                vec![estree::declarator(
                    estree::object_pattern(vec![estree::pattern_property("a")]),
                    Some(estree::ident("o")),
                )],
            ),
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("a")])),
        ]));
        let deps = fixture.deps();
        let o = fixture.idents("o")[0];
        let a_leaf = fixture.idents("a")[1];
        assert_eq!(deps.parents_of(a_leaf), vec![o]);
        assert!(deps.children_of(o).contains(&a_leaf));
    }

    #[test]
    fn arguments_flow_into_parameters_and_returns_flow_out() {
        // function id(v) { return v; } let y = id(x);
        let fixture = Fixture::new(estree::program(vec![
            estree::function_decl(
                "id",
                vec![estree::ident("v")],
                vec![estree::ret(Some(estree::ident("v")))],
            ),
            estree::let_decl(
                "y",
                estree::call(estree::ident("id"), vec![estree::ident("x")]),
            ),
        ]));
        let deps = fixture.deps();
        let vs = fixture.idents("v");
        let x = fixture.idents("x")[0];
        let y = fixture.idents("y")[0];
        // Argument x flows into the parameter declaration.
        assert!(deps.children_of(x).contains(&vs[0]));
        // The parameter's value comes from the call-site argument.
        assert!(deps.parents_of(vs[0]).contains(&x));
        // The declarator's value comes from the returned use.
        assert!(deps.parents_of(y).contains(&vs[1]));
        // And the returned use feeds the call-site declarator.
        assert!(deps.children_of(vs[1]).contains(&y));
    }

    #[test]
    fn object_literal_keys_are_never_endpoints() {
        // let prior = a; x = {a: b};
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("prior", estree::ident("a")),
            estree::expr_stmt(estree::assign(
                estree::ident("x"),
                estree::object(vec![estree::property("a", estree::ident("b"))]),
            )),
        ]));
        let deps = fixture.deps();
        let x = fixture.idents("x")[0];
        let parents = deps.parents_of(x);
        let b = fixture.idents("b")[0];
        assert_eq!(parents, vec![b]);
        // The key `a` resolves nowhere and has no edges.
        let key_a = fixture.idents("a")[1];
        assert!(deps.parents_of(key_a).is_empty());
        assert!(deps.children_of(key_a).is_empty());
    }

    #[test]
    fn queries_are_deterministic_and_memoized() {
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("a", estree::literal_num(1.0)),
            estree::expr_stmt(estree::assign(estree::ident("a"), estree::ident("a"))),
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("a")])),
        ]));
        let deps = fixture.deps();
        let a_use = *fixture.idents("a").last().unwrap();
        let first = deps.parents_of(a_use);
        let second = deps.parents_of(a_use);
        assert_eq!(first, second);
        assert!(!deps.truncated());
    }

    #[test]
    fn edge_budget_marks_truncation() {
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("a", estree::literal_num(1.0)),
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("a")])),
        ]));
        let deps = DataDeps::new(&fixture.tree, &fixture.scopes, &fixture.cfg, &fixture.calls, 1);
        let a_use = fixture.idents("a")[1];
        let _ = deps.parents_of(a_use);
        assert!(deps.truncated());
    }

    #[test]
    fn loop_cycles_terminate() {
        // let s = seed; while (c) { s = s + s; } use(s);
        let fixture = Fixture::new(estree::program(vec![
            estree::let_decl("s", estree::ident("seed")),
            serde_json::json!({
                "type": "WhileStatement",
                "test": estree::ident("c"),
                "body": estree::block(vec![estree::expr_stmt(estree::assign(
                    estree::ident("s"),
                    estree::binary("+", estree::ident("s"), estree::ident("s")),
                ))]),
            }),
            estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("s")])),
        ]));
        let deps = fixture.deps();
        let s_nodes = fixture.idents("s");
        // Use after the loop sees both the initial and the loop definition.
        let s_use = *s_nodes.last().unwrap();
        let parents = deps.parents_of(s_use);
        assert_eq!(parents.len(), 2);
    }
}
