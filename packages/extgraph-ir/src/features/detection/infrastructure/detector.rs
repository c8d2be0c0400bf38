//! Source/sink pairing.
//!
//! Seeds taint at privileged API results, storage reads, and message
//! payloads; materializes forward flows with the data-flow engine; and
//! emits a danger whenever a source flow and a sink flow meet inside the
//! same rendezvous expression and no sender guard gates the sink.

use rustc_hash::FxHashSet;

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::ast::infrastructure::dotted::{dotted_name, member_path, property_name};
use crate::features::data_flow::domain::flow::{FlowPath, FlowStep};
use crate::features::data_flow::infrastructure::engine::FlowEngine;
use crate::features::data_flow::infrastructure::trace::render_flow;
use crate::features::pdg::infrastructure::calls::{params_of, pattern_leaves, CallGraph};
use crate::features::pdg::infrastructure::def_use::{DataDeps, Direction};
use crate::features::scoping::domain::ScopeTree;
use crate::shared::models::Location;
use crate::shared::utils::SourceText;
use once_cell::sync::Lazy;
use regex::Regex;

use super::guards::{handler_has_sender_guard, is_sender_guarded};
use super::listeners::{find_listeners, ListenerKind, MessageListener};
use super::profiles::{
    normalize, ApiProfiles, SinkCategory, SourceCategory, SourceShape, DOM_WRITE_PROPERTIES,
};
use crate::features::detection::domain::danger::{
    Danger, DangerClass, FileDangers, ListenerViolation, Rendezvous, StorageAccess,
};

static STORAGE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^chrome\.storage\.(local|sync|session|managed)\.(get|set|remove|clear|getBytesInUse)$")
        .expect("storage pattern compiles")
});

pub struct Detector<'a> {
    pub tree: &'a SyntaxTree,
    pub scopes: &'a ScopeTree,
    pub calls: &'a CallGraph,
    pub deps: &'a DataDeps<'a>,
    pub engine: &'a FlowEngine<'a>,
    pub profiles: &'a ApiProfiles,
    pub source: &'a SourceText,
    pub report_unguarded_listeners: bool,
}

/// What kind of data a seed carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedKind {
    Privileged,
    Storage,
    Attacker,
}

#[derive(Debug, Clone, Copy)]
struct Seed {
    occurrence: NodeId,
    kind: SeedKind,
    /// Index into the listener list, for attacker seeds.
    listener: Option<usize>,
}

/// Where tainted data must land to complete a pair.
#[derive(Debug, Clone)]
struct SinkHandle {
    /// The rendezvous node (call, assignment, or return statement).
    rendezvous: NodeId,
    /// Subtrees that count as the tainted region.
    region: Vec<NodeId>,
    category: SinkCategory,
    to_flow: Vec<FlowStep>,
    /// Listener owning the sink, when there is one.
    listener: Option<usize>,
    /// True for `sendResponse`-style handles, which are listener-bound
    /// responses by construction.
    is_response: bool,
}

impl Detector<'_> {
    pub fn detect(&self) -> FileDangers {
        let mut out = FileDangers::default();
        self.collect_storage_accesses(&mut out);

        let listeners = find_listeners(self.tree, self.scopes);
        let seeds = self.collect_seeds(&listeners);
        let handles = self.collect_sink_handles(&listeners);

        let mut emitted: Vec<(Location, Location, NodeId, Danger, Option<usize>)> = Vec::new();
        let mut seen: FxHashSet<(NodeId, Vec<NodeId>, NodeId)> = FxHashSet::default();

        for seed in &seeds {
            for path in self.engine.paths(seed.occurrence, Direction::Forward) {
                for handle in &handles {
                    let Some(cut) = self.last_hop_in_region(&path, handle) else {
                        continue;
                    };
                    let Some(class) = classify(seed.kind, handle) else {
                        continue;
                    };
                    if !self.listener_compatible(seed, handle, &listeners) {
                        continue;
                    }
                    if self.gated(seed, handle, &listeners) {
                        continue;
                    }
                    let from_occurrences: Vec<NodeId> = path.occurrences[..=cut].to_vec();
                    let key = (
                        handle.rendezvous,
                        from_occurrences.clone(),
                        seed.occurrence,
                    );
                    if !seen.insert(key) {
                        continue;
                    }
                    let from_path = FlowPath {
                        occurrences: from_occurrences,
                        truncated: path.truncated && cut + 1 == path.occurrences.len(),
                    };
                    let danger = Danger {
                        from_flow: render_flow(self.tree, self.source, &from_path),
                        to_flow: handle.to_flow.clone(),
                        rendezvous: self.rendezvous_record(handle.rendezvous),
                        data_flow_number: String::new(),
                        class,
                        truncated: from_path.truncated || self.deps.truncated(),
                    };
                    emitted.push((
                        self.tree.span(handle.rendezvous).start,
                        self.tree.span(seed.occurrence).start,
                        handle.rendezvous,
                        danger,
                        handle.listener.or(seed.listener),
                    ));
                }
            }
        }

        // Sink position first, then source position, then stable node id.
        emitted.sort_by_key(|(sink, source, node, _, _)| (*sink, *source, *node));
        let total = emitted.len();
        let mut dangerous_listeners: FxHashSet<usize> = FxHashSet::default();
        for (index, (_, _, _, mut danger, listener)) in emitted.into_iter().enumerate() {
            danger.data_flow_number = format!("{}/{}", index + 1, total);
            if let Some(listener) = listener {
                dangerous_listeners.insert(listener);
            }
            if danger.class.is_exfiltration() {
                out.exfiltration_dangers.push(danger);
            } else {
                out.infiltration_dangers.push(danger);
            }
        }

        if self.report_unguarded_listeners {
            for (index, listener) in listeners.iter().enumerate() {
                if dangerous_listeners.contains(&index) {
                    continue;
                }
                let guarded = listener.handler.is_some_and(|handler| {
                    handler_has_sender_guard(
                        self.tree,
                        self.scopes,
                        self.engine,
                        handler,
                        listener.sender_param,
                    )
                });
                if !guarded {
                    let span = self.tree.span(listener.call);
                    out.listener_violations.push(ListenerViolation {
                        listener: listener.kind.as_str().to_owned(),
                        location: span.render(),
                        filename: self.tree.file.clone(),
                        line_of_code: self.source.line(span.start.line).to_owned(),
                    });
                }
            }
        }

        out
    }

    fn collect_storage_accesses(&self, out: &mut FileDangers) {
        for id in self.tree.ids() {
            let NodeKind::CallExpression { callee, .. } = self.tree.kind(id) else {
                continue;
            };
            let Some(dotted) = dotted_name(self.tree, *callee).map(|d| normalize(&d)) else {
                continue;
            };
            if let Some(captures) = STORAGE_CALL.captures(&dotted) {
                let area = captures.get(1).expect("area group").as_str().to_owned();
                let method = captures.get(2).expect("method group").as_str().to_owned();
                let span = self.tree.span(id);
                out.storage_accesses
                    .entry(area)
                    .or_default()
                    .push(StorageAccess {
                        method,
                        location: span.render(),
                        line_of_code: self.source.line(span.start.line).to_owned(),
                    });
            }
        }
    }

    fn collect_seeds(&self, listeners: &[MessageListener]) -> Vec<Seed> {
        let mut seeds = Vec::new();

        for id in self.tree.ids() {
            let NodeKind::CallExpression { callee, arguments } = self.tree.kind(id) else {
                continue;
            };
            let Some(dotted) = dotted_name(self.tree, *callee) else {
                continue;
            };
            for profile in self.profiles.sources_for(&dotted) {
                let kind = match profile.category {
                    SourceCategory::PrivilegedApi => SeedKind::Privileged,
                    SourceCategory::StorageRead => SeedKind::Storage,
                };
                match profile.shape {
                    SourceShape::Callback { callback, param } => {
                        let position = callback.unwrap_or_else(|| arguments.len().saturating_sub(1));
                        let Some(&callback_arg) = arguments.get(position) else {
                            continue;
                        };
                        let Some(function) = self.resolve_function(callback_arg) else {
                            continue;
                        };
                        let Some(&pattern) = params_of(self.tree, function).get(param) else {
                            continue;
                        };
                        for leaf in pattern_leaves(self.tree, pattern) {
                            seeds.push(Seed {
                                occurrence: leaf,
                                kind,
                                listener: None,
                            });
                        }
                    }
                    SourceShape::Result => {
                        for consumer in self.deps.consumers_of_expression(id) {
                            seeds.push(Seed {
                                occurrence: consumer,
                                kind,
                                listener: None,
                            });
                        }
                        // Promise style: the `.then` callback's first
                        // parameter receives the result.
                        for leaf in self.then_callback_params(id) {
                            seeds.push(Seed {
                                occurrence: leaf,
                                kind,
                                listener: None,
                            });
                        }
                    }
                }
            }
        }

        for (index, listener) in listeners.iter().enumerate() {
            if let Some(message) = listener.message_param {
                seeds.push(Seed {
                    occurrence: message,
                    kind: SeedKind::Attacker,
                    listener: Some(index),
                });
            }
        }

        seeds.sort_by_key(|seed| (self.tree.span(seed.occurrence).start, seed.occurrence));
        seeds.dedup_by_key(|seed| (seed.occurrence, seed.kind));
        seeds
    }

    fn collect_sink_handles(&self, listeners: &[MessageListener]) -> Vec<SinkHandle> {
        let mut handles = Vec::new();

        // sendResponse parameters: every call through the parameter is a
        // response back to the message sender.
        for (index, listener) in listeners.iter().enumerate() {
            let Some(send_response) = listener.send_response_param else {
                continue;
            };
            for path in self.engine.paths(send_response, Direction::Forward) {
                let tail = path.tail();
                let Some(call) = self.tree.parent(tail) else {
                    continue;
                };
                let NodeKind::CallExpression { callee, arguments } = self.tree.kind(call) else {
                    continue;
                };
                if *callee != tail {
                    continue;
                }
                handles.push(SinkHandle {
                    rendezvous: call,
                    region: arguments.clone(),
                    category: SinkCategory::Messaging,
                    to_flow: render_flow(self.tree, self.source, &path),
                    listener: Some(index),
                    is_response: true,
                });
            }

            // Returning a value from an onMessage handler responds too.
            if listener.kind == ListenerKind::RuntimeOnMessage {
                if let Some(handler) = listener.handler {
                    for &ret in self.calls.returns(handler) {
                        let argument = match self.tree.kind(ret) {
                            NodeKind::ReturnStatement {
                                argument: Some(argument),
                            } => *argument,
                            NodeKind::ReturnStatement { argument: None } => continue,
                            _ => ret,
                        };
                        // `return true` just keeps the channel open.
                        if matches!(self.tree.kind(argument), NodeKind::Literal { .. }) {
                            continue;
                        }
                        let span = self.tree.span(ret);
                        handles.push(SinkHandle {
                            rendezvous: ret,
                            region: vec![argument],
                            category: SinkCategory::Messaging,
                            to_flow: vec![FlowStep {
                                no: 1,
                                location: span.render(),
                                filename: self.tree.file.clone(),
                                identifier: "return".to_owned(),
                                line_of_code: self.source.line(span.start.line).to_owned(),
                            }],
                            listener: Some(index),
                            is_response: true,
                        });
                    }
                }
            }
        }

        // Dotted-name call sinks from the profile tables.
        for id in self.tree.ids() {
            match self.tree.kind(id) {
                NodeKind::CallExpression { callee, arguments }
                | NodeKind::NewExpression { callee, arguments } => {
                    let Some(dotted) = dotted_name(self.tree, *callee) else {
                        continue;
                    };
                    let Some(profile) = self.profiles.sink_for(&dotted) else {
                        continue;
                    };
                    let region: Vec<NodeId> = arguments
                        .iter()
                        .enumerate()
                        .filter(|(position, _)| profile.taints_argument(*position))
                        .map(|(_, &argument)| argument)
                        .collect();
                    if region.is_empty() {
                        continue;
                    }
                    let callee_span = self.tree.span(*callee);
                    handles.push(SinkHandle {
                        rendezvous: id,
                        region,
                        category: profile.category,
                        to_flow: vec![FlowStep {
                            no: 1,
                            location: callee_span.render(),
                            filename: self.tree.file.clone(),
                            identifier: normalize(&dotted),
                            line_of_code: self.source.line(callee_span.start.line).to_owned(),
                        }],
                        listener: self.enclosing_listener(listeners, id),
                        is_response: false,
                    });
                }
                // DOM write properties are assignment sinks.
                NodeKind::AssignmentExpression { left, right, .. } => {
                    let NodeKind::MemberExpression { property, .. } = self.tree.kind(*left)
                    else {
                        continue;
                    };
                    let Some(name) = property_name(self.tree, *property) else {
                        continue;
                    };
                    if !DOM_WRITE_PROPERTIES.contains(&name.as_str()) {
                        continue;
                    }
                    let left_span = self.tree.span(*left);
                    let identifier = dotted_name(self.tree, *left)
                        .unwrap_or_else(|| member_path(self.tree, *left).join("."));
                    handles.push(SinkHandle {
                        rendezvous: id,
                        region: vec![*right],
                        category: SinkCategory::Dom,
                        to_flow: vec![FlowStep {
                            no: 1,
                            location: left_span.render(),
                            filename: self.tree.file.clone(),
                            identifier,
                            line_of_code: self.source.line(left_span.start.line).to_owned(),
                        }],
                        listener: self.enclosing_listener(listeners, id),
                        is_response: false,
                    });
                }
                _ => {}
            }
        }

        handles
    }

    /// Last hop of `path` inside the handle's tainted region.
    fn last_hop_in_region(&self, path: &FlowPath, handle: &SinkHandle) -> Option<usize> {
        path.occurrences.iter().enumerate().rev().find_map(
            |(index, &occurrence)| {
                handle
                    .region
                    .iter()
                    .any(|&root| self.tree.is_ancestor(root, occurrence))
                    .then_some(index)
            },
        )
    }

    /// Exfiltration must answer an attacker: a messaging sink that is not
    /// a response handle counts only inside some listener's handler.
    fn listener_compatible(
        &self,
        seed: &Seed,
        handle: &SinkHandle,
        _listeners: &[MessageListener],
    ) -> bool {
        if seed.kind == SeedKind::Attacker {
            return true;
        }
        match handle.category {
            SinkCategory::Messaging => handle.is_response || handle.listener.is_some(),
            _ => true,
        }
    }

    fn gated(&self, seed: &Seed, handle: &SinkHandle, listeners: &[MessageListener]) -> bool {
        let listener_index = handle.listener.or(seed.listener);
        let Some(listener) = listener_index.and_then(|i| listeners.get(i)) else {
            return false;
        };
        is_sender_guarded(
            self.tree,
            self.scopes,
            self.engine,
            handle.rendezvous,
            listener.sender_param,
        )
    }

    fn rendezvous_record(&self, node: NodeId) -> Rendezvous {
        let span = self.tree.span(node);
        Rendezvous {
            node_type: self.tree.kind(node).type_name().to_owned(),
            location: span.render(),
            filename: self.tree.file.clone(),
            line_of_code: self.source.line(span.start.line).to_owned(),
        }
    }

    fn enclosing_listener(
        &self,
        listeners: &[MessageListener],
        node: NodeId,
    ) -> Option<usize> {
        listeners.iter().position(|listener| {
            listener
                .handler
                .is_some_and(|handler| self.tree.is_ancestor(handler, node))
        })
    }

    /// First-parameter leaves of `source_call.then(cb)` callbacks.
    fn then_callback_params(&self, source_call: NodeId) -> Vec<NodeId> {
        let Some(member) = self.tree.parent(source_call) else {
            return Vec::new();
        };
        let NodeKind::MemberExpression {
            object, property, ..
        } = self.tree.kind(member)
        else {
            return Vec::new();
        };
        if *object != source_call
            || property_name(self.tree, *property).as_deref() != Some("then")
        {
            return Vec::new();
        }
        let Some(then_call) = self.tree.parent(member) else {
            return Vec::new();
        };
        let NodeKind::CallExpression { callee, arguments } = self.tree.kind(then_call) else {
            return Vec::new();
        };
        if *callee != member {
            return Vec::new();
        }
        arguments
            .first()
            .and_then(|&cb| self.resolve_function(cb))
            .and_then(|function| params_of(self.tree, function).first().copied())
            .map(|pattern| pattern_leaves(self.tree, pattern))
            .unwrap_or_default()
    }

    fn resolve_function(&self, arg: NodeId) -> Option<NodeId> {
        match self.tree.kind(arg) {
            NodeKind::FunctionExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => {
                Some(arg)
            }
            NodeKind::Identifier { .. } => {
                let binding = self.scopes.resolution(arg)?;
                crate::features::pdg::infrastructure::calls::function_of_binding(
                    self.tree,
                    self.scopes,
                    binding,
                )
            }
            NodeKind::ChainExpression { expression } => self.resolve_function(*expression),
            _ => None,
        }
    }
}

/// Seed kind × sink category → vulnerability class.
fn classify(seed: SeedKind, handle: &SinkHandle) -> Option<DangerClass> {
    match (seed, handle.category) {
        (SeedKind::Privileged, SinkCategory::Messaging) => {
            Some(DangerClass::PrivilegedApiExfiltration)
        }
        (SeedKind::Storage, SinkCategory::Messaging) => Some(DangerClass::SensitiveDataRead),
        (SeedKind::Storage, SinkCategory::Dom) => Some(DangerClass::SensitiveDataWrite),
        (SeedKind::Attacker, SinkCategory::PrivilegedApi) => {
            Some(DangerClass::PrivilegedApiInfiltration)
        }
        (SeedKind::Attacker, SinkCategory::StorageWrite)
        | (SeedKind::Attacker, SinkCategory::Dom) => Some(DangerClass::SensitiveDataWrite),
        _ => None,
    }
}
