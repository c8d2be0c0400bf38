//! Sender-guard gating.
//!
//! A sink is considered guarded when one of its control-dependence
//! ancestors tests a property of the listener's sender parameter:
//! `sender.url`, `sender.origin`, `sender.tab.url`, `sender.id`, or
//! `sender.frameId` (window handlers check `event.origin`). The check
//! follows data-flow parents, so an alias like
//! `const who = sender; if (who.url === ...)` still counts.

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::ast::infrastructure::dotted::{member_path, member_root};
use crate::features::data_flow::infrastructure::engine::FlowEngine;
use crate::features::pdg::infrastructure::control_deps::guarding_conditions;
use crate::features::pdg::infrastructure::def_use::Direction;
use crate::features::scoping::domain::ScopeTree;

/// Sender properties that identify the peer.
const SENDER_PROPERTIES: &[&str] = &["url", "origin", "id", "frameId", "tab"];

/// Whether `sink` sits under a condition on the sender parameter.
pub fn is_sender_guarded(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    engine: &FlowEngine<'_>,
    sink: NodeId,
    sender_param: Option<NodeId>,
) -> bool {
    let Some(sender) = sender_param else {
        return false;
    };
    guarding_conditions(tree, sink)
        .iter()
        .any(|guard| condition_mentions_sender(tree, scopes, engine, guard.test, sender))
}

/// Whether any guard anywhere in a handler body references the sender;
/// used to decide whether an unguarded-listener violation applies.
pub fn handler_has_sender_guard(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    engine: &FlowEngine<'_>,
    handler: NodeId,
    sender_param: Option<NodeId>,
) -> bool {
    let Some(sender) = sender_param else {
        return false;
    };
    tree.descendants(handler).into_iter().any(|node| {
        let is_test_position = match tree.parent(node).map(|p| tree.kind(p)) {
            Some(NodeKind::IfStatement { test, .. }) => *test == node,
            Some(NodeKind::ConditionalExpression { test, .. }) => *test == node,
            Some(NodeKind::LogicalExpression { left, .. }) => *left == node,
            Some(NodeKind::SwitchStatement { discriminant, .. }) => *discriminant == node,
            _ => false,
        };
        is_test_position && condition_mentions_sender(tree, scopes, engine, node, sender)
    })
}

fn condition_mentions_sender(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    engine: &FlowEngine<'_>,
    condition: NodeId,
    sender: NodeId,
) -> bool {
    let Some(sender_binding) = scopes.resolution(sender) else {
        return false;
    };
    tree.descendants(condition)
        .into_iter()
        .filter(|&node| matches!(tree.kind(node), NodeKind::MemberExpression { .. }))
        .any(|member| {
            let path = member_path(tree, member);
            if !path
                .iter()
                .any(|segment| SENDER_PROPERTIES.contains(&segment.as_str()))
            {
                return false;
            }
            let root = member_root(tree, member);
            if !matches!(tree.kind(root), NodeKind::Identifier { .. }) {
                return false;
            }
            // Direct reference or a data-flow alias of the sender.
            scopes.resolution(root) == Some(sender_binding)
                || engine
                    .reachable(root, Direction::Backward)
                    .contains(&sender)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::test_support::{estree, ingest_positioned};
    use crate::features::pdg::infrastructure::calls::CallGraph;
    use crate::features::pdg::infrastructure::cfg::ControlFlow;
    use crate::features::pdg::infrastructure::def_use::DataDeps;
    use crate::features::scoping::infrastructure::resolver::resolve_scopes;

    /// chrome.runtime.onMessage.addListener((m, s, sendResponse) => {
    ///     <guarded ? if (s.url === "https://admin.example") : nothing>
    ///     sendResponse(m);
    /// });
    fn listener_doc(guarded: bool) -> serde_json::Value {
        let respond = estree::expr_stmt(estree::call(
            estree::ident("sendResponse"),
            vec![estree::ident("m")],
        ));
        let body = if guarded {
            vec![estree::if_stmt(
                estree::binary(
                    "===",
                    estree::member(estree::ident("s"), "url"),
                    estree::literal_str("https://admin.example"),
                ),
                estree::block(vec![respond]),
                None,
            )]
        } else {
            vec![respond]
        };
        estree::program(vec![estree::expr_stmt(estree::call(
            estree::member(
                estree::member(
                    estree::member(estree::ident("chrome"), "runtime"),
                    "onMessage",
                ),
                "addListener",
            ),
            vec![estree::arrow(
                vec![
                    estree::ident("m"),
                    estree::ident("s"),
                    estree::ident("sendResponse"),
                ],
                body,
            )],
        ))])
    }

    struct Fixture {
        tree: SyntaxTree,
        scopes: ScopeTree,
        cfg: ControlFlow,
        calls: CallGraph,
    }

    impl Fixture {
        fn new(doc: serde_json::Value) -> Self {
            let tree = ingest_positioned("bg.js", &doc);
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
    }

    #[test]
    fn url_check_on_the_sender_guards_the_sink() {
        let fixture = Fixture::new(listener_doc(true));
        let deps = DataDeps::new(
            &fixture.tree,
            &fixture.scopes,
            &fixture.cfg,
            &fixture.calls,
            100_000,
        );
        let engine = FlowEngine::new(&deps, 64);
        let sender = fixture
            .tree
            .ids()
            .find(|&id| fixture.tree.node(id).identifier_name() == Some("s"))
            .unwrap();
        let sink_call = fixture
            .tree
            .ids()
            .filter(|&id| {
                matches!(fixture.tree.kind(id), NodeKind::CallExpression { .. })
            })
            .last()
            .unwrap();
        assert!(is_sender_guarded(
            &fixture.tree,
            &fixture.scopes,
            &engine,
            sink_call,
            Some(sender),
        ));
    }

    #[test]
    fn unguarded_sink_is_not_gated() {
        let fixture = Fixture::new(listener_doc(false));
        let deps = DataDeps::new(
            &fixture.tree,
            &fixture.scopes,
            &fixture.cfg,
            &fixture.calls,
            100_000,
        );
        let engine = FlowEngine::new(&deps, 64);
        let sender = fixture
            .tree
            .ids()
            .find(|&id| fixture.tree.node(id).identifier_name() == Some("s"))
            .unwrap();
        let sink_call = fixture
            .tree
            .ids()
            .filter(|&id| {
                matches!(fixture.tree.kind(id), NodeKind::CallExpression { .. })
            })
            .last()
            .unwrap();
        assert!(!is_sender_guarded(
            &fixture.tree,
            &fixture.scopes,
            &engine,
            sink_call,
            Some(sender),
        ));
    }

    #[test]
    fn alias_of_the_sender_still_guards() {
        // (m, s, sendResponse) => { const who = s;
        //   if (who.origin === "x") sendResponse(m); }
        let doc = estree::program(vec![estree::expr_stmt(estree::call(
            estree::member(
                estree::member(
                    estree::member(estree::ident("chrome"), "runtime"),
                    "onMessage",
                ),
                "addListener",
            ),
            vec![estree::arrow(
                vec![
                    estree::ident("m"),
                    estree::ident("s"),
                    estree::ident("sendResponse"),
                ],
                vec![
                    estree::const_decl("who", estree::ident("s")),
                    estree::if_stmt(
                        estree::binary(
                            "===",
                            estree::member(estree::ident("who"), "origin"),
                            estree::literal_str("x"),
                        ),
                        estree::expr_stmt(estree::call(
                            estree::ident("sendResponse"),
                            vec![estree::ident("m")],
                        )),
                        None,
                    ),
                ],
            )],
        ))]);
        let fixture = Fixture::new(doc);
        let deps = DataDeps::new(
            &fixture.tree,
            &fixture.scopes,
            &fixture.cfg,
            &fixture.calls,
            100_000,
        );
        let engine = FlowEngine::new(&deps, 64);
        let sender = fixture
            .tree
            .ids()
            .find(|&id| fixture.tree.node(id).identifier_name() == Some("s"))
            .unwrap();
        let sink_call = fixture
            .tree
            .ids()
            .filter(|&id| {
                matches!(fixture.tree.kind(id), NodeKind::CallExpression { .. })
            })
            .last()
            .unwrap();
        assert!(is_sender_guarded(
            &fixture.tree,
            &fixture.scopes,
            &engine,
            sink_call,
            Some(sender),
        ));
    }

    #[test]
    fn message_property_checks_do_not_count_as_sender_guards() {
        // if (m.kind === "x") sendResponse(m);  guards on the payload,
        // not the sender.
        let doc = estree::program(vec![estree::expr_stmt(estree::call(
            estree::member(
                estree::member(
                    estree::member(estree::ident("chrome"), "runtime"),
                    "onMessage",
                ),
                "addListener",
            ),
            vec![estree::arrow(
                vec![
                    estree::ident("m"),
                    estree::ident("s"),
                    estree::ident("sendResponse"),
                ],
                vec![estree::if_stmt(
                    estree::binary(
                        "===",
                        estree::member(estree::ident("m"), "kind"),
                        estree::literal_str("x"),
                    ),
                    estree::expr_stmt(estree::call(
                        estree::ident("sendResponse"),
                        vec![estree::ident("m")],
                    )),
                    None,
                )],
            )],
        ))]);
        let fixture = Fixture::new(doc);
        let deps = DataDeps::new(
            &fixture.tree,
            &fixture.scopes,
            &fixture.cfg,
            &fixture.calls,
            100_000,
        );
        let engine = FlowEngine::new(&deps, 64);
        let sender = fixture
            .tree
            .ids()
            .find(|&id| fixture.tree.node(id).identifier_name() == Some("s"))
            .unwrap();
        let sink_call = fixture
            .tree
            .ids()
            .filter(|&id| {
                matches!(fixture.tree.kind(id), NodeKind::CallExpression { .. })
            })
            .last()
            .unwrap();
        assert!(!is_sender_guarded(
            &fixture.tree,
            &fixture.scopes,
            &engine,
            sink_call,
            Some(sender),
        ));
    }
}
