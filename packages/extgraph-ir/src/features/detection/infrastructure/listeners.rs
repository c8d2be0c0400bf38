//! Message-surface discovery.
//!
//! Finds the places where web content can talk to the extension:
//! `chrome.runtime.onMessage` (and `onMessageExternal`) listeners, port
//! `onMessage` listeners, `window.addEventListener("message")` handlers,
//! and `chrome.runtime.onConnect` handlers. Each listener records its
//! handler function and the attacker-facing parameter occurrences.

use crate::features::ast::domain::{LiteralValue, NodeId, NodeKind, SyntaxTree};
use crate::features::ast::infrastructure::dotted::dotted_name;
use crate::features::pdg::infrastructure::calls::{
    function_of_binding, params_of, pattern_leaves,
};
use crate::features::scoping::domain::ScopeTree;

use super::profiles::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    RuntimeOnMessage,
    PortOnMessage,
    WindowMessage,
    OnConnect,
}

impl ListenerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::RuntimeOnMessage => "chrome.runtime.onMessage",
            ListenerKind::PortOnMessage => "port.onMessage",
            ListenerKind::WindowMessage => "window message event",
            ListenerKind::OnConnect => "chrome.runtime.onConnect",
        }
    }
}

/// One discovered message listener.
#[derive(Debug, Clone)]
pub struct MessageListener {
    pub kind: ListenerKind,
    /// The `addListener` call expression.
    pub call: NodeId,
    /// The handler function node, when locally resolvable.
    pub handler: Option<NodeId>,
    /// Attacker-controlled payload parameter (message or event).
    pub message_param: Option<NodeId>,
    /// The sender parameter, when the surface has one.
    pub sender_param: Option<NodeId>,
    /// The `sendResponse` parameter, when the surface has one.
    pub send_response_param: Option<NodeId>,
}

pub fn find_listeners(tree: &SyntaxTree, scopes: &ScopeTree) -> Vec<MessageListener> {
    let mut listeners = Vec::new();
    for id in tree.ids() {
        let NodeKind::CallExpression { callee, arguments } = tree.kind(id) else {
            continue;
        };
        let Some(dotted) = dotted_name(tree, *callee).map(|d| normalize(&d)) else {
            continue;
        };

        if dotted == "chrome.runtime.onMessage.addListener"
            || dotted == "chrome.runtime.onMessageExternal.addListener"
        {
            if let Some(listener) = handler_listener(
                tree,
                scopes,
                id,
                arguments.first().copied(),
                ListenerKind::RuntimeOnMessage,
            ) {
                listeners.push(listener);
            }
        } else if dotted.ends_with(".onMessage.addListener") {
            if let Some(listener) = handler_listener(
                tree,
                scopes,
                id,
                arguments.first().copied(),
                ListenerKind::PortOnMessage,
            ) {
                listeners.push(listener);
            }
        } else if dotted == "chrome.runtime.onConnect.addListener"
            || dotted == "chrome.runtime.onConnectExternal.addListener"
        {
            if let Some(listener) = handler_listener(
                tree,
                scopes,
                id,
                arguments.first().copied(),
                ListenerKind::OnConnect,
            ) {
                listeners.push(listener);
            }
        } else if dotted == "window.addEventListener"
            || dotted == "self.addEventListener"
            || dotted == "addEventListener"
        {
            let is_message = arguments.first().is_some_and(|&event| {
                matches!(
                    tree.kind(event),
                    NodeKind::Literal {
                        value: LiteralValue::String(s)
                    } if s == "message"
                )
            });
            if is_message {
                if let Some(listener) = handler_listener(
                    tree,
                    scopes,
                    id,
                    arguments.get(1).copied(),
                    ListenerKind::WindowMessage,
                ) {
                    listeners.push(listener);
                }
            }
        }
    }
    listeners
}

fn handler_listener(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    call: NodeId,
    handler_arg: Option<NodeId>,
    kind: ListenerKind,
) -> Option<MessageListener> {
    let handler = handler_arg.and_then(|arg| resolve_handler(tree, scopes, arg));
    let params = handler
        .map(|function| params_of(tree, function))
        .unwrap_or_default();
    let leaf = |position: usize| {
        params
            .get(position)
            .map(|&pattern| pattern_leaves(tree, pattern))
            .and_then(|leaves| leaves.first().copied())
    };

    let (message_param, sender_param, send_response_param) = match kind {
        ListenerKind::RuntimeOnMessage => (leaf(0), leaf(1), leaf(2)),
        // Port listeners receive only the payload; the peer is on the port.
        ListenerKind::PortOnMessage => (leaf(0), None, None),
        // The event object carries both payload (.data) and origin.
        ListenerKind::WindowMessage => (leaf(0), leaf(0), None),
        // The port parameter is the attacker-facing object.
        ListenerKind::OnConnect => (leaf(0), leaf(0), None),
    };

    Some(MessageListener {
        kind,
        call,
        handler,
        message_param,
        sender_param,
        send_response_param,
    })
}

fn resolve_handler(tree: &SyntaxTree, scopes: &ScopeTree, arg: NodeId) -> Option<NodeId> {
    match tree.kind(arg) {
        NodeKind::FunctionExpression { .. } | NodeKind::ArrowFunctionExpression { .. } => {
            Some(arg)
        }
        NodeKind::Identifier { .. } => {
            let binding = scopes.resolution(arg)?;
            function_of_binding(tree, scopes, binding)
        }
        NodeKind::ChainExpression { expression } => resolve_handler(tree, scopes, *expression),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::test_support::{estree, ingest_positioned};
    use crate::features::scoping::infrastructure::resolver::resolve_scopes;

    fn listeners_of(doc: serde_json::Value) -> (SyntaxTree, Vec<MessageListener>) {
        let tree = ingest_positioned("bg.js", &doc);
        let scopes = resolve_scopes(&tree).unwrap();
        let listeners = find_listeners(&tree, &scopes);
        (tree, listeners)
    }

    fn runtime_listener_call(handler: serde_json::Value) -> serde_json::Value {
        estree::expr_stmt(estree::call(
            estree::member(
                estree::member(
                    estree::member(estree::ident("chrome"), "runtime"),
                    "onMessage",
                ),
                "addListener",
            ),
            vec![handler],
        ))
    }

    #[test]
    fn runtime_on_message_collects_all_three_params() {
        let (tree, listeners) = listeners_of(estree::program(vec![runtime_listener_call(
            estree::arrow(
                vec![
                    estree::ident("msg"),
                    estree::ident("sender"),
                    estree::ident("sendResponse"),
                ],
                vec![],
            ),
        )]));
        assert_eq!(listeners.len(), 1);
        let listener = &listeners[0];
        assert_eq!(listener.kind, ListenerKind::RuntimeOnMessage);
        assert!(listener.handler.is_some());
        assert_eq!(
            tree.node(listener.message_param.unwrap()).identifier_name(),
            Some("msg")
        );
        assert_eq!(
            tree.node(listener.sender_param.unwrap()).identifier_name(),
            Some("sender")
        );
        assert_eq!(
            tree.node(listener.send_response_param.unwrap())
                .identifier_name(),
            Some("sendResponse")
        );
    }

    #[test]
    fn named_handler_resolves_through_its_binding() {
        let (_, listeners) = listeners_of(estree::program(vec![
            estree::function_decl("onMsg", vec![estree::ident("m")], vec![]),
            runtime_listener_call(estree::ident("onMsg")),
        ]));
        assert_eq!(listeners.len(), 1);
        assert!(listeners[0].handler.is_some());
        assert!(listeners[0].message_param.is_some());
        assert!(listeners[0].sender_param.is_none());
    }

    #[test]
    fn browser_alias_and_ports_are_surfaces_too() {
        let (_, listeners) = listeners_of(estree::program(vec![
            estree::expr_stmt(estree::call(
                estree::member(
                    estree::member(
                        estree::member(estree::ident("browser"), "runtime"),
                        "onMessage",
                    ),
                    "addListener",
                ),
                vec![estree::arrow(vec![estree::ident("m")], vec![])],
            )),
            estree::expr_stmt(estree::call(
                estree::member(
                    estree::member(estree::ident("port"), "onMessage"),
                    "addListener",
                ),
                vec![estree::arrow(vec![estree::ident("payload")], vec![])],
            )),
        ]));
        assert_eq!(listeners.len(), 2);
        assert_eq!(listeners[0].kind, ListenerKind::RuntimeOnMessage);
        assert_eq!(listeners[1].kind, ListenerKind::PortOnMessage);
    }

    #[test]
    fn window_message_handler_is_found_by_event_name() {
        let (_, listeners) = listeners_of(estree::program(vec![estree::expr_stmt(
            estree::call(
                estree::member(estree::ident("window"), "addEventListener"),
                vec![
                    estree::literal_str("message"),
                    estree::arrow(vec![estree::ident("event")], vec![]),
                ],
            ),
        )]));
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].kind, ListenerKind::WindowMessage);
        // Click handlers are not message surfaces.
        let (_, none) = listeners_of(estree::program(vec![estree::expr_stmt(estree::call(
            estree::member(estree::ident("window"), "addEventListener"),
            vec![
                estree::literal_str("click"),
                estree::arrow(vec![estree::ident("event")], vec![]),
            ],
        ))]));
        assert!(none.is_empty());
    }
}
