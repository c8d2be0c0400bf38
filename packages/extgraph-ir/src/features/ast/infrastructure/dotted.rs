//! Dotted-name rendering for member chains.
//!
//! `chrome.storage.local.get` style names key the API profile tables, so
//! a member chain made of identifiers, `this`, and literal computed keys
//! collapses to one string. Anything dynamic yields `None`.

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};

/// Render a callee (or any expression) as a dotted path, if it is static.
pub fn dotted_name(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    let mut segments = Vec::new();
    collect(tree, id, &mut segments)?;
    Some(segments.join("."))
}

/// The base identifier of a member chain: `a` in `a.b.c`, or the
/// identifier itself.
pub fn member_root(tree: &SyntaxTree, id: NodeId) -> NodeId {
    match tree.kind(id) {
        NodeKind::MemberExpression { object, .. } => member_root(tree, *object),
        NodeKind::ChainExpression { expression } => member_root(tree, *expression),
        _ => id,
    }
}

/// Non-computed (or literal-computed) property names along a member chain,
/// base excluded: `["b", "c"]` for `a.b.c`.
pub fn member_path(tree: &SyntaxTree, id: NodeId) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = id;
    loop {
        match tree.kind(current) {
            NodeKind::MemberExpression {
                object, property, ..
            } => {
                if let Some(name) = property_name(tree, *property) {
                    path.push(name);
                }
                current = *object;
            }
            NodeKind::ChainExpression { expression } => current = *expression,
            _ => break,
        }
    }
    path.reverse();
    path
}

fn collect(tree: &SyntaxTree, id: NodeId, out: &mut Vec<String>) -> Option<()> {
    match tree.kind(id) {
        NodeKind::Identifier { name } => {
            out.push(name.clone());
            Some(())
        }
        NodeKind::ThisExpression => {
            out.push("this".to_owned());
            Some(())
        }
        NodeKind::ChainExpression { expression } => collect(tree, *expression, out),
        NodeKind::MemberExpression {
            object, property, ..
        } => {
            collect(tree, *object, out)?;
            out.push(property_name(tree, *property)?);
            Some(())
        }
        _ => None,
    }
}

/// Property position as a name: a non-computed identifier, or a literal
/// string/number computed key.
pub fn property_name(tree: &SyntaxTree, property: NodeId) -> Option<String> {
    let parent_computed = match tree.parent(property).map(|p| tree.kind(p)) {
        Some(NodeKind::MemberExpression { computed, .. }) => *computed,
        Some(NodeKind::Property { computed, .. }) => *computed,
        _ => false,
    };
    match tree.kind(property) {
        NodeKind::Identifier { name } if !parent_computed => Some(name.clone()),
        NodeKind::PrivateIdentifier { name } => Some(format!("#{name}")),
        NodeKind::Literal { value } => match value {
            crate::features::ast::domain::LiteralValue::String(s) => Some(s.clone()),
            crate::features::ast::domain::LiteralValue::Number(n) => Some(format!("{n}")),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::infrastructure::ingest::ingest_document;
    use crate::features::ast::test_support::estree;

    #[test]
    fn renders_plain_member_chains() {
        // chrome.runtime.onMessage.addListener(cb)
        let tree = ingest_document(
            "bg.js",
            &estree::program(vec![estree::expr_stmt(estree::call(
                estree::member(
                    estree::member(
                        estree::member(estree::ident("chrome"), "runtime"),
                        "onMessage",
                    ),
                    "addListener",
                ),
                vec![estree::ident("cb")],
            ))]),
        )
        .unwrap();
        let stmt = tree.children(tree.root)[0];
        let call = tree.children(stmt)[0];
        let callee = tree.children(call)[0];
        assert_eq!(
            dotted_name(&tree, callee).as_deref(),
            Some("chrome.runtime.onMessage.addListener")
        );
        assert_eq!(
            member_path(&tree, callee),
            vec!["runtime", "onMessage", "addListener"]
        );
        let root = member_root(&tree, callee);
        assert_eq!(tree.node(root).identifier_name(), Some("chrome"));
    }

    #[test]
    fn dynamic_chains_are_not_dotted() {
        // obj[key].run()
        let tree = ingest_document(
            "bg.js",
            &estree::program(vec![estree::expr_stmt(estree::call(
                estree::member(
                    estree::computed_member(estree::ident("obj"), estree::ident("key")),
                    "run",
                ),
                vec![],
            ))]),
        )
        .unwrap();
        let stmt = tree.children(tree.root)[0];
        let call = tree.children(stmt)[0];
        let callee = tree.children(call)[0];
        assert_eq!(dotted_name(&tree, callee), None);
    }
}
