//! ESTree JSON → typed arena.
//!
//! The external parser emits one JSON document per file: nodes carry
//! `type`, `range: [start, end]`, `loc: {start: {line, column}, end: ...}`
//! and kind-specific fields. Ingest walks the document once, assigning
//! arena ids in document order and normalizing locations. Unknown node
//! kinds are kept as `Unknown` with their children ordered by source
//! position, so later passes never lose a subtree.

use serde_json::Value;

use crate::features::ast::domain::{
    DeclKind, LiteralValue, Node, NodeId, NodeKind, PropertyKind, SyntaxTree,
};
use crate::shared::models::{AnalysisError, AnalysisResult, ByteRange, Location, Span};

pub fn ingest_document(file: &str, document: &Value) -> AnalysisResult<SyntaxTree> {
    let mut builder = Builder {
        file,
        nodes: Vec::new(),
    };
    let root = builder.build(document, None)?;
    match builder.nodes[root.index()].kind {
        NodeKind::Program { .. } => {}
        _ => {
            return Err(AnalysisError::parse(
                file,
                format!(
                    "document root is {}, expected Program",
                    builder.nodes[root.index()].kind.type_name()
                ),
            ))
        }
    }
    Ok(SyntaxTree::from_parts(file.to_owned(), root, builder.nodes))
}

/// Convenience entry for JSON text (the subprocess output file).
pub fn ingest_json(file: &str, text: &str) -> AnalysisResult<SyntaxTree> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| AnalysisError::parse(file, format!("invalid AST JSON: {e}")))?;
    ingest_document(file, &document)
}

struct Builder<'a> {
    file: &'a str,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn build(&mut self, value: &Value, parent: Option<NodeId>) -> AnalysisResult<NodeId> {
        let obj = value
            .as_object()
            .ok_or_else(|| AnalysisError::parse(self.file, "node is not an object"))?;
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AnalysisError::parse(self.file, "node without a type"))?
            .to_owned();

        // Reserve the slot first so ids follow document pre-order.
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            parent,
            span: read_span(value),
            range: read_range(value),
            kind: NodeKind::EmptyStatement,
        });

        let kind = self.build_kind(&type_name, value, id)?;
        self.nodes[id.index()].kind = kind;
        Ok(id)
    }

    fn build_kind(
        &mut self,
        type_name: &str,
        value: &Value,
        id: NodeId,
    ) -> AnalysisResult<NodeKind> {
        let kind = match type_name {
            "Program" => NodeKind::Program {
                body: self.node_list(value, "body", id)?,
            },
            "FunctionDeclaration" => NodeKind::FunctionDeclaration {
                ident: self.opt_node(value, "id", id)?,
                params: self.node_list(value, "params", id)?,
                body: self.req_node(value, "body", id)?,
                is_async: bool_field(value, "async"),
                is_generator: bool_field(value, "generator"),
            },
            "FunctionExpression" => NodeKind::FunctionExpression {
                ident: self.opt_node(value, "id", id)?,
                params: self.node_list(value, "params", id)?,
                body: self.req_node(value, "body", id)?,
                is_async: bool_field(value, "async"),
                is_generator: bool_field(value, "generator"),
            },
            "ArrowFunctionExpression" => NodeKind::ArrowFunctionExpression {
                params: self.node_list(value, "params", id)?,
                body: self.req_node(value, "body", id)?,
                expression: bool_field(value, "expression"),
                is_async: bool_field(value, "async"),
            },
            "BlockStatement" | "StaticBlock" => NodeKind::BlockStatement {
                body: self.node_list(value, "body", id)?,
            },
            "VariableDeclaration" => NodeKind::VariableDeclaration {
                kind: match value.get("kind").and_then(Value::as_str) {
                    Some("let") => DeclKind::Let,
                    Some("const") => DeclKind::Const,
                    _ => DeclKind::Var,
                },
                declarations: self.node_list(value, "declarations", id)?,
            },
            "VariableDeclarator" => NodeKind::VariableDeclarator {
                id: self.req_node(value, "id", id)?,
                init: self.opt_node(value, "init", id)?,
            },
            "Identifier" => NodeKind::Identifier {
                name: str_field(value, "name").unwrap_or_default(),
            },
            "PrivateIdentifier" => NodeKind::PrivateIdentifier {
                name: str_field(value, "name").unwrap_or_default(),
            },
            "Literal" => NodeKind::Literal {
                value: read_literal(value),
            },
            "TemplateLiteral" => NodeKind::TemplateLiteral {
                quasis: self.node_list(value, "quasis", id)?,
                expressions: self.node_list(value, "expressions", id)?,
            },
            "TemplateElement" => NodeKind::TemplateElement {
                cooked: value
                    .get("value")
                    .and_then(|v| v.get("cooked"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            "TaggedTemplateExpression" => NodeKind::TaggedTemplateExpression {
                tag: self.req_node(value, "tag", id)?,
                quasi: self.req_node(value, "quasi", id)?,
            },
            "MemberExpression" => NodeKind::MemberExpression {
                object: self.req_node(value, "object", id)?,
                property: self.req_node(value, "property", id)?,
                computed: bool_field(value, "computed"),
            },
            "CallExpression" => NodeKind::CallExpression {
                callee: self.req_node(value, "callee", id)?,
                arguments: self.node_list(value, "arguments", id)?,
            },
            "NewExpression" => NodeKind::NewExpression {
                callee: self.req_node(value, "callee", id)?,
                arguments: self.node_list(value, "arguments", id)?,
            },
            "AssignmentExpression" => NodeKind::AssignmentExpression {
                operator: str_field(value, "operator").unwrap_or_else(|| "=".to_owned()),
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
            },
            "UpdateExpression" => NodeKind::UpdateExpression {
                operator: str_field(value, "operator").unwrap_or_default(),
                argument: self.req_node(value, "argument", id)?,
                prefix: bool_field(value, "prefix"),
            },
            "UnaryExpression" => NodeKind::UnaryExpression {
                operator: str_field(value, "operator").unwrap_or_default(),
                argument: self.req_node(value, "argument", id)?,
            },
            "BinaryExpression" => NodeKind::BinaryExpression {
                operator: str_field(value, "operator").unwrap_or_default(),
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
            },
            "LogicalExpression" => NodeKind::LogicalExpression {
                operator: str_field(value, "operator").unwrap_or_default(),
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
            },
            "ConditionalExpression" => NodeKind::ConditionalExpression {
                test: self.req_node(value, "test", id)?,
                consequent: self.req_node(value, "consequent", id)?,
                alternate: self.req_node(value, "alternate", id)?,
            },
            "SequenceExpression" => NodeKind::SequenceExpression {
                expressions: self.node_list(value, "expressions", id)?,
            },
            "IfStatement" => NodeKind::IfStatement {
                test: self.req_node(value, "test", id)?,
                consequent: self.req_node(value, "consequent", id)?,
                alternate: self.opt_node(value, "alternate", id)?,
            },
            "ForStatement" => NodeKind::ForStatement {
                init: self.opt_node(value, "init", id)?,
                test: self.opt_node(value, "test", id)?,
                update: self.opt_node(value, "update", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ForInStatement" => NodeKind::ForInStatement {
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ForOfStatement" => NodeKind::ForOfStatement {
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "WhileStatement" => NodeKind::WhileStatement {
                test: self.req_node(value, "test", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "DoWhileStatement" => NodeKind::DoWhileStatement {
                body: self.req_node(value, "body", id)?,
                test: self.req_node(value, "test", id)?,
            },
            "SwitchStatement" => NodeKind::SwitchStatement {
                discriminant: self.req_node(value, "discriminant", id)?,
                cases: self.node_list(value, "cases", id)?,
            },
            "SwitchCase" => NodeKind::SwitchCase {
                test: self.opt_node(value, "test", id)?,
                consequent: self.node_list(value, "consequent", id)?,
            },
            "BreakStatement" => NodeKind::BreakStatement {
                label: self.opt_node(value, "label", id)?,
            },
            "ContinueStatement" => NodeKind::ContinueStatement {
                label: self.opt_node(value, "label", id)?,
            },
            "LabeledStatement" => NodeKind::LabeledStatement {
                label: self.req_node(value, "label", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ReturnStatement" => NodeKind::ReturnStatement {
                argument: self.opt_node(value, "argument", id)?,
            },
            "ThrowStatement" => NodeKind::ThrowStatement {
                argument: self.req_node(value, "argument", id)?,
            },
            "TryStatement" => NodeKind::TryStatement {
                block: self.req_node(value, "block", id)?,
                handler: self.opt_node(value, "handler", id)?,
                finalizer: self.opt_node(value, "finalizer", id)?,
            },
            "CatchClause" => NodeKind::CatchClause {
                param: self.opt_node(value, "param", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ExpressionStatement" | "Directive" => NodeKind::ExpressionStatement {
                expression: self.req_node(value, "expression", id)?,
            },
            "EmptyStatement" => NodeKind::EmptyStatement,
            "DebuggerStatement" => NodeKind::DebuggerStatement,
            "WithStatement" => NodeKind::WithStatement {
                object: self.req_node(value, "object", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ObjectExpression" => NodeKind::ObjectExpression {
                properties: self.node_list(value, "properties", id)?,
            },
            "Property" | "ObjectProperty" => NodeKind::Property {
                key: self.req_node(value, "key", id)?,
                value: self.req_node(value, "value", id)?,
                kind: match value.get("kind").and_then(Value::as_str) {
                    Some("get") => PropertyKind::Get,
                    Some("set") => PropertyKind::Set,
                    _ => PropertyKind::Init,
                },
                computed: bool_field(value, "computed"),
                shorthand: bool_field(value, "shorthand"),
            },
            "SpreadElement" => NodeKind::SpreadElement {
                argument: self.req_node(value, "argument", id)?,
            },
            "ArrayExpression" => NodeKind::ArrayExpression {
                elements: self.sparse_list(value, "elements", id)?,
            },
            "ObjectPattern" => NodeKind::ObjectPattern {
                properties: self.node_list(value, "properties", id)?,
            },
            "ArrayPattern" => NodeKind::ArrayPattern {
                elements: self.sparse_list(value, "elements", id)?,
            },
            "RestElement" => NodeKind::RestElement {
                argument: self.req_node(value, "argument", id)?,
            },
            "AssignmentPattern" => NodeKind::AssignmentPattern {
                left: self.req_node(value, "left", id)?,
                right: self.req_node(value, "right", id)?,
            },
            "ClassDeclaration" => NodeKind::ClassDeclaration {
                ident: self.opt_node(value, "id", id)?,
                super_class: self.opt_node(value, "superClass", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ClassExpression" => NodeKind::ClassExpression {
                ident: self.opt_node(value, "id", id)?,
                super_class: self.opt_node(value, "superClass", id)?,
                body: self.req_node(value, "body", id)?,
            },
            "ClassBody" => NodeKind::ClassBody {
                body: self.node_list(value, "body", id)?,
            },
            "MethodDefinition" => NodeKind::MethodDefinition {
                key: self.req_node(value, "key", id)?,
                value: self.req_node(value, "value", id)?,
                kind: str_field(value, "kind").unwrap_or_else(|| "method".to_owned()),
                computed: bool_field(value, "computed"),
                is_static: bool_field(value, "static"),
            },
            "PropertyDefinition" => NodeKind::PropertyDefinition {
                key: self.req_node(value, "key", id)?,
                value: self.opt_node(value, "value", id)?,
                computed: bool_field(value, "computed"),
                is_static: bool_field(value, "static"),
            },
            "ThisExpression" => NodeKind::ThisExpression,
            "Super" => NodeKind::Super,
            "AwaitExpression" => NodeKind::AwaitExpression {
                argument: self.req_node(value, "argument", id)?,
            },
            "YieldExpression" => NodeKind::YieldExpression {
                argument: self.opt_node(value, "argument", id)?,
                delegate: bool_field(value, "delegate"),
            },
            "ChainExpression" | "ParenthesizedExpression" => NodeKind::ChainExpression {
                expression: self.req_node(value, "expression", id)?,
            },
            "ImportDeclaration" => NodeKind::ImportDeclaration {
                specifiers: self.node_list(value, "specifiers", id)?,
                source: self.req_node(value, "source", id)?,
            },
            "ImportSpecifier" | "ImportDefaultSpecifier" | "ImportNamespaceSpecifier" => {
                NodeKind::ImportSpecifier {
                    local: self.req_node(value, "local", id)?,
                }
            }
            "ExportNamedDeclaration" => NodeKind::ExportNamedDeclaration {
                declaration: self.opt_node(value, "declaration", id)?,
            },
            "ExportDefaultDeclaration" => NodeKind::ExportDefaultDeclaration {
                declaration: self.req_node(value, "declaration", id)?,
            },
            _ => self.build_unknown(type_name, value, id)?,
        };
        Ok(kind)
    }

    /// Kinds outside the analyzed subset keep their children, ordered by
    /// source position since JSON object field order is not reliable here.
    fn build_unknown(
        &mut self,
        type_name: &str,
        value: &Value,
        id: NodeId,
    ) -> AnalysisResult<NodeKind> {
        let mut children = Vec::new();
        if let Some(obj) = value.as_object() {
            for (field, field_value) in obj {
                if field == "loc" || field == "range" {
                    continue;
                }
                match field_value {
                    Value::Object(inner) if inner.contains_key("type") => {
                        children.push(self.build(field_value, Some(id))?);
                    }
                    Value::Array(items) => {
                        for item in items {
                            if item
                                .as_object()
                                .map(|o| o.contains_key("type"))
                                .unwrap_or(false)
                            {
                                children.push(self.build(item, Some(id))?);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        children.sort_by_key(|&child| {
            let node = &self.nodes[child.index()];
            (node.range.start, node.id)
        });
        Ok(NodeKind::Unknown {
            type_name: type_name.to_owned(),
            children,
        })
    }

    fn req_node(&mut self, value: &Value, field: &str, parent: NodeId) -> AnalysisResult<NodeId> {
        match value.get(field) {
            Some(child) if !child.is_null() => self.build(child, Some(parent)),
            _ => Err(AnalysisError::parse(
                self.file,
                format!("missing required field `{field}`"),
            )),
        }
    }

    fn opt_node(
        &mut self,
        value: &Value,
        field: &str,
        parent: NodeId,
    ) -> AnalysisResult<Option<NodeId>> {
        match value.get(field) {
            Some(child) if !child.is_null() => Ok(Some(self.build(child, Some(parent))?)),
            _ => Ok(None),
        }
    }

    fn node_list(
        &mut self,
        value: &Value,
        field: &str,
        parent: NodeId,
    ) -> AnalysisResult<Vec<NodeId>> {
        match value.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.build(item, Some(parent)))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Array elements where holes (`[a, , b]`) come through as null.
    fn sparse_list(
        &mut self,
        value: &Value,
        field: &str,
        parent: NodeId,
    ) -> AnalysisResult<Vec<Option<NodeId>>> {
        match value.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    if item.is_null() {
                        Ok(None)
                    } else {
                        self.build(item, Some(parent)).map(Some)
                    }
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }
}

fn read_span(value: &Value) -> Span {
    let loc = value.get("loc");
    let pos = |which: &str| -> Location {
        let point = loc.and_then(|l| l.get(which));
        Location::new(
            point
                .and_then(|p| p.get("line"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
            point
                .and_then(|p| p.get("column"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
        )
    };
    Span {
        start: pos("start"),
        end: pos("end"),
    }
}

fn read_range(value: &Value) -> ByteRange {
    if let Some(range) = value.get("range").and_then(Value::as_array) {
        let at = |i: usize| range.get(i).and_then(Value::as_u64).unwrap_or(0) as u32;
        return ByteRange::new(at(0), at(1));
    }
    // Some parsers emit flat start/end offsets instead of a range pair.
    let at = |field: &str| value.get(field).and_then(Value::as_u64).unwrap_or(0) as u32;
    ByteRange::new(at("start"), at("end"))
}

fn read_literal(value: &Value) -> LiteralValue {
    if value.get("regex").is_some() {
        return LiteralValue::Regex(
            value
                .get("raw")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        );
    }
    if let Some(bigint) = value.get("bigint").and_then(Value::as_str) {
        return LiteralValue::BigInt(bigint.to_owned());
    }
    match value.get("value") {
        Some(Value::String(s)) => LiteralValue::String(s.clone()),
        Some(Value::Number(n)) => LiteralValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::Bool(b)) => LiteralValue::Boolean(*b),
        _ => LiteralValue::Null,
    }
}

fn bool_field(value: &Value, field: &str) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingest_assigns_ids_in_document_order() {
        let doc = json!({
            "type": "Program",
            "range": [0, 10],
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 10}},
            "body": [{
                "type": "VariableDeclaration",
                "kind": "let",
                "range": [0, 10],
                "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 10}},
                "declarations": [{
                    "type": "VariableDeclarator",
                    "range": [4, 9],
                    "loc": {"start": {"line": 1, "column": 4}, "end": {"line": 1, "column": 9}},
                    "id": {
                        "type": "Identifier",
                        "name": "a",
                        "range": [4, 5],
                        "loc": {"start": {"line": 1, "column": 4}, "end": {"line": 1, "column": 5}}
                    },
                    "init": {
                        "type": "Literal",
                        "value": 1,
                        "range": [8, 9],
                        "loc": {"start": {"line": 1, "column": 8}, "end": {"line": 1, "column": 9}}
                    }
                }]
            }]
        });
        let tree = ingest_document("bg.js", &doc).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root, NodeId(0));
        let decl = tree.children(tree.root)[0];
        assert!(matches!(
            tree.kind(decl),
            NodeKind::VariableDeclaration { kind: DeclKind::Let, .. }
        ));
        let declarator = tree.children(decl)[0];
        let ident = tree.children(declarator)[0];
        assert_eq!(tree.node(ident).identifier_name(), Some("a"));
        assert_eq!(tree.span(ident).render(), "1:4 - 1:5");
        assert_eq!(tree.parent(ident), Some(declarator));
    }

    #[test]
    fn non_program_root_is_a_parse_failure() {
        let doc = json!({
            "type": "Identifier",
            "name": "x",
            "range": [0, 1],
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 1}}
        });
        assert!(ingest_document("bg.js", &doc).is_err());
    }

    #[test]
    fn unknown_kinds_keep_children_in_source_order() {
        let doc = json!({
            "type": "Program",
            "range": [0, 20],
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 20}},
            "body": [{
                "type": "FancyStatement",
                "range": [0, 20],
                "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 20}},
                // Field names chosen so alphabetical order differs from
                // source order.
                "zz_first": {
                    "type": "Identifier", "name": "early",
                    "range": [2, 7],
                    "loc": {"start": {"line": 1, "column": 2}, "end": {"line": 1, "column": 7}}
                },
                "aa_second": {
                    "type": "Identifier", "name": "late",
                    "range": [10, 14],
                    "loc": {"start": {"line": 1, "column": 10}, "end": {"line": 1, "column": 14}}
                }
            }]
        });
        let tree = ingest_document("cs.js", &doc).unwrap();
        let fancy = tree.children(tree.root)[0];
        let children = tree.children(fancy);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.node(children[0]).identifier_name(), Some("early"));
        assert_eq!(tree.node(children[1]).identifier_name(), Some("late"));
    }
}
