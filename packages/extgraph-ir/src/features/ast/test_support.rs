//! ESTree fixture builders for the test suites.
//!
//! Structure-only tests use the bare constructors (zero spans). Tests that
//! assert on locations or `line_of_code` build a [`estree::Src`] from the
//! literal JavaScript text and derive every span from it, so a fixture can
//! never disagree with its own source.

use crate::features::ast::domain::{NodeId, SyntaxTree};
use crate::features::ast::infrastructure::ingest::ingest_document;
use crate::shared::models::{ByteRange, Span};

/// Ingest a fixture and stamp every node with synthetic document-order
/// positions (interval-encoded over the pre-order ids). Gives fixtures
/// built without explicit `loc` data a consistent "earlier in source"
/// relation, which the def-use ordering rules depend on.
pub fn ingest_positioned(file: &str, doc: &serde_json::Value) -> SyntaxTree {
    let mut tree = ingest_document(file, doc).expect("fixture must ingest");
    let ids: Vec<NodeId> = tree.ids().collect();
    for &id in &ids {
        let start = 2 * id.0;
        let end = 2 * subtree_max(&tree, id) + 1;
        tree.set_span(id, Span::new(1, start, 1, end), ByteRange::new(start, end));
    }
    tree
}

fn subtree_max(tree: &SyntaxTree, id: NodeId) -> u32 {
    tree.children(id)
        .into_iter()
        .map(|child| subtree_max(tree, child))
        .max()
        .map_or(id.0, |m| m.max(id.0))
}

pub mod estree {
    use serde_json::{json, Value};

    /// One token's byte range and line/column span inside a [`Src`].
    #[derive(Debug, Clone, Copy)]
    pub struct Tok {
        pub start_offset: u32,
        pub end_offset: u32,
        pub start_line: u32,
        pub start_col: u32,
        pub end_line: u32,
        pub end_col: u32,
    }

    /// Literal source text with token lookup; spans are computed, never
    /// hand-counted.
    pub struct Src {
        text: String,
    }

    impl Src {
        pub fn new(text: impl Into<String>) -> Self {
            Self { text: text.into() }
        }

        pub fn text(&self) -> &str {
            &self.text
        }

        /// Span of the `nth` (1-based) occurrence of `needle`, matched on
        /// word boundaries so `s` never matches inside `sendResponse`.
        pub fn tok(&self, needle: &str, nth: usize) -> Tok {
            let bytes = self.text.as_bytes();
            let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$';
            let needle_is_word = needle.bytes().all(is_word);
            let mut seen = 0;
            let mut from = 0;
            while let Some(pos) = self.text[from..].find(needle) {
                let start = from + pos;
                let end = start + needle.len();
                let bounded = !needle_is_word
                    || ((start == 0 || !is_word(bytes[start - 1]))
                        && (end == bytes.len() || !is_word(bytes[end])));
                if bounded {
                    seen += 1;
                    if seen == nth {
                        return self.span_of(start, end);
                    }
                }
                from = start + 1;
            }
            panic!("token `{needle}` #{nth} not found in fixture source");
        }

        /// Span from the start of `from` to the end of `to`.
        pub fn between(&self, from: Tok, to: Tok) -> Tok {
            self.span_of(from.start_offset as usize, to.end_offset as usize)
        }

        /// Span of the whole source.
        pub fn all(&self) -> Tok {
            self.span_of(0, self.text.len())
        }

        fn span_of(&self, start: usize, end: usize) -> Tok {
            let line_col = |offset: usize| {
                let before = &self.text[..offset];
                let line = before.matches('\n').count() as u32 + 1;
                let col = before
                    .rfind('\n')
                    .map(|nl| offset - nl - 1)
                    .unwrap_or(offset) as u32;
                (line, col)
            };
            let (start_line, start_col) = line_col(start);
            let (end_line, end_col) = line_col(end);
            Tok {
                start_offset: start as u32,
                end_offset: end as u32,
                start_line,
                start_col,
                end_line,
                end_col,
            }
        }
    }

    /// Attach a real range/loc to a node built by the bare constructors.
    pub fn at(mut node: Value, tok: Tok) -> Value {
        let obj = node.as_object_mut().expect("estree node");
        obj.insert(
            "range".to_owned(),
            json!([tok.start_offset, tok.end_offset]),
        );
        obj.insert(
            "loc".to_owned(),
            json!({
                "start": {"line": tok.start_line, "column": tok.start_col},
                "end": {"line": tok.end_line, "column": tok.end_col},
            }),
        );
        node
    }

    pub fn program(body: Vec<Value>) -> Value {
        json!({"type": "Program", "body": body})
    }

    pub fn ident(name: &str) -> Value {
        json!({"type": "Identifier", "name": name})
    }

    pub fn literal_str(value: &str) -> Value {
        json!({"type": "Literal", "value": value})
    }

    pub fn literal_num(value: f64) -> Value {
        json!({"type": "Literal", "value": value})
    }

    pub fn literal_null() -> Value {
        json!({"type": "Literal", "value": null})
    }

    pub fn literal_bool(value: bool) -> Value {
        json!({"type": "Literal", "value": value})
    }

    pub fn expr_stmt(expression: Value) -> Value {
        json!({"type": "ExpressionStatement", "expression": expression})
    }

    pub fn member(object: Value, property: &str) -> Value {
        json!({
            "type": "MemberExpression",
            "object": object,
            "property": ident(property),
            "computed": false,
        })
    }

    pub fn computed_member(object: Value, property: Value) -> Value {
        json!({
            "type": "MemberExpression",
            "object": object,
            "property": property,
            "computed": true,
        })
    }

    pub fn call(callee: Value, arguments: Vec<Value>) -> Value {
        json!({"type": "CallExpression", "callee": callee, "arguments": arguments})
    }

    pub fn assign(left: Value, right: Value) -> Value {
        json!({
            "type": "AssignmentExpression",
            "operator": "=",
            "left": left,
            "right": right,
        })
    }

    pub fn var_decl(kind: &str, declarators: Vec<Value>) -> Value {
        json!({"type": "VariableDeclaration", "kind": kind, "declarations": declarators})
    }

    pub fn declarator(id: Value, init: Option<Value>) -> Value {
        json!({
            "type": "VariableDeclarator",
            "id": id,
            "init": init.unwrap_or(Value::Null),
        })
    }

    /// `let <name> = <init>;`
    pub fn let_decl(name: &str, init: Value) -> Value {
        var_decl("let", vec![declarator(ident(name), Some(init))])
    }

    pub fn const_decl(name: &str, init: Value) -> Value {
        var_decl("const", vec![declarator(ident(name), Some(init))])
    }

    pub fn block(body: Vec<Value>) -> Value {
        json!({"type": "BlockStatement", "body": body})
    }

    pub fn function_decl(name: &str, params: Vec<Value>, body: Vec<Value>) -> Value {
        json!({
            "type": "FunctionDeclaration",
            "id": ident(name),
            "params": params,
            "body": block(body),
            "async": false,
            "generator": false,
        })
    }

    pub fn function_expr(name: Option<&str>, params: Vec<Value>, body: Vec<Value>) -> Value {
        json!({
            "type": "FunctionExpression",
            "id": name.map(ident).unwrap_or(Value::Null),
            "params": params,
            "body": block(body),
            "async": false,
            "generator": false,
        })
    }

    pub fn arrow(params: Vec<Value>, body: Vec<Value>) -> Value {
        json!({
            "type": "ArrowFunctionExpression",
            "params": params,
            "body": block(body),
            "expression": false,
            "async": false,
        })
    }

    /// Arrow with a bare expression body.
    pub fn arrow_expr(params: Vec<Value>, body: Value) -> Value {
        json!({
            "type": "ArrowFunctionExpression",
            "params": params,
            "body": body,
            "expression": true,
            "async": false,
        })
    }

    pub fn ret(argument: Option<Value>) -> Value {
        json!({
            "type": "ReturnStatement",
            "argument": argument.unwrap_or(Value::Null),
        })
    }

    pub fn if_stmt(test: Value, consequent: Value, alternate: Option<Value>) -> Value {
        json!({
            "type": "IfStatement",
            "test": test,
            "consequent": consequent,
            "alternate": alternate.unwrap_or(Value::Null),
        })
    }

    pub fn binary(operator: &str, left: Value, right: Value) -> Value {
        json!({
            "type": "BinaryExpression",
            "operator": operator,
            "left": left,
            "right": right,
        })
    }

    pub fn logical(operator: &str, left: Value, right: Value) -> Value {
        json!({
            "type": "LogicalExpression",
            "operator": operator,
            "left": left,
            "right": right,
        })
    }

    pub fn unary(operator: &str, argument: Value) -> Value {
        json!({"type": "UnaryExpression", "operator": operator, "argument": argument})
    }

    pub fn object(properties: Vec<Value>) -> Value {
        json!({"type": "ObjectExpression", "properties": properties})
    }

    pub fn property(key: &str, value: Value) -> Value {
        json!({
            "type": "Property",
            "key": ident(key),
            "value": value,
            "kind": "init",
            "computed": false,
            "shorthand": false,
        })
    }

    pub fn object_pattern(properties: Vec<Value>) -> Value {
        json!({"type": "ObjectPattern", "properties": properties})
    }

    /// Shorthand destructuring entry `{ name }`.
    pub fn pattern_property(name: &str) -> Value {
        json!({
            "type": "Property",
            "key": ident(name),
            "value": ident(name),
            "kind": "init",
            "computed": false,
            "shorthand": true,
        })
    }

    pub fn array(elements: Vec<Value>) -> Value {
        json!({"type": "ArrayExpression", "elements": elements})
    }
}
