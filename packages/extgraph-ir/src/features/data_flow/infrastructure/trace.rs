//! Flow rendering: occurrence paths → numbered report records.

use crate::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use crate::features::data_flow::domain::flow::{FlowPath, FlowStep};
use crate::shared::utils::SourceText;

/// Render one path. Hops number from 1 consecutively.
pub fn render_flow(tree: &SyntaxTree, source: &SourceText, path: &FlowPath) -> Vec<FlowStep> {
    path.occurrences
        .iter()
        .enumerate()
        .map(|(index, &occurrence)| render_step(tree, source, occurrence, index + 1))
        .collect()
}

pub fn render_step(
    tree: &SyntaxTree,
    source: &SourceText,
    occurrence: NodeId,
    no: usize,
) -> FlowStep {
    let span = tree.span(occurrence);
    let identifier = match tree.kind(occurrence) {
        NodeKind::Identifier { name } => name.clone(),
        other => other.type_name().to_owned(),
    };
    FlowStep {
        no,
        location: span.render(),
        filename: tree.file.clone(),
        identifier,
        line_of_code: source.line(span.start.line).to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ast::infrastructure::ingest::ingest_document;
    use crate::features::ast::test_support::estree;
    use serde_json::json;

    #[test]
    fn steps_carry_location_identifier_and_line() {
        let src = estree::Src::new("let data = 1;\nsend(data);\n");
        let decl_tok = src.tok("data", 1);
        let use_tok = src.tok("data", 2);
        let doc = json!({
            "type": "Program",
            "body": [
                estree::at(
                    estree::var_decl(
                        "let",
                        vec![estree::at(
                            estree::declarator(
                                estree::at(estree::ident("data"), decl_tok),
                                Some(estree::literal_num(1.0)),
                            ),
                            src.between(decl_tok, src.tok("1", 1)),
                        )],
                    ),
                    src.between(src.tok("let", 1), src.tok("1", 1)),
                ),
                estree::at(
                    estree::expr_stmt(estree::call(
                        estree::at(estree::ident("send"), src.tok("send", 1)),
                        vec![estree::at(estree::ident("data"), use_tok)],
                    )),
                    src.between(src.tok("send", 1), use_tok),
                ),
            ],
        });
        let tree = ingest_document("bg.js", &doc).unwrap();
        let source = SourceText::new(src.text());
        let decl = tree
            .ids()
            .find(|&id| tree.node(id).identifier_name() == Some("data"))
            .unwrap();
        let use_occ = tree
            .ids()
            .filter(|&id| tree.node(id).identifier_name() == Some("data"))
            .last()
            .unwrap();
        let path = FlowPath {
            occurrences: vec![decl, use_occ],
            truncated: false,
        };
        let steps = render_flow(&tree, &source, &path);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].no, 1);
        assert_eq!(steps[0].location, "1:4 - 1:8");
        assert_eq!(steps[0].identifier, "data");
        assert_eq!(steps[0].line_of_code, "let data = 1;");
        assert_eq!(steps[1].no, 2);
        assert_eq!(steps[1].location, "2:5 - 2:9");
        assert_eq!(steps[1].filename, "bg.js");
        assert_eq!(steps[1].line_of_code, "send(data);");
    }
}
