//! Location fidelity: flow records must point at the exact spans and
//! line text of the original source.

use pretty_assertions::assert_eq;
use serde_json::json;

use extgraph_ir::config::AnalysisConfig;
use extgraph_ir::features::ast::test_support::estree::{self, Src, Tok};
use extgraph_ir::ingest_document;
use extgraph_ir::pipeline::file_analysis::analyze_tree;
use extgraph_ir::ApiProfiles;

fn loc(tok: Tok) -> String {
    format!(
        "{}:{} - {}:{}",
        tok.start_line, tok.start_col, tok.end_line, tok.end_col
    )
}

#[test]
fn cookies_exfiltration_reports_exact_spans_and_lines() {
    let src = Src::new(concat!(
        "chrome.runtime.onMessage.addListener((m, s, sendResponse) => {\n",
        "    chrome.cookies.getAll({},\n",
        "        function (cookies) {\n",
        "            sendResponse(cookies);\n",
        "        });\n",
        "    return true;\n",
        "});\n",
    ));

    // Word-bounded token occurrences, in reading order:
    // cookies #1 is the `chrome.cookies` property, #2 the callback
    // parameter, #3 the responded value.
    let sr_param = src.tok("sendResponse", 1);
    let sr_call = src.tok("sendResponse", 2);
    let ck_param = src.tok("cookies", 2);
    let ck_use = src.tok("cookies", 3);
    let rendezvous = src.between(sr_call, src.tok("(cookies)", 2));

    let doc = json!({
        "type": "Program",
        "body": [estree::expr_stmt(estree::call(
            estree::member(
                estree::member(
                    estree::member(estree::ident("chrome"), "runtime"),
                    "onMessage",
                ),
                "addListener",
            ),
            vec![estree::arrow(
                vec![
                    estree::at(estree::ident("m"), src.tok("m", 1)),
                    estree::at(estree::ident("s"), src.tok("s", 1)),
                    estree::at(estree::ident("sendResponse"), sr_param),
                ],
                vec![
                    estree::expr_stmt(estree::call(
                        estree::member(
                            estree::member(estree::ident("chrome"), "cookies"),
                            "getAll",
                        ),
                        vec![
                            estree::object(vec![]),
                            estree::function_expr(
                                None,
                                vec![estree::at(estree::ident("cookies"), ck_param)],
                                vec![estree::expr_stmt(estree::at(
                                    estree::call(
                                        estree::at(estree::ident("sendResponse"), sr_call),
                                        vec![estree::at(estree::ident("cookies"), ck_use)],
                                    ),
                                    rendezvous,
                                ))],
                            ),
                        ],
                    )),
                    estree::ret(Some(estree::literal_bool(true))),
                ],
            )],
        ))],
    });

    let tree = ingest_document("background.js", &doc).unwrap();
    let outcome = analyze_tree(
        &tree,
        src.text(),
        &AnalysisConfig::default(),
        &ApiProfiles::builtin(),
        None,
    )
    .unwrap();

    assert_eq!(outcome.dangers.exfiltration_dangers.len(), 1);
    let danger = &outcome.dangers.exfiltration_dangers[0];

    let from: Vec<(usize, String, String)> = danger
        .from_flow
        .iter()
        .map(|s| (s.no, s.identifier.clone(), s.location.clone()))
        .collect();
    assert_eq!(
        from,
        vec![
            (1, "cookies".to_owned(), loc(ck_param)),
            (2, "cookies".to_owned(), loc(ck_use)),
        ]
    );
    assert_eq!(danger.from_flow[0].line_of_code, "function (cookies) {");
    assert_eq!(danger.from_flow[1].line_of_code, "sendResponse(cookies);");

    let to: Vec<(usize, String, String)> = danger
        .to_flow
        .iter()
        .map(|s| (s.no, s.identifier.clone(), s.location.clone()))
        .collect();
    assert_eq!(
        to,
        vec![
            (1, "sendResponse".to_owned(), loc(sr_param)),
            (2, "sendResponse".to_owned(), loc(sr_call)),
        ]
    );

    assert_eq!(danger.rendezvous.location, loc(rendezvous));
    assert_eq!(danger.rendezvous.node_type, "CallExpression");
    assert_eq!(danger.rendezvous.filename, "background.js");
    assert_eq!(danger.rendezvous.line_of_code, "sendResponse(cookies);");
    assert_eq!(danger.data_flow_number, "1/1");

    // Every step carries the analyzed file's name.
    assert!(danger
        .from_flow
        .iter()
        .chain(&danger.to_flow)
        .all(|step| step.filename == "background.js"));
}
