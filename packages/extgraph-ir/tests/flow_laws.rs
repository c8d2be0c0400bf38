//! Data-flow laws over whole programs: name capture, hoisting, and
//! determinism seen through the public pipeline types.

use extgraph_ir::features::ast::domain::{NodeId, NodeKind, SyntaxTree};
use extgraph_ir::features::ast::test_support::{estree, ingest_positioned};
use extgraph_ir::features::data_flow::infrastructure::engine::FlowEngine;
use extgraph_ir::features::pdg::infrastructure::calls::CallGraph;
use extgraph_ir::features::pdg::infrastructure::cfg::ControlFlow;
use extgraph_ir::features::pdg::infrastructure::def_use::{DataDeps, Direction};
use extgraph_ir::features::scoping::domain::{BindingKind, ScopeTree};
use extgraph_ir::features::scoping::infrastructure::resolver::resolve_scopes;

struct Analysis {
    tree: SyntaxTree,
    scopes: ScopeTree,
    cfg: ControlFlow,
    calls: CallGraph,
}

impl Analysis {
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
fn call_of_a_hoisted_function_resolves_to_the_declaration() {
    // !function(){ function v(e){ return e } function s(e){ v(e) } }()
    let analysis = Analysis::new(estree::program(vec![estree::expr_stmt(estree::unary(
        "!",
        estree::call(
            estree::function_expr(
                None,
                vec![],
                vec![
                    estree::function_decl(
                        "v",
                        vec![estree::ident("e")],
                        vec![estree::ret(Some(estree::ident("e")))],
                    ),
                    estree::function_decl(
                        "s",
                        vec![estree::ident("e")],
                        vec![estree::expr_stmt(estree::call(
                            estree::ident("v"),
                            vec![estree::ident("e")],
                        ))],
                    ),
                ],
            ),
            vec![],
        ),
    ))]));
    let deps = analysis.deps();
    let vs = analysis.idents("v");
    assert_eq!(vs.len(), 2); // declaration + call reference
    let declaration = vs[0];
    let call_use = vs[1];
    let parents = deps.parents_of(call_use);
    assert!(
        parents.contains(&declaration),
        "parents of the call reference must include the function declaration"
    );
    // The binding really is the hoisted function, not some variable.
    let binding = analysis
        .scopes
        .binding(analysis.scopes.resolution(call_use).unwrap());
    assert_eq!(binding.kind, BindingKind::Function);
}

#[test]
fn function_expression_self_name_never_shadows_an_outer_parameter() {
    // (function(t){ !function t(){} ; console.log(t); })(42)
    let analysis = Analysis::new(estree::program(vec![estree::expr_stmt(estree::call(
        estree::function_expr(
            None,
            vec![estree::ident("t")],
            vec![
                estree::expr_stmt(estree::unary(
                    "!",
                    estree::function_expr(Some("t"), vec![], vec![]),
                )),
                estree::expr_stmt(estree::call(
                    estree::member(estree::ident("console"), "log"),
                    vec![estree::ident("t")],
                )),
            ],
        ),
        vec![estree::literal_num(42.0)],
    ))]));
    let deps = analysis.deps();
    let ts = analysis.idents("t");
    assert_eq!(ts.len(), 3); // parameter, inner self-name, logged use
    let parameter = ts[0];
    let self_name = ts[1];
    let logged = ts[2];
    let parents = deps.parents_of(logged);
    assert!(parents.contains(&parameter));
    assert!(
        !parents.contains(&self_name),
        "the inner function-expression name must not capture the use"
    );
}

#[test]
fn transitive_queries_stay_identical_across_runs() {
    let doc = estree::program(vec![
        estree::let_decl("seed", estree::literal_num(7.0)),
        estree::let_decl("a", estree::ident("seed")),
        estree::let_decl("b", estree::binary("+", estree::ident("a"), estree::ident("seed"))),
        estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("b")])),
    ]);
    let analysis = Analysis::new(doc);
    let deps = analysis.deps();
    let engine = FlowEngine::new(&deps, 64);
    let b_use = *analysis.idents("b").last().unwrap();
    let runs: Vec<Vec<NodeId>> = (0..3)
        .map(|_| engine.reachable(b_use, Direction::Backward))
        .collect();
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
    // The closure covers the whole chain back to the seed literal decl.
    let seed_decl = analysis.idents("seed")[0];
    assert!(runs[0].contains(&seed_decl));
}

#[test]
fn object_literal_property_keys_stay_out_of_every_flow() {
    // let token = a; send({a: token});
    let analysis = Analysis::new(estree::program(vec![
        estree::let_decl("token", estree::ident("a")),
        estree::expr_stmt(estree::call(
            estree::ident("send"),
            vec![estree::object(vec![estree::property(
                "a",
                estree::ident("token"),
            )])],
        )),
    ]));
    let deps = analysis.deps();
    let engine = FlowEngine::new(&deps, 64);
    let key_a = *analysis.idents("a").last().unwrap();
    // The key is not an occurrence: no resolution, no edges, and no flow
    // from the token declaration touches it.
    assert!(analysis.scopes.resolution(key_a).is_none());
    let token_decl = analysis.idents("token")[0];
    let reachable = engine.reachable(token_decl, Direction::Forward);
    assert!(!reachable.contains(&key_a));
    for kind in [Direction::Forward, Direction::Backward] {
        let paths = engine.paths(token_decl, kind);
        assert!(paths
            .iter()
            .all(|path| !path.occurrences.contains(&key_a)));
    }
}

#[test]
fn switch_and_loops_keep_the_pdg_finite_and_ordered() {
    // Pathological-ish control flow; the point is termination and
    // deterministic ordering, not precision.
    let doc = estree::program(vec![
        estree::let_decl("x", estree::literal_num(0.0)),
        serde_json::json!({
            "type": "SwitchStatement",
            "discriminant": estree::ident("mode"),
            "cases": [
                {
                    "type": "SwitchCase",
                    "test": estree::literal_num(1.0),
                    "consequent": [estree::expr_stmt(estree::assign(
                        estree::ident("x"),
                        estree::literal_num(1.0),
                    ))],
                },
                {
                    "type": "SwitchCase",
                    "test": null,
                    "consequent": [estree::expr_stmt(estree::assign(
                        estree::ident("x"),
                        estree::literal_num(2.0),
                    ))],
                },
            ],
        }),
        serde_json::json!({
            "type": "DoWhileStatement",
            "body": estree::block(vec![estree::expr_stmt(estree::assign(
                estree::ident("x"),
                estree::binary("+", estree::ident("x"), estree::literal_num(1.0)),
            ))]),
            "test": estree::ident("again"),
        }),
        estree::expr_stmt(estree::call(estree::ident("use"), vec![estree::ident("x")])),
    ]);
    let analysis = Analysis::new(doc);
    let deps = analysis.deps();
    let x_use = *analysis.idents("x").last().unwrap();
    let first = deps.parents_of(x_use);
    let second = deps.parents_of(x_use);
    assert_eq!(first, second);
    assert!(!first.is_empty());
    // Every parent is a definition of x.
    for parent in first {
        assert!(analysis.scopes.roles_of(parent).defines());
    }
}
