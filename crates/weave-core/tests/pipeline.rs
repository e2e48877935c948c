#![cfg(unix)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use weave_core::{ConfigError, WeaveConfig, WeaveError, Weaver};
use weave_overlay::GENERATED_HEADER;
use weave_pointcut::Diagnostic;
use weave_test_utils::{snapshot_contents, snapshot_tree, GoWorkspace};

fn write_spec(ws: &GoWorkspace, name: &str, contents: &str) -> PathBuf {
    let path = ws.root().parent().unwrap().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config(ws: &GoWorkspace, spec: &Path) -> WeaveConfig {
    WeaveConfig::default()
        .with_source_root(ws.root())
        .with_target("example.com/app")
        .with_aspect_file(spec)
        .with_overlay_root(ws.overlay())
}

const DET_SPEC: &str = r#"
advice_source: src/main_aspect.go
aspects:
  - advice: TraceAspect
    pointcut: '\(\*example\.com/app/worker\.W\)\.Do'
"#;

#[test]
fn full_weave_writes_rewritten_units_and_links_the_rest() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(&ws, "det.yaml", DET_SPEC);
    let outcome = Weaver::new(config(&ws, &spec)).run().unwrap();

    assert_eq!(outcome.join_points, 2);
    let main = ws.read_overlay("main.go");
    assert!(main.starts_with(GENERATED_HEADER));
    assert!(main.contains("\tagaspect \"example.com/app/agaspect\"\n"));
    assert!(main.contains("f := (_ag_pgen_ag_proxy_0(o))\n"));
    assert!(main.contains("func _ag_proxy_1(_ag_recv *worker.W, _ag_p0 int) int {"));
    assert!(main.contains("(&agaspect.TraceAspect{}).Advice(_ag_ctx)"));

    let advice = ws.read_overlay("agaspect/main_aspect.go");
    assert!(advice.starts_with("package agaspect\n"));

    let root = ws.root().canonicalize().unwrap().display().to_string();
    let tree = snapshot_tree(ws.overlay());
    assert!(tree.contains(&"main.go".to_string()));
    assert!(tree.contains(&format!("worker -> {root}/worker")));
    assert!(tree.contains(&format!("go.mod -> {root}/go.mod")));
    assert!(!tree.iter().any(|e| e.starts_with("main_aspect.go")));
    assert_eq!(outcome.written.len(), 2);
}

#[test]
fn zero_matches_write_nothing() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(
        &ws,
        "none.yaml",
        "aspects:\n  - advice: TraceAspect\n    pointcut: 'nothing\\.here'\n",
    );
    let outcome = Weaver::new(config(&ws, &spec)).run().unwrap();

    assert!(outcome.is_nothing_to_do());
    assert!(outcome.written.is_empty());
    assert!(!ws.overlay().exists());
}

#[test]
fn rerun_reconciliation_is_a_noop() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(&ws, "det.yaml", DET_SPEC);
    let weaver = Weaver::new(config(&ws, &spec));

    let first = weaver.run().unwrap();
    assert!(!first.report.is_noop());
    let before = snapshot_tree(ws.overlay());
    let first_main = ws.read_overlay("main.go");

    let second = weaver.run().unwrap();
    assert!(second.report.is_noop());
    assert_eq!(snapshot_tree(ws.overlay()), before);
    assert_eq!(ws.read_overlay("main.go"), first_main);
}

#[test]
fn written_and_linked_paths_are_disjoint_and_cover_the_tree() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(&ws, "det.yaml", DET_SPEC);
    let outcome = Weaver::new(config(&ws, &spec)).run().unwrap();

    let overlay = ws.overlay().canonicalize().unwrap_or_else(|_| ws.overlay().to_path_buf());
    let relative = |p: &PathBuf| {
        p.strip_prefix(ws.overlay())
            .or_else(|_| p.strip_prefix(&overlay))
            .unwrap()
            .to_path_buf()
    };
    let written: BTreeSet<PathBuf> = outcome.written.iter().map(relative).collect();
    let linked: BTreeSet<PathBuf> = outcome.report.linked.iter().map(relative).collect();
    assert!(written.is_disjoint(&linked));

    for (file, _) in snapshot_contents(ws.root()) {
        if file.ends_with("_aspect.go") {
            continue;
        }
        let path = PathBuf::from(&file);
        let covered = written.contains(&path) || linked.iter().any(|l| path.starts_with(l));
        assert!(covered, "{file} is not reachable from the overlay");
    }
}

#[test]
fn original_tree_is_never_mutated() {
    let ws = GoWorkspace::sample_app();
    let before = snapshot_contents(ws.root());
    let spec = write_spec(
        &ws,
        "all.json",
        r#"{"aspects": [{"advice": "TraceAspect", "pointcut": "example\\.com/app.*"}]}"#,
    );
    Weaver::new(config(&ws, &spec)).run().unwrap();
    assert_eq!(snapshot_contents(ws.root()), before);
}

#[test]
fn overlapping_pointcuts_report_a_conflict() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(
        &ws,
        "overlap.toml",
        r#"
[[aspects]]
advice = "First"
pointcut = 'example\.com/app\.sayHello'

[[aspects]]
advice = "Second"
pointcut = '.*sayHello'
"#,
    );
    let outcome = Weaver::new(config(&ws, &spec)).run().unwrap();

    assert_eq!(outcome.join_points, 1);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::PointcutConflict { winner, .. } if winner == "Second")));
    assert!(ws.read_overlay("main.go").contains("(&agaspect.Second{}).Advice(_ag_ctx)"));
}

#[test]
fn multi_result_declarations_keep_their_shape() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(
        &ws,
        "divide.yaml",
        "aspects:\n  - advice: TraceAspect\n    pointcut: 'example\\.com/app\\.divide'\n",
    );
    Weaver::new(config(&ws, &spec)).run().unwrap();
    let main = ws.read_overlay("main.go");

    assert!(main.contains("q, err := (_ag_pgen_ag_proxy_0())(6, 3)"));
    assert!(main.contains("func _ag_proxy_0(_ag_p0 int, _ag_p1 int) (int, error) {"));
    assert!(main.contains("\t\t_ag_res0, _ag_res1 := divide(_ag_arg0, _ag_arg1)\n"));
    assert!(main.contains("\t_ag_res1, _ := _ag_res[1].(error)\n\treturn _ag_res0, _ag_res1\n"));
    assert!(main.contains("func _ag_pgen_ag_proxy_0() func(int, int) (int, error) {"));
}

#[test]
fn configuration_errors_stop_before_any_phase() {
    let ws = GoWorkspace::sample_app();
    let err = Weaver::new(
        WeaveConfig::default()
            .with_source_root(ws.root())
            .with_target("example.com/app")
            .with_overlay_root(ws.overlay()),
    )
    .run()
    .unwrap_err();
    assert!(matches!(
        err,
        WeaveError::Configuration(ConfigError::MissingAspectFile)
    ));
    assert!(err.is_configuration());
    assert!(!ws.overlay().exists());
}

#[test]
fn unknown_target_is_a_load_error() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(&ws, "det.yaml", DET_SPEC);
    let err = Weaver::new(config(&ws, &spec).with_target("example.com/app/missing"))
        .run()
        .unwrap_err();
    assert!(matches!(err, WeaveError::Load(_)));
    assert!(!ws.overlay().exists());
}

#[test]
fn advice_alias_renames_the_injected_import() {
    let ws = GoWorkspace::sample_app();
    let spec = write_spec(&ws, "det.yaml", DET_SPEC);
    Weaver::new(config(&ws, &spec).with_advice_alias("adv"))
        .run()
        .unwrap();
    let main = ws.read_overlay("main.go");

    assert!(main.contains("\tadv \"example.com/app/agaspect\"\n"));
    assert!(main.contains("(&adv.TraceAspect{}).Advice(_ag_ctx)"));
    assert!(ws.read_overlay("agaspect/main_aspect.go").starts_with("package agaspect\n"));
}
