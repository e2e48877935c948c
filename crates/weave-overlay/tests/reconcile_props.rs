#![cfg(unix)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use weave_overlay::{reconcile, Materializer, OverlayLayout};
use weave_test_utils::{snapshot_tree, GoWorkspace};

const SUFFIX: &str = "_aspect.go";

/// Files of a generated tree, dropping any path that would need an existing
/// file to also be a directory
fn consistent(paths: Vec<String>) -> Vec<PathBuf> {
    let mut accepted: Vec<PathBuf> = Vec::new();
    for p in paths.into_iter().map(PathBuf::from) {
        let clash = accepted
            .iter()
            .any(|q| *q == p || p.starts_with(q) || q.starts_with(&p));
        if !clash {
            accepted.push(p);
        }
    }
    accepted
}

/// Every path reachable from the overlay root by following the overlay's
/// own directories and resolving symlinks into the original tree
fn reachable(ws: &GoWorkspace) -> BTreeSet<PathBuf> {
    fn walk(dir: &Path, rel: &Path, out: &mut BTreeSet<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let name = rel.join(path.file_name().unwrap());
            if path.is_dir() {
                walk(&path, &name, out);
            } else {
                out.insert(name);
            }
        }
    }
    let mut out = BTreeSet::new();
    if ws.overlay().exists() {
        walk(ws.overlay(), Path::new(""), &mut out);
    }
    out
}

fn originals(ws: &GoWorkspace, files: &[PathBuf]) -> BTreeSet<PathBuf> {
    files
        .iter()
        .filter(|f| !f.to_string_lossy().ends_with(SUFFIX))
        .filter(|f| ws.root().join(f).exists())
        .cloned()
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_second_reconcile_changes_nothing(
        raw in prop::collection::vec("[a-c]{1,2}(/[a-c]{1,2}){0,2}(\\.go|_aspect\\.go)?", 1..10),
        pick in prop::collection::vec(any::<bool>(), 10),
    ) {
        let ws = GoWorkspace::new();
        let files = consistent(raw);
        for f in &files {
            ws.write(f.to_str().unwrap(), "x\n");
        }

        let layout = OverlayLayout::new(ws.root(), ws.overlay());
        let mut materializer = Materializer::new(layout.clone());
        for (f, chosen) in files.iter().zip(pick.iter()) {
            if *chosen && !f.to_string_lossy().ends_with(SUFFIX) {
                materializer.write_file(f, "woven\n").unwrap();
            }
        }
        let written = materializer.written().clone();

        let first = reconcile(&layout, &written, SUFFIX).unwrap();
        let before = snapshot_tree(ws.overlay());
        let second = reconcile(&layout, &written, SUFFIX).unwrap();

        prop_assert!(second.is_noop());
        prop_assert_eq!(snapshot_tree(ws.overlay()), before);

        // Created links and written files never coincide...
        let linked: BTreeSet<PathBuf> = first
            .linked
            .iter()
            .map(|p| p.strip_prefix(ws.overlay()).unwrap().to_path_buf())
            .collect();
        prop_assert!(linked.is_disjoint(&written));

        // ...and together they expose every original file.
        let visible = reachable(&ws);
        for f in originals(&ws, &files) {
            prop_assert!(visible.contains(&f), "{} not visible in overlay", f.display());
        }
        for f in &written {
            prop_assert_eq!(fs::read_to_string(ws.overlay().join(f)).unwrap(), "woven\n");
        }
    }
}

#[test]
fn mirrors_sample_app_and_skips_aspects() {
    let ws = GoWorkspace::sample_app();
    let layout = OverlayLayout::new(ws.root(), ws.overlay());
    let mut materializer = Materializer::new(layout.clone());
    materializer
        .write_file(Path::new("main.go"), "package main\n")
        .unwrap();

    let report = reconcile(&layout, materializer.written(), SUFFIX).unwrap();
    let root = ws.root().display().to_string();
    assert_eq!(
        snapshot_tree(ws.overlay()),
        vec![
            format!("README.md -> {root}/README.md"),
            format!("go.mod -> {root}/go.mod"),
            format!("internal -> {root}/internal"),
            "main.go".to_string(),
            format!("worker -> {root}/worker"),
        ]
    );
    assert_eq!(report.linked.len(), 4);
    assert!(report.recursed.is_empty());
}

#[test]
fn nested_rewrite_recurses_and_links_siblings() {
    let ws = GoWorkspace::sample_app();
    ws.write("worker/extra.go", "package worker\n");
    let layout = OverlayLayout::new(ws.root(), ws.overlay());
    let mut materializer = Materializer::new(layout.clone());
    materializer
        .write_file(Path::new("worker/worker.go"), "package worker\n")
        .unwrap();

    let report = reconcile(&layout, materializer.written(), SUFFIX).unwrap();
    assert_eq!(report.recursed, vec![PathBuf::from("worker")]);
    let tree = snapshot_tree(ws.overlay());
    let root = ws.root().display().to_string();
    assert!(tree.contains(&"worker/".to_string()));
    assert!(tree.contains(&"worker/worker.go".to_string()));
    assert!(tree.contains(&format!("worker/extra.go -> {root}/worker/extra.go")));
    assert!(tree.contains(&format!("main.go -> {root}/main.go")));
    assert!(!tree.iter().any(|e| e.starts_with("main_aspect.go")));
}

#[test]
fn existing_overlay_entries_are_left_alone() {
    let ws = GoWorkspace::sample_app();
    fs::create_dir_all(ws.overlay()).unwrap();
    fs::write(ws.overlay().join("README.md"), "custom\n").unwrap();

    let layout = OverlayLayout::new(ws.root(), ws.overlay());
    reconcile(&layout, &BTreeSet::new(), SUFFIX).unwrap();
    assert_eq!(ws.read_overlay("README.md"), "custom\n");
}
