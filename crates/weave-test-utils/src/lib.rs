//! Testing utilities for the weave workspace
//!
//! Temporary Go source trees, a canned sample application, and helpers to
//! snapshot a directory tree (files, directories and symlinks).

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const MODULE_PATH: &str = "example.com/app";

pub const MAIN_GO: &str = r#"package main

import (
	"fmt"

	"example.com/app/worker"
)

func sayHello(s string) {
	fmt.Printf("hello %s\n", s)
}

func divide(a, b int) (int, error) {
	if b == 0 {
		return 0, fmt.Errorf("division by zero")
	}
	return a / b, nil
}

func sum(xs ...int) int {
	total := 0
	for _, x := range xs {
		total += x
	}
	return total
}

func main() {
	sayHello("world")
	q, err := divide(6, 3)
	fmt.Println(q, err, sum(1, 2, 3))

	o := &worker.W{N: 1}
	f := o.Do
	o = &worker.W{N: 2}
	fmt.Println(f(0), worker.New(3).Do(1))
}
"#;

pub const WORKER_GO: &str = r#"package worker

import "fmt"

type W struct {
	N int
}

func New(n int) *W {
	return &W{N: n}
}

func (w *W) Do(x int) int {
	fmt.Printf("W%d.Do(%d)\n", w.N, x)
	return w.N + x
}
"#;

pub const ASPECT_GO: &str = r#"package main

import asp "golang.org/x/exp/aspectgo/aspect"

type TraceAspect struct{}

func (a *TraceAspect) Advice(ctx asp.Context) []interface{} {
	return ctx.Call(ctx.Args())
}
"#;

pub const UTIL_GO: &str = r#"package util

func Clamp(v, lo, hi int) int {
	if v < lo {
		return lo
	}
	if v > hi {
		return hi
	}
	return v
}
"#;

/// A temporary source root plus a sibling overlay location.
///
/// Layout: `<tmp>/src` is the source root, `<tmp>/out` the overlay root
/// (not created until something writes there).
#[derive(Debug)]
pub struct GoWorkspace {
    _dir: TempDir,
    root: PathBuf,
    overlay: PathBuf,
}

impl GoWorkspace {
    /// Empty GOPATH-style source root (no `go.mod`)
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        let overlay = dir.path().join("out");
        Self {
            _dir: dir,
            root,
            overlay,
        }
    }

    /// Source root holding a `go.mod` for `module_path`
    pub fn module(module_path: &str) -> Self {
        let ws = Self::new();
        ws.write("go.mod", &format!("module {module_path}\n\ngo 1.21\n"));
        ws
    }

    /// The canned sample application: `main` package with an aspect unit,
    /// a `worker` package, an unrelated `internal/util` package and a
    /// non-Go file.
    pub fn sample_app() -> Self {
        let ws = Self::module(MODULE_PATH);
        ws.write("main.go", MAIN_GO);
        ws.write("main_aspect.go", ASPECT_GO);
        ws.write("worker/worker.go", WORKER_GO);
        ws.write("internal/util/util.go", UTIL_GO);
        ws.write("README.md", "# sample\n");
        ws
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn overlay(&self) -> &Path {
        &self.overlay
    }

    /// Write a file under the source root, creating parents
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Read a file under the source root
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative)).unwrap()
    }

    /// Read a file under the overlay root
    pub fn read_overlay(&self, relative: &str) -> String {
        fs::read_to_string(self.overlay.join(relative)).unwrap()
    }
}

impl Default for GoWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted snapshot of a tree: `dir/` for directories, `path -> target` for
/// symlinks (not followed), `path` for files.
pub fn snapshot_tree(root: &Path) -> Vec<String> {
    let mut entries = Vec::new();
    if root.exists() {
        collect(root, root, &mut entries);
    }
    entries.sort();
    entries
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let rel = path.strip_prefix(root).unwrap().display().to_string();
        let meta = fs::symlink_metadata(&path).unwrap();
        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path).unwrap();
            out.push(format!("{rel} -> {}", target.display()));
        } else if meta.is_dir() {
            out.push(format!("{rel}/"));
            collect(root, &path, out);
        } else {
            out.push(rel);
        }
    }
}

/// Snapshot of the source root's files (contents included) to prove it was
/// never mutated.
pub fn snapshot_contents(root: &Path) -> Vec<(String, String)> {
    let mut files = Vec::new();
    for entry in snapshot_tree(root) {
        if entry.ends_with('/') || entry.contains(" -> ") {
            continue;
        }
        let contents = fs::read_to_string(root.join(&entry)).unwrap_or_default();
        files.push((entry, contents));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_app_layout() {
        let ws = GoWorkspace::sample_app();
        let tree = snapshot_tree(ws.root());
        assert!(tree.contains(&"go.mod".to_string()));
        assert!(tree.contains(&"worker/".to_string()));
        assert!(tree.contains(&"worker/worker.go".to_string()));
        assert!(!ws.overlay().exists());
    }
}
