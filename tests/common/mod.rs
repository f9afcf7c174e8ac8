//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use routescan::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticEntity};

pub const MODULE: &str = "example.com/app";

/// The checked-in shop module.
pub fn shop_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("shop")
}

/// A throwaway Go module with the given files (paths relative to the root).
/// `go.mod` and a controller marker package are always added.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("create temp dir");
    write(temp.path(), "go.mod", &format!("module {}\n\ngo 1.22\n", MODULE));
    write(
        temp.path(),
        "base/base.go",
        "package base\n\ntype ControllerBase struct{}\n",
    );
    for (path, contents) in files {
        write(temp.path(), path, contents);
    }
    temp
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, contents).expect("write fixture");
}

/// Every diagnostic in the trees, depth first.
pub fn all_diagnostics(entities: &[DiagnosticEntity]) -> Vec<&Diagnostic> {
    fn walk<'a>(entity: &'a DiagnosticEntity, out: &mut Vec<&'a Diagnostic>) {
        out.extend(entity.diagnostics.iter());
        for child in &entity.children {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    for entity in entities {
        walk(entity, &mut out);
    }
    out
}

pub fn with_code(entities: &[DiagnosticEntity], code: DiagnosticCode) -> Vec<&Diagnostic> {
    all_diagnostics(entities)
        .into_iter()
        .filter(|d| d.code == code)
        .collect()
}

/// A controller file with one route whose annotations and signature are
/// supplied by the test.
pub fn controller_with_route(annotations: &str, signature: &str) -> String {
    let doc: String = annotations
        .lines()
        .map(|line| format!("// {}\n", line.trim()))
        .collect();
    format!(
        r#"package api

import (
	"context"

	"example.com/app/base"
)

// WidgetsController manages widgets.
// @Tag(Widgets)
type WidgetsController struct {{
	base.ControllerBase
}}

{doc}func (c *WidgetsController) {signature} {{
	return nil
}}
"#
    )
}
