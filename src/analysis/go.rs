//! Go source analyzer using tree-sitter.
//!
//! Extracts:
//! - Package clause and import table
//! - Type declarations (struct, interface, named types, aliases)
//! - Methods with receivers, parameters and results
//! - Constant blocks, including `iota` continuations
//! - Doc comments attached to declarations and struct fields

use std::path::Path;

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::{
    CommentLine, ConstDecl, DocComment, FieldDecl, Import, ImportKind, MethodDecl, ParamDecl,
    SourceFile, Span, TypeDecl, TypeDeclKind, TypeExpr,
};
use crate::error::AnalysisError;

/// Tree-sitter query for the package declaration.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Holds a parsed tree-sitter tree and the source it was parsed from.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: std::path::PathBuf,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Go language analyzer.
pub struct GoAnalyzer {
    language: Language,
    /// Compiled on first use and shared by every worker thread.
    package_query: OnceCell<Query>,
}

impl GoAnalyzer {
    /// Create a new Go analyzer.
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
            package_query: OnceCell::new(),
        }
    }

    /// Create a new parser for this thread.
    fn create_parser(&self) -> Result<Parser, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| AnalysisError::Parse {
                path: Default::default(),
                reason: e.to_string(),
            })?;
        Ok(parser)
    }

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors still produce a tree with ERROR nodes.
    pub fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile, AnalysisError> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::Parse {
                path: path.to_path_buf(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_path_buf(),
        })
    }

    /// Parse and extract in one step.
    pub fn analyze(&self, path: &Path, source: &[u8]) -> Result<SourceFile, AnalysisError> {
        let parsed = self.parse(path, source)?;
        self.extract(&parsed)
    }

    /// Extract all declarations from a parsed file.
    pub fn extract(&self, parsed: &ParsedFile) -> Result<SourceFile, AnalysisError> {
        let root = parsed.tree.root_node();
        let package = self.extract_package(parsed)?.unwrap_or_default();

        let mut file = SourceFile {
            path: parsed.path.clone(),
            package,
            imports: Vec::new(),
            types: Vec::new(),
            methods: Vec::new(),
            consts: Vec::new(),
            version: None,
            has_parse_errors: root.has_error(),
        };

        for (node, doc) in with_docs(parsed, &named_children(root)) {
            match node.kind() {
                "import_declaration" => self.extract_imports(parsed, node, &mut file.imports),
                "type_declaration" => self.extract_types(parsed, node, doc, &mut file.types),
                "method_declaration" => {
                    if let Some(method) = self.extract_method(parsed, node, doc) {
                        file.methods.push(method);
                    }
                }
                "const_declaration" => self.extract_consts(parsed, node, doc, &mut file.consts),
                _ => {}
            }
        }

        Ok(file)
    }

    /// Extract the package name from a parsed file.
    fn extract_package(&self, parsed: &ParsedFile) -> Result<Option<String>, AnalysisError> {
        let query = self.package_query.get_or_try_init(|| {
            Query::new(&self.language, PACKAGE_QUERY).map_err(|e| AnalysisError::Parse {
                path: parsed.path.clone(),
                reason: e.to_string(),
            })
        })?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Ok(Some(parsed.node_text(capture.node).to_string()));
                }
            }
        }
        Ok(None)
    }

    fn extract_imports(&self, parsed: &ParsedFile, decl: Node, out: &mut Vec<Import>) {
        for child in named_children(decl) {
            match child.kind() {
                "import_spec" => out.extend(self.import_spec(parsed, child)),
                "import_spec_list" => {
                    for spec in named_children(child) {
                        if spec.kind() == "import_spec" {
                            out.extend(self.import_spec(parsed, spec));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn import_spec(&self, parsed: &ParsedFile, spec: Node) -> Option<Import> {
        let path_node = spec.child_by_field_name("path")?;
        let path = parsed
            .node_text(path_node)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();

        let (alias, kind) = match spec.child_by_field_name("name") {
            Some(name) => match name.kind() {
                "dot" => (None, ImportKind::Dot),
                "blank_identifier" => (None, ImportKind::Blank),
                _ => (
                    Some(parsed.node_text(name).to_string()),
                    ImportKind::Aliased,
                ),
            },
            None => (None, ImportKind::Plain),
        };

        Some(Import {
            path,
            alias,
            kind,
            span: Span::from_node(spec),
        })
    }

    fn extract_types(
        &self,
        parsed: &ParsedFile,
        decl: Node,
        doc: DocComment,
        out: &mut Vec<TypeDecl>,
    ) {
        let specs = with_docs(parsed, &named_children(decl));
        let single = specs.len() == 1;

        for (spec, spec_doc) in specs {
            // A lone spec takes the comment above the `type` keyword.
            let doc = if single && spec_doc.is_empty() {
                doc.clone()
            } else {
                spec_doc
            };

            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let Some(type_node) = spec.child_by_field_name("type") else {
                continue;
            };
            let name = parsed.node_text(name_node).to_string();

            let kind = match spec.kind() {
                "type_alias" => TypeDeclKind::Alias(self.type_expr(parsed, type_node)),
                "type_spec" => match type_node.kind() {
                    "struct_type" => TypeDeclKind::Struct(self.struct_fields(parsed, type_node)),
                    "interface_type" => TypeDeclKind::Interface,
                    _ => TypeDeclKind::Named(self.type_expr(parsed, type_node)),
                },
                _ => continue,
            };

            out.push(TypeDecl {
                name,
                kind,
                doc,
                span: Span::from_node(spec),
            });
        }
    }

    fn struct_fields(&self, parsed: &ParsedFile, struct_node: Node) -> Vec<FieldDecl> {
        let Some(list) = named_children(struct_node)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Vec::new();
        };

        let mut fields = Vec::new();
        for (field, doc) in with_docs(parsed, &named_children(list)) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = field.child_by_field_name("type") else {
                continue;
            };
            let ty = self.type_expr(parsed, type_node);
            let tag = field
                .child_by_field_name("tag")
                .map(|t| unquote(parsed.node_text(t)));

            let mut cursor = field.walk();
            let names: Vec<Node> = field.children_by_field_name("name", &mut cursor).collect();

            if names.is_empty() {
                fields.push(FieldDecl {
                    name: None,
                    ty,
                    tag,
                    doc,
                    span: Span::from_node(field),
                });
                continue;
            }

            for name in names {
                fields.push(FieldDecl {
                    name: Some(parsed.node_text(name).to_string()),
                    ty: ty.clone(),
                    tag: tag.clone(),
                    doc: doc.clone(),
                    span: Span::from_node(field),
                });
            }
        }
        fields
    }

    fn extract_method(&self, parsed: &ParsedFile, node: Node, doc: DocComment) -> Option<MethodDecl> {
        let name = parsed.node_text(node.child_by_field_name("name")?).to_string();

        let receiver_list = node.child_by_field_name("receiver")?;
        let receiver_decl = named_children(receiver_list)
            .into_iter()
            .find(|n| n.kind() == "parameter_declaration")?;
        let receiver_type = receiver_decl.child_by_field_name("type")?;
        let (receiver, pointer_receiver) = match self.type_expr(parsed, receiver_type) {
            TypeExpr::Pointer(inner) => (base_name(&inner), true),
            other => (base_name(&other), false),
        };

        let params = node
            .child_by_field_name("parameters")
            .map(|list| self.parameter_list(parsed, list))
            .unwrap_or_default();

        let results = match node.child_by_field_name("result") {
            Some(result) if result.kind() == "parameter_list" => {
                self.parameter_list(parsed, result)
            }
            Some(result) => vec![ParamDecl {
                name: None,
                ty: self.type_expr(parsed, result),
                span: Span::from_node(result),
            }],
            None => Vec::new(),
        };

        Some(MethodDecl {
            name,
            receiver,
            pointer_receiver,
            params,
            results,
            doc,
            span: Span::from_node(node),
        })
    }

    fn parameter_list(&self, parsed: &ParsedFile, list: Node) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        for decl in named_children(list) {
            let variadic = match decl.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut ty = self.type_expr(parsed, type_node);
            if variadic {
                ty = TypeExpr::Slice(Box::new(ty));
            }

            let mut cursor = decl.walk();
            let names: Vec<Node> = decl.children_by_field_name("name", &mut cursor).collect();
            if names.is_empty() {
                params.push(ParamDecl {
                    name: None,
                    ty,
                    span: Span::from_node(decl),
                });
            } else {
                for name in names {
                    params.push(ParamDecl {
                        name: Some(parsed.node_text(name).to_string()),
                        ty: ty.clone(),
                        span: Span::from_node(name),
                    });
                }
            }
        }
        params
    }

    fn extract_consts(
        &self,
        parsed: &ParsedFile,
        decl: Node,
        doc: DocComment,
        out: &mut Vec<ConstDecl>,
    ) {
        let specs = with_docs(parsed, &named_children(decl));
        let single = specs.len() == 1;

        let mut inherited_type: Option<TypeExpr> = None;
        let mut iota_offset: Option<i64> = None;

        for (iota, (spec, spec_doc)) in specs.into_iter().enumerate() {
            if spec.kind() != "const_spec" {
                continue;
            }
            let doc = if single && spec_doc.is_empty() {
                doc.clone()
            } else {
                spec_doc
            };

            let values: Vec<Node> = spec
                .child_by_field_name("value")
                .map(named_children)
                .unwrap_or_default();

            // Specs without values repeat the previous type and expression.
            if !values.is_empty() {
                inherited_type = spec
                    .child_by_field_name("type")
                    .map(|t| self.type_expr(parsed, t));
                iota_offset = values.first().and_then(|v| iota_expr(parsed.node_text(*v)));
            }

            let mut cursor = spec.walk();
            let names: Vec<Node> = spec.children_by_field_name("name", &mut cursor).collect();
            for (idx, name) in names.into_iter().enumerate() {
                let value = match values.get(idx) {
                    Some(v) => match iota_expr(parsed.node_text(*v)) {
                        Some(offset) => Some((iota as i64 + offset).to_string()),
                        None => Some(literal_value(parsed.node_text(*v))),
                    },
                    None => iota_offset.map(|offset| (iota as i64 + offset).to_string()),
                };
                out.push(ConstDecl {
                    name: parsed.node_text(name).to_string(),
                    ty: inherited_type.clone(),
                    value,
                    doc: doc.clone(),
                    span: Span::from_node(spec),
                });
            }
        }
    }

    /// Convert a type node into a `TypeExpr`.
    fn type_expr(&self, parsed: &ParsedFile, node: Node) -> TypeExpr {
        let child = |field: &str| {
            node.child_by_field_name(field)
                .map(|n| Box::new(self.type_expr(parsed, n)))
                .unwrap_or_else(|| Box::new(TypeExpr::Opaque(String::new())))
        };

        match node.kind() {
            "type_identifier" => TypeExpr::named(parsed.node_text(node)),
            "qualified_type" => {
                let package = node
                    .child_by_field_name("package")
                    .map(|n| parsed.node_text(n))
                    .unwrap_or("");
                let name = node
                    .child_by_field_name("name")
                    .map(|n| parsed.node_text(n))
                    .unwrap_or("");
                TypeExpr::qualified(package, name)
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::Pointer(Box::new(self.type_expr(parsed, inner))),
                None => TypeExpr::Opaque(parsed.node_text(node).to_string()),
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.type_expr(parsed, inner),
                None => TypeExpr::Opaque(parsed.node_text(node).to_string()),
            },
            "slice_type" => TypeExpr::Slice(child("element")),
            "array_type" => TypeExpr::Array {
                len: node
                    .child_by_field_name("length")
                    .map(|n| parsed.node_text(n).to_string())
                    .unwrap_or_default(),
                elem: child("element"),
            },
            "implicit_length_array_type" => TypeExpr::Array {
                len: "...".to_string(),
                elem: child("element"),
            },
            "map_type" => TypeExpr::Map {
                key: child("key"),
                value: child("value"),
            },
            "channel_type" => TypeExpr::Chan(child("value")),
            _ => TypeExpr::Opaque(parsed.node_text(node).to_string()),
        }
    }
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn named_children<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Pair every non-comment node with the `//` block directly above it.
fn with_docs<'a>(parsed: &ParsedFile, nodes: &[Node<'a>]) -> Vec<(Node<'a>, DocComment)> {
    let mut out = Vec::new();
    let mut pending: Vec<Node<'a>> = Vec::new();
    let mut last_end_row: Option<usize> = None;

    for node in nodes {
        if node.kind() == "comment" {
            let trailing = last_end_row == Some(node.start_position().row);
            let contiguous = pending
                .last()
                .is_some_and(|p| p.end_position().row + 1 == node.start_position().row);
            // Trailing comments on the previous declaration's line are skipped.
            if contiguous {
                pending.push(*node);
            } else if !trailing {
                pending = vec![*node];
            }
            continue;
        }

        let attached = pending
            .last()
            .is_some_and(|p| p.end_position().row + 1 == node.start_position().row);
        let doc = if attached {
            doc_comment(parsed, &pending)
        } else {
            DocComment::default()
        };
        pending.clear();
        last_end_row = Some(node.end_position().row);
        out.push((*node, doc));
    }
    out
}

fn doc_comment(parsed: &ParsedFile, comments: &[Node]) -> DocComment {
    let mut lines = Vec::new();
    for comment in comments {
        let raw = parsed.node_text(*comment);
        let Some(body) = raw.strip_prefix("//") else {
            continue;
        };
        let (offset, text) = match body.strip_prefix(' ') {
            Some(rest) => (3, rest),
            None => (2, body),
        };
        let text = text.trim_end_matches('\r');
        lines.push(CommentLine {
            text: text.to_string(),
            span: Span::from_node(*comment).sub_span(offset, text.len()),
        });
    }
    DocComment { lines }
}

fn base_name(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Named { name, .. } => name.clone(),
        TypeExpr::Pointer(inner) => base_name(inner),
        other => {
            // Generic receivers (`T[K]`) arrive opaque.
            let text = other.to_string();
            text.split('[').next().unwrap_or(&text).to_string()
        }
    }
}

fn unquote(text: &str) -> String {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return raw.to_string();
    }
    text.trim_matches('"').replace("\\\"", "\"")
}

fn literal_value(text: &str) -> String {
    let text = text.trim();
    if text.starts_with('"') || text.starts_with('`') {
        unquote(text)
    } else {
        text.to_string()
    }
}

/// `iota`, `iota + N` or `iota - N`, returning the offset.
fn iota_expr(text: &str) -> Option<i64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let rest = compact.strip_prefix("iota")?;
    if rest.is_empty() {
        return Some(0);
    }
    if let Some(n) = rest.strip_prefix('+') {
        return n.parse().ok();
    }
    rest.strip_prefix('-')
        .and_then(|n| n.parse::<i64>().ok())
        .map(|n| -n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> SourceFile {
        let analyzer = GoAnalyzer::new();
        analyzer
            .analyze(Path::new("test.go"), source.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_extract_package() {
        let file = extract("package main\n");
        assert_eq!(file.package, "main");
        assert!(!file.has_parse_errors);
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
package main

import (
    "fmt"
    m "github.com/acme/shop/models"
    . "github.com/acme/shop/dot"
    _ "github.com/lib/pq"
)
"#;
        let file = extract(source);
        assert_eq!(file.imports.len(), 4);
        assert!(file
            .imports
            .iter()
            .any(|i| i.path == "fmt" && i.kind == ImportKind::Plain));
        assert!(file.imports.iter().any(|i| i.path == "github.com/acme/shop/models"
            && i.alias.as_deref() == Some("m")
            && i.kind == ImportKind::Aliased));
        assert!(file
            .imports
            .iter()
            .any(|i| i.path == "github.com/acme/shop/dot" && i.kind == ImportKind::Dot));
        assert!(file
            .imports
            .iter()
            .any(|i| i.path == "github.com/lib/pq" && i.kind == ImportKind::Blank));
        assert_eq!(file.import_by_name("m").unwrap().path, "github.com/acme/shop/models");
        assert_eq!(file.dot_imports().count(), 1);
    }

    #[test]
    fn test_extract_struct_with_docs_and_tags() {
        let source = r#"
package models

// User is a registered account.
// It is stored in the users table.
type User struct {
    // The unique identifier
    ID    int    `json:"id"`
    Name, Alias string
    Tags  map[string][]*Tag `json:"tags,omitempty" validate:"required"`
    Base
}
"#;
        let file = extract(source);
        let user = file.find_type("User").unwrap();
        assert_eq!(
            user.doc.text(),
            "User is a registered account.\nIt is stored in the users table."
        );
        let TypeDeclKind::Struct(fields) = &user.kind else {
            panic!("expected struct, got {:?}", user.kind);
        };
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].name.as_deref(), Some("ID"));
        assert_eq!(fields[0].doc.text(), "The unique identifier");
        assert_eq!(fields[0].tag_value("json").as_deref(), Some("id"));
        assert_eq!(fields[1].name.as_deref(), Some("Name"));
        assert_eq!(fields[2].name.as_deref(), Some("Alias"));
        assert_eq!(fields[3].ty.to_string(), "map[string][]*Tag");
        assert_eq!(fields[3].tag_value("validate").as_deref(), Some("required"));
        assert!(fields[4].is_embedded());
        assert_eq!(fields[4].ty, TypeExpr::named("Base"));
    }

    #[test]
    fn test_doc_comment_line_spans() {
        let source = "package p\n\n// @Tag(Users)\ntype C struct{}\n";
        let file = extract(source);
        let decl = file.find_type("C").unwrap();
        let line = &decl.doc.lines[0];
        assert_eq!(line.text, "@Tag(Users)");
        assert_eq!(line.span.start_line, 3);
        assert_eq!(line.span.start_col, 4);
        assert_eq!(&source[line.span.start_byte..line.span.end_byte], "@Tag(Users)");
    }

    #[test]
    fn test_detached_comment_is_not_doc() {
        let source = r#"
package p

// Unrelated note.

type Lonely struct{}
"#;
        let file = extract(source);
        assert!(file.find_type("Lonely").unwrap().doc.is_empty());
    }

    #[test]
    fn test_extract_methods() {
        let source = r#"
package controllers

import "context"

// @Method(GET)
func (c *UsersController) GetUser(ctx context.Context, id string, tags ...string) (*User, error) {
    return nil, nil
}

func (c UsersController) helper() error {
    return nil
}
"#;
        let file = extract(source);
        assert_eq!(file.methods.len(), 2);

        let get = &file.methods[0];
        assert_eq!(get.qualified_name(), "UsersController.GetUser");
        assert!(get.pointer_receiver);
        assert!(get.is_exported());
        assert_eq!(get.doc.text(), "@Method(GET)");
        assert_eq!(get.params.len(), 3);
        assert_eq!(get.params[0].ty, TypeExpr::qualified("context", "Context"));
        assert_eq!(get.params[1].name.as_deref(), Some("id"));
        assert_eq!(get.params[2].ty.to_string(), "[]string");
        assert_eq!(get.results.len(), 2);
        assert_eq!(get.results[0].ty.to_string(), "*User");
        assert_eq!(get.results[1].ty, TypeExpr::named("error"));

        let helper = &file.methods[1];
        assert!(!helper.pointer_receiver);
        assert!(!helper.is_exported());
        assert_eq!(helper.results.len(), 1);
    }

    #[test]
    fn test_extract_named_types_and_aliases() {
        let source = r#"
package models

type (
    // Status of an order
    Status string
    ID = int64
    Store interface { Get() error }
)
"#;
        let file = extract(source);
        let status = file.find_type("Status").unwrap();
        assert!(matches!(&status.kind, TypeDeclKind::Named(t) if *t == TypeExpr::named("string")));
        assert_eq!(status.doc.text(), "Status of an order");
        assert!(matches!(
            &file.find_type("ID").unwrap().kind,
            TypeDeclKind::Alias(t) if *t == TypeExpr::named("int64")
        ));
        assert!(matches!(
            file.find_type("Store").unwrap().kind,
            TypeDeclKind::Interface
        ));
    }

    #[test]
    fn test_extract_consts_with_iota() {
        let source = r#"
package models

const (
    // Pending is the initial state
    StatusPending Status = "pending"
    StatusDone    Status = "done"
)

const (
    Low Priority = iota + 1
    Medium
    High
)
"#;
        let file = extract(source);
        let find = |name: &str| file.consts.iter().find(|c| c.name == name).unwrap();

        assert_eq!(find("StatusPending").value.as_deref(), Some("pending"));
        assert_eq!(find("StatusPending").doc.text(), "Pending is the initial state");
        assert_eq!(find("StatusDone").ty, Some(TypeExpr::named("Status")));
        assert_eq!(find("Low").value.as_deref(), Some("1"));
        assert_eq!(find("Medium").value.as_deref(), Some("2"));
        assert_eq!(find("High").value.as_deref(), Some("3"));
        assert_eq!(find("High").ty, Some(TypeExpr::named("Priority")));
    }

    #[test]
    fn test_iota_expr() {
        assert_eq!(iota_expr("iota"), Some(0));
        assert_eq!(iota_expr("iota + 2"), Some(2));
        assert_eq!(iota_expr("iota-1"), Some(-1));
        assert_eq!(iota_expr("\"x\""), None);
    }

    #[test]
    fn test_parse_errors_are_tolerated() {
        let file = extract("package p\n\ntype Broken struct {\n");
        assert!(file.has_parse_errors);
    }
}
