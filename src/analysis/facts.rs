//! Fact structures extracted from Go source files.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::FileVersion;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// A sub-span on the first line of `self`, `offset` bytes in and `len`
    /// bytes wide.
    pub fn sub_span(&self, offset: usize, len: usize) -> Self {
        Self {
            start_byte: self.start_byte + offset,
            end_byte: self.start_byte + offset + len,
            start_line: self.start_line,
            start_col: self.start_col + offset,
            end_line: self.start_line,
            end_col: self.start_col + offset + len,
        }
    }

    /// Whether `other` lies within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A single `//` line of a doc comment, with the comment marker stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    /// Text after `//`, with one leading space removed.
    pub text: String,
    /// Span of `text` within the file.
    pub span: Span,
}

/// The comment block attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub lines: Vec<CommentLine>,
}

impl DocComment {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain text of the block, lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A Go type expression as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `Name` or `pkg.Name`.
    Named {
        qualifier: Option<String>,
        name: String,
    },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array {
        len: String,
        elem: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan(Box<TypeExpr>),
    /// Inline function, interface or struct type, kept as source text.
    Opaque(String),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            qualifier: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(qualifier: &str, name: &str) -> Self {
        TypeExpr::Named {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        }
    }

    /// Whether this is a bare or qualified name with no container around it.
    pub fn is_named(&self) -> bool {
        matches!(self, TypeExpr::Named { .. })
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named {
                qualifier: Some(q),
                name,
            } => write!(f, "{}.{}", q, name),
            TypeExpr::Named {
                qualifier: None,
                name,
            } => write!(f, "{}", name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Chan(inner) => write!(f, "chan {}", inner),
            TypeExpr::Opaque(text) => write!(f, "{}", text),
        }
    }
}

/// How an import brings a package into scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `import "pkg"`
    Plain,
    /// `import alias "pkg"`
    Aliased,
    /// `import . "pkg"`
    Dot,
    /// `import _ "pkg"`
    Blank,
    /// Not imported at all; the symbol lives in the declaring package.
    Local,
    /// Predeclared identifier, no import involved.
    Universe,
}

/// An import declaration.
#[derive(Debug, Clone)]
pub struct Import {
    /// The import path.
    pub path: String,
    /// Optional alias (e.g., `import foo "bar"` -> alias is "foo").
    pub alias: Option<String>,
    pub kind: ImportKind,
    /// Source span.
    pub span: Span,
}

impl Import {
    /// The identifier this import is referenced by when no package
    /// clause is available: the alias, or the last path segment with any
    /// major-version suffix skipped.
    pub fn default_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let mut segments = self.path.rsplit('/');
        let last = segments.next().unwrap_or(&self.path);
        let is_version = last.len() > 1
            && last.starts_with('v')
            && last[1..].chars().all(|c| c.is_ascii_digit());
        let name = if is_version {
            segments.next().unwrap_or(last)
        } else {
            last
        };
        name.replace('-', "_")
    }
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// `None` for embedded fields.
    pub name: Option<String>,
    pub ty: TypeExpr,
    /// Raw tag contents without the surrounding quotes.
    pub tag: Option<String>,
    pub doc: DocComment,
    pub span: Span,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.name.is_none()
    }

    /// Value of `key` in the struct tag (`json:"name,omitempty"` -> `name,omitempty`).
    pub fn tag_value(&self, key: &str) -> Option<String> {
        let tag = self.tag.as_deref()?;
        let needle = format!("{}:\"", key);
        let start = tag.find(&needle)? + needle.len();
        let rest = &tag[start..];
        let end = rest.find('"')?;
        Some(rest[..end].to_string())
    }
}

/// Shape of a type declaration.
#[derive(Debug, Clone)]
pub enum TypeDeclKind {
    Struct(Vec<FieldDecl>),
    Interface,
    /// `type X Y`
    Named(TypeExpr),
    /// `type X = Y`
    Alias(TypeExpr),
}

/// A `type` declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    pub doc: DocComment,
    pub span: Span,
}

/// A parameter or result in a method signature.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A method declaration (function with a receiver).
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    /// Receiver base type name, pointer stripped.
    pub receiver: String,
    pub pointer_receiver: bool,
    pub params: Vec<ParamDecl>,
    pub results: Vec<ParamDecl>,
    pub doc: DocComment,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(|c| c.is_uppercase())
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.receiver, self.name)
    }
}

/// A single constant inside a `const` declaration.
#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub name: String,
    /// Declared or inherited (`iota` continuation) type.
    pub ty: Option<TypeExpr>,
    /// Literal value text, quotes removed for strings. `iota` continuations
    /// carry their index.
    pub value: Option<String>,
    pub doc: DocComment,
    pub span: Span,
}

/// All facts extracted from a single Go file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File path.
    pub path: PathBuf,
    /// Package clause name.
    pub package: String,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
    pub methods: Vec<MethodDecl>,
    pub consts: Vec<ConstDecl>,
    /// Fingerprint of the bytes this file was extracted from; `None` when the
    /// file could not be stat-ed.
    pub version: Option<FileVersion>,
    /// Whether the file had parse errors.
    pub has_parse_errors: bool,
}

impl SourceFile {
    /// Find a type declaration by name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Look up an import by the name it is referenced with in this file.
    pub fn import_by_name(&self, name: &str) -> Option<&Import> {
        self.imports
            .iter()
            .filter(|i| !matches!(i.kind, ImportKind::Dot | ImportKind::Blank))
            .find(|i| i.default_name() == name)
    }

    /// Dot imports, which expose their package's names unqualified.
    pub fn dot_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(|i| i.kind == ImportKind::Dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(path: &str, alias: Option<&str>) -> Import {
        Import {
            path: path.to_string(),
            alias: alias.map(str::to_string),
            kind: if alias.is_some() {
                ImportKind::Aliased
            } else {
                ImportKind::Plain
            },
            span: Span::default(),
        }
    }

    #[test]
    fn test_import_default_name() {
        assert_eq!(import("time", None).default_name(), "time");
        assert_eq!(
            import("github.com/acme/shop/models", None).default_name(),
            "models"
        );
        assert_eq!(
            import("github.com/acme/shop/v2", None).default_name(),
            "shop"
        );
        assert_eq!(
            import("github.com/acme/shop/models", Some("m")).default_name(),
            "m"
        );
    }

    #[test]
    fn test_type_expr_display() {
        let expr = TypeExpr::Map {
            key: Box::new(TypeExpr::named("string")),
            value: Box::new(TypeExpr::Slice(Box::new(TypeExpr::Pointer(Box::new(
                TypeExpr::qualified("models", "User"),
            ))))),
        };
        assert_eq!(expr.to_string(), "map[string][]*models.User");
    }

    #[test]
    fn test_field_tag_value() {
        let field = FieldDecl {
            name: Some("Email".to_string()),
            ty: TypeExpr::named("string"),
            tag: Some(r#"json:"email,omitempty" validate:"required,email""#.to_string()),
            doc: DocComment::default(),
            span: Span::default(),
        };
        assert_eq!(field.tag_value("json").as_deref(), Some("email,omitempty"));
        assert_eq!(field.tag_value("validate").as_deref(), Some("required,email"));
        assert_eq!(field.tag_value("xml"), None);
    }

    #[test]
    fn test_span_sub_span() {
        let line = Span {
            start_byte: 100,
            end_byte: 120,
            start_line: 7,
            start_col: 3,
            end_line: 7,
            end_col: 23,
        };
        let sub = line.sub_span(4, 6);
        assert_eq!(sub.start_byte, 104);
        assert_eq!(sub.end_byte, 110);
        assert_eq!(sub.start_col, 7);
        assert_eq!(sub.end_col, 13);
        assert!(line.contains(&sub));
    }
}
