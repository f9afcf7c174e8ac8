//! Metadata shared by the graph, the cache and the reducer.
//!
//! `TypeMetadata` is the structural identity of a type usage: two usages
//! with equal metadata collapse into one canonical graph node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::ImportKind;

/// Identity of a Go declaration: defining package path plus name.
///
/// Routes use `Controller.Method` as their name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId {
    pub package: String,
    pub name: String,
}

impl DeclId {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// What a resolved type usage refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Predeclared identifier such as `string` or `error`.
    Builtin,
    /// Type from the standard library, treated as opaque.
    Special,
    Struct,
    Enum,
    Alias,
    /// Interfaces are referenced but never expanded.
    Interface,
    /// Inline function, channel element or anonymous struct.
    Opaque,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Builtin => "builtin",
            SymbolKind::Special => "special",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Alias => "alias",
            SymbolKind::Interface => "interface",
            SymbolKind::Opaque => "opaque",
        }
    }

    /// Whether usages of this kind point at an expandable model declaration.
    pub fn is_model(&self) -> bool {
        matches!(self, SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Alias)
    }
}

/// One container layer around a type, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "lowercase")]
pub enum TypeLayer {
    Pointer,
    Slice,
    Array { len: String },
    Map { key: Box<TypeMetadata> },
    Chan,
}

/// Enum or alias details carried on a type usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasInfo {
    pub name: String,
    pub underlying: String,
    /// Constant values, for enums.
    pub values: Vec<String>,
}

/// Structural description of a type usage.
///
/// Every field takes part in equality and hashing, so this doubles as the
/// deduplication key for canonical type nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMetadata {
    /// Formatted type with containers, base name unqualified (`[]*User`).
    pub name: String,
    /// Innermost type name.
    pub base_name: String,
    /// Import path of the defining package; empty for predeclared types.
    pub package_path: String,
    /// Package clause name of the defining package.
    pub default_alias: String,
    pub description: String,
    pub import_kind: ImportKind,
    pub is_builtin: bool,
    pub is_by_reference: bool,
    pub symbol_kind: SymbolKind,
    pub alias: Option<AliasInfo>,
    pub layers: Vec<TypeLayer>,
}

impl TypeMetadata {
    /// Identity of the declaration this usage refers to, when it refers to
    /// an expandable model.
    pub fn model_id(&self) -> Option<DeclId> {
        self.symbol_kind
            .is_model()
            .then(|| DeclId::new(self.package_path.clone(), self.base_name.clone()))
    }

    /// Model identities referenced by this usage, including map keys.
    pub fn referenced_models(&self) -> Vec<DeclId> {
        let mut ids = Vec::new();
        for layer in &self.layers {
            if let TypeLayer::Map { key } = layer {
                ids.extend(key.referenced_models());
            }
        }
        ids.extend(self.model_id());
        ids
    }

    /// Render containers around a base name, outermost layer first.
    pub fn format_name(layers: &[TypeLayer], base: &str) -> String {
        let mut out = String::new();
        for layer in layers {
            match layer {
                TypeLayer::Pointer => out.push('*'),
                TypeLayer::Slice => out.push_str("[]"),
                TypeLayer::Array { len } => {
                    out.push('[');
                    out.push_str(len);
                    out.push(']');
                }
                TypeLayer::Map { key } => {
                    out.push_str("map[");
                    out.push_str(&key.name);
                    out.push(']');
                }
                TypeLayer::Chan => out.push_str("chan "),
            }
        }
        out.push_str(base);
        out
    }
}

impl fmt::Display for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// HTTP verbs accepted by `@Method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Trace => "TRACE",
            HttpVerb::Connect => "CONNECT",
        }
    }

    /// Verbs whose requests conventionally carry no body.
    pub fn is_read_only(&self) -> bool {
        matches!(self, HttpVerb::Get | HttpVerb::Head | HttpVerb::Options)
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "DELETE" => Ok(HttpVerb::Delete),
            "HEAD" => Ok(HttpVerb::Head),
            "OPTIONS" => Ok(HttpVerb::Options),
            "TRACE" => Ok(HttpVerb::Trace),
            "CONNECT" => Ok(HttpVerb::Connect),
            other => Err(format!("unknown HTTP verb '{}'", other)),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a route parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
    Form,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Body => "body",
            ParamLocation::Form => "form",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `@Security` requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

/// A declared response, from `@Response` or `@ErrorResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// `None` when the annotation value is not a number.
    pub code: Option<u16>,
    pub raw_code: String,
    pub description: String,
    pub is_error: bool,
}

/// A struct field as exposed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Go field name; the type name for embedded fields.
    pub name: String,
    /// Name from the `json` tag, falling back to the Go name.
    pub json_name: String,
    #[serde(rename = "type")]
    pub ty: TypeMetadata,
    pub description: String,
    pub validator: Option<String>,
    pub deprecated: bool,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMetadata {
    pub id: DeclId,
    pub description: String,
    pub deprecated: bool,
    pub fields: Vec<FieldMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueMetadata {
    pub name: String,
    pub value: String,
    pub description: String,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMetadata {
    pub id: DeclId,
    pub description: String,
    pub deprecated: bool,
    /// Underlying primitive (`string`, `int`, ...).
    pub underlying: String,
    pub values: Vec<EnumValueMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMetadata {
    pub id: DeclId,
    pub description: String,
    pub deprecated: bool,
    /// Whether declared with `=` rather than as a new named type.
    pub is_type_alias: bool,
    pub underlying: TypeMetadata,
}

/// Expanded metadata for a model declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelMetadata {
    Struct(StructMetadata),
    Enum(EnumMetadata),
    Alias(AliasMetadata),
}

impl ModelMetadata {
    pub fn id(&self) -> &DeclId {
        match self {
            ModelMetadata::Struct(m) => &m.id,
            ModelMetadata::Enum(m) => &m.id,
            ModelMetadata::Alias(m) => &m.id,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            ModelMetadata::Struct(_) => SymbolKind::Struct,
            ModelMetadata::Enum(_) => SymbolKind::Enum,
            ModelMetadata::Alias(_) => SymbolKind::Alias,
        }
    }
}
