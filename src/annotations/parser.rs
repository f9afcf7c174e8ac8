//! Doc comment to `AnnotationSet` parsing.
//!
//! Parsing never fails: malformed lines and repeated singletons are
//! recorded as diagnostics on the set and the remaining lines are still
//! processed.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::{Annotation, AnnotationKind, AnnotationSet, ValueArity};
use crate::analysis::{CommentLine, DocComment, Span};
use crate::diagnostics::{Diagnostic, DiagnosticCode};

lazy_static! {
    /// `@Keyword` at the start of a trimmed comment line.
    static ref KEYWORD_PATTERN: Regex = Regex::new(r"^@([A-Za-z][A-Za-z0-9_]*)").unwrap();

    /// Unquoted object keys, quoted before handing the options to serde_json.
    static ref BARE_KEY_PATTERN: Regex =
        Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)\s*:"#).unwrap();
}

/// Parse the annotation block attached to a declaration.
pub fn parse_annotations(doc: &DocComment) -> AnnotationSet {
    let mut set = AnnotationSet::default();
    let mut text_lines: Vec<&str> = Vec::new();

    for line in &doc.lines {
        let trimmed = line.text.trim();
        if !trimmed.starts_with('@') {
            text_lines.push(trimmed);
            continue;
        }

        let leading = line.text.len() - line.text.trim_start().len();
        let span = line.span.sub_span(leading, trimmed.len());
        match parse_line(trimmed, span) {
            Ok(annotation) => {
                if annotation.kind.is_singleton() && set.has(&annotation.kind) {
                    set.issues.push(Diagnostic::new(
                        DiagnosticCode::DuplicateAnnotation,
                        format!("{} may only appear once", annotation.kind),
                        annotation.span,
                    ));
                    continue;
                }
                set.annotations.push(annotation);
            }
            Err(malformed) => {
                if let Some(kind) = malformed.kind {
                    set.malformed.push(kind);
                }
                set.issues.push(malformed.diagnostic);
            }
        }
    }

    set.text = text_lines.join("\n").trim().to_string();
    set
}

/// Parse raw comment text (without `//` markers), one line per row.
///
/// Spans are relative to the text: line numbers start at 1 and columns
/// at 1.
pub fn parse_text(text: &str) -> AnnotationSet {
    let mut offset = 0;
    let lines = text
        .lines()
        .enumerate()
        .map(|(row, line)| {
            let span = Span {
                start_byte: offset,
                end_byte: offset + line.len(),
                start_line: row + 1,
                start_col: 1,
                end_line: row + 1,
                end_col: line.len() + 1,
            };
            offset += line.len() + 1;
            CommentLine {
                text: line.to_string(),
                span,
            }
        })
        .collect();
    parse_annotations(&DocComment { lines })
}

/// A line that looked like an annotation but could not be parsed.
struct Malformed {
    /// The kind named by the line, when its keyword was readable.
    kind: Option<AnnotationKind>,
    diagnostic: Diagnostic,
}

fn parse_line(text: &str, span: Span) -> Result<Annotation, Malformed> {
    let keyword = KEYWORD_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Malformed {
            kind: None,
            diagnostic: Diagnostic::new(
                DiagnosticCode::MalformedAnnotation,
                format!("'{}' is not a valid annotation", text),
                span,
            ),
        })?;
    let kind = AnnotationKind::from_keyword(keyword);
    let malformed = |message: String| Malformed {
        kind: Some(kind.clone()),
        diagnostic: Diagnostic::new(DiagnosticCode::MalformedAnnotation, message, span),
    };
    let rest = &text[1 + keyword.len()..];

    let mut value = None;
    let mut value_span = None;
    let mut options = Map::new();
    let description;

    if rest.starts_with('(') {
        let close = matching_paren(rest)
            .ok_or_else(|| malformed(format!("{} has an unterminated argument list", kind)))?;
        let args_offset = 1 + keyword.len() + 1;
        let args = &rest[1..close];
        description = rest[close + 1..].trim().to_string();

        let parts = split_top_level(args);
        let is_list = kind.arity() == ValueArity::List;
        if parts.len() > 2 && !is_list {
            return Err(malformed(format!(
                "{} takes at most a value and an options object",
                kind
            )));
        }
        // List kinds keep every positional part, joined back with ", ".
        let mut items: Vec<String> = Vec::new();
        let mut items_range: Option<(usize, usize)> = None;
        for (part_offset, part) in parts {
            let leading = part.len() - part.trim_start().len();
            let part = part.trim();
            let start = args_offset + part_offset + leading;
            if part.starts_with('{') {
                options = parse_options(part).map_err(|reason| {
                    malformed(format!("{} has invalid options: {}", kind, reason))
                })?;
            } else if is_list && !part.is_empty() && options.is_empty() {
                items.push(unquote(part));
                let first = items_range.map_or(start, |(first, _)| first);
                items_range = Some((first, start + part.len()));
            } else if !is_list && value.is_none() && !part.is_empty() {
                value = Some(unquote(part));
                value_span = Some(span.sub_span(start, part.len()));
            } else {
                return Err(malformed(format!("{} has an unexpected argument '{}'", kind, part)));
            }
        }
        if let Some((first, end)) = items_range {
            value = Some(items.join(", "));
            value_span = Some(span.sub_span(first, end - first));
        }
    } else if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        description = rest.trim().to_string();
    } else {
        return Err(malformed(format!("'{}' is not a valid annotation", text)));
    }

    match kind.arity() {
        ValueArity::Required | ValueArity::List if value.is_none() => {
            return Err(malformed(format!("{} requires a value", kind)));
        }
        ValueArity::None if value.is_some() => {
            return Err(malformed(format!("{} does not take a value", kind)));
        }
        _ => {}
    }

    Ok(Annotation {
        kind,
        value,
        options,
        description,
        span,
        value_span,
    })
}

/// Byte index of the `)` closing the `(` at index 0.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (c == ')').then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside quotes and brackets, keeping each part's offset.
fn split_top_level(text: &str) -> Vec<(usize, &str)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push((start, &text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((start, &text[start..]));
    parts
}

fn parse_options(text: &str) -> Result<Map<String, Value>, String> {
    let normalized = BARE_KEY_PATTERN.replace_all(text, r#"$1"$2":"#);
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_block() {
        let set = parse_text(
            "Creates a widget.\n\
             @Method(POST)\n\
             @Route(/widgets/{id})\n\
             @Path(id, { name: \"widgetId\", validate: \"required,uuid\" }) The widget id\n\
             @Response(201) Created\n\
             @ErrorResponse(404) Not found",
        );

        assert!(set.issues.is_empty(), "{:?}", set.issues);
        assert_eq!(set.text, "Creates a widget.");
        assert_eq!(set.annotations.len(), 5);
        assert_eq!(set.value(&AnnotationKind::Method), Some("POST"));
        assert_eq!(set.value(&AnnotationKind::Route), Some("/widgets/{id}"));

        let path = set.first(&AnnotationKind::Path).unwrap();
        assert_eq!(path.value.as_deref(), Some("id"));
        assert_eq!(path.option_str("name"), Some("widgetId"));
        assert_eq!(path.option_str("validate"), Some("required,uuid"));
        assert_eq!(path.description, "The widget id");

        let error = set.first(&AnnotationKind::ErrorResponse).unwrap();
        assert_eq!(error.value.as_deref(), Some("404"));
        assert_eq!(error.description, "Not found");
    }

    #[test]
    fn test_value_span_points_at_value() {
        let set = parse_text("@Route(/widgets/{id})");
        let route = set.first(&AnnotationKind::Route).unwrap();
        let span = route.value_span.unwrap();
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_col, 8);
        assert_eq!(span.end_col - span.start_col, "/widgets/{id}".len());
        assert_eq!(route.span.start_col, 1);
    }

    #[test]
    fn test_quoted_value_and_array_option() {
        let set = parse_text(r#"@Security("oauth", { scopes: ["read", "write"] })"#);
        let security = set.first(&AnnotationKind::Security).unwrap();
        assert_eq!(security.value.as_deref(), Some("oauth"));
        assert_eq!(security.option_strings("scopes"), vec!["read", "write"]);
    }

    #[test]
    fn test_flags_without_arguments() {
        let set = parse_text("@Deprecated use v2\n@Hidden");
        assert!(set.issues.is_empty());
        let deprecated = set.first(&AnnotationKind::Deprecated).unwrap();
        assert_eq!(deprecated.value, None);
        assert_eq!(deprecated.description, "use v2");
        assert!(set.has(&AnnotationKind::Hidden));
    }

    #[test]
    fn test_malformed_lines_are_reported_and_skipped() {
        let set = parse_text(
            "@Route(/widgets\n\
             @Query(limit, { broken )\n\
             @Method\n\
             @Tag(Widgets)",
        );

        assert_eq!(set.annotations.len(), 1);
        assert_eq!(set.value(&AnnotationKind::Tag), Some("Widgets"));
        assert_eq!(set.issues.len(), 3);
        assert!(set
            .issues
            .iter()
            .all(|d| d.code == DiagnosticCode::MalformedAnnotation));
        assert_eq!(set.issues[0].span.start_line, 1);
        assert_eq!(set.issues[2].span.start_line, 3);
        assert!(set.issues[2].message.contains("requires a value"));
    }

    #[test]
    fn test_content_type_takes_a_list() {
        let set = parse_text(
            "@ContentType(application/json, \"application/xml\")\n@Route(/a, /b)",
        );
        let content = set.first(&AnnotationKind::ContentType).unwrap();
        assert_eq!(
            content.value.as_deref(),
            Some("application/json, application/xml")
        );
        let span = content.value_span.unwrap();
        assert_eq!(span.start_col, 14);
        assert_eq!(
            span.end_col - span.start_col,
            "application/json, \"application/xml\"".len()
        );

        // Other kinds still take a single value.
        assert_eq!(set.issues.len(), 1);
        assert!(set.issues[0].message.contains("unexpected argument '/b'"));
        assert!(set.has_malformed(&AnnotationKind::Route));
    }

    #[test]
    fn test_duplicate_singleton() {
        let set = parse_text("@Route(/a)\n@Route(/b)\n@Query(x)\n@Query(y)");
        assert_eq!(set.value(&AnnotationKind::Route), Some("/a"));
        assert_eq!(set.all(&AnnotationKind::Query).count(), 2);
        assert_eq!(set.issues.len(), 1);
        assert_eq!(set.issues[0].code, DiagnosticCode::DuplicateAnnotation);
        assert_eq!(set.issues[0].span.start_line, 2);
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let set = parse_text("@RateLimit(100, { window: \"1m\" })");
        assert!(set.issues.is_empty());
        let annotation = &set.annotations[0];
        assert_eq!(
            annotation.kind,
            AnnotationKind::Unknown {
                keyword: "RateLimit".to_string()
            }
        );
        assert_eq!(annotation.option_str("window"), Some("1m"));
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level(r#"id, { a: "x,y", b: [1, 2] }"#);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], (0, "id"));
        assert_eq!(parts[1].1.trim(), r#"{ a: "x,y", b: [1, 2] }"#);
    }

    #[test]
    fn test_span_offsets_from_doc_comment() {
        let doc = DocComment {
            lines: vec![CommentLine {
                text: "  @Query(limit)".to_string(),
                span: Span {
                    start_byte: 40,
                    end_byte: 55,
                    start_line: 5,
                    start_col: 4,
                    end_line: 5,
                    end_col: 19,
                },
            }],
        };
        let set = parse_annotations(&doc);
        let query = set.first(&AnnotationKind::Query).unwrap();
        assert_eq!(query.span.start_col, 6);
        assert_eq!(query.value_span.unwrap().start_col, 13);
    }
}
