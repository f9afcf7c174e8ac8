//! Output formatting for diagnostics and flattened metadata.
//!
//! Supports two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticEntity, Severity};
use crate::reduce::ReducedMetadata;

// =============================================================================
// JSON Format
// =============================================================================

/// Diagnostics report written by `validate --format json`.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    pub passed: bool,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
    pub entities: &'a [DiagnosticEntity],
}

/// Severity totals across every entity tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
}

impl Totals {
    pub fn of(entities: &[DiagnosticEntity]) -> Self {
        entities.iter().fold(Self::default(), |acc, entity| {
            let c = entity.classify();
            Self {
                errors: acc.errors + c.errors.len(),
                warnings: acc.warnings + c.warnings.len(),
                infos: acc.infos + c.infos.len(),
                hints: acc.hints + c.hints.len(),
            }
        })
    }

    pub fn passed(&self) -> bool {
        self.errors == 0
    }
}

pub fn write_diagnostics_json(path: &str, entities: &[DiagnosticEntity]) -> anyhow::Result<()> {
    let totals = Totals::of(entities);
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        passed: totals.passed(),
        errors: totals.errors,
        warnings: totals.warnings,
        infos: totals.infos,
        hints: totals.hints,
        entities,
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

/// Write the flattened metadata as pretty JSON.
pub fn write_metadata_json(metadata: &ReducedMetadata) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(metadata)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write diagnostics in pretty (human-readable) format.
pub fn write_diagnostics_pretty(path: &str, root: &Path, entities: &[DiagnosticEntity]) {
    let totals = Totals::of(entities);

    // Header
    println!();
    print!("  ");
    print!("{}", "routescan".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    println!();

    for entity in entities {
        if entity.classify().total() > 0 {
            write_entity(entity, root, 1);
            println!();
        }
    }

    write_final_status(&totals);
    println!();
}

fn write_entity(entity: &DiagnosticEntity, root: &Path, depth: usize) {
    let counts = entity.classify();
    if counts.total() == 0 {
        return;
    }
    let indent = "  ".repeat(depth);
    println!(
        "{}{} {} {}",
        indent,
        entity.kind.as_str().dimmed(),
        entity.name.bold(),
        format!(
            "({} error(s), {} warning(s))",
            counts.errors.len(),
            counts.warnings.len()
        )
        .dimmed()
    );

    for diag in &entity.diagnostics {
        write_diagnostic(diag, entity.file.as_deref(), root, &indent);
    }
    for child in &entity.children {
        write_entity(child, root, depth + 1);
    }
}

fn write_diagnostic(diag: &Diagnostic, file: Option<&Path>, root: &Path, indent: &str) {
    print!("{}", indent);
    write_severity_tag(&diag.severity);
    print!("{:<30}", diag.code.as_str().dimmed());
    if let Some(file) = file {
        let shown = file.strip_prefix(root).unwrap_or(file);
        print!("{}", shown.display().to_string().blue());
    }
    println!("{}", format!(":{}", diag.span).dimmed());

    // Message on next line, indented
    println!("{}          {}", indent, diag.message);
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("  {} ", "ERROR".red()),
        Severity::Warning => print!("  {} ", "WARN ".yellow()),
        Severity::Info => print!("  {} ", "INFO ".blue()),
        Severity::Hint => print!("  {} ", "HINT ".dimmed()),
    }
}

fn write_final_status(totals: &Totals) {
    print!(
        "  {}",
        format!(
            "{} error(s), {} warning(s), {} info, {} hint(s)",
            totals.errors, totals.warnings, totals.infos, totals.hints
        )
        .dimmed()
    );
    print!("  ");
    if totals.passed() {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;
    use crate::diagnostics::{DiagnosticCode, EntityKind};

    #[test]
    fn test_totals_include_children() {
        let mut route = DiagnosticEntity::new(EntityKind::Route, "Get", None);
        route.diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingPathReference,
            "missing",
            Span::default(),
        ));
        let mut controller = DiagnosticEntity::new(EntityKind::Controller, "Widgets", None);
        controller.diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingTag,
            "no tag",
            Span::default(),
        ));
        controller.children.push(route);

        let totals = Totals::of(&[controller]);
        assert_eq!(totals.errors, 1);
        assert_eq!(totals.warnings, 1);
        assert!(!totals.passed());
    }

    #[test]
    fn test_json_report_serializes_entities() {
        let entity = DiagnosticEntity::new(EntityKind::Controller, "Widgets", None);
        let entities = vec![entity];
        let report = JsonReport {
            version: "0.0.0".to_string(),
            path: ".".to_string(),
            passed: true,
            errors: 0,
            warnings: 0,
            infos: 0,
            hints: 0,
            entities: &entities,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entities"][0]["name"], "Widgets");
        assert_eq!(json["passed"], true);
    }
}
