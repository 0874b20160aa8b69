//! Diagnostics for requirement lowering.
//!
//! [`RequirementError`]s and the protocol collectors' own findings become
//! [`Diagnostic`] records in a caller-owned [`DiagnosticSink`]. Rendering
//! is separate: [`render_diagnostic`] produces an ariadne report and
//! [`render_plain`] a one-line compiler-style message.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use genreq_common::{LineIndex, SourceLoc};
use serde::Serialize;

use crate::error::RequirementError;
use crate::requirement::Requirement;

// ── Error Codes ────────────────────────────────────────────────────────

pub mod codes {
    pub const INVALID_TYPE_REQUIREMENT: &str = "E0101";
    pub const CONCRETE_TYPE_MISMATCH: &str = "E0102";
    pub const CONFLICTING_REQUIREMENT: &str = "E0103";
    pub const ASSOCIATED_TYPE_OVERRIDES_TYPEALIAS: &str = "E0104";
    pub const REDUNDANT_REQUIREMENT: &str = "W0101";
    pub const INHERITED_ASSOCIATED_TYPE_REDECLARED: &str = "W0102";
    pub const TYPEALIAS_OVERRIDES_ASSOCIATED_TYPE: &str = "W0103";
    pub const USE_SAME_TYPE: &str = "N0101";
    pub const DECLARED_HERE: &str = "N0102";
    pub const AMBIGUOUS_INHERITED_TYPE: &str = "N0103";
}

/// Assign a code to each RequirementError variant.
fn error_code(err: &RequirementError) -> &'static str {
    match err {
        RequirementError::InvalidTypeRequirement { .. } => codes::INVALID_TYPE_REQUIREMENT,
        RequirementError::ConcreteTypeMismatch { .. } => codes::CONCRETE_TYPE_MISMATCH,
        RequirementError::ConflictingRequirement { .. } => codes::CONFLICTING_REQUIREMENT,
        RequirementError::RedundantRequirement { .. } => codes::REDUNDANT_REQUIREMENT,
    }
}

// ── Records ────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }
}

/// A suggested source edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FixIt {
    Replace { loc: SourceLoc, text: String },
    InsertAfter { loc: SourceLoc, text: String },
    Remove { loc: SourceLoc },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub loc: SourceLoc,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fix_its: Vec<FixIt>,
    /// Attached notes, rendered with this diagnostic.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Diagnostic>,
}

impl Diagnostic {
    fn new(severity: Severity, code: &'static str, message: String, loc: SourceLoc) -> Self {
        Diagnostic { severity, code, message, loc, fix_its: Vec::new(), notes: Vec::new() }
    }

    pub fn error(code: &'static str, message: impl Into<String>, loc: SourceLoc) -> Self {
        Diagnostic::new(Severity::Error, code, message.into(), loc)
    }

    pub fn warning(code: &'static str, message: impl Into<String>, loc: SourceLoc) -> Self {
        Diagnostic::new(Severity::Warning, code, message.into(), loc)
    }

    pub fn note(code: &'static str, message: impl Into<String>, loc: SourceLoc) -> Self {
        Diagnostic::new(Severity::Note, code, message.into(), loc)
    }

    pub fn with_fix_it(mut self, fix_it: FixIt) -> Self {
        self.fix_its.push(fix_it);
        self
    }

    pub fn with_note(mut self, note: Diagnostic) -> Self {
        self.notes.push(note);
        self
    }
}

/// Caller-owned, append-only list of diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

// ── Translation ────────────────────────────────────────────────────────

/// Translate requirement errors into diagnostics.
///
/// Errors without a location, or involving a type that failed to resolve,
/// are skipped. With `allow_concrete_generic_params`, an invalid `T: Int`
/// also suggests `T == Int`. Returns whether any error-severity diagnostic
/// was emitted; warnings do not count.
pub fn diagnose_requirement_errors(
    errors: &[RequirementError],
    allow_concrete_generic_params: bool,
    sink: &mut DiagnosticSink,
) -> bool {
    let mut diagnosed_error = false;

    for error in errors {
        let loc = error.loc();
        if !loc.is_valid() || error.has_error_type() {
            continue;
        }
        let code = error_code(error);

        match error {
            RequirementError::InvalidTypeRequirement { subject, constraint, .. } => {
                let mut diagnostic = Diagnostic::error(
                    code,
                    format!(
                        "type '{}' constrained to non-protocol, non-class type '{}'",
                        subject, constraint
                    ),
                    loc,
                );
                if allow_concrete_generic_params {
                    let name = subject.display_without_self();
                    diagnostic = diagnostic.with_note(
                        Diagnostic::note(
                            codes::USE_SAME_TYPE,
                            format!(
                                "use '{0} == {1}' to require '{0}' to be '{1}'",
                                name, constraint
                            ),
                            loc,
                        )
                        .with_fix_it(FixIt::Replace { loc, text: " == ".to_string() }),
                    );
                }
                sink.emit(diagnostic);
                diagnosed_error = true;
            }
            RequirementError::ConcreteTypeMismatch { first, second, .. } => {
                sink.emit(Diagnostic::error(
                    code,
                    format!(
                        "generic signature requires types '{}' and '{}' to be the same",
                        first, second
                    ),
                    loc,
                ));
                diagnosed_error = true;
            }
            RequirementError::ConflictingRequirement { requirement, .. } => {
                sink.emit(Diagnostic::error(
                    code,
                    format!(
                        "type '{}' in conformance requirement does not refer to a generic parameter or associated type",
                        requirement.first_type()
                    ),
                    loc,
                ));
                diagnosed_error = true;
            }
            RequirementError::RedundantRequirement { requirement, .. } => {
                sink.emit(Diagnostic::warning(code, redundant_message(requirement), loc));
            }
        }
    }

    diagnosed_error
}

fn redundant_message(requirement: &Requirement) -> String {
    match requirement {
        Requirement::SameType { first, second } => {
            format!("redundant same-type constraint '{}' == '{}'", first, second)
        }
        Requirement::Conformance { subject, constraint } => {
            format!("redundant conformance constraint '{}' : '{}'", subject, constraint)
        }
        Requirement::Superclass { subject, constraint } => {
            format!("redundant superclass constraint '{}' : '{}'", subject, constraint)
        }
        Requirement::Layout { subject, layout } => {
            format!("redundant constraint '{}' : '{}'", subject, layout)
        }
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

fn label_text(code: &str) -> &'static str {
    match code {
        codes::INVALID_TYPE_REQUIREMENT => "not a protocol or class",
        codes::CONCRETE_TYPE_MISMATCH => "these types can never be equal",
        codes::CONFLICTING_REQUIREMENT => "subject is a concrete type",
        codes::REDUNDANT_REQUIREMENT => "always satisfied",
        codes::INHERITED_ASSOCIATED_TYPE_REDECLARED => "redeclared here",
        codes::ASSOCIATED_TYPE_OVERRIDES_TYPEALIAS => "redundant associated type",
        codes::TYPEALIAS_OVERRIDES_ASSOCIATED_TYPE => "overrides an associated type",
        codes::AMBIGUOUS_INHERITED_TYPE => "inherited from more than one protocol",
        _ => "here",
    }
}

fn fix_it_help(fix_it: &FixIt) -> String {
    match fix_it {
        FixIt::Replace { text, .. } => format!("replace with `{}`", text),
        FixIt::InsertAfter { text, .. } => format!("insert `{}`", text),
        FixIt::Remove { .. } => "remove this declaration".to_string(),
    }
}

/// Render a diagnostic with ariadne.
///
/// The output is colorless for consistent test snapshots. Notes with a
/// location become secondary labels; the rest become report notes.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Clamp a range to be valid within source bounds.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span_of = |loc: SourceLoc| -> Option<Range<usize>> {
        loc.range().map(|r| clamp(usize::from(r.start())..usize::from(r.end())))
    };

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Note => ReportKind::Advice,
    };
    let span = span_of(diagnostic.loc).unwrap_or_else(|| clamp(0..0));

    let mut builder = Report::build(kind, span.clone())
        .with_code(diagnostic.code)
        .with_message(&diagnostic.message)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label_text(diagnostic.code))
                .with_color(Color::Red),
        );

    let mut unlocated = Vec::new();
    for note in &diagnostic.notes {
        match span_of(note.loc) {
            Some(range) if note.loc != diagnostic.loc => builder.add_label(
                Label::new(range)
                    .with_message(&note.message)
                    .with_color(Color::Blue),
            ),
            _ => unlocated.push(note.message.clone()),
        }
    }
    if !unlocated.is_empty() {
        builder.set_note(unlocated.join("\n"));
    }

    let helps: Vec<String> = diagnostic
        .fix_its
        .iter()
        .chain(diagnostic.notes.iter().flat_map(|n| n.fix_its.iter()))
        .map(fix_it_help)
        .collect();
    if !helps.is_empty() {
        builder.set_help(helps.join("; "));
    }

    let report = builder.finish();

    // Render to buffer without colors.
    let mut buf = Vec::new();
    if report.write(Source::from(source), &mut buf).is_err() {
        return render_plain(diagnostic, source, filename);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// `file:line:col: severity: message [code]`, one line per diagnostic and
/// attached note.
pub fn render_plain(diagnostic: &Diagnostic, source: &str, filename: &str) -> String {
    let index = LineIndex::new(source);
    let mut out = String::new();
    write_plain_line(&mut out, diagnostic, &index, filename);
    for note in &diagnostic.notes {
        write_plain_line(&mut out, note, &index, filename);
    }
    out
}

fn write_plain_line(out: &mut String, diagnostic: &Diagnostic, index: &LineIndex, filename: &str) {
    let position = match index.line_col(diagnostic.loc) {
        Some((line, col)) => format!("{}:{}:{}", filename, line, col),
        None => filename.to_string(),
    };
    out.push_str(&format!(
        "{}: {}: {} [{}]\n",
        position,
        diagnostic.severity.as_str(),
        diagnostic.message,
        diagnostic.code
    ));
}
