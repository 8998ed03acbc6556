//! User-visible diagnostics.
//!
//! Every phase appends [`Diagnostic`]s to a shared [`Diagnostics`] buffer
//! owned by the compilation. Entries are never mutated after being pushed;
//! consumers that need positional order sort by `(line, column)`.

use std::fmt;

use serde::Serialize;

/// Stable diagnostic codes.
///
/// These are part of the user-facing contract and must not be renumbered.
pub mod codes {
    // Preprocessor / lexer.
    pub const LEX_MIXED_INDENT: &str = "TWLEX001";
    pub const LEX_INDENT_KIND: &str = "TWLEX002";
    pub const LEX_INDENT_UNIT: &str = "TWLEX003";
    pub const LEX_BAD_DEDENT: &str = "TWLEX004";
    pub const LEX_INDENT_JUMP: &str = "TWLEX005";
    pub const LEX_UNEXPECTED_CHAR: &str = "TWLEX010";
    pub const LEX_LEADING_UNDERSCORE: &str = "TWLEX011";

    // Parser.
    pub const PARSE_GRAMMAR: &str = "TWPARSE001";

    // Checker.
    pub const CHECK_UNEXPECTED_INDENT: &str = "TWCHECK001";
    pub const CHECK_UNKNOWN_TYPE: &str = "TWCHECK010";
    pub const CHECK_TYPE_MISMATCH: &str = "TWCHECK012";
    pub const CHECK_UNDEFINED_VAR: &str = "TWCHECK013";
    pub const CHECK_INT_BOUNDS: &str = "TWCHECK014";
    pub const CHECK_LITERAL_KIND: &str = "TWCHECK016";
    pub const CHECK_F32_OVERFLOW: &str = "TWCHECK017";
    pub const CHECK_PATTERN_TYPE: &str = "TWCHECK018";
    pub const CHECK_ARM_CONTEXT: &str = "TWCHECK019";
    pub const CHECK_NON_EXHAUSTIVE: &str = "TWCHECK020";
    pub const CHECK_INT_ONLY_OP: &str = "TWCHECK021";
    pub const CHECK_OPERAND_MISMATCH: &str = "TWCHECK022";
    pub const CHECK_LOGICAL_OP: &str = "TWCHECK024";
    pub const CHECK_DUP_FIELD_DECL: &str = "TWCHECK026";
    pub const CHECK_MISSING_FIELD: &str = "TWCHECK027";
    pub const CHECK_UNKNOWN_INIT_FIELD: &str = "TWCHECK028";
    pub const CHECK_DUP_INIT_FIELD: &str = "TWCHECK029";
    pub const CHECK_UNKNOWN_FIELD: &str = "TWCHECK030";
    pub const CHECK_NON_RECORD_ACCESS: &str = "TWCHECK031";
    pub const CHECK_SELF_FIELD: &str = "TWCHECK032";
    pub const CHECK_INDEX_BOUNDS: &str = "TWCHECK034";
    pub const CHECK_BAD_INDEX: &str = "TWCHECK035";
    pub const CHECK_LIST_SIZE: &str = "TWCHECK036";
    pub const CHECK_LIST_LEN: &str = "TWCHECK037";
    pub const CHECK_REFINE_BASE: &str = "TWCHECK040";
    pub const CHECK_REFINE_RANGE: &str = "TWCHECK041";
    pub const CHECK_UNREACHABLE: &str = "TWCHECK050";
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single user-visible diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable code, e.g. `TWCHECK012`.
    pub code: &'static str,
    pub severity: Severity,
    /// 1-based source line.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Render in the `[CODE] message` contract format, with the optional
    /// `suggestion:` second line.
    pub fn format(&self) -> String {
        match &self.suggestion {
            Some(s) => format!("[{}] {}\nsuggestion: {}", self.code, self.message, s),
            None => format!("[{}] {}", self.code, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Append-only diagnostics buffer, one per compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error.
    pub fn error(&mut self, code: &'static str, line: u32, column: u32, message: impl Into<String>) {
        self.push(code, Severity::Error, line, column, message, None);
    }

    /// Append a warning.
    pub fn warning(
        &mut self,
        code: &'static str,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) {
        self.push(code, Severity::Warning, line, column, message, None);
    }

    /// Append a diagnostic with an explicit severity and suggestion.
    pub fn push(
        &mut self,
        code: &'static str,
        severity: Severity,
        line: u32,
        column: u32,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) {
        self.entries.push(Diagnostic {
            code,
            severity,
            line,
            column,
            message: message.into(),
            suggestion,
        });
    }

    /// Whether any error-severity diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// All entries in encounter order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// First error-severity entry, if any.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.entries.iter().find(|d| d.severity == Severity::Error)
    }

    /// Entries sorted by `(line, column)`; encounter order breaks ties.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut out: Vec<&Diagnostic> = self.entries.iter().collect();
        out.sort_by_key(|d| (d.line, d.column));
        out
    }

    /// Warnings only, in encounter order.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
