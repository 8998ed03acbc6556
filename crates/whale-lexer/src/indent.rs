//! Indentation preprocessor.
//!
//! Reduces free-form leading whitespace to explicit level-change markers
//! before tokenization. Each inward level change on line `L` entering level
//! `N` is spliced into the stream as `⟨L,N⟩⇥`; each outward change as
//! `⟨L,0⟩⇤` (one marker per level closed). The rest of the line passes
//! through byte-for-byte, so downstream positions stay 1:1 with the
//! original file.
//!
//! A file commits to a single whitespace discipline: tabs or spaces, never
//! both. With tabs, one tab is one level. With spaces, the first indented
//! line fixes the indent unit and every later line must stay on that grid.
//! Indentation may grow by at most one level per line. Violations abort
//! the pipeline with a typed [`IndentError`]; there is no partial output.

use std::fmt;

use whale_common::diag::codes;

/// Opening bracket of a level marker.
pub const MARKER_OPEN: char = '⟨';
/// Closing bracket of a level marker.
pub const MARKER_CLOSE: char = '⟩';
/// Inward level change.
pub const MARKER_INDENT: char = '⇥';
/// Outward level change.
pub const MARKER_DEDENT: char = '⇤';

/// How the whitespace discipline for a file is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentMode {
    /// The first indenting line fixes the whitespace kind.
    Detect,
    /// The file may opt into spaces with a leading `"use spaces"` line;
    /// otherwise tabs are required.
    Directive,
}

/// Which whitespace kind a file has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WsKind {
    Tabs,
    Spaces,
}

impl WsKind {
    fn name(self) -> &'static str {
        match self {
            WsKind::Tabs => "tabs",
            WsKind::Spaces => "spaces",
        }
    }
}

/// A structural indentation error. Aborts the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct IndentError {
    pub kind: IndentErrorKind,
    /// 1-based line of the offending indentation.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
    /// What the discipline required.
    pub expected: String,
    /// What the line actually had.
    pub found: String,
}

/// The specific indentation rule that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentErrorKind {
    /// A line mixes tabs and spaces in its leading whitespace.
    MixedIndent,
    /// A line uses the whitespace kind the file did not commit to.
    IndentMismatch,
    /// A space-indented line is off the established unit grid on the way in.
    IndentUnit,
    /// A dedent lands on a column that is not a multiple of the unit.
    BadDedent,
    /// Indentation grew by more than one level in a single line.
    IndentJump,
}

impl IndentErrorKind {
    /// Stable diagnostic code for this error kind.
    pub fn code(self) -> &'static str {
        match self {
            IndentErrorKind::MixedIndent => codes::LEX_MIXED_INDENT,
            IndentErrorKind::IndentMismatch => codes::LEX_INDENT_KIND,
            IndentErrorKind::IndentUnit => codes::LEX_INDENT_UNIT,
            IndentErrorKind::BadDedent => codes::LEX_BAD_DEDENT,
            IndentErrorKind::IndentJump => codes::LEX_INDENT_JUMP,
        }
    }
}

impl fmt::Display for IndentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            IndentErrorKind::MixedIndent => "mixed tabs and spaces in indentation",
            IndentErrorKind::IndentMismatch => "indentation kind disagrees with the rest of the file",
            IndentErrorKind::IndentUnit => "indentation is not a whole number of indent units",
            IndentErrorKind::BadDedent => "dedent does not align with any enclosing level",
            IndentErrorKind::IndentJump => "indentation increases by more than one level",
        };
        write!(
            f,
            "{} at line {}, column {} (expected {}, found {})",
            what, self.line, self.column, self.expected, self.found
        )
    }
}

impl std::error::Error for IndentError {}

/// Run the preprocessor over raw source text.
///
/// Returns the normalized stream with level markers spliced in, or the
/// first structural error. A UTF-8 byte-order mark at the start of the
/// stream is dropped. Blank and comment-only lines bypass level tracking
/// entirely.
pub fn preprocess(source: &str, mode: IndentMode) -> Result<String, IndentError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let lines: Vec<&str> = source.split('\n').collect();

    let mut kind: Option<WsKind> = None;
    let mut directive_spaces = false;
    if mode == IndentMode::Directive {
        let first = lines.first().map(|l| l.trim()).unwrap_or("");
        directive_spaces = first == "\"use spaces\"" || first == "'use spaces'";
        kind = Some(if directive_spaces {
            WsKind::Spaces
        } else {
            WsKind::Tabs
        });
    }

    let mut out = String::with_capacity(source.len() + 16);
    let mut unit: Option<u32> = None;
    let mut level: u32 = 0;
    let mut last_line = 1u32;

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = (idx + 1) as u32;
        if idx > 0 {
            out.push('\n');
        }
        if idx == 0 && directive_spaces {
            // The directive is consumed; keep the line so numbering holds.
            continue;
        }

        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let ws_end = line
            .find(|c| c != ' ' && c != '\t')
            .unwrap_or(line.len());
        let (lead, rest) = line.split_at(ws_end);

        // Blank and comment-only lines never touch the level machinery.
        if rest.is_empty() || rest.starts_with('#') {
            out.push_str(raw);
            continue;
        }
        last_line = line_no;

        let new_level = if lead.is_empty() {
            0
        } else {
            classify_lead(lead, line_no, &mut kind, &mut unit, level)?
        };

        if new_level > level + 1 {
            return Err(IndentError {
                kind: IndentErrorKind::IndentJump,
                line: line_no,
                column: 1,
                expected: format!("at most level {}", level + 1),
                found: format!("level {new_level}"),
            });
        }

        if new_level == level + 1 {
            push_marker(&mut out, line_no, new_level, MARKER_INDENT);
        } else {
            for _ in new_level..level {
                push_marker(&mut out, line_no, 0, MARKER_DEDENT);
            }
        }
        level = new_level;
        out.push_str(raw);
    }

    // Close every open level at end of input.
    if level > 0 {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        for _ in 0..level {
            push_marker(&mut out, last_line, 0, MARKER_DEDENT);
        }
    }

    Ok(out)
}

/// Validate one line's leading whitespace and compute its level.
fn classify_lead(
    lead: &str,
    line_no: u32,
    kind: &mut Option<WsKind>,
    unit: &mut Option<u32>,
    level: u32,
) -> Result<u32, IndentError> {
    let has_tab = lead.contains('\t');
    let has_space = lead.contains(' ');
    if has_tab && has_space {
        let first = lead.chars().next().unwrap_or(' ');
        let column = lead
            .chars()
            .position(|c| c != first)
            .map(|i| (i + 1) as u32)
            .unwrap_or(1);
        return Err(IndentError {
            kind: IndentErrorKind::MixedIndent,
            line: line_no,
            column,
            expected: if first == '\t' { "tabs" } else { "spaces" }.to_string(),
            found: if first == '\t' { "a space" } else { "a tab" }.to_string(),
        });
    }

    let this_kind = if has_tab { WsKind::Tabs } else { WsKind::Spaces };
    match *kind {
        None => *kind = Some(this_kind),
        Some(k) if k != this_kind => {
            return Err(IndentError {
                kind: IndentErrorKind::IndentMismatch,
                line: line_no,
                column: 1,
                expected: k.name().to_string(),
                found: this_kind.name().to_string(),
            });
        }
        Some(_) => {}
    }

    let count = lead.len() as u32;
    match this_kind {
        WsKind::Tabs => Ok(count),
        WsKind::Spaces => match *unit {
            // The first space-indented line fixes the indent unit.
            None => {
                *unit = Some(count);
                Ok(1)
            }
            Some(u) => {
                if count % u != 0 {
                    let going_in = count > level * u;
                    return Err(IndentError {
                        kind: if going_in {
                            IndentErrorKind::IndentUnit
                        } else {
                            IndentErrorKind::BadDedent
                        },
                        line: line_no,
                        column: count + 1,
                        expected: format!("a multiple of {u} spaces"),
                        found: format!("{count} spaces"),
                    });
                }
                Ok(count / u)
            }
        },
    }
}

/// Append a `⟨line,level⟩` marker with the given direction glyph.
fn push_marker(out: &mut String, line: u32, level: u32, glyph: char) {
    out.push(MARKER_OPEN);
    out.push_str(&line.to_string());
    out.push(',');
    out.push_str(&level.to_string());
    out.push(MARKER_CLOSE);
    out.push(glyph);
}
