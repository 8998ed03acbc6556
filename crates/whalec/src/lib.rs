//! The TinyWhale compile pipeline.
//!
//! Phases run strictly forward, all writing into one [`Compilation`]:
//!
//! ```text
//! source → preprocess → tokenize → parse → check → emit
//! ```
//!
//! [`compile`] is the one-call entry point: it returns the binary, the
//! WAT text and the warnings, or the first formatted diagnostic as a
//! [`CompileError`]. [`compile_full`] exposes every store for tooling
//! and tests. A compilation is a value; running two side by side shares
//! nothing.

use std::fmt;

use whale_check::{check, SemIr};
use whale_common::diag::{Diagnostic, Diagnostics, Severity};
use whale_common::intern::{FloatInterner, StringInterner};
use whale_common::token::TokenStore;
use whale_lexer::{preprocess, tokenize, IndentMode};
use whale_parser::node::NodeStore;
use whale_parser::parse_tokens;

/// Internal emitter failure surfaced through the diagnostic channel.
pub const EMIT_INTERNAL: &str = "TWEMIT001";

/// Options accepted by the pipeline entry.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Filename used when rendering diagnostics.
    pub filename: Option<String>,
    /// Passed through to the emitter (reserved for the optimizer).
    pub optimize: bool,
    /// Whitespace discipline selection for the preprocessor.
    pub indent_mode: IndentMode,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            filename: None,
            optimize: false,
            indent_mode: IndentMode::Detect,
        }
    }
}

/// A successful compile.
#[derive(Debug)]
pub struct CompileOutput {
    /// Always true for a returned output; errors surface as
    /// [`CompileError`] instead.
    pub valid: bool,
    /// The WebAssembly module bytes.
    pub binary: Vec<u8>,
    /// The matching WAT text.
    pub text: String,
    /// Warnings collected along the way, in encounter order.
    pub warnings: Vec<Diagnostic>,
}

/// A failed compile, carrying the first error diagnostic.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub diagnostic: Diagnostic,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostic.format())
    }
}

impl std::error::Error for CompileError {}

/// Every store a compilation produced, for tooling and tests.
///
/// Ids held by any store are only meaningful against this compilation.
#[derive(Debug)]
pub struct Compilation {
    pub source: String,
    pub filename: String,
    pub strings: StringInterner,
    pub floats: FloatInterner,
    pub tokens: TokenStore,
    pub nodes: NodeStore,
    /// Present whenever the front half ran far enough to check.
    pub semir: Option<SemIr>,
    pub diagnostics: Diagnostics,
}

/// Run the front-end phases and keep everything.
///
/// A structural indentation error aborts before tokenization; it is
/// recorded in the diagnostics and the stores stay empty. All other
/// failures accumulate diagnostics while later phases still run.
pub fn compile_full(source: &str, options: &CompileOptions) -> Compilation {
    let filename = options
        .filename
        .clone()
        .unwrap_or_else(|| "<input>".to_string());
    let mut strings = StringInterner::new();
    let mut floats = FloatInterner::new();
    let mut diagnostics = Diagnostics::new();

    let normalized = match preprocess(source, options.indent_mode) {
        Ok(normalized) => normalized,
        Err(error) => {
            diagnostics.push(
                error.kind.code(),
                Severity::Error,
                error.line,
                error.column,
                error.to_string(),
                None,
            );
            return Compilation {
                source: source.to_string(),
                filename,
                strings,
                floats,
                tokens: TokenStore::new(),
                nodes: NodeStore::new(),
                semir: None,
                diagnostics,
            };
        }
    };

    let tokens = tokenize(&normalized, &mut strings, &mut floats, &mut diagnostics);
    let nodes = parse_tokens(&tokens, &mut diagnostics);
    let semir = check(&nodes, &tokens, &mut strings, &floats, &mut diagnostics);

    Compilation {
        source: source.to_string(),
        filename,
        strings,
        floats,
        tokens,
        nodes,
        semir: Some(semir),
        diagnostics,
    }
}

/// Compile source text to a WebAssembly module.
///
/// On failure the error carries the first diagnostic, formatted per the
/// `[CODE] message` contract; the full sorted list is available through
/// [`compile_full`].
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let compilation = compile_full(source, options);
    if let Some(first) = compilation.diagnostics.first_error() {
        return Err(CompileError {
            diagnostic: first.clone(),
        });
    }
    let Some(semir) = &compilation.semir else {
        // No errors and no IR cannot happen; keep the failure typed.
        return Err(CompileError {
            diagnostic: internal_diagnostic("check phase produced no IR"),
        });
    };

    let module = whale_emit::emit(
        semir,
        &compilation.nodes,
        &compilation.tokens,
        &compilation.strings,
        options.optimize,
    )
    .map_err(|e| CompileError {
        diagnostic: internal_diagnostic(&e.to_string()),
    })?;

    Ok(CompileOutput {
        valid: true,
        binary: module.binary,
        text: module.text,
        warnings: compilation.diagnostics.warnings(),
    })
}

fn internal_diagnostic(message: &str) -> Diagnostic {
    Diagnostic {
        code: EMIT_INTERNAL,
        severity: Severity::Error,
        line: 1,
        column: 1,
        message: message.to_string(),
        suggestion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_formats_with_its_code() {
        let err = compile("x: i32 = missing\npanic\n", &CompileOptions::default()).unwrap_err();
        let formatted = err.to_string();
        assert!(formatted.starts_with("[TWCHECK013] "), "{formatted}");
    }

    #[test]
    fn indentation_errors_abort_the_pipeline() {
        let compilation = compile_full("type P\n\t x: i32\n", &CompileOptions::default());
        assert!(compilation.diagnostics.has_errors());
        assert_eq!(compilation.diagnostics.entries()[0].code, "TWLEX001");
        assert!(compilation.tokens.is_empty());
        assert!(compilation.semir.is_none());
    }

    #[test]
    fn warnings_ride_along_with_success() {
        let output = compile("panic\nx: i32 = 1\n", &CompileOptions::default()).unwrap();
        assert!(output.valid);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].code, "TWCHECK050");
    }

    #[test]
    fn directive_mode_is_selectable() {
        let options = CompileOptions {
            indent_mode: IndentMode::Directive,
            ..CompileOptions::default()
        };
        // Without the directive, space indentation is rejected.
        let err = compile("type P\n  x: i32\npanic\n", &options).unwrap_err();
        assert_eq!(err.diagnostic.code, "TWLEX002");

        let ok = compile("\"use spaces\"\ntype P\n  x: i32\npanic\n", &options);
        assert!(ok.is_ok());
    }
}
