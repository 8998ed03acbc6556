//! The TinyWhale compiler CLI.
//!
//! Provides the `whalec` command:
//!
//! - `whalec build <file>` - Compile a TinyWhale source file to a `.wasm`
//!   module
//!
//! Options:
//! - `--output` - Output path for the module (defaults to the input with
//!   a `.wasm` extension)
//! - `--emit-wat` - Write the textual form alongside the binary
//! - `--optimize` - Forwarded to the emitter
//! - `--directive` - Require tabs unless the file opts into spaces with
//!   a `"use spaces"` first line
//! - `--json` - Print diagnostics as JSON instead of rendered reports

use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use whale_common::diag::Severity;
use whale_common::span::LineIndex;
use whale_lexer::IndentMode;
use whalec::{compile_full, CompileOptions, Compilation};

#[derive(Parser)]
#[command(name = "whalec", version, about = "The TinyWhale compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a TinyWhale source file to WebAssembly
    Build {
        /// Path to the source file
        file: PathBuf,

        /// Output path for the compiled module
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the WAT text next to the binary
        #[arg(long = "emit-wat")]
        emit_wat: bool,

        /// Forwarded to the emitter (reserved for the optimizer)
        #[arg(long)]
        optimize: bool,

        /// Use directive mode for the indentation discipline
        #[arg(long)]
        directive: bool,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            file,
            output,
            emit_wat,
            optimize,
            directive,
            json,
        } => {
            if let Err(e) = build(&file, output.as_deref(), emit_wat, optimize, directive, json) {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Execute the build pipeline: read -> compile -> report -> write.
fn build(
    file: &Path,
    output: Option<&Path>,
    emit_wat: bool,
    optimize: bool,
    directive: bool,
    json: bool,
) -> Result<(), String> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {}", file.display(), e))?;

    let options = CompileOptions {
        filename: Some(file.display().to_string()),
        optimize,
        indent_mode: if directive {
            IndentMode::Directive
        } else {
            IndentMode::Detect
        },
    };
    let compilation = compile_full(&source, &options);

    if json {
        let rendered = serde_json::to_string_pretty(&compilation.diagnostics.sorted())
            .map_err(|e| e.to_string())?;
        println!("{rendered}");
    } else {
        report_diagnostics(&compilation);
    }
    if compilation.diagnostics.has_errors() {
        return Err("compilation failed due to errors above".to_string());
    }

    let semir = compilation
        .semir
        .as_ref()
        .ok_or_else(|| "internal: no IR after a clean check".to_string())?;
    let module = whale_emit::emit(
        semir,
        &compilation.nodes,
        &compilation.tokens,
        &compilation.strings,
        optimize,
    )
    .map_err(|e| e.to_string())?;

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => file.with_extension("wasm"),
    };
    std::fs::write(&output_path, &module.binary)
        .map_err(|e| format!("failed to write '{}': {}", output_path.display(), e))?;
    eprintln!("  wasm: {}", output_path.display());

    if emit_wat {
        let wat_path = output_path.with_extension("wat");
        std::fs::write(&wat_path, module.text.as_bytes())
            .map_err(|e| format!("failed to write '{}': {}", wat_path.display(), e))?;
        eprintln!("  wat: {}", wat_path.display());
    }

    Ok(())
}

/// Render diagnostics with labeled source spans, sorted by position.
fn report_diagnostics(compilation: &Compilation) {
    let index = LineIndex::new(&compilation.source);
    for diagnostic in compilation.diagnostics.sorted() {
        let kind = match diagnostic.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };
        let start = index.offset_of(diagnostic.line, diagnostic.column) as usize;
        let end = (start + 1).min(compilation.source.len().max(1));
        let span = start.min(end.saturating_sub(1))..end;

        let mut report = Report::<std::ops::Range<usize>>::build(kind, span.clone())
            .with_code(diagnostic.code)
            .with_message(&diagnostic.message)
            .with_label(Label::new(span).with_message(&diagnostic.message));
        if let Some(suggestion) = &diagnostic.suggestion {
            report = report.with_help(suggestion);
        }
        let _ = report.finish().eprint(Source::from(&compilation.source));
    }
}
