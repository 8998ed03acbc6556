//! End-to-end pipeline scenarios.

use whale_check::inst::InstKind;
use whalec::{compile, compile_full, CompileOptions};

const WASM_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

fn count_kind(compilation: &whalec::Compilation, kind: InstKind) -> usize {
    compilation
        .semir
        .as_ref()
        .map(|s| s.insts.iter().filter(|(_, i)| i.kind == kind).count())
        .unwrap_or(0)
}

#[test]
fn scenario_bare_panic() {
    let output = compile("panic\n", &CompileOptions::default()).unwrap();
    assert!(output.valid);
    assert_eq!(&output.binary[..8], &WASM_HEADER);
    assert!(output.warnings.is_empty());

    let compilation = compile_full("panic\n", &CompileOptions::default());
    assert_eq!(count_kind(&compilation, InstKind::Unreachable), 1);
}

#[test]
fn scenario_single_binding() {
    let source = "x:i32 = 42\npanic\n";
    let output = compile(source, &CompileOptions::default()).unwrap();
    assert_eq!(&output.binary[..8], &WASM_HEADER);

    let compilation = compile_full(source, &CompileOptions::default());
    let semir = compilation.semir.as_ref().unwrap();
    assert_eq!(semir.symbols.local_count(), 1);
    let kinds: Vec<InstKind> = semir.insts.iter().map(|(_, i)| i.kind).collect();
    assert_eq!(
        kinds,
        vec![InstKind::IntConst, InstKind::Bind, InstKind::Unreachable]
    );
}

#[test]
fn scenario_shadowing_binding() {
    let source = "x:i32 = 0\nx:i32 = x\npanic\n";
    let output = compile(source, &CompileOptions::default()).unwrap();
    assert_eq!(&output.binary[..8], &WASM_HEADER);

    let mut compilation = compile_full(source, &CompileOptions::default());
    let semir = compilation.semir.as_ref().unwrap();
    assert_eq!(count_kind(&compilation, InstKind::VarRef), 1);
    assert_eq!(semir.symbols.local_count(), 2);
    let x = compilation.strings.intern("x");
    let latest = semir.symbols.lookup(x).unwrap();
    assert_eq!(semir.symbols.get(latest).local_index, 1);
}

#[test]
fn scenario_type_mismatch_line_two() {
    let err = compile("x:i64 = 0\ny:i32 = x\npanic\n", &CompileOptions::default()).unwrap_err();
    assert_eq!(err.diagnostic.code, "TWCHECK012");
    assert_eq!(err.diagnostic.line, 2);
}

#[test]
fn scenario_record_flattening() {
    let source = "type Point\n\tx: i32\n\ty: i32\np:Point =\n\tx: 1\n\ty: 2\npanic\n";
    let output = compile(source, &CompileOptions::default()).unwrap();
    assert_eq!(&output.binary[..8], &WASM_HEADER);

    let mut compilation = compile_full(source, &CompileOptions::default());
    let semir = compilation.semir.as_ref().unwrap();
    assert!(semir.succeeded);
    let point = compilation.strings.intern("Point");
    let ty = semir.types.lookup(point).unwrap();
    let fields = semir.types.get(ty).unwrap().fields.as_ref().unwrap().len();
    assert_eq!(fields, 2);
    for name in ["p_x", "p_y"] {
        let id = compilation.strings.intern(name);
        assert!(semir.symbols.lookup(id).is_some(), "{name} must exist");
    }
    assert_eq!(count_kind(&compilation, InstKind::Bind), 2);
}

#[test]
fn scenario_match_shapes() {
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\t_ -> 0\npanic\n";
    let output = compile(source, &CompileOptions::default()).unwrap();
    assert!(output.valid);
    assert!(output.warnings.is_empty());

    let compilation = compile_full(source, &CompileOptions::default());
    assert_eq!(count_kind(&compilation, InstKind::MatchArm), 2);
    assert_eq!(count_kind(&compilation, InstKind::Match), 1);

    // Swapping the catch-all for a second literal arm breaks exhaustiveness.
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\t1 -> 200\npanic\n";
    let err = compile(source, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.diagnostic.code, "TWCHECK020");
}

#[test]
fn conformance_text_properties() {
    let source = "x: i32 = 1\ny: i64 = 2\npanic\n";
    let output = compile(source, &CompileOptions::default()).unwrap();
    assert!(output.text.contains("(module"));
    assert!(output.text.contains("(export \"_start\""));
    assert_eq!(output.text.matches("(local ").count(), 2);
}

#[test]
fn determinism_across_invocations() {
    let source = "type P\n\ta: i32\np: P =\n\ta: 3\nr: i32 = match p.a\n\t3 -> 1\n\t_ -> 0\npanic\n";
    let a = compile(source, &CompileOptions::default()).unwrap();
    let b = compile(source, &CompileOptions::default()).unwrap();
    assert_eq!(a.binary, b.binary);
    assert_eq!(a.text, b.text);
}

#[test]
fn diagnostics_sort_by_position() {
    let source = "a: i32 = 1.5\nb: Missing = 2\nc: i32 = undefinedname\npanic\n";
    let compilation = compile_full(source, &CompileOptions::default());
    let sorted = compilation.diagnostics.sorted();
    let lines: Vec<u32> = sorted.iter().map(|d| d.line).collect();
    let mut expected = lines.clone();
    expected.sort_unstable();
    assert_eq!(lines, expected);
    assert_eq!(sorted.len(), 3);
}

#[test]
fn build_artifacts_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("main.tw");
    std::fs::write(&src_path, "x: i32 = 7\npanic\n").unwrap();

    let source = std::fs::read_to_string(&src_path).unwrap();
    let options = CompileOptions {
        filename: Some(src_path.display().to_string()),
        ..CompileOptions::default()
    };
    let output = compile(&source, &options).unwrap();

    let wasm_path = src_path.with_extension("wasm");
    std::fs::write(&wasm_path, &output.binary).unwrap();
    let bytes = std::fs::read(&wasm_path).unwrap();
    assert_eq!(&bytes[..8], &WASM_HEADER);

    let wat_path = src_path.with_extension("wat");
    std::fs::write(&wat_path, output.text.as_bytes()).unwrap();
    let text = std::fs::read_to_string(&wat_path).unwrap();
    assert!(text.contains("(export \"_start\""));
}
