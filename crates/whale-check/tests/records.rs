//! Record declarations, record literals, flattening, and list bindings.

use whale_check::inst::InstKind;
use whale_check::ty::{TypeId, TypeKind};
use whale_check::{check, SemIr};
use whale_common::diag::Diagnostics;
use whale_common::intern::{FloatInterner, StringInterner};
use whale_lexer::{preprocess, tokenize, IndentMode};
use whale_parser::parse_tokens;

fn check_source(source: &str) -> (SemIr, Diagnostics, StringInterner) {
    let normalized = preprocess(source, IndentMode::Detect).expect("valid indentation");
    let mut strings = StringInterner::new();
    let mut floats = FloatInterner::new();
    let mut diags = Diagnostics::new();
    let tokens = tokenize(&normalized, &mut strings, &mut floats, &mut diags);
    let nodes = parse_tokens(&tokens, &mut diags);
    let semir = check(&nodes, &tokens, &mut strings, &floats, &mut diags);
    (semir, diags, strings)
}

fn count_kind(semir: &SemIr, kind: InstKind) -> usize {
    semir.insts.iter().filter(|(_, i)| i.kind == kind).count()
}

const POINT: &str = "type Point\n\tx: i32\n\ty: i32\n";

#[test]
fn record_literal_flattens_into_scalar_locals() {
    let source = format!("{POINT}p: Point =\n\tx: 1\n\ty: 2\npanic\n");
    let (semir, diags, mut strings) = check_source(&source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(semir.succeeded);

    let point = strings.intern("Point");
    let ty = semir.types.lookup(point).unwrap();
    assert_eq!(semir.types.kind(ty), TypeKind::Record);
    let fields = semir.types.get(ty).unwrap().fields.as_ref().unwrap().clone();
    assert_eq!(fields.len(), 2);
    assert!(fields.iter().all(|f| f.ty == TypeId::I32));

    let p_x = strings.intern("p_x");
    let p_y = strings.intern("p_y");
    let sx = semir.symbols.lookup(p_x).unwrap();
    let sy = semir.symbols.lookup(p_y).unwrap();
    assert_eq!(semir.symbols.get(sx).ty, TypeId::I32);
    assert_eq!(semir.symbols.get(sy).ty, TypeId::I32);
    assert_eq!(semir.symbols.local_count(), 2);
    assert_eq!(count_kind(&semir, InstKind::Bind), 2);
}

#[test]
fn flattened_field_access_resolves_to_var_ref() {
    let source = format!("{POINT}p: Point =\n\tx: 1\n\ty: 2\nsum: i32 = p.x + p.y\npanic\n");
    let (semir, diags, _) = check_source(&source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(count_kind(&semir, InstKind::VarRef), 2);
    // No runtime field projection is needed once flattening resolved.
    assert_eq!(count_kind(&semir, InstKind::FieldAccess), 0);
}

#[test]
fn unknown_field_access_is_twcheck030() {
    let source = format!("{POINT}p: Point =\n\tx: 1\n\ty: 2\nz: i32 = p.z\npanic\n");
    let (_, diags, _) = check_source(&source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK030");
}

#[test]
fn field_access_on_scalar_is_twcheck031() {
    let (_, diags, _) = check_source("n: i32 = 1\nx: i32 = n.x\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK031");
}

#[test]
fn missing_field_in_initializer_is_twcheck027() {
    let source = format!("{POINT}p: Point =\n\tx: 1\npanic\n");
    let (_, diags, _) = check_source(&source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK027");
}

#[test]
fn unknown_field_in_initializer_is_twcheck028() {
    let source = format!("{POINT}p: Point =\n\tx: 1\n\ty: 2\n\tz: 3\npanic\n");
    let (_, diags, _) = check_source(&source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK028");
}

#[test]
fn duplicate_initializer_field_is_twcheck029() {
    let source = format!("{POINT}p: Point =\n\tx: 1\n\tx: 2\n\ty: 3\npanic\n");
    let (_, diags, _) = check_source(&source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK029");
}

#[test]
fn duplicate_field_declaration_is_twcheck026() {
    let (_, diags, _) = check_source("type P\n\tx: i32\n\tx: i32\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK026");
}

#[test]
fn self_referential_field_is_twcheck032() {
    let (_, diags, _) = check_source("type P\n\tnext: P\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK032");
}

#[test]
fn field_init_type_errors_use_field_types() {
    let source = format!("{POINT}p: Point =\n\tx: 1.5\n\ty: 2\npanic\n");
    let (_, diags, _) = check_source(&source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK016");
}

#[test]
fn nested_record_fields_resolve() {
    let source = "type Inner\n\tv: i64\ntype Outer\n\tinner: Inner\n\tcount: i32\npanic\n";
    let (semir, diags, mut strings) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    let outer = strings.intern("Outer");
    let ty = semir.types.lookup(outer).unwrap();
    let fields = semir.types.get(ty).unwrap().fields.as_ref().unwrap().clone();
    assert_eq!(fields.len(), 2);
    let inner = strings.intern("Inner");
    assert_eq!(fields[0].ty, semir.types.lookup(inner).unwrap());
}

#[test]
fn list_binding_flattens_into_indexed_locals() {
    let (semir, diags, mut strings) = check_source("xs: i32[]<size=3> = [1, 2, 3]\npanic\n");
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(semir.symbols.local_count(), 3);
    assert_eq!(count_kind(&semir, InstKind::Bind), 3);
    for i in 0..3 {
        let name = strings.intern(&format!("xs_{i}"));
        let sym = semir.symbols.lookup(name).unwrap();
        assert_eq!(semir.symbols.get(sym).ty, TypeId::I32);
    }
}

#[test]
fn list_index_access_resolves_flattened_symbol() {
    let (semir, diags, _) = check_source("xs: i32[]<size=2> = [10, 20]\ny: i32 = xs[1]\npanic\n");
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(count_kind(&semir, InstKind::VarRef), 1);
}

#[test]
fn list_index_out_of_bounds_is_twcheck034() {
    let (_, diags, _) = check_source("xs: i32[]<size=2> = [10, 20]\ny: i32 = xs[2]\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK034");
}

#[test]
fn negative_list_index_is_twcheck035() {
    let (_, diags, _) = check_source("xs: i32[]<size=2> = [10, 20]\ny: i32 = xs[-1]\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK035");
}

#[test]
fn zero_list_size_is_twcheck036() {
    let (_, diags, _) = check_source("xs: i32[]<size=0> = [1]\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK036");
}

#[test]
fn list_literal_length_mismatch_is_twcheck037() {
    let (_, diags, _) = check_source("xs: i32[]<size=3> = [1, 2]\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK037");
}

#[test]
fn list_element_types_are_enforced() {
    let (_, diags, _) = check_source("xs: i32[]<size=2> = [1, 2.5]\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK016");
}

#[test]
fn list_types_intern_by_element_and_size() {
    let source = "xs: i32[]<size=2> = [1, 2]\nys: i32[]<size=2> = [3, 4]\ny: i32 = xs[0]\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(diags.is_empty());
    // Two list bindings over the same list type: one interned entry.
    let list_count = semir
        .types
        .iter()
        .filter(|(_, t)| t.kind == TypeKind::List)
        .count();
    assert_eq!(list_count, 1);
}
