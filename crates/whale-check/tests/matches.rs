//! Match checking: arms, patterns, exhaustiveness, and emission shape.

use whale_check::inst::InstKind;
use whale_check::ty::TypeId;
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

#[test]
fn wildcard_match_emits_arms_then_match_then_bind() {
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\t_ -> 0\npanic\n";
    let (semir, diags, mut strings) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(semir.succeeded);

    assert_eq!(count_kind(&semir, InstKind::MatchArm), 2);
    assert_eq!(count_kind(&semir, InstKind::Match), 1);

    // The match instruction records the scrutinee and arm count, and the
    // result symbol is bound to it.
    let (match_id, match_inst) = semir
        .insts
        .iter()
        .find(|(_, i)| i.kind == InstKind::Match)
        .unwrap();
    assert_eq!(match_inst.arg1, 2);
    let scrutinee = semir
        .insts
        .get(whale_check::inst::InstId(match_inst.arg0 as u32));
    assert_eq!(scrutinee.kind, InstKind::VarRef);

    let result = strings.intern("result");
    let sym = semir.symbols.lookup(result).unwrap();
    let bind = semir
        .insts
        .iter()
        .find(|(_, i)| i.kind == InstKind::Bind && i.arg0 == sym.0 as i32)
        .unwrap()
        .1;
    assert_eq!(bind.arg1 as u32, match_id.0);
    assert_eq!(bind.ty, TypeId::I32);
}

#[test]
fn missing_catch_all_is_twcheck020() {
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\t1 -> 200\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(!semir.succeeded);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK020");
}

#[test]
fn binding_pattern_is_a_catch_all() {
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\tn -> n\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert_eq!(count_kind(&semir, InstKind::PatternBind), 1);
    // `n` shadows nothing but still owns a fresh local.
    assert_eq!(semir.symbols.local_count(), 3);
}

#[test]
fn or_pattern_with_catch_all_satisfies_exhaustiveness() {
    let source = "x: i32 = 1\nresult: i32 = match x\n\t0 | _ -> 5\npanic\n";
    let (_, diags, _) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let source = "x: i32 = 1\nresult: i32 = match x\n\t0 | 1 -> 5\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK020");
}

#[test]
fn catch_all_must_be_the_last_arm() {
    // A wildcard followed by a literal arm: the last arm decides.
    let source = "x: i32 = 1\nresult: i32 = match x\n\t_ -> 5\n\t0 -> 1\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK020");
}

#[test]
fn float_pattern_on_integer_scrutinee_is_twcheck018() {
    let source = "x: i32 = 1\nresult: i32 = match x\n\t1.5 -> 0\n\t_ -> 1\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK018");
}

#[test]
fn pattern_literal_out_of_scrutinee_range_is_twcheck018() {
    let source = "x: i32 = 1\nresult: i32 = match x\n\t2147483648 -> 0\n\t_ -> 1\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK018");
}

#[test]
fn negated_literal_patterns_check_against_scrutinee() {
    let source = "x: i32 = -5\nresult: i32 = match x\n\t-5 -> 1\n\t_ -> 0\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(semir.succeeded);
}

#[test]
fn arm_bodies_check_against_the_result_type() {
    let source = "x: i32 = 1\nresult: i32 = match x\n\t0 -> 1.5\n\t_ -> 0\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK016");
}

#[test]
fn scrutinee_checks_against_the_result_type() {
    let source = "x: i64 = 1\nresult: i32 = match x\n\t_ -> 0\npanic\n";
    let (_, diags, _) = check_source(source);
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK012");
}

#[test]
fn panic_is_a_valid_arm_body() {
    let source = "x: i32 = 1\nresult: i32 = match x\n\t0 -> panic\n\t_ -> 7\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    // One from the arm body, one from the trailing statement.
    assert_eq!(count_kind(&semir, InstKind::Unreachable), 2);
}

#[test]
fn match_arm_outside_match_is_twcheck019() {
    let (_, diags, _) = check_source("type P\n\t0 -> 1\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK019");
}

#[test]
fn unexpected_indentation_is_twcheck001() {
    let (_, diags, _) = check_source("x: i32 = 1\n\ty: i32 = 2\npanic\n");
    assert_eq!(diags.first_error().unwrap().code, "TWCHECK001");
}

#[test]
fn match_over_distinct_scrutinee_uses_its_base_bounds() {
    let source = "type Code = i32\nc: Code = 7\nr: Code = match c\n\t7 -> 1\n\t_ -> 0\npanic\n";
    let (semir, diags, _) = check_source(source);
    assert!(diags.is_empty(), "{:?}", diags.entries());
    assert!(semir.succeeded);
}
