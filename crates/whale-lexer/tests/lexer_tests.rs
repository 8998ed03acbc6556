//! End-to-end lexing: preprocess raw source, then tokenize.

use whale_common::diag::Diagnostics;
use whale_common::intern::{FloatInterner, StringInterner};
use whale_common::token::{TokenKind, TokenStore};
use whale_lexer::{preprocess, tokenize, IndentMode};

fn lex_file(source: &str) -> (TokenStore, Diagnostics) {
    let normalized = preprocess(source, IndentMode::Detect).expect("indentation should be valid");
    let mut strings = StringInterner::new();
    let mut floats = FloatInterner::new();
    let mut diags = Diagnostics::new();
    let store = tokenize(&normalized, &mut strings, &mut floats, &mut diags);
    (store, diags)
}

#[test]
fn match_block_produces_layout_tokens() {
    let source = "x: i32 = 42\nresult: i32 = match x\n\t0 -> 100\n\t_ -> 0\npanic\n";
    let (store, diags) = lex_file(source);
    assert!(diags.is_empty());

    let kinds: Vec<TokenKind> = store.iter().map(|(_, t)| t.kind).collect();
    let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
    let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
    assert_eq!(indents, 1);
    assert_eq!(dedents, 1);

    // The indent marker precedes the first arm's pattern.
    let indent_pos = kinds.iter().position(|k| *k == TokenKind::Indent).unwrap();
    assert_eq!(kinds[indent_pos + 1], TokenKind::IntLiteral);
    assert_eq!(kinds[indent_pos + 2], TokenKind::Arrow);
}

#[test]
fn type_declaration_round_trip() {
    let source = "type Point\n\tx: i32\n\ty: i32\np: Point =\n\tx: 1\n\ty: 2\npanic\n";
    let (store, diags) = lex_file(source);
    assert!(diags.is_empty());

    let uppers = store
        .iter()
        .filter(|(_, t)| t.kind == TokenKind::UpperIdent)
        .count();
    assert_eq!(uppers, 2, "Point appears in declaration and annotation");

    // Two indented blocks, each closed once.
    let dedents = store
        .iter()
        .filter(|(_, t)| t.kind == TokenKind::Dedent)
        .count();
    assert_eq!(dedents, 2);
}

#[test]
fn dedents_are_closed_at_eof() {
    let source = "r: i32 = match 1\n\t_ -> 0";
    let (store, _) = lex_file(source);
    let kinds: Vec<TokenKind> = store.iter().map(|(_, t)| t.kind).collect();
    let last_dedent = kinds.iter().rposition(|k| *k == TokenKind::Dedent);
    assert!(last_dedent.is_some(), "EOF must close the open block");
    assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
}

#[test]
fn token_positions_survive_normalization() {
    let source = "type P\n\tcount: i64\npanic\n";
    let (store, _) = lex_file(source);
    let count_tok = store
        .iter()
        .find(|(_, t)| t.kind == TokenKind::Ident)
        .map(|(_, t)| (t.line, t.col))
        .unwrap();
    // `count` sits on line 2 behind one tab.
    assert_eq!(count_tok, (2, 2));
}
