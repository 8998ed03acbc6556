//! TinyWhale parser: token stream in, postorder parse tree out.
//!
//! The tree is a flat vector of `(kind, token, subtree_size)` records in
//! postorder (see [`node`]), which makes child traversal an O(1)-per-hop
//! backwards walk and keeps the whole tree in one allocation. The parser
//! itself is a hand-rolled recursive descent over the token stream; the
//! synthetic `Indent`/`Dedent` tokens remove all whitespace ambiguity.

pub mod node;

mod parser;

pub use node::{NodeId, NodeKind, NodeStore, ParseNode};
pub use parser::parse_tokens;

use whale_common::diag::Diagnostics;
use whale_common::intern::{FloatInterner, StringInterner};
use whale_common::token::TokenStore;

/// Lex and parse a normalized stream in one step.
///
/// Convenience for callers that do not need to hold onto the lexer
/// separately; the preprocessor still runs before this (its structural
/// errors abort, which a tokenizing parser cannot express).
pub fn parse_normalized(
    normalized: &str,
    strings: &mut StringInterner,
    floats: &mut FloatInterner,
    diags: &mut Diagnostics,
) -> (TokenStore, NodeStore) {
    let tokens = whale_lexer::tokenize(normalized, strings, floats, diags);
    let nodes = parse_tokens(&tokens, diags);
    (tokens, nodes)
}
