use serde::Serialize;

use crate::intern::{FloatId, StrId};

/// Id of a token in a [`TokenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct TokenId(pub u32);

/// A token produced by the TinyWhale lexer.
///
/// Positions are 1-based; columns count bytes from the start of the line in
/// the *original* source (indentation markers spliced in by the
/// preprocessor never advance the column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
    pub payload: TokenPayload,
}

impl Token {
    /// Create a token with no payload.
    pub fn new(kind: TokenKind, line: u32, col: u32) -> Self {
        Self {
            kind,
            line,
            col,
            payload: TokenPayload::None,
        }
    }

    /// Create a token carrying a payload.
    pub fn with_payload(kind: TokenKind, line: u32, col: u32, payload: TokenPayload) -> Self {
        Self {
            kind,
            line,
            col,
            payload,
        }
    }

    /// Interned text payload, if this token carries one.
    pub fn text_id(&self) -> Option<StrId> {
        match self.payload {
            TokenPayload::Str(id) => Some(id),
            _ => None,
        }
    }

    /// Indent level payload, if this token carries one.
    pub fn level(&self) -> Option<u32> {
        match self.payload {
            TokenPayload::Level(n) => Some(n),
            _ => None,
        }
    }
}

/// Per-token payload.
///
/// Identifiers and integer literals carry their interned text; float
/// literals carry their interned numeric value; indent/dedent markers carry
/// the level they enter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TokenPayload {
    None,
    Str(StrId),
    Float(FloatId),
    Level(u32),
}

/// Every kind of token in the TinyWhale language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // ── Keywords (3) ───────────────────────────────────────────────────
    KwPanic,
    KwMatch,
    KwType,

    // ── Primitive type names (4) ───────────────────────────────────────
    I32,
    I64,
    F32,
    F64,

    // ── Identifiers and literals (4) ───────────────────────────────────
    /// Lowercase-initial identifier, e.g. `count`.
    Ident,
    /// Uppercase-initial identifier, e.g. `Point`.
    UpperIdent,
    /// Integer literal text, e.g. `42`, `1e10`. Payload is the text.
    IntLiteral,
    /// Float literal, e.g. `3.14`, `2.5e-3`. Payload is the value.
    FloatLiteral,

    // ── Punctuation and operators ──────────────────────────────────────
    /// `:`
    Colon,
    /// `=`
    Eq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `%%` (floored remainder)
    PercentPercent,
    /// `&`
    Amp,
    /// `|`
    Bar,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>` (unsigned shift)
    ShrU,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `.`
    Dot,
    /// `!`
    Bang,
    /// `,`
    Comma,
    /// `_` (wildcard)
    Underscore,
    /// `->`
    Arrow,

    // ── Layout (3) ─────────────────────────────────────────────────────
    /// Synthetic indent marker; payload is the level entered.
    Indent,
    /// Synthetic dedent marker; payload is the level recorded by the
    /// preprocessor.
    Dedent,
    /// End of a physical line.
    Newline,

    // ── Special (2) ────────────────────────────────────────────────────
    Eof,
    /// Invalid input. Used for error recovery.
    Error,
}

impl TokenKind {
    /// Whether this kind names a primitive type (`i32`/`i64`/`f32`/`f64`).
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TokenKind::I32 | TokenKind::I64 | TokenKind::F32 | TokenKind::F64
        )
    }

    /// Whether this kind can start a type reference.
    pub fn starts_type(self) -> bool {
        self.is_primitive() || matches!(self, TokenKind::UpperIdent | TokenKind::LParen)
    }
}

/// Look up a keyword from its string representation.
///
/// Exact match only: `panicMode`, `i32value` and `matchmaking` are ordinary
/// identifiers.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "panic" => Some(TokenKind::KwPanic),
        "match" => Some(TokenKind::KwMatch),
        "type" => Some(TokenKind::KwType),
        "i32" => Some(TokenKind::I32),
        "i64" => Some(TokenKind::I64),
        "f32" => Some(TokenKind::F32),
        "f64" => Some(TokenKind::F64),
        _ => None,
    }
}

/// Dense append-only sequence of tokens.
///
/// Ids are assigned in creation order and stay valid for the lifetime of
/// the compilation.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: Vec<Token>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token and return its id.
    pub fn push(&mut self, token: Token) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(token);
        id
    }

    /// Fetch a token by id.
    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate tokens in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (TokenId(i as u32), t))
    }

    /// All tokens as a slice.
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_from_str_recognizes_all_keywords() {
        let keywords = [
            ("panic", TokenKind::KwPanic),
            ("match", TokenKind::KwMatch),
            ("type", TokenKind::KwType),
            ("i32", TokenKind::I32),
            ("i64", TokenKind::I64),
            ("f32", TokenKind::F32),
            ("f64", TokenKind::F64),
        ];
        for (s, expected) in keywords {
            assert_eq!(keyword_from_str(s), Some(expected));
        }
    }

    #[test]
    fn keyword_from_str_rejects_near_misses() {
        assert_eq!(keyword_from_str("panicMode"), None);
        assert_eq!(keyword_from_str("i32value"), None);
        assert_eq!(keyword_from_str("matchmaking"), None);
        assert_eq!(keyword_from_str("Panic"), None);
        assert_eq!(keyword_from_str(""), None);
    }

    #[test]
    fn store_assigns_dense_ids() {
        let mut store = TokenStore::new();
        let a = store.push(Token::new(TokenKind::KwPanic, 1, 1));
        let b = store.push(Token::new(TokenKind::Newline, 1, 6));
        assert_eq!(a, TokenId(0));
        assert_eq!(b, TokenId(1));
        assert_eq!(store.get(a).kind, TokenKind::KwPanic);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn payload_accessors() {
        let tok = Token::with_payload(TokenKind::Indent, 2, 1, TokenPayload::Level(1));
        assert_eq!(tok.level(), Some(1));
        assert_eq!(tok.text_id(), None);

        let tok = Token::with_payload(TokenKind::Ident, 1, 1, TokenPayload::Str(StrId(3)));
        assert_eq!(tok.text_id(), Some(StrId(3)));
        assert_eq!(tok.level(), None);
    }
}
