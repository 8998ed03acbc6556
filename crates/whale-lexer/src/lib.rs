//! TinyWhale lexer: indentation preprocessing plus tokenization.
//!
//! [`indent::preprocess`] reduces leading whitespace to explicit level
//! markers; [`tokenize`] turns the normalized stream into a dense
//! [`TokenStore`]. Keywords are recognized by exact match after an
//! identifier is scanned, so `panicMode` and `i32value` stay ordinary
//! identifiers. Comments (`#` to end of line) are dropped.

pub mod indent;

mod cursor;

use cursor::Cursor;
use whale_common::diag::{codes, Diagnostics};
use whale_common::intern::{FloatInterner, StringInterner};
use whale_common::token::{keyword_from_str, Token, TokenKind, TokenPayload, TokenStore};

pub use indent::{preprocess, IndentError, IndentErrorKind, IndentMode};

/// Tokenize a normalized stream into a [`TokenStore`].
///
/// Identifier and integer-literal text is interned into `strings`; float
/// values into `floats`. Invalid input produces `Error` tokens plus
/// `TWLEX01x` diagnostics; tokenization always runs to the end of input
/// and finishes with an `Eof` token.
pub fn tokenize(
    normalized: &str,
    strings: &mut StringInterner,
    floats: &mut FloatInterner,
    diags: &mut Diagnostics,
) -> TokenStore {
    let mut lexer = Lexer {
        cursor: Cursor::new(normalized),
        strings,
        floats,
        diags,
    };
    let mut store = TokenStore::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        store.push(token);
        if done {
            return store;
        }
    }
}

struct Lexer<'src, 'ctx> {
    cursor: Cursor<'src>,
    strings: &'ctx mut StringInterner,
    floats: &'ctx mut FloatInterner,
    diags: &'ctx mut Diagnostics,
}

impl<'src, 'ctx> Lexer<'src, 'ctx> {
    /// Produce the next token.
    fn next_token(&mut self) -> Token {
        loop {
            self.skip_blank();
            let line = self.cursor.line();
            let col = self.cursor.col();

            let Some(c) = self.cursor.peek() else {
                return Token::new(TokenKind::Eof, line, col);
            };

            return match c {
                '\n' => {
                    self.cursor.advance();
                    Token::new(TokenKind::Newline, line, col)
                }
                '#' => {
                    // Comment to end of line; no token.
                    self.cursor.eat_while(|c| c != '\n');
                    continue;
                }
                indent::MARKER_OPEN => self.lex_marker(),

                '(' => self.single(TokenKind::LParen, line, col),
                ')' => self.single(TokenKind::RParen, line, col),
                '[' => self.single(TokenKind::LBracket, line, col),
                ']' => self.single(TokenKind::RBracket, line, col),
                '.' => self.single(TokenKind::Dot, line, col),
                ',' => self.single(TokenKind::Comma, line, col),
                ':' => self.single(TokenKind::Colon, line, col),
                '+' => self.single(TokenKind::Plus, line, col),
                '*' => self.single(TokenKind::Star, line, col),
                '/' => self.single(TokenKind::Slash, line, col),
                '^' => self.single(TokenKind::Caret, line, col),
                '~' => self.single(TokenKind::Tilde, line, col),

                '-' => self.lex_minus(line, col),
                '=' => self.lex_eq(line, col),
                '!' => self.lex_bang(line, col),
                '%' => self.lex_percent(line, col),
                '&' => self.lex_amp(line, col),
                '|' => self.lex_pipe(line, col),
                '<' => self.lex_lt(line, col),
                '>' => self.lex_gt(line, col),

                '0'..='9' => self.lex_number(line, col),
                '_' => self.lex_underscore(line, col),
                c if c.is_ascii_alphabetic() => self.lex_ident(line, col),

                _ => {
                    self.cursor.advance();
                    self.diags.error(
                        codes::LEX_UNEXPECTED_CHAR,
                        line,
                        col,
                        format!("unexpected character {c:?}"),
                    );
                    Token::new(TokenKind::Error, line, col)
                }
            };
        }
    }

    /// Skip insignificant whitespace (spaces, tabs, carriage returns).
    fn skip_blank(&mut self) {
        self.cursor.eat_while(|c| c == ' ' || c == '\t' || c == '\r');
    }

    fn single(&mut self, kind: TokenKind, line: u32, col: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, line, col)
    }

    /// `-` -> `Minus`, `->` -> `Arrow`
    fn lex_minus(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('>') {
            self.cursor.advance();
            Token::new(TokenKind::Arrow, line, col)
        } else {
            Token::new(TokenKind::Minus, line, col)
        }
    }

    /// `=` -> `Eq`, `==` -> `EqEq`
    fn lex_eq(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::EqEq, line, col)
        } else {
            Token::new(TokenKind::Eq, line, col)
        }
    }

    /// `!` -> `Bang`, `!=` -> `NotEq`
    fn lex_bang(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::NotEq, line, col)
        } else {
            Token::new(TokenKind::Bang, line, col)
        }
    }

    /// `%` -> `Percent`, `%%` -> `PercentPercent`
    fn lex_percent(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('%') {
            self.cursor.advance();
            Token::new(TokenKind::PercentPercent, line, col)
        } else {
            Token::new(TokenKind::Percent, line, col)
        }
    }

    /// `&` -> `Amp`, `&&` -> `AmpAmp`
    fn lex_amp(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('&') {
            self.cursor.advance();
            Token::new(TokenKind::AmpAmp, line, col)
        } else {
            Token::new(TokenKind::Amp, line, col)
        }
    }

    /// `|` -> `Bar`, `||` -> `PipePipe`
    fn lex_pipe(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('|') {
            self.cursor.advance();
            Token::new(TokenKind::PipePipe, line, col)
        } else {
            Token::new(TokenKind::Bar, line, col)
        }
    }

    /// `<` -> `Lt`, `<=` -> `LtEq`, `<<` -> `Shl`
    fn lex_lt(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => {
                self.cursor.advance();
                Token::new(TokenKind::LtEq, line, col)
            }
            Some('<') => {
                self.cursor.advance();
                Token::new(TokenKind::Shl, line, col)
            }
            _ => Token::new(TokenKind::Lt, line, col),
        }
    }

    /// `>` -> `Gt`, `>=` -> `GtEq`, `>>` -> `Shr`, `>>>` -> `ShrU`
    fn lex_gt(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => {
                self.cursor.advance();
                Token::new(TokenKind::GtEq, line, col)
            }
            Some('>') => {
                self.cursor.advance();
                if self.cursor.peek() == Some('>') {
                    self.cursor.advance();
                    Token::new(TokenKind::ShrU, line, col)
                } else {
                    Token::new(TokenKind::Shr, line, col)
                }
            }
            _ => Token::new(TokenKind::Gt, line, col),
        }
    }

    /// Lex a `⟨line,level⟩⇥` / `⟨line,level⟩⇤` preprocessor marker.
    ///
    /// Markers occupy bytes in the normalized stream but no columns in the
    /// original source, so the column counter is reset afterwards.
    fn lex_marker(&mut self) -> Token {
        let line_fallback = self.cursor.line();
        self.cursor.advance(); // consume the opening bracket
        let line = self.lex_marker_number().unwrap_or(line_fallback);
        if self.cursor.peek() == Some(',') {
            self.cursor.advance();
        }
        let level = self.lex_marker_number().unwrap_or(0);
        if self.cursor.peek() == Some(indent::MARKER_CLOSE) {
            self.cursor.advance();
        }
        let kind = match self.cursor.peek() {
            Some(indent::MARKER_INDENT) => {
                self.cursor.advance();
                TokenKind::Indent
            }
            Some(indent::MARKER_DEDENT) => {
                self.cursor.advance();
                TokenKind::Dedent
            }
            _ => TokenKind::Error,
        };
        self.cursor.set_col(1);
        Token::with_payload(kind, line, 1, TokenPayload::Level(level))
    }

    fn lex_marker_number(&mut self) -> Option<u32> {
        let start = self.cursor.pos();
        self.cursor.eat_while(|c| c.is_ascii_digit());
        self.cursor.slice(start, self.cursor.pos()).parse().ok()
    }

    /// Lex an integer or float literal.
    ///
    /// Integers allow plain scientific notation (`1e10`); floats are
    /// `d.d` with an optional signed exponent.
    fn lex_number(&mut self, line: u32, col: u32) -> Token {
        let start = self.cursor.pos();
        self.cursor.eat_while(|c| c.is_ascii_digit());

        let is_float = self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.cursor.advance(); // consume '.'
            self.cursor.eat_while(|c| c.is_ascii_digit());
            if self.cursor.peek() == Some('e') || self.cursor.peek() == Some('E') {
                self.lex_float_exponent();
            }
            let text = self.cursor.slice(start, self.cursor.pos());
            let value = text.parse::<f64>().unwrap_or(0.0);
            return Token::with_payload(
                TokenKind::FloatLiteral,
                line,
                col,
                TokenPayload::Float(self.floats.intern(value)),
            );
        }

        // Unsigned exponent keeps the literal an integer: `1e10`.
        if matches!(self.cursor.peek(), Some('e' | 'E'))
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        let text = self.cursor.slice(start, self.cursor.pos());
        Token::with_payload(
            TokenKind::IntLiteral,
            line,
            col,
            TokenPayload::Str(self.strings.intern(text)),
        )
    }

    fn lex_float_exponent(&mut self) {
        // Consume `e`/`E` plus an optional sign, digits follow.
        self.cursor.advance();
        if matches!(self.cursor.peek(), Some('+' | '-')) {
            self.cursor.advance();
        }
        self.cursor.eat_while(|c| c.is_ascii_digit());
    }

    /// `_` alone is the wildcard; `_name` is reserved and rejected.
    fn lex_underscore(&mut self, line: u32, col: u32) -> Token {
        self.cursor.advance();
        if self
            .cursor
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.cursor
                .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
            self.diags.error(
                codes::LEX_LEADING_UNDERSCORE,
                line,
                col,
                "identifiers may not begin with an underscore",
            );
            return Token::new(TokenKind::Error, line, col);
        }
        Token::new(TokenKind::Underscore, line, col)
    }

    /// Lex an identifier, then check for an exact keyword match.
    fn lex_ident(&mut self, line: u32, col: u32) -> Token {
        let start = self.cursor.pos();
        let first = self.cursor.advance().unwrap_or('a');
        self.cursor
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = self.cursor.slice(start, self.cursor.pos());

        if let Some(kind) = keyword_from_str(text) {
            return Token::new(kind, line, col);
        }
        let kind = if first.is_ascii_uppercase() {
            TokenKind::UpperIdent
        } else {
            TokenKind::Ident
        };
        Token::with_payload(kind, line, col, TokenPayload::Str(self.strings.intern(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (TokenStore, StringInterner, Diagnostics) {
        let mut strings = StringInterner::new();
        let mut floats = FloatInterner::new();
        let mut diags = Diagnostics::new();
        let store = tokenize(source, &mut strings, &mut floats, &mut diags);
        (store, strings, diags)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.iter().map(|(_, t)| t.kind).collect()
    }

    #[test]
    fn lex_binding_line() {
        assert_eq!(
            kinds("x: i32 = 42\n"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::I32,
                TokenKind::Eq,
                TokenKind::IntLiteral,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_need_exact_match() {
        assert_eq!(
            kinds("panic panicMode matchmaking i32value"),
            vec![
                TokenKind::KwPanic,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn upper_identifiers_are_distinct() {
        assert_eq!(
            kinds("Point origin"),
            vec![TokenKind::UpperIdent, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            kinds("a >> b >>> c >= d"),
            vec![
                TokenKind::Ident,
                TokenKind::Shr,
                TokenKind::Ident,
                TokenKind::ShrU,
                TokenKind::Ident,
                TokenKind::GtEq,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("a %% b % c"),
            vec![
                TokenKind::Ident,
                TokenKind::PercentPercent,
                TokenKind::Ident,
                TokenKind::Percent,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("p -> q - r"),
            vec![
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Minus,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn int_scientific_notation_stays_integer() {
        let (store, strings, _) = lex("1e10");
        let tok = store.get(whale_common::token::TokenId(0));
        assert_eq!(tok.kind, TokenKind::IntLiteral);
        assert_eq!(strings.resolve(tok.text_id().unwrap()), "1e10");
    }

    #[test]
    fn float_literals_carry_values() {
        let mut strings = StringInterner::new();
        let mut floats = FloatInterner::new();
        let mut diags = Diagnostics::new();
        let store = tokenize("2.5 1.0e3 3.25e-2", &mut strings, &mut floats, &mut diags);
        let values: Vec<f64> = store
            .iter()
            .filter(|(_, t)| t.kind == TokenKind::FloatLiteral)
            .map(|(_, t)| match t.payload {
                TokenPayload::Float(id) => floats.resolve(id),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![2.5, 1000.0, 0.0325]);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            kinds("panic # trailing note\n# full line\n"),
            vec![
                TokenKind::KwPanic,
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn markers_become_layout_tokens() {
        let (store, _, _) = lex("type P\n⟨2,1⟩⇥\tx: i32\n⟨3,0⟩⇤panic\n");
        let layout: Vec<(TokenKind, u32, Option<u32>)> = store
            .iter()
            .filter(|(_, t)| matches!(t.kind, TokenKind::Indent | TokenKind::Dedent))
            .map(|(_, t)| (t.kind, t.line, t.level()))
            .collect();
        assert_eq!(
            layout,
            vec![(TokenKind::Indent, 2, Some(1)), (TokenKind::Dedent, 3, Some(0))]
        );
    }

    #[test]
    fn marker_does_not_shift_columns() {
        let (store, _, _) = lex("type P\n⟨2,1⟩⇥\tx: i32\n");
        let ident = store.iter().find(|(_, t)| t.kind == TokenKind::Ident).unwrap().1;
        // The tab occupies column 1, the identifier starts at column 2.
        assert_eq!((ident.line, ident.col), (2, 2));
    }

    #[test]
    fn wildcard_versus_reserved_underscore() {
        let (store, _, diags) = lex("_ _reserved");
        let kinds: Vec<TokenKind> = store.iter().map(|(_, t)| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Underscore, TokenKind::Error, TokenKind::Eof]
        );
        assert_eq!(diags.entries()[0].code, "TWLEX011");
    }

    #[test]
    fn unexpected_character_is_reported() {
        let (store, _, diags) = lex("x = @");
        assert!(store.iter().any(|(_, t)| t.kind == TokenKind::Error));
        assert_eq!(diags.entries()[0].code, "TWLEX010");
    }

    #[test]
    fn positions_are_line_and_byte_column() {
        let (store, _, _) = lex("x: i32 = 42\ny: i32 = 7\n");
        let tokens: Vec<(TokenKind, u32, u32)> =
            store.iter().map(|(_, t)| (t.kind, t.line, t.col)).collect();
        assert_eq!(tokens[0], (TokenKind::Ident, 1, 1));
        assert_eq!(tokens[1], (TokenKind::Colon, 1, 2));
        assert_eq!(tokens[2], (TokenKind::I32, 1, 4));
        assert_eq!(tokens[3], (TokenKind::Eq, 1, 8));
        assert_eq!(tokens[4], (TokenKind::IntLiteral, 1, 10));
        assert_eq!(tokens[6], (TokenKind::Ident, 2, 1));
    }
}
