//! Pattern productions for match arms.
//!
//! `Pattern = OrPattern`; `OrPattern = Primary (| Primary)*`; primaries are
//! an optionally negated literal, a lowercase binding, or the wildcard `_`.

use whale_common::token::TokenKind;

use crate::node::NodeKind;

use super::Parser;

impl<'a> Parser<'a> {
    /// Whether the current line starts a match arm.
    ///
    /// Literal, negated-literal and wildcard starts are unambiguous; a
    /// lowercase identifier only counts when followed by `->` or `|`, so
    /// indented bindings and field lines are not swallowed.
    pub(crate) fn at_match_arm(&self) -> bool {
        match self.current() {
            TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::Underscore
            | TokenKind::Minus => true,
            TokenKind::Ident => {
                matches!(self.peek(1), TokenKind::Arrow | TokenKind::Bar)
            }
            _ => false,
        }
    }

    /// `Pattern -> BlockExpression`
    pub(crate) fn parse_match_arm(&mut self) {
        let mark = self.mark();
        let first = self.current_id();
        self.parse_pattern();
        if self.failed() {
            return;
        }
        if self
            .expect(TokenKind::Arrow, "expected `->` in match arm")
            .is_none()
        {
            return;
        }
        self.parse_expression();
        if self.failed() {
            return;
        }
        self.finish(NodeKind::MatchArm, first, mark);
    }

    fn parse_pattern(&mut self) {
        let mark = self.mark();
        let first = self.current_id();
        self.parse_primary_pattern();
        if self.failed() || !self.at(TokenKind::Bar) {
            return;
        }
        while self.eat(TokenKind::Bar).is_some() {
            self.parse_primary_pattern();
            if self.failed() {
                return;
            }
        }
        self.finish(NodeKind::OrPattern, first, mark);
    }

    fn parse_primary_pattern(&mut self) {
        match self.current() {
            TokenKind::Underscore => {
                let tok = self.advance();
                self.leaf(NodeKind::WildcardPattern, tok);
            }
            TokenKind::Ident => {
                let tok = self.advance();
                self.leaf(NodeKind::BindingPattern, tok);
            }
            TokenKind::IntLiteral => {
                let mark = self.mark();
                let tok = self.advance();
                self.leaf(NodeKind::IntLiteral, tok);
                self.finish(NodeKind::LiteralPattern, tok, mark);
            }
            TokenKind::FloatLiteral => {
                let mark = self.mark();
                let tok = self.advance();
                self.leaf(NodeKind::FloatLiteral, tok);
                self.finish(NodeKind::LiteralPattern, tok, mark);
            }
            TokenKind::Minus => {
                let mark = self.mark();
                let op = self.advance();
                let vmark = self.mark();
                match self.current() {
                    TokenKind::IntLiteral => {
                        let lit = self.advance();
                        self.leaf(NodeKind::IntLiteral, lit);
                    }
                    TokenKind::FloatLiteral => {
                        let lit = self.advance();
                        self.leaf(NodeKind::FloatLiteral, lit);
                    }
                    _ => {
                        self.error_at_current("expected a literal after `-` in pattern");
                        return;
                    }
                }
                self.finish(NodeKind::UnaryExpr, op, vmark);
                self.finish(NodeKind::LiteralPattern, op, mark);
            }
            _ => self.error_at_current("expected a pattern"),
        }
    }
}
