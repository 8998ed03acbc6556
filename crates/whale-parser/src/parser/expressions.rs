//! Expression productions with conventional precedence.
//!
//! Bottom of the ladder to the top: `||`, `&&`, `|`, `^`, `&`,
//! comparison (chainable), shifts, additive, multiplicative, unary,
//! postfix, primary. Operator nodes anchor on their operator token so the
//! operator survives into the tree.

use whale_common::token::TokenKind;

use crate::node::NodeKind;

use super::Parser;

const COMPARE_OPS: [TokenKind; 6] = [
    TokenKind::Lt,
    TokenKind::Gt,
    TokenKind::LtEq,
    TokenKind::GtEq,
    TokenKind::EqEq,
    TokenKind::NotEq,
];

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) {
        self.parse_logical_or();
    }

    fn parse_logical_or(&mut self) {
        self.parse_bin_left(&[TokenKind::PipePipe], Self::parse_logical_and);
    }

    fn parse_logical_and(&mut self) {
        self.parse_bin_left(&[TokenKind::AmpAmp], Self::parse_bit_or);
    }

    fn parse_bit_or(&mut self) {
        self.parse_bin_left(&[TokenKind::Bar], Self::parse_bit_xor);
    }

    fn parse_bit_xor(&mut self) {
        self.parse_bin_left(&[TokenKind::Caret], Self::parse_bit_and);
    }

    fn parse_bit_and(&mut self) {
        self.parse_bin_left(&[TokenKind::Amp], Self::parse_comparison);
    }

    /// Comparisons chain: `a < b < c` becomes one `CompareChain` node over
    /// all operands rather than nesting.
    fn parse_comparison(&mut self) {
        let mark = self.mark();
        self.parse_shift();
        let mut first_op = None;
        let mut count = 0usize;
        while !self.failed() && self.at_any(&COMPARE_OPS) {
            let op = self.advance();
            first_op.get_or_insert(op);
            count += 1;
            self.parse_shift();
        }
        if self.failed() {
            return;
        }
        if let Some(op) = first_op {
            let kind = if count == 1 {
                NodeKind::BinaryExpr
            } else {
                NodeKind::CompareChain
            };
            self.finish(kind, op, mark);
        }
    }

    fn parse_shift(&mut self) {
        self.parse_bin_left(
            &[TokenKind::Shl, TokenKind::Shr, TokenKind::ShrU],
            Self::parse_additive,
        );
    }

    fn parse_additive(&mut self) {
        self.parse_bin_left(
            &[TokenKind::Plus, TokenKind::Minus],
            Self::parse_multiplicative,
        );
    }

    fn parse_multiplicative(&mut self) {
        self.parse_bin_left(
            &[
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::PercentPercent,
            ],
            Self::parse_unary,
        );
    }

    /// Left-associative binary level.
    fn parse_bin_left(&mut self, ops: &[TokenKind], next: fn(&mut Self)) {
        let mark = self.mark();
        next(self);
        while !self.failed() && self.at_any(ops) {
            let op = self.advance();
            next(self);
            if self.failed() {
                return;
            }
            self.finish(NodeKind::BinaryExpr, op, mark);
        }
    }

    /// `- x`, `~ x`
    fn parse_unary(&mut self) {
        if self.at(TokenKind::Minus) || self.at(TokenKind::Tilde) {
            let mark = self.mark();
            let op = self.advance();
            self.parse_unary();
            if self.failed() {
                return;
            }
            self.finish(NodeKind::UnaryExpr, op, mark);
        } else {
            self.parse_postfix();
        }
    }

    /// `.field`, `[index]`, `(args)`
    fn parse_postfix(&mut self) {
        let mark = self.mark();
        self.parse_primary();
        loop {
            if self.failed() {
                return;
            }
            match self.current() {
                TokenKind::Dot => {
                    let dot = self.advance();
                    if self.at(TokenKind::Ident) {
                        let field = self.advance();
                        self.leaf(NodeKind::Identifier, field);
                    } else {
                        self.error_at_current("expected a field name after `.`");
                        return;
                    }
                    self.finish(NodeKind::FieldAccess, dot, mark);
                }
                TokenKind::LBracket => {
                    let lbracket = self.advance();
                    self.parse_index_literal();
                    if self.failed() {
                        return;
                    }
                    if self
                        .expect(TokenKind::RBracket, "expected `]` after list index")
                        .is_none()
                    {
                        return;
                    }
                    self.finish(NodeKind::IndexAccess, lbracket, mark);
                }
                TokenKind::LParen => {
                    let lparen = self.advance();
                    if !self.at(TokenKind::RParen) {
                        loop {
                            self.parse_expression();
                            if self.failed() || self.eat(TokenKind::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    if self.failed() {
                        return;
                    }
                    if self
                        .expect(TokenKind::RParen, "expected `)` after call arguments")
                        .is_none()
                    {
                        return;
                    }
                    self.finish(NodeKind::FuncCall, lparen, mark);
                }
                _ => return,
            }
        }
    }

    /// List indices must be integer literals; a leading minus is kept so
    /// the checker can reject negatives with a precise message.
    fn parse_index_literal(&mut self) {
        if self.at(TokenKind::Minus) {
            let mark = self.mark();
            let op = self.advance();
            if self.at(TokenKind::IntLiteral) {
                let lit = self.advance();
                self.leaf(NodeKind::IntLiteral, lit);
            } else {
                self.error_at_current("list index must be an integer literal");
                return;
            }
            self.finish(NodeKind::UnaryExpr, op, mark);
        } else if self.at(TokenKind::IntLiteral) {
            let lit = self.advance();
            self.leaf(NodeKind::IntLiteral, lit);
        } else {
            self.error_at_current("list index must be an integer literal");
        }
    }

    fn parse_primary(&mut self) {
        match self.current() {
            TokenKind::IntLiteral => {
                let tok = self.advance();
                self.leaf(NodeKind::IntLiteral, tok);
            }
            TokenKind::FloatLiteral => {
                let tok = self.advance();
                self.leaf(NodeKind::FloatLiteral, tok);
            }
            TokenKind::Ident | TokenKind::UpperIdent => {
                let tok = self.advance();
                self.leaf(NodeKind::Identifier, tok);
            }
            TokenKind::LParen => {
                let mark = self.mark();
                let lparen = self.advance();
                self.parse_expression();
                if self.failed() {
                    return;
                }
                if self
                    .expect(TokenKind::RParen, "expected `)` to close expression")
                    .is_none()
                {
                    return;
                }
                self.finish(NodeKind::ParenExpr, lparen, mark);
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::KwMatch => {
                let mark = self.mark();
                let kw = self.advance();
                self.parse_expression();
                if self.failed() {
                    return;
                }
                self.finish(NodeKind::MatchExpr, kw, mark);
            }
            TokenKind::KwPanic => {
                let tok = self.advance();
                self.leaf(NodeKind::PanicExpr, tok);
            }
            _ => self.error_at_current("expected an expression"),
        }
    }

    /// `[e0, e1, …]`; the empty list is a parse error.
    fn parse_list_literal(&mut self) {
        let mark = self.mark();
        let lbracket = self.advance();
        if self.at(TokenKind::RBracket) {
            self.error_at_current("empty list literal");
            return;
        }
        loop {
            self.parse_expression();
            if self.failed() || self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        if self.failed() {
            return;
        }
        if self
            .expect(TokenKind::RBracket, "expected `]` to close list literal")
            .is_none()
        {
            return;
        }
        self.finish(NodeKind::ListLiteral, lbracket, mark);
    }
}
