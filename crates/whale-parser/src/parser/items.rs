//! Statement-level productions: bindings, type declarations, fields, and
//! type references.

use whale_common::token::TokenKind;

use crate::node::NodeKind;

use super::Parser;

impl<'a> Parser<'a> {
    /// A root-level or dedent-trailing statement.
    pub(crate) fn parse_statement(&mut self) {
        match self.current() {
            TokenKind::KwPanic => {
                let tok = self.advance();
                self.leaf(NodeKind::PanicStatement, tok);
            }
            TokenKind::KwType => self.parse_type_decl(),
            TokenKind::Ident | TokenKind::UpperIdent => self.parse_binding(),
            _ => self.error_at_current("expected a statement"),
        }
    }

    /// Content of an indented line. The shape is decided by lookahead; the
    /// checker later validates it against the enclosing block context.
    pub(crate) fn parse_indented_content(&mut self) {
        if self.at_match_arm() {
            self.parse_match_arm();
            return;
        }
        match self.current() {
            TokenKind::KwPanic => {
                let tok = self.advance();
                self.leaf(NodeKind::PanicStatement, tok);
            }
            TokenKind::KwType => self.parse_type_decl(),
            TokenKind::Ident if self.peek(1) == TokenKind::Colon => self.parse_field_or_binding(),
            TokenKind::Ident | TokenKind::UpperIdent => self.parse_binding(),
            _ => self.error_at_current("expected an indented statement"),
        }
    }

    /// `type Name` opens a record declaration body; `type Name = T`
    /// declares a distinct type over `T` on one line.
    fn parse_type_decl(&mut self) {
        let mark = self.mark();
        let type_tok = self.advance();
        if self.at(TokenKind::UpperIdent) {
            let name = self.advance();
            self.leaf(NodeKind::Identifier, name);
        } else {
            self.error_at_current("expected a type name after `type`");
            return;
        }
        if self.eat(TokenKind::Eq).is_some() {
            self.parse_type_ref();
            if self.failed() {
                return;
            }
        }
        self.finish(NodeKind::TypeDecl, type_tok, mark);
    }

    /// `identifier (: TypeRef)? = Expression?`
    ///
    /// Classified after parsing: an uppercase left side with an uppercase
    /// right side is a type alias; a missing right side (or a lone
    /// uppercase right side) is a record binding whose field initializers
    /// follow on indented lines; everything else is a value binding.
    fn parse_binding(&mut self) {
        let mark = self.mark();
        let lhs_upper = self.at(TokenKind::UpperIdent);
        let name_tok = self.advance();
        self.leaf(NodeKind::Identifier, name_tok);

        let mut annot_primitive = false;
        if self.at(TokenKind::Colon) {
            let colon = self.advance();
            let tmark = self.mark();
            annot_primitive = self.current().is_primitive()
                && self.peek(1) != TokenKind::Lt
                && self.peek(1) != TokenKind::LBracket;
            self.parse_type_ref();
            if self.failed() {
                return;
            }
            self.finish(NodeKind::TypeAnnotation, colon, tmark);
        }

        if self.expect(TokenKind::Eq, "expected `=` in binding").is_none() {
            return;
        }

        if self.at(TokenKind::Newline) || self.at(TokenKind::Eof) {
            // Record-literal mode: the body arrives on indented lines.
            self.finish(NodeKind::RecordBinding, name_tok, mark);
            return;
        }

        if lhs_upper {
            if self.at(TokenKind::UpperIdent) {
                let rhs = self.advance();
                self.leaf(NodeKind::Identifier, rhs);
                self.finish(NodeKind::TypeAlias, name_tok, mark);
            } else {
                self.error_at_current("expected a type name on the right side of a type alias");
            }
            return;
        }

        let emark = self.mark();
        self.parse_expression();
        if self.failed() {
            return;
        }
        let lone_upper = self.mark() == emark + 1
            && self.last_kind() == Some(NodeKind::Identifier)
            && self.last_token_kind() == Some(TokenKind::UpperIdent);
        let kind = if lone_upper {
            NodeKind::RecordBinding
        } else if annot_primitive {
            NodeKind::PrimitiveBinding
        } else {
            NodeKind::VariableBinding
        };
        self.finish(kind, name_tok, mark);
    }

    /// An indented `name : …` line: field declaration, field initializer,
    /// or a full (misplaced) binding, decided by what follows the colon.
    fn parse_field_or_binding(&mut self) {
        let mark = self.mark();
        let name_tok = self.advance();
        self.leaf(NodeKind::Identifier, name_tok);
        let colon = self.advance();

        if self.current().starts_type() {
            let tmark = self.mark();
            self.parse_type_ref();
            if self.failed() {
                return;
            }
            if self.at(TokenKind::Eq) {
                // A value binding that happens to sit on an indented line.
                self.finish(NodeKind::TypeAnnotation, colon, tmark);
                self.advance();
                self.parse_expression();
                if self.failed() {
                    return;
                }
                self.finish(NodeKind::VariableBinding, name_tok, mark);
            } else {
                self.finish(NodeKind::FieldDecl, name_tok, mark);
            }
        } else {
            self.parse_expression();
            if self.failed() {
                return;
            }
            self.finish(NodeKind::FieldInit, name_tok, mark);
        }
    }

    // ── Type references ────────────────────────────────────────────────

    /// `TypeRef = primitive | UpperIdent | RefinementType | ListType
    ///  | FuncType`
    pub(crate) fn parse_type_ref(&mut self) {
        let mark = self.mark();
        let base_tok = self.current_id();
        match self.current() {
            k if k.is_primitive() => {
                let tok = self.advance();
                self.leaf(NodeKind::Identifier, tok);
            }
            TokenKind::UpperIdent => {
                let tok = self.advance();
                self.leaf(NodeKind::Identifier, tok);
            }
            TokenKind::LParen => {
                self.parse_func_type(mark);
                if self.failed() {
                    return;
                }
            }
            _ => {
                self.error_at_current("expected a type");
                return;
            }
        }

        loop {
            if self.failed() {
                return;
            }
            if self.at(TokenKind::Lt) {
                self.parse_type_bounds();
                if self.failed() {
                    return;
                }
                self.finish(NodeKind::RefinementType, base_tok, mark);
            } else if self.at(TokenKind::LBracket) && self.peek(1) == TokenKind::RBracket {
                self.advance();
                self.advance();
                self.parse_type_bounds();
                if self.failed() {
                    return;
                }
                self.finish(NodeKind::ListType, base_tok, mark);
            } else {
                break;
            }
        }
    }

    /// `( TypeRef, … ) -> TypeRef`
    fn parse_func_type(&mut self, mark: usize) {
        let lparen = self.advance();
        let pmark = self.mark();
        if !self.at(TokenKind::RParen) {
            loop {
                self.parse_type_ref();
                if self.failed() || self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        if self.failed() {
            return;
        }
        self.finish(NodeKind::TypeList, lparen, pmark);
        if self.expect(TokenKind::RParen, "expected `)` in function type").is_none() {
            return;
        }
        if self.expect(TokenKind::Arrow, "expected `->` in function type").is_none() {
            return;
        }
        self.parse_type_ref();
        if self.failed() {
            return;
        }
        self.finish(NodeKind::FuncType, lparen, mark);
    }

    /// `< Bound (, Bound)* >`
    fn parse_type_bounds(&mut self) {
        let mark = self.mark();
        let Some(lt) = self.expect(TokenKind::Lt, "expected `<` to open type bounds") else {
            return;
        };
        loop {
            self.parse_bound();
            if self.failed() || self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        if self.failed() {
            return;
        }
        if self.expect(TokenKind::Gt, "expected `>` to close type bounds").is_none() {
            return;
        }
        self.finish(NodeKind::TypeBounds, lt, mark);
    }

    /// `(min|max|size) = [-]? intLiteral`
    ///
    /// The bound name is not validated here; the checker knows which names
    /// a base type admits.
    fn parse_bound(&mut self) {
        let mark = self.mark();
        let Some(name) = self.expect(TokenKind::Ident, "expected a bound name") else {
            return;
        };
        if self.expect(TokenKind::Eq, "expected `=` in type bound").is_none() {
            return;
        }
        if self.at(TokenKind::Minus) {
            let vmark = self.mark();
            let op = self.advance();
            if self.at(TokenKind::IntLiteral) {
                let lit = self.advance();
                self.leaf(NodeKind::IntLiteral, lit);
            } else {
                self.error_at_current("expected an integer literal in type bound");
                return;
            }
            self.finish(NodeKind::UnaryExpr, op, vmark);
        } else if self.at(TokenKind::IntLiteral) {
            let lit = self.advance();
            self.leaf(NodeKind::IntLiteral, lit);
        } else {
            self.error_at_current("expected an integer literal in type bound");
            return;
        }
        self.finish(NodeKind::Bound, name, mark);
    }
}
