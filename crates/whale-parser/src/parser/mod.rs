//! Recursive descent parser emitting postorder nodes.
//!
//! Every parse function records a mark (the node count before its
//! children), parses children, then pushes its own node with
//! `subtree_size = nodes_since_mark + 1`. Because nodes are appended after
//! their children, the store is in postorder by construction.
//!
//! # Line structure
//!
//! The preprocessor only marks level *changes*, so a line inside a block
//! that stays at the same depth carries no `Indent` token. The parser
//! tracks the current level itself: marker tokens update it, and a
//! markerless line classifies as `IndentedLine` whenever the level is
//! non-zero.
//!
//! # Failure
//!
//! First-error-only: the first grammar mismatch records `TWPARSE001`,
//! parsing stops, and no `Program` root is pushed. The checker treats a
//! store without a `Program` root as unchecked input.

mod expressions;
mod items;
mod patterns;

use whale_common::diag::{codes, Diagnostics};
use whale_common::token::{Token, TokenId, TokenKind, TokenStore};

use crate::node::{NodeId, NodeKind, NodeStore};

pub(crate) struct Parser<'a> {
    tokens: &'a TokenStore,
    pos: usize,
    nodes: NodeStore,
    diags: &'a mut Diagnostics,
    /// Current indentation level, tracked from marker tokens.
    level: u32,
    failed: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a TokenStore, diags: &'a mut Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            nodes: NodeStore::new(),
            diags,
            level: 0,
            failed: false,
        }
    }

    /// Parse the whole token stream into a postorder store.
    pub(crate) fn parse_program(mut self) -> NodeStore {
        while !self.failed {
            while self.at(TokenKind::Newline) {
                self.advance();
            }
            if self.at(TokenKind::Eof) {
                break;
            }
            match self.current() {
                TokenKind::Indent => self.parse_indented_line(),
                TokenKind::Dedent => self.parse_dedent_line(),
                _ if self.level > 0 => self.parse_continuation_line(),
                _ => self.parse_root_line(),
            }
        }
        if !self.failed {
            let size = self.nodes.len() as u32 + 1;
            self.nodes.push(NodeKind::Program, TokenId(0), size);
        }
        self.nodes
    }

    // ── Lines ──────────────────────────────────────────────────────────

    fn parse_root_line(&mut self) {
        let mark = self.mark();
        let first = self.current_id();
        self.parse_statement();
        self.end_line();
        if !self.failed {
            self.finish(NodeKind::RootLine, first, mark);
        }
    }

    fn parse_indented_line(&mut self) {
        let mark = self.mark();
        let indent = self.advance();
        if let Some(level) = self.tokens.get(indent).level() {
            self.level = level;
        }
        while self.at(TokenKind::Dedent) {
            self.advance();
            self.level = self.level.saturating_sub(1);
        }
        if !self.at(TokenKind::Newline) && !self.at(TokenKind::Eof) {
            self.parse_indented_content();
        }
        self.end_line();
        if !self.failed {
            self.finish(NodeKind::IndentedLine, indent, mark);
        }
    }

    /// A markerless line inside an open block.
    fn parse_continuation_line(&mut self) {
        let mark = self.mark();
        let first = self.current_id();
        self.parse_indented_content();
        self.end_line();
        if !self.failed {
            self.finish(NodeKind::IndentedLine, first, mark);
        }
    }

    fn parse_dedent_line(&mut self) {
        let mark = self.mark();
        let first = self.current_id();
        while self.at(TokenKind::Dedent) {
            self.advance();
            self.level = self.level.saturating_sub(1);
        }
        if !self.at(TokenKind::Newline) && !self.at(TokenKind::Eof) {
            if self.level > 0 {
                self.parse_indented_content();
            } else {
                self.parse_statement();
            }
        }
        self.end_line();
        if !self.failed {
            self.finish(NodeKind::DedentLine, first, mark);
        }
    }

    /// Consume the trailing newline of a line.
    fn end_line(&mut self) {
        if self.failed {
            return;
        }
        if self.at(TokenKind::Newline) {
            self.advance();
        } else if !self.at(TokenKind::Eof) {
            self.error_at_current("expected end of line");
        }
    }

    // ── Token access ───────────────────────────────────────────────────

    pub(crate) fn current(&self) -> TokenKind {
        self.token_at(self.pos).kind
    }

    pub(crate) fn peek(&self, n: usize) -> TokenKind {
        self.token_at(self.pos + n).kind
    }

    fn token_at(&self, pos: usize) -> &Token {
        let idx = pos.min(self.tokens.len().saturating_sub(1));
        self.tokens.get(TokenId(idx as u32))
    }

    /// Id of the current token (clamped to the final `Eof`).
    pub(crate) fn current_id(&self) -> TokenId {
        TokenId(self.pos.min(self.tokens.len().saturating_sub(1)) as u32)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current())
    }

    /// Consume the current token and return its id.
    pub(crate) fn advance(&mut self) -> TokenId {
        let id = self.current_id();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        id
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<TokenId> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume a required token or record a grammar error.
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> Option<TokenId> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            self.error_at_current(what);
            None
        }
    }

    // ── Errors ─────────────────────────────────────────────────────────

    /// Record a `TWPARSE001` at the current token and stop parsing.
    pub(crate) fn error_at_current(&mut self, message: &str) {
        if self.failed {
            return;
        }
        self.failed = true;
        let tok = self.token_at(self.pos);
        self.diags
            .error(codes::PARSE_GRAMMAR, tok.line, tok.col, message);
    }

    pub(crate) fn failed(&self) -> bool {
        self.failed
    }

    // ── Node construction ──────────────────────────────────────────────

    /// Node count before a production's children are parsed.
    pub(crate) fn mark(&self) -> usize {
        self.nodes.len()
    }

    /// Push a node covering everything since `mark`.
    pub(crate) fn finish(&mut self, kind: NodeKind, token: TokenId, mark: usize) -> NodeId {
        let size = (self.nodes.len() - mark + 1) as u32;
        self.nodes.push(kind, token, size)
    }

    /// Push a childless node.
    pub(crate) fn leaf(&mut self, kind: NodeKind, token: TokenId) -> NodeId {
        self.nodes.push(kind, token, 1)
    }

    /// Kind of the node pushed last, if any.
    pub(crate) fn last_kind(&self) -> Option<NodeKind> {
        self.nodes.root().map(|id| self.nodes.get(id).kind)
    }

    /// Token kind anchoring the node pushed last.
    pub(crate) fn last_token_kind(&self) -> Option<TokenKind> {
        self.nodes
            .root()
            .map(|id| self.tokens.get(self.nodes.get(id).token).kind)
    }
}

/// Parse a token stream into a postorder [`NodeStore`].
pub fn parse_tokens(tokens: &TokenStore, diags: &mut Diagnostics) -> NodeStore {
    Parser::new(tokens, diags).parse_program()
}
