//! Shared types for the TinyWhale compiler.
//!
//! Everything the phases pass between each other lives here: source
//! positions, the token vocabulary and the dense [`token::TokenStore`],
//! the string and float interners, and the diagnostics buffer with the
//! stable `TWLEX…`/`TWPARSE…`/`TWCHECK…` codes.

pub mod diag;
pub mod intern;
pub mod span;
pub mod token;

pub use diag::{Diagnostic, Diagnostics, Severity};
pub use intern::{FloatId, FloatInterner, StrId, StringInterner};
pub use span::LineIndex;
pub use token::{Token, TokenId, TokenKind, TokenPayload, TokenStore};
