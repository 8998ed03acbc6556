//! TinyWhale WebAssembly emitter.
//!
//! Consumes checked SemIR and produces the binary module plus its textual
//! form. The contract with the checker: one machine local per symbol
//! (typed via `to_wasm_type`), instructions lowered one-for-one from
//! `Bind`/`Unreachable` roots, and a synthesized `_start` function
//! exported as `"_start"`.

pub mod ops;

mod encode;
mod lower;
mod wat;

use whale_check::SemIr;
use whale_common::intern::StringInterner;
use whale_common::token::TokenStore;
use whale_parser::node::NodeStore;

pub use lower::{EmitError, LoweredModule};

/// An emitted module: binary WebAssembly plus the matching WAT text.
#[derive(Debug)]
pub struct WasmModule {
    pub binary: Vec<u8>,
    pub text: String,
}

/// Emit a checked program.
///
/// `_optimize` is plumbed through from the pipeline options and reserved
/// for the optimizer; lowering is currently identical either way. Only
/// call this after a successful check; a stream with invalid operands is
/// an internal error.
pub fn emit(
    semir: &SemIr,
    nodes: &NodeStore,
    tokens: &TokenStore,
    strings: &StringInterner,
    _optimize: bool,
) -> Result<WasmModule, EmitError> {
    let lowered = lower::lower(semir, nodes, tokens, strings)?;
    Ok(WasmModule {
        binary: encode::encode_module(&lowered.locals, &lowered.ops),
        text: wat::print_module(&lowered.locals, &lowered.ops),
    })
}
