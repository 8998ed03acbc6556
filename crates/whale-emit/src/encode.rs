//! Binary module encoding.
//!
//! Emits the minimal module shape the pipeline promises: magic and
//! version, a single `() -> ()` function type, one function, an exported
//! `_start`, and a code section whose body declares one local per symbol
//! and then the lowered ops. Integers use LEB128 as the format requires.

use crate::ops::{ValType, WasmOp};

const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const SECTION_TYPE: u8 = 1;
const SECTION_FUNCTION: u8 = 3;
const SECTION_EXPORT: u8 = 7;
const SECTION_CODE: u8 = 10;

/// Encode a lowered module into WebAssembly bytes.
pub fn encode_module(locals: &[ValType], ops: &[WasmOp]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + ops.len() * 3);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION);

    // Type section: one signature, () -> ().
    let mut types = Vec::new();
    uleb(&mut types, 1);
    types.push(0x60);
    uleb(&mut types, 0);
    uleb(&mut types, 0);
    section(&mut out, SECTION_TYPE, &types);

    // Function section: one function using type 0.
    let mut funcs = Vec::new();
    uleb(&mut funcs, 1);
    uleb(&mut funcs, 0);
    section(&mut out, SECTION_FUNCTION, &funcs);

    // Export section: `_start` as function 0.
    let mut exports = Vec::new();
    uleb(&mut exports, 1);
    uleb(&mut exports, "_start".len() as u32);
    exports.extend_from_slice(b"_start");
    exports.push(0x00);
    uleb(&mut exports, 0);
    section(&mut out, SECTION_EXPORT, &exports);

    // Code section: one body.
    let mut body = Vec::new();
    uleb(&mut body, locals.len() as u32);
    for local in locals {
        uleb(&mut body, 1);
        body.push(local.byte());
    }
    for op in ops {
        encode_op(&mut body, op);
    }
    body.push(0x0B);

    let mut code = Vec::new();
    uleb(&mut code, 1);
    uleb(&mut code, body.len() as u32);
    code.extend_from_slice(&body);
    section(&mut out, SECTION_CODE, &code);

    out
}

fn section(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    out.push(id);
    uleb(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

fn encode_op(out: &mut Vec<u8>, op: &WasmOp) {
    match op {
        WasmOp::Unreachable => out.push(0x00),
        WasmOp::If(ty) => {
            out.push(0x04);
            out.push(ty.byte());
        }
        WasmOp::Else => out.push(0x05),
        WasmOp::End => out.push(0x0B),
        WasmOp::LocalGet(index) => {
            out.push(0x20);
            uleb(out, *index);
        }
        WasmOp::LocalSet(index) => {
            out.push(0x21);
            uleb(out, *index);
        }
        WasmOp::I32Const(value) => {
            out.push(0x41);
            sleb(out, *value as i64);
        }
        WasmOp::I64Const(value) => {
            out.push(0x42);
            sleb(out, *value);
        }
        WasmOp::F32Const(value) => {
            out.push(0x43);
            out.extend_from_slice(&value.to_le_bytes());
        }
        WasmOp::F64Const(value) => {
            out.push(0x44);
            out.extend_from_slice(&value.to_le_bytes());
        }
        WasmOp::Numeric(numeric) => out.push(numeric.byte()),
    }
}

/// Unsigned LEB128.
fn uleb(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Signed LEB128.
fn sleb(out: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (value == 0 && sign_clear) || (value == -1 && !sign_clear) {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Numeric;

    #[test]
    fn module_starts_with_magic_and_version() {
        let bytes = encode_module(&[], &[WasmOp::Unreachable]);
        assert_eq!(&bytes[..8], &[0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn export_name_is_embedded() {
        let bytes = encode_module(&[ValType::I32], &[]);
        let needle = b"_start";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn uleb_small_and_multi_byte() {
        let mut out = Vec::new();
        uleb(&mut out, 0);
        uleb(&mut out, 127);
        uleb(&mut out, 128);
        uleb(&mut out, 300);
        assert_eq!(out, vec![0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);
    }

    #[test]
    fn sleb_encodes_signed_values() {
        let mut out = Vec::new();
        sleb(&mut out, 0);
        assert_eq!(out, vec![0x00]);

        let mut out = Vec::new();
        sleb(&mut out, -1);
        assert_eq!(out, vec![0x7F]);

        let mut out = Vec::new();
        sleb(&mut out, 64);
        assert_eq!(out, vec![0xC0, 0x00]);

        let mut out = Vec::new();
        sleb(&mut out, -64);
        assert_eq!(out, vec![0x40]);

        let mut out = Vec::new();
        sleb(&mut out, -123456);
        assert_eq!(out, vec![0xC0, 0xBB, 0x78]);
    }

    #[test]
    fn ops_encode_with_immediates() {
        let bytes = encode_module(
            &[ValType::I32],
            &[
                WasmOp::I32Const(42),
                WasmOp::LocalSet(0),
                WasmOp::LocalGet(0),
                WasmOp::Numeric(Numeric::I32Eqz),
            ],
        );
        // The code body contains: const 42, set 0, get 0, eqz.
        let needle = [0x41, 42, 0x21, 0x00, 0x20, 0x00, 0x45];
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn deterministic_output() {
        let ops = [WasmOp::I64Const(-5), WasmOp::Unreachable];
        let a = encode_module(&[ValType::I64], &ops);
        let b = encode_module(&[ValType::I64], &ops);
        assert_eq!(a, b);
    }
}
