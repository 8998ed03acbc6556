//! Text-format rendering of a lowered module.
//!
//! Prints the same op list the binary encoder consumes, so the `.wat`
//! always describes the `.wasm` byte for byte. Locals are declared by
//! index (names would collide under shadowing).

use crate::ops::{ValType, WasmOp};

/// Render a lowered module as WebAssembly text.
pub fn print_module(locals: &[ValType], ops: &[WasmOp]) -> String {
    let mut out = String::new();
    out.push_str("(module\n");
    out.push_str("  (func $_start (export \"_start\")\n");
    for local in locals {
        out.push_str("    (local ");
        out.push_str(local.wat());
        out.push_str(")\n");
    }

    let mut depth: usize = 0;
    for op in ops {
        let line_depth = match op {
            WasmOp::Else | WasmOp::End => depth.saturating_sub(1),
            _ => depth,
        };
        out.push_str("    ");
        for _ in 0..line_depth {
            out.push_str("  ");
        }
        out.push_str(&render_op(op));
        out.push('\n');
        match op {
            WasmOp::If(_) => depth += 1,
            WasmOp::End => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    out.push_str("  )\n)\n");
    out
}

fn render_op(op: &WasmOp) -> String {
    match op {
        WasmOp::Unreachable => "unreachable".to_string(),
        WasmOp::I32Const(v) => format!("i32.const {v}"),
        WasmOp::I64Const(v) => format!("i64.const {v}"),
        WasmOp::F32Const(v) => format!("f32.const {v}"),
        WasmOp::F64Const(v) => format!("f64.const {v}"),
        WasmOp::LocalGet(i) => format!("local.get {i}"),
        WasmOp::LocalSet(i) => format!("local.set {i}"),
        WasmOp::If(ty) => format!("if (result {})", ty.wat()),
        WasmOp::Else => "else".to_string(),
        WasmOp::End => "end".to_string(),
        WasmOp::Numeric(n) => n.wat().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Numeric;

    #[test]
    fn straight_line_module() {
        let text = print_module(
            &[ValType::I32],
            &[
                WasmOp::I32Const(42),
                WasmOp::LocalSet(0),
                WasmOp::Unreachable,
            ],
        );
        assert_eq!(
            text,
            "(module\n  (func $_start (export \"_start\")\n    (local i32)\n    i32.const 42\n    local.set 0\n    unreachable\n  )\n)\n"
        );
    }

    #[test]
    fn if_blocks_indent_their_bodies() {
        let text = print_module(
            &[],
            &[
                WasmOp::I32Const(1),
                WasmOp::If(ValType::I32),
                WasmOp::I32Const(2),
                WasmOp::Else,
                WasmOp::I32Const(3),
                WasmOp::End,
                WasmOp::Numeric(Numeric::I32Eqz),
            ],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "    i32.const 1");
        assert_eq!(lines[3], "    if (result i32)");
        assert_eq!(lines[4], "      i32.const 2");
        assert_eq!(lines[5], "    else");
        assert_eq!(lines[6], "      i32.const 3");
        assert_eq!(lines[7], "    end");
        assert_eq!(lines[8], "    i32.eqz");
    }
}
