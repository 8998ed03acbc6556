//! SemIR to WebAssembly op lowering.
//!
//! The instruction stream is consumed from its roots: every `Bind` and
//! every top-level `Unreachable` is a statement, and value instructions
//! are materialized on demand by following operand references. Expression
//! trees reference each operand exactly once and contain no side effects,
//! which keeps re-emission (used by `%%` and by match comparisons) sound.

use std::fmt;

use rustc_hash::FxHashMap;
use whale_check::inst::{InstId, InstKind};
use whale_check::literal::parse_int_literal;
use whale_check::SemIr;
use whale_common::intern::StringInterner;
use whale_common::token::{TokenKind, TokenStore};
use whale_parser::node::{NodeId, NodeKind, NodeStore};

use crate::ops::{Numeric, ValType, WasmOp};

/// An internal emitter failure.
///
/// Reaching this on a successfully checked program is a compiler bug; the
/// message says which invariant broke.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitError(pub String);

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emit failed: {}", self.0)
    }
}

impl std::error::Error for EmitError {}

/// The lowered program: one local per symbol plus the `_start` body.
#[derive(Debug)]
pub struct LoweredModule {
    pub locals: Vec<ValType>,
    pub ops: Vec<WasmOp>,
}

/// Lower checked SemIR into a flat op list.
pub fn lower(
    semir: &SemIr,
    nodes: &NodeStore,
    tokens: &TokenStore,
    strings: &StringInterner,
) -> Result<LoweredModule, EmitError> {
    Lowering {
        semir,
        nodes,
        tokens,
        strings,
        pattern_binds: collect_pattern_binds(semir),
        ops: Vec::new(),
    }
    .run()
}

/// Pattern node to bound local, for binding patterns.
fn collect_pattern_binds(semir: &SemIr) -> FxHashMap<NodeId, u32> {
    let mut map = FxHashMap::default();
    for (_, inst) in semir.insts.iter() {
        if inst.kind == InstKind::PatternBind {
            let local = semir
                .symbols
                .get(whale_check::symbols::SymbolId(inst.arg0 as u32))
                .local_index;
            map.insert(inst.node, local);
        }
    }
    map
}

struct Lowering<'a> {
    semir: &'a SemIr,
    nodes: &'a NodeStore,
    tokens: &'a TokenStore,
    strings: &'a StringInterner,
    pattern_binds: FxHashMap<NodeId, u32>,
    ops: Vec<WasmOp>,
}

/// One arm of a match, reduced to what lowering needs.
struct LoweredArm {
    literals: Vec<i64>,
    catch_all: bool,
    bind_local: Option<u32>,
    body: InstId,
}

impl<'a> Lowering<'a> {
    fn run(mut self) -> Result<LoweredModule, EmitError> {
        let mut locals = Vec::with_capacity(self.semir.symbols.len());
        for (_, entry) in self.semir.symbols.iter() {
            locals.push(self.val_type(entry.ty)?);
        }

        let referenced = self.referenced_set();
        for (id, inst) in self.semir.insts.iter() {
            match inst.kind {
                InstKind::Bind => {
                    self.lower_value(InstId(inst.arg1 as u32))?;
                    let local = self
                        .semir
                        .symbols
                        .get(whale_check::symbols::SymbolId(inst.arg0 as u32))
                        .local_index;
                    self.ops.push(WasmOp::LocalSet(local));
                }
                InstKind::Unreachable if !referenced[id.0 as usize] => {
                    self.ops.push(WasmOp::Unreachable);
                }
                _ => {}
            }
        }

        Ok(LoweredModule {
            locals,
            ops: self.ops,
        })
    }

    /// Which instructions appear as an operand of another instruction.
    fn referenced_set(&self) -> Vec<bool> {
        let mut referenced = vec![false; self.semir.insts.len()];
        let mut mark = |arg: i32| {
            if arg >= 0 && (arg as usize) < referenced.len() {
                referenced[arg as usize] = true;
            }
        };
        for (_, inst) in self.semir.insts.iter() {
            match inst.kind {
                InstKind::Bind => mark(inst.arg1),
                InstKind::Negate | InstKind::BitwiseNot | InstKind::FieldAccess => mark(inst.arg0),
                InstKind::BinaryOp | InstKind::LogicalAnd | InstKind::LogicalOr => {
                    mark(inst.arg0);
                    mark(inst.arg1);
                }
                InstKind::Match => mark(inst.arg0),
                InstKind::MatchArm | InstKind::PatternBind => mark(inst.arg1),
                _ => {}
            }
        }
        referenced
    }

    // ── Value lowering ─────────────────────────────────────────────────

    fn lower_value(&mut self, id: InstId) -> Result<(), EmitError> {
        let inst = *self.semir.insts.get(id);
        match inst.kind {
            InstKind::IntConst => {
                let op = match self.val_type(inst.ty)? {
                    ValType::I32 => WasmOp::I32Const(inst.int_value() as i32),
                    ValType::I64 => WasmOp::I64Const(inst.int_value()),
                    other => {
                        return Err(EmitError(format!("integer constant typed {other:?}")))
                    }
                };
                self.ops.push(op);
                Ok(())
            }
            InstKind::FloatConst => {
                let value = inst.float_value();
                let op = match self.val_type(inst.ty)? {
                    ValType::F32 => WasmOp::F32Const(value as f32),
                    ValType::F64 => WasmOp::F64Const(value),
                    other => return Err(EmitError(format!("float constant typed {other:?}"))),
                };
                self.ops.push(op);
                Ok(())
            }
            InstKind::VarRef => {
                let local = self
                    .semir
                    .symbols
                    .get(whale_check::symbols::SymbolId(inst.arg0 as u32))
                    .local_index;
                self.ops.push(WasmOp::LocalGet(local));
                Ok(())
            }
            InstKind::Negate => self.lower_negate(&inst),
            InstKind::BitwiseNot => {
                self.lower_value(InstId(inst.arg0 as u32))?;
                match self.val_type(inst.ty)? {
                    ValType::I32 => {
                        self.ops.push(WasmOp::I32Const(-1));
                        self.ops.push(WasmOp::Numeric(Numeric::I32Xor));
                    }
                    ValType::I64 => {
                        self.ops.push(WasmOp::I64Const(-1));
                        self.ops.push(WasmOp::Numeric(Numeric::I64Xor));
                    }
                    other => return Err(EmitError(format!("`~` on {other:?}"))),
                }
                Ok(())
            }
            InstKind::BinaryOp => self.lower_binary(id, &inst),
            InstKind::LogicalAnd => self.lower_logical(&inst, true),
            InstKind::LogicalOr => self.lower_logical(&inst, false),
            InstKind::Match => self.lower_match(id, &inst),
            InstKind::Unreachable => {
                self.ops.push(WasmOp::Unreachable);
                Ok(())
            }
            InstKind::FieldAccess => {
                Err(EmitError("field access survived flattening".to_string()))
            }
            InstKind::Bind | InstKind::MatchArm | InstKind::PatternBind => Err(EmitError(
                format!("{:?} is not a value instruction", inst.kind),
            )),
        }
    }

    fn lower_negate(&mut self, inst: &whale_check::inst::Inst) -> Result<(), EmitError> {
        match self.val_type(inst.ty)? {
            ValType::I32 => {
                self.ops.push(WasmOp::I32Const(0));
                self.lower_value(InstId(inst.arg0 as u32))?;
                self.ops.push(WasmOp::Numeric(Numeric::I32Sub));
            }
            ValType::I64 => {
                self.ops.push(WasmOp::I64Const(0));
                self.lower_value(InstId(inst.arg0 as u32))?;
                self.ops.push(WasmOp::Numeric(Numeric::I64Sub));
            }
            ValType::F32 => {
                self.lower_value(InstId(inst.arg0 as u32))?;
                self.ops.push(WasmOp::Numeric(Numeric::F32Neg));
            }
            ValType::F64 => {
                self.lower_value(InstId(inst.arg0 as u32))?;
                self.ops.push(WasmOp::Numeric(Numeric::F64Neg));
            }
        }
        Ok(())
    }

    fn lower_binary(
        &mut self,
        id: InstId,
        inst: &whale_check::inst::Inst,
    ) -> Result<(), EmitError> {
        let lhs = InstId(inst.arg0 as u32);
        let rhs = InstId(inst.arg1 as u32);
        let operand_ty = self.val_type(self.semir.insts.get(lhs).ty)?;
        let op = self.binop_token(inst.node)?;

        // Floored remainder needs the divisor three times; operand trees
        // are pure, so re-lowering is sound.
        if op == TokenKind::PercentPercent {
            let rem = match operand_ty {
                ValType::I32 => Numeric::I32RemS,
                ValType::I64 => Numeric::I64RemS,
                other => return Err(EmitError(format!("`%%` on {other:?}"))),
            };
            let add = if operand_ty == ValType::I32 {
                Numeric::I32Add
            } else {
                Numeric::I64Add
            };
            self.lower_value(lhs)?;
            self.lower_value(rhs)?;
            self.ops.push(WasmOp::Numeric(rem));
            self.lower_value(rhs)?;
            self.ops.push(WasmOp::Numeric(add));
            self.lower_value(rhs)?;
            self.ops.push(WasmOp::Numeric(rem));
            return Ok(());
        }

        self.lower_value(lhs)?;
        self.lower_value(rhs)?;
        let numeric = select_numeric(op, operand_ty)
            .ok_or_else(|| EmitError(format!("no opcode for {op:?} at inst {}", id.0)))?;
        self.ops.push(WasmOp::Numeric(numeric));
        Ok(())
    }

    fn lower_logical(
        &mut self,
        inst: &whale_check::inst::Inst,
        is_and: bool,
    ) -> Result<(), EmitError> {
        let lhs = InstId(inst.arg0 as u32);
        let rhs = InstId(inst.arg1 as u32);
        let lhs_ty = self.val_type(self.semir.insts.get(lhs).ty)?;
        let rhs_ty = self.val_type(self.semir.insts.get(rhs).ty)?;

        self.lower_value(lhs)?;
        self.push_nonzero_test(lhs_ty)?;
        self.ops.push(WasmOp::If(ValType::I32));
        if is_and {
            self.lower_value(rhs)?;
            self.push_nonzero_test(rhs_ty)?;
            self.ops.push(WasmOp::Else);
            self.ops.push(WasmOp::I32Const(0));
        } else {
            self.ops.push(WasmOp::I32Const(1));
            self.ops.push(WasmOp::Else);
            self.lower_value(rhs)?;
            self.push_nonzero_test(rhs_ty)?;
        }
        self.ops.push(WasmOp::End);
        Ok(())
    }

    /// Normalize the top of stack to 0/1 as i32.
    fn push_nonzero_test(&mut self, ty: ValType) -> Result<(), EmitError> {
        match ty {
            ValType::I32 => {
                self.ops.push(WasmOp::Numeric(Numeric::I32Eqz));
                self.ops.push(WasmOp::Numeric(Numeric::I32Eqz));
            }
            ValType::I64 => {
                self.ops.push(WasmOp::Numeric(Numeric::I64Eqz));
                self.ops.push(WasmOp::Numeric(Numeric::I32Eqz));
            }
            other => return Err(EmitError(format!("logical operand of type {other:?}"))),
        }
        Ok(())
    }

    // ── Match lowering ─────────────────────────────────────────────────

    fn lower_match(
        &mut self,
        id: InstId,
        inst: &whale_check::inst::Inst,
    ) -> Result<(), EmitError> {
        let arm_count = inst.arg1 as u32;
        let scrutinee = InstId(inst.arg0 as u32);
        let result = self.val_type(inst.ty)?;

        let first_arm = id
            .0
            .checked_sub(arm_count)
            .ok_or_else(|| EmitError("match arm count exceeds stream".to_string()))?;
        let mut arms = Vec::with_capacity(arm_count as usize);
        for i in first_arm..id.0 {
            let arm = self.semir.insts.get(InstId(i));
            if arm.kind != InstKind::MatchArm {
                return Err(EmitError("match arms are not contiguous".to_string()));
            }
            arms.push(self.lower_arm_info(NodeId(arm.arg0 as u32), InstId(arm.arg1 as u32))?);
        }

        let scrutinee_ty = self.val_type(self.semir.insts.get(scrutinee).ty)?;
        self.emit_arms(&arms, scrutinee, scrutinee_ty, result)
    }

    fn lower_arm_info(&self, pattern: NodeId, body: InstId) -> Result<LoweredArm, EmitError> {
        let mut arm = LoweredArm {
            literals: Vec::new(),
            catch_all: false,
            bind_local: None,
            body,
        };
        self.collect_pattern(pattern, &mut arm)?;
        Ok(arm)
    }

    fn collect_pattern(&self, pattern: NodeId, arm: &mut LoweredArm) -> Result<(), EmitError> {
        match self.nodes.get(pattern).kind {
            NodeKind::WildcardPattern => {
                arm.catch_all = true;
                Ok(())
            }
            NodeKind::BindingPattern => {
                arm.catch_all = true;
                arm.bind_local = self.pattern_binds.get(&pattern).copied();
                Ok(())
            }
            NodeKind::LiteralPattern => {
                let value = self
                    .nodes
                    .children(pattern)
                    .first()
                    .and_then(|&child| self.pattern_literal(child))
                    .ok_or_else(|| EmitError("non-integer literal pattern".to_string()))?;
                arm.literals.push(value);
                Ok(())
            }
            NodeKind::OrPattern => {
                for child in self.nodes.children(pattern) {
                    self.collect_pattern(child, arm)?;
                }
                Ok(())
            }
            other => Err(EmitError(format!("unexpected pattern node {other:?}"))),
        }
    }

    fn pattern_literal(&self, node: NodeId) -> Option<i64> {
        match self.nodes.get(node).kind {
            NodeKind::IntLiteral => {
                let token = self.tokens.get(self.nodes.get(node).token);
                let text = token.text_id()?;
                parse_int_literal(self.strings.resolve(text)).map(|v| v as i64)
            }
            NodeKind::UnaryExpr => {
                let child = self.nodes.children(node).first().copied()?;
                self.pattern_literal(child).map(|v| v.wrapping_neg())
            }
            _ => None,
        }
    }

    fn emit_arms(
        &mut self,
        arms: &[LoweredArm],
        scrutinee: InstId,
        scrutinee_ty: ValType,
        result: ValType,
    ) -> Result<(), EmitError> {
        let Some((arm, rest)) = arms.split_first() else {
            // Only reachable on an unchecked stream; keep the stack valid.
            self.ops.push(WasmOp::Unreachable);
            return Ok(());
        };

        if arm.catch_all {
            if let Some(local) = arm.bind_local {
                self.lower_value(scrutinee)?;
                self.ops.push(WasmOp::LocalSet(local));
            }
            return self.lower_value(arm.body);
        }

        let (eq, constant): (Numeric, fn(i64) -> WasmOp) = match scrutinee_ty {
            ValType::I32 => (Numeric::I32Eq, |v| WasmOp::I32Const(v as i32)),
            ValType::I64 => (Numeric::I64Eq, WasmOp::I64Const),
            other => return Err(EmitError(format!("literal match on {other:?}"))),
        };
        for (i, &literal) in arm.literals.iter().enumerate() {
            self.lower_value(scrutinee)?;
            self.ops.push(constant(literal));
            self.ops.push(WasmOp::Numeric(eq));
            if i > 0 {
                self.ops.push(WasmOp::Numeric(Numeric::I32Or));
            }
        }
        self.ops.push(WasmOp::If(result));
        self.lower_value(arm.body)?;
        self.ops.push(WasmOp::Else);
        self.emit_arms(rest, scrutinee, scrutinee_ty, result)?;
        self.ops.push(WasmOp::End);
        Ok(())
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn val_type(&self, ty: whale_check::ty::TypeId) -> Result<ValType, EmitError> {
        match self.semir.types.to_wasm_type(ty) {
            Some(whale_check::ty::WasmType::I32) => Ok(ValType::I32),
            Some(whale_check::ty::WasmType::I64) => Ok(ValType::I64),
            Some(whale_check::ty::WasmType::F32) => Ok(ValType::F32),
            Some(whale_check::ty::WasmType::F64) => Ok(ValType::F64),
            None => Err(EmitError("type has no scalar machine representation".to_string())),
        }
    }

    /// Operator token of a `BinaryOp`'s node.
    ///
    /// Operator nodes anchor on their operator token; comparison-chain
    /// pairs anchor on their right operand instead, in which case the
    /// operator is the token immediately before it.
    fn binop_token(&self, node: NodeId) -> Result<TokenKind, EmitError> {
        let anchor = self.nodes.get(node).token;
        let kind = self.tokens.get(anchor).kind;
        if is_operator(kind) {
            return Ok(kind);
        }
        if anchor.0 > 0 {
            let previous = self
                .tokens
                .get(whale_common::token::TokenId(anchor.0 - 1))
                .kind;
            if is_operator(previous) {
                return Ok(previous);
            }
        }
        Err(EmitError("operator token not recoverable".to_string()))
    }
}

fn is_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::PercentPercent
            | TokenKind::Amp
            | TokenKind::Bar
            | TokenKind::Caret
            | TokenKind::Shl
            | TokenKind::Shr
            | TokenKind::ShrU
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::EqEq
            | TokenKind::NotEq
    )
}

/// Pick the numeric opcode for an operator over an operand type.
fn select_numeric(op: TokenKind, ty: ValType) -> Option<Numeric> {
    use Numeric::*;
    use TokenKind as T;
    Some(match (ty, op) {
        (ValType::I32, T::Plus) => I32Add,
        (ValType::I32, T::Minus) => I32Sub,
        (ValType::I32, T::Star) => I32Mul,
        (ValType::I32, T::Slash) => I32DivS,
        (ValType::I32, T::Percent) => I32RemS,
        (ValType::I32, T::Amp) => I32And,
        (ValType::I32, T::Bar) => I32Or,
        (ValType::I32, T::Caret) => I32Xor,
        (ValType::I32, T::Shl) => I32Shl,
        (ValType::I32, T::Shr) => I32ShrS,
        (ValType::I32, T::ShrU) => I32ShrU,
        (ValType::I32, T::Lt) => I32LtS,
        (ValType::I32, T::Gt) => I32GtS,
        (ValType::I32, T::LtEq) => I32LeS,
        (ValType::I32, T::GtEq) => I32GeS,
        (ValType::I32, T::EqEq) => I32Eq,
        (ValType::I32, T::NotEq) => I32Ne,
        (ValType::I64, T::Plus) => I64Add,
        (ValType::I64, T::Minus) => I64Sub,
        (ValType::I64, T::Star) => I64Mul,
        (ValType::I64, T::Slash) => I64DivS,
        (ValType::I64, T::Percent) => I64RemS,
        (ValType::I64, T::Amp) => I64And,
        (ValType::I64, T::Bar) => I64Or,
        (ValType::I64, T::Caret) => I64Xor,
        (ValType::I64, T::Shl) => I64Shl,
        (ValType::I64, T::Shr) => I64ShrS,
        (ValType::I64, T::ShrU) => I64ShrU,
        (ValType::I64, T::Lt) => I64LtS,
        (ValType::I64, T::Gt) => I64GtS,
        (ValType::I64, T::LtEq) => I64LeS,
        (ValType::I64, T::GtEq) => I64GeS,
        (ValType::I64, T::EqEq) => I64Eq,
        (ValType::I64, T::NotEq) => I64Ne,
        (ValType::F32, T::Plus) => F32Add,
        (ValType::F32, T::Minus) => F32Sub,
        (ValType::F32, T::Star) => F32Mul,
        (ValType::F32, T::Slash) => F32Div,
        (ValType::F32, T::Lt) => F32Lt,
        (ValType::F32, T::Gt) => F32Gt,
        (ValType::F32, T::LtEq) => F32Le,
        (ValType::F32, T::GtEq) => F32Ge,
        (ValType::F32, T::EqEq) => F32Eq,
        (ValType::F32, T::NotEq) => F32Ne,
        (ValType::F64, T::Plus) => F64Add,
        (ValType::F64, T::Minus) => F64Sub,
        (ValType::F64, T::Star) => F64Mul,
        (ValType::F64, T::Slash) => F64Div,
        (ValType::F64, T::Lt) => F64Lt,
        (ValType::F64, T::Gt) => F64Gt,
        (ValType::F64, T::LtEq) => F64Le,
        (ValType::F64, T::GtEq) => F64Ge,
        (ValType::F64, T::EqEq) => F64Eq,
        (ValType::F64, T::NotEq) => F64Ne,
        _ => return None,
    })
}
