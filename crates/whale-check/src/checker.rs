//! The semantic checker.
//!
//! A single forward pass over the program's line nodes builds SemIR:
//! instructions, symbols, types, and scopes, plus diagnostics. Indented
//! blocks that belong to a parent form (`match` arms, `type` bodies,
//! record-literal initializers) are tracked on a stack of block contexts;
//! a context is finalized on the matching dedent, at the next root line,
//! or at end of input.
//!
//! Checking is fault-tolerant. An expression that fails yields the
//! invalid type sentinel and no instruction; the enclosing statement
//! short-circuits and checking continues with the next sibling.

use rustc_hash::FxHashMap;
use whale_common::diag::{codes, Diagnostics};
use whale_common::intern::{FloatInterner, StrId, StringInterner};
use whale_common::token::{Token, TokenKind, TokenPayload, TokenStore};
use whale_parser::node::{NodeId, NodeKind, NodeStore};

use crate::inst::{Inst, InstId, InstKind, InstStore};
use crate::literal::{fits, parse_int_literal};
use crate::scope::{ScopeId, ScopeStore};
use crate::symbols::{SymbolId, SymbolStore};
use crate::ty::{Constraints, FieldInfo, TypeId, TypeKind, TypeStore, WasmType};
use crate::SemIr;

/// One checked match arm, buffered until the context is finalized.
struct ArmInfo {
    arm: NodeId,
    pattern: NodeId,
    body: Option<InstId>,
    catch_all: bool,
}

/// An open indented block belonging to a parent form.
enum BlockContext {
    TypeDecl {
        name: StrId,
        node: NodeId,
        fields: Vec<FieldInfo>,
    },
    RecordLiteral {
        name: StrId,
        ty: TypeId,
        node: NodeId,
        values: Vec<Option<InstId>>,
        seen: Vec<bool>,
    },
    Match {
        name: StrId,
        result_ty: TypeId,
        node: NodeId,
        scrutinee: Option<InstId>,
        scrutinee_ty: TypeId,
        arms: Vec<ArmInfo>,
    },
}

/// How a binary operator constrains its operands and result.
#[derive(Clone, Copy, PartialEq)]
enum OpClass {
    /// `+ - * /`: operands and result share one numeric type.
    Arith,
    /// `% %% & | ^ << >> >>>`: like `Arith` but integer-only.
    IntOnly,
    /// `< > <= >= == !=`: operands share a type, result is i32.
    Compare,
    /// `&& ||`: integer operands, i32 result, short-circuit.
    Logical,
}

fn op_class(kind: TokenKind) -> Option<OpClass> {
    match kind {
        TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
            Some(OpClass::Arith)
        }
        TokenKind::Percent
        | TokenKind::PercentPercent
        | TokenKind::Amp
        | TokenKind::Bar
        | TokenKind::Caret
        | TokenKind::Shl
        | TokenKind::Shr
        | TokenKind::ShrU => Some(OpClass::IntOnly),
        TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::LtEq
        | TokenKind::GtEq
        | TokenKind::EqEq
        | TokenKind::NotEq => Some(OpClass::Compare),
        TokenKind::AmpAmp | TokenKind::PipePipe => Some(OpClass::Logical),
        _ => None,
    }
}

pub(crate) struct Checker<'a> {
    nodes: &'a NodeStore,
    tokens: &'a TokenStore,
    strings: &'a mut StringInterner,
    floats: &'a FloatInterner,
    diags: &'a mut Diagnostics,

    insts: InstStore,
    symbols: SymbolStore,
    types: TypeStore,
    scopes: ScopeStore,

    current_scope: ScopeId,
    contexts: Vec<BlockContext>,
    /// Flattened aggregate bindings: base name to record/list type.
    aggregates: FxHashMap<StrId, TypeId>,
    /// Contiguous unreachable source lines, merged into one warning.
    unreachable: Option<(u32, u32)>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(
        nodes: &'a NodeStore,
        tokens: &'a TokenStore,
        strings: &'a mut StringInterner,
        floats: &'a FloatInterner,
        diags: &'a mut Diagnostics,
    ) -> Self {
        let types = TypeStore::new(strings);
        let mut scopes = ScopeStore::new();
        let current_scope = scopes.push(None);
        Checker {
            nodes,
            tokens,
            strings,
            floats,
            diags,
            insts: InstStore::new(),
            symbols: SymbolStore::new(),
            types,
            scopes,
            current_scope,
            contexts: Vec::new(),
            aggregates: FxHashMap::default(),
            unreachable: None,
        }
    }

    pub(crate) fn run(mut self) -> SemIr {
        let rooted = self
            .nodes
            .root()
            .filter(|&root| self.nodes.get(root).kind == NodeKind::Program);
        if let Some(root) = rooted {
            for line in self.nodes.children(root) {
                match self.nodes.get(line).kind {
                    NodeKind::RootLine => {
                        self.finalize_all_contexts();
                        for stmt in self.nodes.children(line) {
                            self.check_line_statement(stmt);
                        }
                    }
                    NodeKind::IndentedLine => self.check_indented_line(line),
                    NodeKind::DedentLine => {
                        let count = self.dedent_count(line);
                        for _ in 0..count {
                            self.finalize_top_context();
                        }
                        for stmt in self.nodes.children(line) {
                            self.check_line_statement(stmt);
                        }
                    }
                    _ => {}
                }
            }
            self.finalize_all_contexts();
        }
        self.flush_unreachable();

        let succeeded = !self.diags.has_errors();
        SemIr {
            insts: self.insts,
            symbols: self.symbols,
            types: self.types,
            scopes: self.scopes,
            succeeded,
        }
    }

    // ── Line dispatch ──────────────────────────────────────────────────

    /// Number of consecutive `Dedent` tokens starting a dedent line.
    fn dedent_count(&self, line: NodeId) -> u32 {
        let mut idx = self.nodes.get(line).token.0 as usize;
        let mut count = 0;
        while idx < self.tokens.len() {
            if self
                .tokens
                .get(whale_common::token::TokenId(idx as u32))
                .kind
                == TokenKind::Dedent
            {
                count += 1;
                idx += 1;
            } else {
                break;
            }
        }
        count
    }

    fn check_line_statement(&mut self, stmt: NodeId) {
        if !self.scopes.get(self.current_scope).reachable {
            let (line, _) = self.pos(stmt);
            self.unreachable = Some(match self.unreachable {
                Some((start, _)) => (start, line),
                None => (line, line),
            });
        }
        self.check_statement(stmt);
    }

    fn check_statement(&mut self, stmt: NodeId) {
        match self.nodes.get(stmt).kind {
            NodeKind::PanicStatement => {
                self.emit(InstKind::Unreachable, TypeId::NONE, -1, -1, stmt);
                self.scopes.set_reachable(self.current_scope, false);
            }
            NodeKind::TypeDecl => self.check_type_decl(stmt),
            NodeKind::TypeAlias => self.check_type_alias(stmt),
            NodeKind::VariableBinding | NodeKind::PrimitiveBinding => {
                self.check_value_binding(stmt)
            }
            NodeKind::RecordBinding => self.check_record_binding(stmt),
            NodeKind::MatchArm => {
                self.err(codes::CHECK_ARM_CONTEXT, stmt, "match arm outside a match");
            }
            _ => {
                self.err(
                    codes::CHECK_UNEXPECTED_INDENT,
                    stmt,
                    "unexpected statement",
                );
            }
        }
    }

    fn check_indented_line(&mut self, line: NodeId) {
        let Some(&content) = self.nodes.children(line).first() else {
            return;
        };
        let kind = self.nodes.get(content).kind;
        match self.contexts.last() {
            Some(BlockContext::Match { .. }) => {
                if kind == NodeKind::MatchArm {
                    self.check_match_arm(content);
                } else {
                    self.err(
                        codes::CHECK_UNEXPECTED_INDENT,
                        content,
                        "expected a match arm",
                    );
                }
            }
            Some(BlockContext::TypeDecl { .. }) => {
                if kind == NodeKind::FieldDecl {
                    self.check_field_decl(content);
                } else if kind == NodeKind::MatchArm {
                    self.err(codes::CHECK_ARM_CONTEXT, content, "match arm outside a match");
                } else {
                    self.err(
                        codes::CHECK_UNEXPECTED_INDENT,
                        content,
                        "expected a field declaration",
                    );
                }
            }
            Some(BlockContext::RecordLiteral { .. }) => {
                if kind == NodeKind::FieldInit {
                    self.check_field_init(content);
                } else if kind == NodeKind::MatchArm {
                    self.err(codes::CHECK_ARM_CONTEXT, content, "match arm outside a match");
                } else {
                    self.err(
                        codes::CHECK_UNEXPECTED_INDENT,
                        content,
                        "expected a field initializer",
                    );
                }
            }
            None => {
                if kind == NodeKind::MatchArm {
                    self.err(codes::CHECK_ARM_CONTEXT, content, "match arm outside a match");
                } else {
                    self.err(
                        codes::CHECK_UNEXPECTED_INDENT,
                        content,
                        "unexpected indentation",
                    );
                }
            }
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// `type Name` opens a record body; `type Name = T` declares a
    /// distinct type over `T`.
    fn check_type_decl(&mut self, stmt: NodeId) {
        let children = self.nodes.children(stmt);
        let Some(&name_node) = children.first() else {
            return;
        };
        let Some(name) = self.node_text(name_node) else {
            return;
        };
        if let Some(&underlying) = children.get(1) {
            let resolved = self.resolve_type_ref(underlying);
            if resolved.is_valid() {
                self.types.register_distinct(name, resolved, stmt);
            }
        } else {
            self.contexts.push(BlockContext::TypeDecl {
                name,
                node: stmt,
                fields: Vec::new(),
            });
        }
    }

    /// `Alias = Rhs` renames an existing type; no new type is created.
    fn check_type_alias(&mut self, stmt: NodeId) {
        let children = self.nodes.children(stmt);
        let (Some(&lhs), Some(&rhs)) = (children.first(), children.get(1)) else {
            return;
        };
        let (Some(alias), Some(target)) = (self.node_text(lhs), self.node_text(rhs)) else {
            return;
        };
        match self.types.lookup(target) {
            Some(ty) => self.types.register_alias(alias, ty),
            None => {
                let shown = self.strings.resolve(target).to_string();
                self.err(codes::CHECK_UNKNOWN_TYPE, rhs, format!("unknown type `{shown}`"));
            }
        }
    }

    fn check_value_binding(&mut self, stmt: NodeId) {
        let children = self.nodes.children(stmt);
        let Some(&name_node) = children.first() else {
            return;
        };
        let Some(name) = self.node_text(name_node) else {
            return;
        };

        let mut idx = 1;
        let mut declared = TypeId::INVALID;
        let mut annotated = false;
        if let Some(&annotation) = children.get(idx) {
            if self.nodes.get(annotation).kind == NodeKind::TypeAnnotation {
                annotated = true;
                if let Some(&ty_node) = self.nodes.children(annotation).first() {
                    declared = self.resolve_type_ref(ty_node);
                }
                idx += 1;
            }
        }
        let Some(&expr) = children.get(idx) else {
            return;
        };

        // `name : T = match scrutinee` opens a match context instead of
        // binding immediately; the arms follow on indented lines.
        if self.nodes.get(expr).kind == NodeKind::MatchExpr {
            let scrutinee_node = self.nodes.children(expr).first().copied();
            let expected = declared.is_valid().then_some(declared);
            let (scrutinee, scrutinee_ty) = match scrutinee_node {
                Some(s) => self.check_expr(s, expected),
                None => (None, TypeId::INVALID),
            };
            self.contexts.push(BlockContext::Match {
                name,
                result_ty: declared,
                node: stmt,
                scrutinee,
                scrutinee_ty,
                arms: Vec::new(),
            });
            return;
        }

        if annotated && !declared.is_valid() {
            // The annotation already failed; still surface expression errors.
            self.check_expr(expr, None);
            return;
        }

        if declared.is_valid() {
            match self.types.kind(declared) {
                TypeKind::List => self.check_list_binding(stmt, name, declared, expr),
                TypeKind::Record => {
                    let shown = self.display(declared);
                    self.err(
                        codes::CHECK_TYPE_MISMATCH,
                        expr,
                        format!("`{shown}` bindings take an indented field block"),
                    );
                }
                _ => {
                    let (value, _) = self.check_expr(expr, Some(declared));
                    let sym = self.symbols.add(name, declared, stmt);
                    if let Some(value) = value {
                        self.emit(
                            InstKind::Bind,
                            declared,
                            sym.0 as i32,
                            value.0 as i32,
                            stmt,
                        );
                    }
                }
            }
        } else {
            // No annotation: bind at the expression's natural type.
            let (value, ty) = self.check_expr(expr, None);
            if ty.is_valid() && ty != TypeId::NONE {
                let sym = self.symbols.add(name, ty, stmt);
                if let Some(value) = value {
                    self.emit(InstKind::Bind, ty, sym.0 as i32, value.0 as i32, stmt);
                }
            }
        }
    }

    /// `name : T[]<size=N> = [e0, …]` flattens into `N` scalar bindings.
    fn check_list_binding(&mut self, stmt: NodeId, name: StrId, list_ty: TypeId, expr: NodeId) {
        if self.nodes.get(expr).kind != NodeKind::ListLiteral {
            let shown = self.display(list_ty);
            self.err(
                codes::CHECK_TYPE_MISMATCH,
                expr,
                format!("expected a list literal for `{shown}`"),
            );
            return;
        }
        let info = self.types.get(list_ty).cloned();
        let (Some(element), Some(size)) = (
            info.as_ref().and_then(|i| i.element),
            info.as_ref().and_then(|i| i.size),
        ) else {
            return;
        };

        let elements = self.nodes.children(expr);
        let mut values = Vec::with_capacity(elements.len());
        for &element_node in &elements {
            let (value, _) = self.check_expr(element_node, Some(element));
            values.push(value);
        }
        if elements.len() != size as usize {
            self.err(
                codes::CHECK_LIST_LEN,
                expr,
                format!(
                    "list literal has {} elements, but the list type holds {size}",
                    elements.len()
                ),
            );
            return;
        }

        let syms = self
            .symbols
            .declare_list_binding(name, list_ty, stmt, self.strings, &self.types);
        for (sym, value) in syms.iter().zip(values) {
            if let Some(value) = value {
                self.emit(InstKind::Bind, element, sym.0 as i32, value.0 as i32, stmt);
            }
        }
        self.aggregates.insert(name, list_ty);
    }

    /// `name : R =` (or `name = R`) opens a record-literal context; the
    /// field initializers follow on indented lines.
    fn check_record_binding(&mut self, stmt: NodeId) {
        let children = self.nodes.children(stmt);
        let Some(&name_node) = children.first() else {
            return;
        };
        let Some(name) = self.node_text(name_node) else {
            return;
        };

        let mut idx = 1;
        let mut declared = TypeId::INVALID;
        let mut annotated = false;
        if let Some(&annotation) = children.get(idx) {
            if self.nodes.get(annotation).kind == NodeKind::TypeAnnotation {
                annotated = true;
                if let Some(&ty_node) = self.nodes.children(annotation).first() {
                    declared = self.resolve_type_ref(ty_node);
                }
                idx += 1;
            }
        }

        // A lone uppercase initializer names the record type.
        if let Some(&rhs) = children.get(idx) {
            if let Some(rhs_name) = self.node_text(rhs) {
                match self.types.lookup(rhs_name) {
                    Some(rhs_ty) => {
                        if annotated && declared.is_valid() && declared != rhs_ty {
                            let want = self.display(declared);
                            let got = self.display(rhs_ty);
                            self.err(
                                codes::CHECK_TYPE_MISMATCH,
                                rhs,
                                format!("expected `{want}`, found `{got}`"),
                            );
                            return;
                        }
                        if !declared.is_valid() {
                            declared = rhs_ty;
                        }
                    }
                    None => {
                        let shown = self.strings.resolve(rhs_name).to_string();
                        self.err(
                            codes::CHECK_UNKNOWN_TYPE,
                            rhs,
                            format!("unknown type `{shown}`"),
                        );
                        return;
                    }
                }
            }
        }

        if !declared.is_valid() {
            if !annotated && children.get(idx).is_none() {
                self.err(
                    codes::CHECK_UNKNOWN_TYPE,
                    stmt,
                    "record binding requires a type",
                );
            }
            return;
        }
        if self.types.kind(declared) != TypeKind::Record {
            let shown = self.display(declared);
            self.err(
                codes::CHECK_TYPE_MISMATCH,
                stmt,
                format!("`{shown}` is not a record type"),
            );
            return;
        }
        let field_count = self
            .types
            .get(declared)
            .and_then(|i| i.fields.as_ref())
            .map(|f| f.len())
            .unwrap_or(0);
        self.contexts.push(BlockContext::RecordLiteral {
            name,
            ty: declared,
            node: stmt,
            values: vec![None; field_count],
            seen: vec![false; field_count],
        });
    }

    // ── Indented block members ─────────────────────────────────────────

    fn check_field_decl(&mut self, node: NodeId) {
        let Some(BlockContext::TypeDecl { name, node: decl, mut fields }) = self.contexts.pop()
        else {
            return;
        };
        let children = self.nodes.children(node);
        if let (Some(&field_name_node), Some(&ty_node)) = (children.first(), children.get(1)) {
            if let Some(field_name) = self.node_text(field_name_node) {
                // A field typed as the enclosing record is a self-reference.
                let self_ref = self.node_text(ty_node) == Some(name)
                    && self.nodes.get(ty_node).kind == NodeKind::Identifier;
                if self_ref {
                    let shown = self.strings.resolve(name).to_string();
                    self.err(
                        codes::CHECK_SELF_FIELD,
                        ty_node,
                        format!("field type `{shown}` refers to the type being declared"),
                    );
                } else if fields.iter().any(|f| f.name == field_name) {
                    let shown = self.strings.resolve(field_name).to_string();
                    self.err(
                        codes::CHECK_DUP_FIELD_DECL,
                        field_name_node,
                        format!("duplicate field `{shown}`"),
                    );
                } else {
                    let ty = self.resolve_type_ref(ty_node);
                    if ty.is_valid() {
                        let index = fields.len() as u32;
                        fields.push(FieldInfo {
                            name: field_name,
                            ty,
                            index,
                        });
                    }
                }
            }
        }
        self.contexts.push(BlockContext::TypeDecl {
            name,
            node: decl,
            fields,
        });
    }

    fn check_field_init(&mut self, node: NodeId) {
        let Some(BlockContext::RecordLiteral { name, ty, node: binding, mut values, mut seen }) =
            self.contexts.pop()
        else {
            return;
        };
        let children = self.nodes.children(node);
        if let (Some(&field_name_node), Some(&expr)) = (children.first(), children.get(1)) {
            if let Some(field_name) = self.node_text(field_name_node) {
                let field = self
                    .types
                    .get(ty)
                    .and_then(|i| i.fields.as_ref())
                    .and_then(|fs| fs.iter().find(|f| f.name == field_name).copied());
                match field {
                    Some(field) => {
                        if seen[field.index as usize] {
                            let shown = self.strings.resolve(field_name).to_string();
                            self.err(
                                codes::CHECK_DUP_INIT_FIELD,
                                field_name_node,
                                format!("field `{shown}` is initialized twice"),
                            );
                        } else {
                            let (value, _) = self.check_expr(expr, Some(field.ty));
                            values[field.index as usize] = value;
                            seen[field.index as usize] = true;
                        }
                    }
                    None => {
                        let record = self.display(ty);
                        let shown = self.strings.resolve(field_name).to_string();
                        self.err(
                            codes::CHECK_UNKNOWN_INIT_FIELD,
                            field_name_node,
                            format!("record `{record}` has no field `{shown}`"),
                        );
                        self.check_expr(expr, None);
                    }
                }
            }
        }
        self.contexts.push(BlockContext::RecordLiteral {
            name,
            ty,
            node: binding,
            values,
            seen,
        });
    }

    fn check_match_arm(&mut self, node: NodeId) {
        let Some(BlockContext::Match {
            name,
            result_ty,
            node: binding,
            scrutinee,
            scrutinee_ty,
            mut arms,
        }) = self.contexts.pop()
        else {
            return;
        };
        let children = self.nodes.children(node);
        if let (Some(&pattern), Some(&body)) = (children.first(), children.get(1)) {
            let catch_all = self.check_pattern(pattern, scrutinee_ty, scrutinee);
            let expected = result_ty.is_valid().then_some(result_ty);
            let (body_inst, _) = self.check_expr(body, expected);
            arms.push(ArmInfo {
                arm: node,
                pattern,
                body: body_inst,
                catch_all,
            });
        }
        self.contexts.push(BlockContext::Match {
            name,
            result_ty,
            node: binding,
            scrutinee,
            scrutinee_ty,
            arms,
        });
    }

    /// Returns whether the pattern is a catch-all (matches any value).
    fn check_pattern(
        &mut self,
        pattern: NodeId,
        scrutinee_ty: TypeId,
        scrutinee: Option<InstId>,
    ) -> bool {
        match self.nodes.get(pattern).kind {
            NodeKind::WildcardPattern => true,
            NodeKind::BindingPattern => {
                if let Some(name) = self.node_text(pattern) {
                    if scrutinee_ty.is_valid() {
                        let sym = self.symbols.add(name, scrutinee_ty, pattern);
                        self.emit(
                            InstKind::PatternBind,
                            scrutinee_ty,
                            sym.0 as i32,
                            scrutinee.map(|i| i.0 as i32).unwrap_or(-1),
                            pattern,
                        );
                    }
                }
                true
            }
            NodeKind::LiteralPattern => {
                self.check_literal_pattern(pattern, scrutinee_ty);
                false
            }
            NodeKind::OrPattern => {
                let mut catch_all = false;
                for child in self.nodes.children(pattern) {
                    if self.check_pattern(child, scrutinee_ty, scrutinee) {
                        catch_all = true;
                    }
                }
                catch_all
            }
            _ => false,
        }
    }

    fn check_literal_pattern(&mut self, pattern: NodeId, scrutinee_ty: TypeId) {
        if !scrutinee_ty.is_valid() {
            return;
        }
        let base = self.types.to_wasm_type(scrutinee_ty);
        let value = self.nodes.children(pattern).first().and_then(|&lit| self.literal_value(lit));
        match (base, value) {
            (Some(base), Some(LiteralValue::Int(v))) if base.is_integer() => {
                if !fits(v, base) {
                    let shown = self.display(scrutinee_ty);
                    self.err(
                        codes::CHECK_PATTERN_TYPE,
                        pattern,
                        format!("pattern literal is out of range for `{shown}`"),
                    );
                }
            }
            _ => {
                let shown = self.display(scrutinee_ty);
                self.err(
                    codes::CHECK_PATTERN_TYPE,
                    pattern,
                    format!("pattern does not match scrutinee type `{shown}`"),
                );
            }
        }
    }

    // ── Context finalization ───────────────────────────────────────────

    fn finalize_all_contexts(&mut self) {
        while !self.contexts.is_empty() {
            self.finalize_top_context();
        }
    }

    fn finalize_top_context(&mut self) {
        match self.contexts.pop() {
            None => {}
            Some(BlockContext::TypeDecl { name, node, fields }) => {
                self.types.register_record(name, fields, node);
            }
            Some(BlockContext::RecordLiteral {
                name,
                ty,
                node,
                values,
                seen,
            }) => {
                let fields = self
                    .types
                    .get(ty)
                    .and_then(|i| i.fields.clone())
                    .unwrap_or_default();
                for field in &fields {
                    if !seen[field.index as usize] {
                        let record = self.display(ty);
                        let shown = self.strings.resolve(field.name).to_string();
                        self.err(
                            codes::CHECK_MISSING_FIELD,
                            node,
                            format!("missing field `{shown}` in `{record}` literal"),
                        );
                    }
                }
                let syms = self
                    .symbols
                    .declare_record_binding(name, &fields, node, self.strings);
                for (field, sym) in fields.iter().zip(&syms) {
                    if let Some(value) = values[field.index as usize] {
                        self.emit(
                            InstKind::Bind,
                            field.ty,
                            sym.0 as i32,
                            value.0 as i32,
                            node,
                        );
                    }
                }
                self.aggregates.insert(name, ty);
            }
            Some(BlockContext::Match {
                name,
                result_ty,
                node,
                scrutinee,
                scrutinee_ty: _,
                arms,
            }) => {
                let exhaustive = arms.last().map(|a| a.catch_all).unwrap_or(false);
                if !exhaustive {
                    let (line, col) = self.pos(node);
                    self.diags.push(
                        codes::CHECK_NON_EXHAUSTIVE,
                        whale_common::diag::Severity::Error,
                        line,
                        col,
                        "non-exhaustive match",
                        Some("end with a catch-all arm: `_ -> …` or a binding".to_string()),
                    );
                }
                let arm_count = arms.len() as i32;
                for arm in &arms {
                    self.emit(
                        InstKind::MatchArm,
                        result_ty,
                        arm.pattern.0 as i32,
                        arm.body.map(|i| i.0 as i32).unwrap_or(-1),
                        arm.arm,
                    );
                }
                let match_inst = self.emit(
                    InstKind::Match,
                    result_ty,
                    scrutinee.map(|i| i.0 as i32).unwrap_or(-1),
                    arm_count,
                    node,
                );
                if result_ty.is_valid() {
                    let sym = self.symbols.add(name, result_ty, node);
                    self.emit(
                        InstKind::Bind,
                        result_ty,
                        sym.0 as i32,
                        match_inst.0 as i32,
                        node,
                    );
                }
            }
        }
    }

    fn flush_unreachable(&mut self) {
        if let Some((start, end)) = self.unreachable.take() {
            let suggestion = if start == end {
                format!("remove line {start}")
            } else {
                format!("remove lines {start}-{end}")
            };
            self.diags.push(
                codes::CHECK_UNREACHABLE,
                whale_common::diag::Severity::Warning,
                start,
                1,
                "unreachable code",
                Some(suggestion),
            );
        }
    }

    // ── Type references ────────────────────────────────────────────────

    fn resolve_type_ref(&mut self, node: NodeId) -> TypeId {
        match self.nodes.get(node).kind {
            NodeKind::Identifier => {
                let token = self.node_token(node);
                match token.kind {
                    TokenKind::I32 => TypeId::I32,
                    TokenKind::I64 => TypeId::I64,
                    TokenKind::F32 => TypeId::F32,
                    TokenKind::F64 => TypeId::F64,
                    TokenKind::UpperIdent => {
                        let Some(name) = token.text_id() else {
                            return TypeId::INVALID;
                        };
                        match self.types.lookup(name) {
                            Some(ty) => ty,
                            None => {
                                let shown = self.strings.resolve(name).to_string();
                                self.err(
                                    codes::CHECK_UNKNOWN_TYPE,
                                    node,
                                    format!("unknown type `{shown}`"),
                                );
                                TypeId::INVALID
                            }
                        }
                    }
                    _ => {
                        self.err(codes::CHECK_UNKNOWN_TYPE, node, "expected a type name");
                        TypeId::INVALID
                    }
                }
            }
            NodeKind::RefinementType => self.resolve_refinement(node),
            NodeKind::ListType => self.resolve_list_type(node),
            NodeKind::FuncType => {
                self.err(
                    codes::CHECK_UNKNOWN_TYPE,
                    node,
                    "function types are not supported here",
                );
                TypeId::INVALID
            }
            _ => {
                self.err(codes::CHECK_UNKNOWN_TYPE, node, "expected a type");
                TypeId::INVALID
            }
        }
    }

    fn resolve_refinement(&mut self, node: NodeId) -> TypeId {
        let children = self.nodes.children(node);
        let (Some(&base_node), Some(&bounds)) = (children.first(), children.get(1)) else {
            return TypeId::INVALID;
        };
        let base = self.resolve_type_ref(base_node);
        if !base.is_valid() {
            return TypeId::INVALID;
        }
        let integer_base = self
            .types
            .to_wasm_type(base)
            .is_some_and(|w| w.is_integer());
        if !integer_base {
            let shown = self.display(base);
            self.err(
                codes::CHECK_REFINE_BASE,
                base_node,
                format!("refinements require an integer base, found `{shown}`"),
            );
            return TypeId::INVALID;
        }

        let mut constraints = Constraints::default();
        for bound in self.nodes.children(bounds) {
            let Some(bound_name) = self.node_text(bound) else {
                continue;
            };
            let value = self
                .nodes
                .children(bound)
                .first()
                .and_then(|&v| self.int_literal_value(v));
            match self.strings.resolve(bound_name) {
                "min" => constraints.min = value,
                "max" => constraints.max = value,
                other => {
                    let other = other.to_string();
                    self.err(
                        codes::CHECK_REFINE_BASE,
                        bound,
                        format!("refined types take only `min` and `max` bounds, found `{other}`"),
                    );
                    return TypeId::INVALID;
                }
            }
        }
        self.types.register_refined(base, constraints, node)
    }

    fn resolve_list_type(&mut self, node: NodeId) -> TypeId {
        let children = self.nodes.children(node);
        let (Some(&element_node), Some(&bounds)) = (children.first(), children.get(1)) else {
            return TypeId::INVALID;
        };
        let element = self.resolve_type_ref(element_node);
        if !element.is_valid() {
            return TypeId::INVALID;
        }

        let mut size: Option<i128> = None;
        for bound in self.nodes.children(bounds) {
            let Some(bound_name) = self.node_text(bound) else {
                continue;
            };
            let value = self
                .nodes
                .children(bound)
                .first()
                .and_then(|&v| self.int_literal_value(v));
            match self.strings.resolve(bound_name) {
                "size" => size = value,
                other => {
                    let other = other.to_string();
                    self.err(
                        codes::CHECK_LIST_SIZE,
                        bound,
                        format!("list types take only a `size` bound, found `{other}`"),
                    );
                    return TypeId::INVALID;
                }
            }
        }
        match size {
            Some(n) if n > 0 && n <= u32::MAX as i128 => {
                self.types.register_list(element, n as u32, node)
            }
            Some(n) => {
                self.err(
                    codes::CHECK_LIST_SIZE,
                    node,
                    format!("invalid list size {n}"),
                );
                TypeId::INVALID
            }
            None => {
                self.err(codes::CHECK_LIST_SIZE, node, "list type requires a `size` bound");
                TypeId::INVALID
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Check an expression. With `expected`, the type is threaded through
    /// literals and operators (typed mode); without, natural types apply
    /// (inferred mode). Returns the instruction and result type, or
    /// `(None, INVALID)` when the expression fails.
    fn check_expr(&mut self, node: NodeId, expected: Option<TypeId>) -> (Option<InstId>, TypeId) {
        match self.nodes.get(node).kind {
            NodeKind::IntLiteral => {
                let value = self.int_literal_value(node);
                self.check_int_value(value, expected, node)
            }
            NodeKind::FloatLiteral => {
                let value = self.float_literal_value(node);
                self.check_float_value(value, expected, node)
            }
            NodeKind::Identifier => self.check_identifier(node, expected),
            NodeKind::ParenExpr => match self.nodes.children(node).first() {
                Some(&inner) => self.check_expr(inner, expected),
                None => (None, TypeId::INVALID),
            },
            NodeKind::UnaryExpr => self.check_unary(node, expected),
            NodeKind::BinaryExpr => self.check_binary(node, expected),
            NodeKind::CompareChain => self.check_compare_chain(node, expected),
            NodeKind::FieldAccess => self.check_field_access(node, expected),
            NodeKind::IndexAccess => self.check_index_access(node, expected),
            NodeKind::FuncCall => {
                let callee = self.nodes.children(node).first().copied();
                let message = match callee.and_then(|c| self.node_text(c)) {
                    Some(name) => {
                        let shown = self.strings.resolve(name).to_string();
                        format!("`{shown}` is not a known function")
                    }
                    None => "call target is not a known function".to_string(),
                };
                self.err(codes::CHECK_UNDEFINED_VAR, node, message);
                (None, TypeId::INVALID)
            }
            NodeKind::ListLiteral => {
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    "list literals may only initialize a list-typed binding",
                );
                (None, TypeId::INVALID)
            }
            NodeKind::MatchExpr => {
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    "`match` may only initialize a binding",
                );
                (None, TypeId::INVALID)
            }
            NodeKind::PanicExpr => {
                let inst = self.emit(InstKind::Unreachable, TypeId::NONE, -1, -1, node);
                let ty = expected.filter(|t| t.is_valid()).unwrap_or(TypeId::NONE);
                (Some(inst), ty)
            }
            _ => {
                self.err(codes::CHECK_TYPE_MISMATCH, node, "expected an expression");
                (None, TypeId::INVALID)
            }
        }
    }

    fn check_int_value(
        &mut self,
        value: Option<i128>,
        expected: Option<TypeId>,
        node: NodeId,
    ) -> (Option<InstId>, TypeId) {
        let ty = match expected {
            Some(t) if t.is_valid() => t,
            Some(_) => return (None, TypeId::INVALID),
            None => TypeId::I32,
        };
        let Some(base) = self.types.to_wasm_type(ty) else {
            let shown = self.display(ty);
            self.err(
                codes::CHECK_TYPE_MISMATCH,
                node,
                format!("expected `{shown}`, found an integer literal"),
            );
            return (None, TypeId::INVALID);
        };
        if !base.is_integer() {
            let shown = self.display(ty);
            self.err(
                codes::CHECK_LITERAL_KIND,
                node,
                format!("integer literal cannot initialize `{shown}`"),
            );
            return (None, TypeId::INVALID);
        }
        let in_bounds = value.is_some_and(|v| fits(v, base));
        let Some(value) = value.filter(|_| in_bounds) else {
            let shown = self.display(ty);
            self.err(
                codes::CHECK_INT_BOUNDS,
                node,
                format!("integer literal out of range for `{shown}`"),
            );
            return (None, TypeId::INVALID);
        };
        if let Some(c) = self.refinement_of(ty) {
            let below = c.min.is_some_and(|min| value < min);
            let above = c.max.is_some_and(|max| value > max);
            if below || above {
                let shown = self.display(ty);
                self.err(
                    codes::CHECK_REFINE_RANGE,
                    node,
                    format!("literal {value} violates the bounds of `{shown}`"),
                );
                return (None, TypeId::INVALID);
            }
        }
        let inst = self.insts.push(Inst::int_const(value as i64, ty, node));
        (Some(inst), ty)
    }

    fn check_float_value(
        &mut self,
        value: Option<f64>,
        expected: Option<TypeId>,
        node: NodeId,
    ) -> (Option<InstId>, TypeId) {
        let Some(value) = value else {
            return (None, TypeId::INVALID);
        };
        let ty = match expected {
            Some(t) if t.is_valid() => t,
            Some(_) => return (None, TypeId::INVALID),
            None => TypeId::F64,
        };
        let Some(base) = self.types.to_wasm_type(ty) else {
            let shown = self.display(ty);
            self.err(
                codes::CHECK_TYPE_MISMATCH,
                node,
                format!("expected `{shown}`, found a float literal"),
            );
            return (None, TypeId::INVALID);
        };
        if base.is_integer() {
            let shown = self.display(ty);
            self.err(
                codes::CHECK_LITERAL_KIND,
                node,
                format!("float literal cannot initialize `{shown}`"),
            );
            return (None, TypeId::INVALID);
        }
        if base == WasmType::F32 && value.is_finite() && value.abs() > f32::MAX as f64 {
            self.err(codes::CHECK_F32_OVERFLOW, node, "float literal overflows `f32`");
            return (None, TypeId::INVALID);
        }
        let inst = self.insts.push(Inst::float_const(value, ty, node));
        (Some(inst), ty)
    }

    fn check_identifier(
        &mut self,
        node: NodeId,
        expected: Option<TypeId>,
    ) -> (Option<InstId>, TypeId) {
        let token = self.node_token(node);
        let Some(name) = token.text_id() else {
            return (None, TypeId::INVALID);
        };
        if token.kind == TokenKind::UpperIdent {
            let shown = self.strings.resolve(name).to_string();
            self.err(
                codes::CHECK_UNDEFINED_VAR,
                node,
                format!("`{shown}` is not a value"),
            );
            return (None, TypeId::INVALID);
        }
        let Some(sym) = self.symbols.lookup(name) else {
            let shown = self.strings.resolve(name).to_string();
            if self.aggregates.contains_key(&name) {
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("`{shown}` is an aggregate binding, not a scalar value"),
                );
            } else {
                self.err(
                    codes::CHECK_UNDEFINED_VAR,
                    node,
                    format!("undefined variable `{shown}`"),
                );
            }
            return (None, TypeId::INVALID);
        };
        let ty = self.symbols.get(sym).ty;
        if let Some(want) = expected {
            if want.is_valid() && !self.types.are_equal(ty, want) {
                let want_shown = self.display(want);
                let got_shown = self.display(ty);
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("expected `{want_shown}`, found `{got_shown}`"),
                );
                return (None, TypeId::INVALID);
            }
        }
        let inst = self.emit(InstKind::VarRef, ty, sym.0 as i32, -1, node);
        (Some(inst), ty)
    }

    fn check_unary(&mut self, node: NodeId, expected: Option<TypeId>) -> (Option<InstId>, TypeId) {
        let op = self.node_token(node).kind;
        let Some(&operand) = self.nodes.children(node).first() else {
            return (None, TypeId::INVALID);
        };
        match op {
            TokenKind::Minus => match self.nodes.get(operand).kind {
                // Negation of a literal flows the expected type into the
                // literal, so `-2147483648` checks precisely as i32.
                NodeKind::IntLiteral => {
                    let value = self.int_literal_value(operand).map(|v| -v);
                    self.check_int_value(value, expected, node)
                }
                NodeKind::FloatLiteral => {
                    let value = self.float_literal_value(operand).map(|v| -v);
                    self.check_float_value(value, expected, node)
                }
                _ => {
                    let (inst, ty) = self.check_expr(operand, expected);
                    let Some(inst) = inst else {
                        return (None, TypeId::INVALID);
                    };
                    if self.types.to_wasm_type(ty).is_none() {
                        let shown = self.display(ty);
                        self.err(
                            codes::CHECK_TYPE_MISMATCH,
                            node,
                            format!("cannot negate a value of type `{shown}`"),
                        );
                        return (None, TypeId::INVALID);
                    }
                    let negate = self.emit(InstKind::Negate, ty, inst.0 as i32, -1, node);
                    (Some(negate), ty)
                }
            },
            TokenKind::Tilde => {
                let (inst, ty) = self.check_expr(operand, expected);
                let Some(inst) = inst else {
                    return (None, TypeId::INVALID);
                };
                let integer = self
                    .types
                    .to_wasm_type(ty)
                    .is_some_and(|w| w.is_integer());
                if !integer {
                    let shown = self.display(ty);
                    self.err(
                        codes::CHECK_INT_ONLY_OP,
                        node,
                        format!("`~` requires an integer operand, found `{shown}`"),
                    );
                    return (None, TypeId::INVALID);
                }
                let inst = self.emit(InstKind::BitwiseNot, ty, inst.0 as i32, -1, node);
                (Some(inst), ty)
            }
            _ => (None, TypeId::INVALID),
        }
    }

    fn check_binary(&mut self, node: NodeId, expected: Option<TypeId>) -> (Option<InstId>, TypeId) {
        let op = self.node_token(node).kind;
        let Some(class) = op_class(op) else {
            return (None, TypeId::INVALID);
        };
        let children = self.nodes.children(node);
        let (Some(&lhs), Some(&rhs)) = (children.first(), children.get(1)) else {
            return (None, TypeId::INVALID);
        };

        match class {
            OpClass::Arith | OpClass::IntOnly => {
                let (ty, li, ri) = match expected {
                    Some(want) if want.is_valid() => {
                        let (li, _) = self.check_expr(lhs, Some(want));
                        let (ri, _) = self.check_expr(rhs, Some(want));
                        (want, li, ri)
                    }
                    Some(_) => return (None, TypeId::INVALID),
                    None => {
                        let (li, lt) = self.check_expr(lhs, None);
                        if !lt.is_valid() {
                            self.check_expr(rhs, None);
                            return (None, TypeId::INVALID);
                        }
                        let (ri, rt) = self.check_operand(rhs, lt);
                        if !rt.is_valid() {
                            return (None, TypeId::INVALID);
                        }
                        (lt, li, ri)
                    }
                };
                let base = self.types.to_wasm_type(ty);
                if class == OpClass::IntOnly && !base.is_some_and(|w| w.is_integer()) {
                    let shown = self.display(ty);
                    self.err(
                        codes::CHECK_INT_ONLY_OP,
                        node,
                        format!("operator requires integer operands, found `{shown}`"),
                    );
                    return (None, TypeId::INVALID);
                }
                if base.is_none() {
                    let shown = self.display(ty);
                    self.err(
                        codes::CHECK_TYPE_MISMATCH,
                        node,
                        format!("operator cannot produce `{shown}`"),
                    );
                    return (None, TypeId::INVALID);
                }
                let (Some(li), Some(ri)) = (li, ri) else {
                    return (None, TypeId::INVALID);
                };
                let inst = self.emit(InstKind::BinaryOp, ty, li.0 as i32, ri.0 as i32, node);
                (Some(inst), ty)
            }
            OpClass::Compare => {
                if let Some(want) = expected {
                    if want.is_valid() && want != TypeId::I32 {
                        let shown = self.display(want);
                        self.err(
                            codes::CHECK_TYPE_MISMATCH,
                            node,
                            format!("comparison yields `i32`, expected `{shown}`"),
                        );
                        self.check_expr(lhs, None);
                        self.check_expr(rhs, None);
                        return (None, TypeId::INVALID);
                    }
                }
                let (li, lt) = self.check_expr(lhs, None);
                if !lt.is_valid() {
                    self.check_expr(rhs, None);
                    return (None, TypeId::INVALID);
                }
                let (ri, rt) = self.check_operand(rhs, lt);
                if !rt.is_valid() {
                    return (None, TypeId::INVALID);
                }
                let (Some(li), Some(ri)) = (li, ri) else {
                    return (None, TypeId::INVALID);
                };
                let inst = self.emit(InstKind::BinaryOp, TypeId::I32, li.0 as i32, ri.0 as i32, node);
                (Some(inst), TypeId::I32)
            }
            OpClass::Logical => {
                if let Some(want) = expected {
                    if want.is_valid() && want != TypeId::I32 {
                        let shown = self.display(want);
                        self.err(
                            codes::CHECK_TYPE_MISMATCH,
                            node,
                            format!("logical operator yields `i32`, expected `{shown}`"),
                        );
                        self.check_expr(lhs, None);
                        self.check_expr(rhs, None);
                        return (None, TypeId::INVALID);
                    }
                }
                let (li, lt) = self.check_expr(lhs, None);
                let (ri, rt) = self.check_expr(rhs, None);
                let mut ok = true;
                for (operand, ty) in [(lhs, lt), (rhs, rt)] {
                    if !ty.is_valid() {
                        ok = false;
                        continue;
                    }
                    let integer = self
                        .types
                        .to_wasm_type(ty)
                        .is_some_and(|w| w.is_integer());
                    if !integer {
                        let shown = self.display(ty);
                        self.err(
                            codes::CHECK_LOGICAL_OP,
                            operand,
                            format!("logical operators require integer operands, found `{shown}`"),
                        );
                        ok = false;
                    }
                }
                let (Some(li), Some(ri)) = (li, ri) else {
                    return (None, TypeId::INVALID);
                };
                if !ok {
                    return (None, TypeId::INVALID);
                }
                let kind = if op == TokenKind::AmpAmp {
                    InstKind::LogicalAnd
                } else {
                    InstKind::LogicalOr
                };
                let inst = self.emit(kind, TypeId::I32, li.0 as i32, ri.0 as i32, node);
                (Some(inst), TypeId::I32)
            }
        }
    }

    /// `a < b < c`: all operands share one type, the result is `i32`.
    /// Decomposed into pairwise comparisons joined with `LogicalAnd`; the
    /// pair instructions anchor on their right operand so the operator
    /// token stays recoverable.
    fn check_compare_chain(
        &mut self,
        node: NodeId,
        expected: Option<TypeId>,
    ) -> (Option<InstId>, TypeId) {
        if let Some(want) = expected {
            if want.is_valid() && want != TypeId::I32 {
                let shown = self.display(want);
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("comparison yields `i32`, expected `{shown}`"),
                );
                return (None, TypeId::INVALID);
            }
        }
        let operands = self.nodes.children(node);
        let Some(&first) = operands.first() else {
            return (None, TypeId::INVALID);
        };
        let (fi, ft) = self.check_expr(first, None);
        if !ft.is_valid() {
            return (None, TypeId::INVALID);
        }
        let mut insts = vec![fi];
        for &operand in &operands[1..] {
            let (oi, ot) = self.check_operand(operand, ft);
            if !ot.is_valid() {
                return (None, TypeId::INVALID);
            }
            insts.push(oi);
        }

        let mut combined: Option<InstId> = None;
        for (i, pair) in insts.windows(2).enumerate() {
            let (Some(a), Some(b)) = (pair[0], pair[1]) else {
                return (None, TypeId::INVALID);
            };
            let cmp = self.emit(
                InstKind::BinaryOp,
                TypeId::I32,
                a.0 as i32,
                b.0 as i32,
                operands[i + 1],
            );
            combined = Some(match combined {
                None => cmp,
                Some(previous) => self.emit(
                    InstKind::LogicalAnd,
                    TypeId::I32,
                    previous.0 as i32,
                    cmp.0 as i32,
                    node,
                ),
            });
        }
        (combined, TypeId::I32)
    }

    fn check_field_access(
        &mut self,
        node: NodeId,
        expected: Option<TypeId>,
    ) -> (Option<InstId>, TypeId) {
        let children = self.nodes.children(node);
        let (Some(&base), Some(&field_node)) = (children.first(), children.get(1)) else {
            return (None, TypeId::INVALID);
        };
        let Some(field_name) = self.node_text(field_node) else {
            return (None, TypeId::INVALID);
        };

        // Flattened-symbol fast path: `p.x` resolves to the local `p_x`.
        if let Some(base_name) = self.simple_name(base) {
            let base_text = self.strings.resolve(base_name).to_string();
            let field_text = self.strings.resolve(field_name).to_string();
            let flat = self.strings.intern(&format!("{base_text}_{field_text}"));
            if let Some(sym) = self.symbols.lookup(flat) {
                return self.var_ref_checked(sym, expected, node);
            }
            return match self.aggregates.get(&base_name).copied() {
                Some(ty) if self.types.kind(ty) == TypeKind::Record => {
                    let record = self.display(ty);
                    self.err(
                        codes::CHECK_UNKNOWN_FIELD,
                        field_node,
                        format!("record `{record}` has no field `{field_text}`"),
                    );
                    (None, TypeId::INVALID)
                }
                Some(_) => {
                    self.err(
                        codes::CHECK_NON_RECORD_ACCESS,
                        node,
                        format!("`{base_text}` is not a record"),
                    );
                    (None, TypeId::INVALID)
                }
                None => {
                    if self.symbols.lookup(base_name).is_some() {
                        self.err(
                            codes::CHECK_NON_RECORD_ACCESS,
                            node,
                            format!("`{base_text}` is not a record"),
                        );
                    } else {
                        self.err(
                            codes::CHECK_UNDEFINED_VAR,
                            base,
                            format!("undefined variable `{base_text}`"),
                        );
                    }
                    (None, TypeId::INVALID)
                }
            };
        }

        // General path: the base is some expression; it must be a record.
        let (base_inst, base_ty) = self.check_expr(base, None);
        if !base_ty.is_valid() {
            return (None, TypeId::INVALID);
        }
        if self.types.kind(base_ty) != TypeKind::Record {
            let shown = self.display(base_ty);
            self.err(
                codes::CHECK_NON_RECORD_ACCESS,
                node,
                format!("field access on non-record `{shown}`"),
            );
            return (None, TypeId::INVALID);
        }
        let field = self
            .types
            .get(base_ty)
            .and_then(|i| i.fields.as_ref())
            .and_then(|fs| fs.iter().find(|f| f.name == field_name).copied());
        let Some(field) = field else {
            let record = self.display(base_ty);
            let shown = self.strings.resolve(field_name).to_string();
            self.err(
                codes::CHECK_UNKNOWN_FIELD,
                field_node,
                format!("record `{record}` has no field `{shown}`"),
            );
            return (None, TypeId::INVALID);
        };
        if let Some(want) = expected {
            if want.is_valid() && field.ty != want {
                let want_shown = self.display(want);
                let got_shown = self.display(field.ty);
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("expected `{want_shown}`, found `{got_shown}`"),
                );
                return (None, TypeId::INVALID);
            }
        }
        let base_arg = base_inst.map(|i| i.0 as i32).unwrap_or(-1);
        let inst = self.emit(
            InstKind::FieldAccess,
            field.ty,
            base_arg,
            field.index as i32,
            node,
        );
        (Some(inst), field.ty)
    }

    fn check_index_access(
        &mut self,
        node: NodeId,
        expected: Option<TypeId>,
    ) -> (Option<InstId>, TypeId) {
        let children = self.nodes.children(node);
        let (Some(&base), Some(&index_node)) = (children.first(), children.get(1)) else {
            return (None, TypeId::INVALID);
        };

        let index = match self.nodes.get(index_node).kind {
            NodeKind::IntLiteral => self.int_literal_value(index_node),
            _ => None,
        };
        let Some(index) = index.filter(|&i| i >= 0) else {
            self.err(
                codes::CHECK_BAD_INDEX,
                index_node,
                "list index must be a non-negative integer literal",
            );
            return (None, TypeId::INVALID);
        };

        let Some(base_name) = self.simple_name(base) else {
            self.err(
                codes::CHECK_TYPE_MISMATCH,
                node,
                "only list bindings can be indexed",
            );
            return (None, TypeId::INVALID);
        };
        let base_text = self.strings.resolve(base_name).to_string();
        match self.aggregates.get(&base_name).copied() {
            Some(ty) if self.types.kind(ty) == TypeKind::List => {
                let size = self.types.get(ty).and_then(|i| i.size).unwrap_or(0);
                if index >= size as i128 {
                    self.err(
                        codes::CHECK_INDEX_BOUNDS,
                        index_node,
                        format!("index {index} is out of bounds for a list of size {size}"),
                    );
                    return (None, TypeId::INVALID);
                }
                let flat = self.strings.intern(&format!("{base_text}_{index}"));
                match self.symbols.lookup(flat) {
                    Some(sym) => self.var_ref_checked(sym, expected, node),
                    None => (None, TypeId::INVALID),
                }
            }
            Some(_) => {
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("`{base_text}` is not a list"),
                );
                (None, TypeId::INVALID)
            }
            None => {
                if self.symbols.lookup(base_name).is_some() {
                    self.err(
                        codes::CHECK_TYPE_MISMATCH,
                        node,
                        format!("`{base_text}` is not a list"),
                    );
                } else {
                    self.err(
                        codes::CHECK_UNDEFINED_VAR,
                        base,
                        format!("undefined variable `{base_text}`"),
                    );
                }
                (None, TypeId::INVALID)
            }
        }
    }

    /// Emit a `VarRef`, checking the symbol's type against an expectation.
    fn var_ref_checked(
        &mut self,
        sym: SymbolId,
        expected: Option<TypeId>,
        node: NodeId,
    ) -> (Option<InstId>, TypeId) {
        let ty = self.symbols.get(sym).ty;
        if let Some(want) = expected {
            if want.is_valid() && !self.types.are_equal(ty, want) {
                let want_shown = self.display(want);
                let got_shown = self.display(ty);
                self.err(
                    codes::CHECK_TYPE_MISMATCH,
                    node,
                    format!("expected `{want_shown}`, found `{got_shown}`"),
                );
                return (None, TypeId::INVALID);
            }
        }
        let inst = self.emit(InstKind::VarRef, ty, sym.0 as i32, -1, node);
        (Some(inst), ty)
    }

    /// Check the right operand of a binary form against the left's type:
    /// literals adapt via typed mode, anything else must match exactly.
    fn check_operand(&mut self, node: NodeId, expected: TypeId) -> (Option<InstId>, TypeId) {
        if self.is_literal_like(node) {
            return self.check_expr(node, Some(expected));
        }
        let (inst, ty) = self.check_expr(node, None);
        if ty.is_valid() && !self.types.are_equal(ty, expected) {
            let want = self.display(expected);
            let got = self.display(ty);
            self.err(
                codes::CHECK_OPERAND_MISMATCH,
                node,
                format!("operand type mismatch: `{want}` vs `{got}`"),
            );
            return (None, TypeId::INVALID);
        }
        (inst, ty)
    }

    fn is_literal_like(&self, node: NodeId) -> bool {
        match self.nodes.get(node).kind {
            NodeKind::IntLiteral | NodeKind::FloatLiteral => true,
            NodeKind::ParenExpr | NodeKind::UnaryExpr => self
                .nodes
                .children(node)
                .first()
                .is_some_and(|&c| self.is_literal_like(c)),
            _ => false,
        }
    }

    // ── Literal values ─────────────────────────────────────────────────

    fn int_literal_value(&self, node: NodeId) -> Option<i128> {
        match self.nodes.get(node).kind {
            NodeKind::IntLiteral => {
                let text = self.node_token(node).text_id()?;
                parse_int_literal(self.strings.resolve(text))
            }
            NodeKind::UnaryExpr => {
                let child = self.nodes.children(node).first().copied()?;
                self.int_literal_value(child).map(|v| -v)
            }
            _ => None,
        }
    }

    fn float_literal_value(&self, node: NodeId) -> Option<f64> {
        match self.node_token(node).payload {
            TokenPayload::Float(id) => Some(self.floats.resolve(id)),
            _ => None,
        }
    }

    fn literal_value(&self, node: NodeId) -> Option<LiteralValue> {
        match self.nodes.get(node).kind {
            NodeKind::IntLiteral => self.int_literal_value(node).map(LiteralValue::Int),
            NodeKind::FloatLiteral => self.float_literal_value(node).map(LiteralValue::Float),
            NodeKind::UnaryExpr => {
                let child = self.nodes.children(node).first().copied()?;
                match self.literal_value(child)? {
                    LiteralValue::Int(v) => Some(LiteralValue::Int(-v)),
                    LiteralValue::Float(v) => Some(LiteralValue::Float(-v)),
                }
            }
            _ => None,
        }
    }

    // ── Small helpers ──────────────────────────────────────────────────

    fn emit(&mut self, kind: InstKind, ty: TypeId, arg0: i32, arg1: i32, node: NodeId) -> InstId {
        self.insts.push(Inst {
            kind,
            ty,
            arg0,
            arg1,
            node,
        })
    }

    fn node_token(&self, node: NodeId) -> &Token {
        self.tokens.get(self.nodes.get(node).token)
    }

    /// Interned text of a node's anchor token, if it has one.
    fn node_text(&self, node: NodeId) -> Option<StrId> {
        self.node_token(node).text_id()
    }

    /// The name of a plain lowercase identifier node.
    fn simple_name(&self, node: NodeId) -> Option<StrId> {
        if self.nodes.get(node).kind != NodeKind::Identifier {
            return None;
        }
        let token = self.node_token(node);
        if token.kind == TokenKind::Ident {
            token.text_id()
        } else {
            None
        }
    }

    fn pos(&self, node: NodeId) -> (u32, u32) {
        let token = self.node_token(node);
        (token.line, token.col)
    }

    fn err(&mut self, code: &'static str, node: NodeId, message: impl Into<String>) {
        let (line, col) = self.pos(node);
        self.diags.error(code, line, col, message);
    }

    fn display(&self, ty: TypeId) -> String {
        self.types.display(ty, self.strings)
    }

    /// Constraints of a refined type, walking through distinct wrappers.
    fn refinement_of(&self, ty: TypeId) -> Option<Constraints> {
        let mut current = ty;
        loop {
            let info = self.types.get(current)?;
            match info.kind {
                TypeKind::Refined => return info.constraints,
                TypeKind::Distinct => current = info.underlying,
                _ => return None,
            }
        }
    }
}

enum LiteralValue {
    Int(i128),
    Float(f64),
}
