//! The symbol store.
//!
//! A flat append-only table of bindings plus a name map that always points
//! at the most recent entry, which is all the shadowing model needs: every
//! shadow allocates a fresh machine local, and match-arm bodies simply see
//! the outer table. Aggregate bindings never get a local of their own;
//! they are flattened into one scalar entry per leaf (`base_field` for
//! records, `base_0 … base_N-1` for lists).

use rustc_hash::FxHashMap;
use whale_common::intern::{StrId, StringInterner};
use whale_parser::node::NodeId;

use crate::ty::{FieldInfo, TypeId, TypeStore};

/// Id of a symbol in a [`SymbolStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SymbolId(pub u32);

/// One binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolEntry {
    pub name: StrId,
    pub ty: TypeId,
    /// Index of the machine local backing this binding. Fresh per entry.
    pub local_index: u32,
    /// The binding's parse node.
    pub node: NodeId,
}

/// Append-only symbol table with most-recent-wins name lookup.
#[derive(Debug, Default)]
pub struct SymbolStore {
    entries: Vec<SymbolEntry>,
    by_name: FxHashMap<StrId, SymbolId>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding, allocating a fresh local index and shadowing any
    /// earlier binding of the same name.
    pub fn add(&mut self, name: StrId, ty: TypeId, node: NodeId) -> SymbolId {
        let id = SymbolId(self.entries.len() as u32);
        self.entries.push(SymbolEntry {
            name,
            ty,
            local_index: id.0,
            node,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Most recent binding of a name.
    pub fn lookup(&self, name: StrId) -> Option<SymbolId> {
        self.by_name.get(&name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &SymbolEntry {
        &self.entries[id.0 as usize]
    }

    /// Number of entries, which equals the number of machine locals.
    pub fn local_count(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in id (= local) order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (SymbolId(i as u32), e))
    }

    /// Flatten a record binding into one scalar symbol per field.
    ///
    /// The symbols are named `base_field` in field-declaration order and
    /// typed as their field. Later `base.field` references resolve to
    /// these entries directly.
    pub fn declare_record_binding(
        &mut self,
        base: StrId,
        fields: &[FieldInfo],
        node: NodeId,
        strings: &mut StringInterner,
    ) -> Vec<SymbolId> {
        let base_text = strings.resolve(base).to_string();
        fields
            .iter()
            .map(|field| {
                let field_text = strings.resolve(field.name).to_string();
                let flat = strings.intern(&format!("{base_text}_{field_text}"));
                self.add(flat, field.ty, node)
            })
            .collect()
    }

    /// Flatten a list binding into `size` scalar symbols named
    /// `base_0 … base_N-1`, each typed as the element type.
    pub fn declare_list_binding(
        &mut self,
        base: StrId,
        list_ty: TypeId,
        node: NodeId,
        strings: &mut StringInterner,
        types: &TypeStore,
    ) -> Vec<SymbolId> {
        let Some(info) = types.get(list_ty) else {
            return Vec::new();
        };
        let (Some(element), Some(size)) = (info.element, info.size) else {
            return Vec::new();
        };
        let base_text = strings.resolve(base).to_string();
        (0..size)
            .map(|i| {
                let flat = strings.intern(&format!("{base_text}_{i}"));
                self.add(flat, element, node)
            })
            .collect()
    }
}
