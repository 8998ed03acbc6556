//! The type store.
//!
//! All types live in one dense, append-only table. The five builtins
//! occupy fixed ids 0..=4; user types append in registration order and are
//! compared nominally, so `are_equal` is a plain id comparison. Refined
//! integer types and fixed-size list types are content-interned: asking
//! for the same `(base, min, max)` or `(element, size)` twice yields the
//! same id.

use rustc_hash::FxHashMap;
use whale_common::intern::{StrId, StringInterner};
use whale_parser::node::NodeId;

/// Id of a type in a [`TypeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The invalid sentinel. Never resolves and never compares equal to a
    /// registered type's role in checking: expressions that failed to
    /// check carry it so callers can short-circuit.
    pub const INVALID: TypeId = TypeId(u32::MAX);
    /// The absent type.
    pub const NONE: TypeId = TypeId(0);
    pub const I32: TypeId = TypeId(1);
    pub const I64: TypeId = TypeId(2);
    pub const F32: TypeId = TypeId(3);
    pub const F64: TypeId = TypeId(4);

    pub fn is_valid(self) -> bool {
        self != TypeId::INVALID
    }
}

/// The shape of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    None,
    I32,
    I64,
    F32,
    F64,
    /// A named type distinct from (but represented as) its underlying type.
    Distinct,
    /// A nominal record with ordered fields.
    Record,
    /// An integer base narrowed by min/max bounds.
    Refined,
    /// A fixed-size list of a single element type.
    List,
}

/// The scalar WebAssembly type a TinyWhale type lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,
}

impl WasmType {
    pub fn is_integer(self) -> bool {
        matches!(self, WasmType::I32 | WasmType::I64)
    }
}

/// One record field, ordered by declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldInfo {
    pub name: StrId,
    pub ty: TypeId,
    pub index: u32,
}

/// Min/max bounds of a refined integer type. `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Constraints {
    pub min: Option<i128>,
    pub max: Option<i128>,
}

/// One entry in the type table.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Declared name; anonymous for refined and list types.
    pub name: Option<StrId>,
    /// The represented type. Builtins and structural types self-reference.
    pub underlying: TypeId,
    /// Declaration site; `None` for builtins and interned types without one.
    pub node: Option<NodeId>,
    pub fields: Option<Vec<FieldInfo>>,
    pub constraints: Option<Constraints>,
    pub element: Option<TypeId>,
    pub size: Option<u32>,
}

impl TypeInfo {
    fn builtin(kind: TypeKind, id: TypeId, name: Option<StrId>) -> Self {
        TypeInfo {
            kind,
            name,
            underlying: id,
            node: None,
            fields: None,
            constraints: None,
            element: None,
            size: None,
        }
    }
}

/// Dense, append-only type table with name lookup and content interning.
#[derive(Debug)]
pub struct TypeStore {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<StrId, TypeId>,
    refined: FxHashMap<(TypeId, Constraints), TypeId>,
    lists: FxHashMap<(TypeId, u32), TypeId>,
}

impl TypeStore {
    /// Create a store with the five builtins at their fixed ids.
    pub fn new(strings: &mut StringInterner) -> Self {
        let mut store = TypeStore {
            types: Vec::with_capacity(8),
            by_name: FxHashMap::default(),
            refined: FxHashMap::default(),
            lists: FxHashMap::default(),
        };
        store
            .types
            .push(TypeInfo::builtin(TypeKind::None, TypeId::NONE, None));
        for (kind, id, name) in [
            (TypeKind::I32, TypeId::I32, "i32"),
            (TypeKind::I64, TypeId::I64, "i64"),
            (TypeKind::F32, TypeId::F32, "f32"),
            (TypeKind::F64, TypeId::F64, "f64"),
        ] {
            let name = strings.intern(name);
            store.types.push(TypeInfo::builtin(kind, id, Some(name)));
            store.by_name.insert(name, id);
        }
        store
    }

    fn push(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(info);
        id
    }

    /// Fetch a type by id. The invalid sentinel never resolves.
    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        if id.is_valid() {
            self.types.get(id.0 as usize)
        } else {
            None
        }
    }

    /// Kind of a type; `None` shape for the invalid sentinel.
    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.get(id).map(|t| t.kind).unwrap_or(TypeKind::None)
    }

    /// Nominal equality: O(1) id comparison.
    pub fn are_equal(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    /// Resolve a declared name.
    pub fn lookup(&self, name: StrId) -> Option<TypeId> {
        self.by_name.get(&name).copied()
    }

    /// Register a distinct named type over an underlying type.
    pub fn register_distinct(&mut self, name: StrId, underlying: TypeId, node: NodeId) -> TypeId {
        let id = self.push(TypeInfo {
            kind: TypeKind::Distinct,
            name: Some(name),
            underlying,
            node: Some(node),
            fields: None,
            constraints: None,
            element: None,
            size: None,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Register a nominal record type with its ordered fields.
    pub fn register_record(&mut self, name: StrId, fields: Vec<FieldInfo>, node: NodeId) -> TypeId {
        let next = TypeId(self.types.len() as u32);
        let id = self.push(TypeInfo {
            kind: TypeKind::Record,
            name: Some(name),
            underlying: next,
            node: Some(node),
            fields: Some(fields),
            constraints: None,
            element: None,
            size: None,
        });
        self.by_name.insert(name, id);
        id
    }

    /// Register (or reuse) a refined integer type.
    ///
    /// Identical `(base, constraints)` pairs always return the same id;
    /// any differing component allocates a fresh distinct id.
    pub fn register_refined(
        &mut self,
        base: TypeId,
        constraints: Constraints,
        node: NodeId,
    ) -> TypeId {
        if let Some(&id) = self.refined.get(&(base, constraints)) {
            return id;
        }
        let id = self.push(TypeInfo {
            kind: TypeKind::Refined,
            name: None,
            underlying: base,
            node: Some(node),
            fields: None,
            constraints: Some(constraints),
            element: None,
            size: None,
        });
        self.refined.insert((base, constraints), id);
        id
    }

    /// Register (or reuse) a fixed-size list type.
    pub fn register_list(&mut self, element: TypeId, size: u32, node: NodeId) -> TypeId {
        if let Some(&id) = self.lists.get(&(element, size)) {
            return id;
        }
        let next = TypeId(self.types.len() as u32);
        let id = self.push(TypeInfo {
            kind: TypeKind::List,
            name: None,
            underlying: next,
            node: Some(node),
            fields: None,
            constraints: None,
            element: Some(element),
            size: Some(size),
        });
        self.lists.insert((element, size), id);
        id
    }

    /// Map a declared name onto an existing type id (pure renaming).
    pub fn register_alias(&mut self, name: StrId, target: TypeId) {
        self.by_name.insert(name, target);
    }

    /// The scalar machine type backing a type.
    ///
    /// Unwraps `Distinct` and `Refined` to their underlying primitive; a
    /// list lowers to its element's machine type (flattening puts each
    /// element in its own local). Records and the invalid sentinel have no
    /// single machine type.
    pub fn to_wasm_type(&self, id: TypeId) -> Option<WasmType> {
        let mut current = id;
        loop {
            let info = self.get(current)?;
            match info.kind {
                TypeKind::I32 => return Some(WasmType::I32),
                TypeKind::I64 => return Some(WasmType::I64),
                TypeKind::F32 => return Some(WasmType::F32),
                TypeKind::F64 => return Some(WasmType::F64),
                TypeKind::Distinct | TypeKind::Refined => current = info.underlying,
                TypeKind::List => current = info.element?,
                TypeKind::Record | TypeKind::None => return None,
            }
        }
    }

    /// Human-readable name for diagnostics.
    pub fn display(&self, id: TypeId, strings: &StringInterner) -> String {
        let Some(info) = self.get(id) else {
            return "<invalid>".to_string();
        };
        if let Some(name) = info.name {
            return strings.resolve(name).to_string();
        }
        match info.kind {
            TypeKind::Refined => {
                let base = self.display(info.underlying, strings);
                let c = info.constraints.unwrap_or_default();
                let mut parts = Vec::new();
                if let Some(min) = c.min {
                    parts.push(format!("min={min}"));
                }
                if let Some(max) = c.max {
                    parts.push(format!("max={max}"));
                }
                format!("{base}<{}>", parts.join(", "))
            }
            TypeKind::List => {
                let element = info.element.map(|e| self.display(e, strings));
                format!(
                    "{}[]<size={}>",
                    element.unwrap_or_else(|| "<invalid>".to_string()),
                    info.size.unwrap_or(0)
                )
            }
            TypeKind::None => "none".to_string(),
            _ => "<anonymous>".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate types in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId(i as u32), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (TypeStore, StringInterner) {
        let mut strings = StringInterner::new();
        let types = TypeStore::new(&mut strings);
        (types, strings)
    }

    #[test]
    fn builtins_sit_at_fixed_ids() {
        let (types, strings) = store();
        assert_eq!(types.kind(TypeId::NONE), TypeKind::None);
        assert_eq!(types.kind(TypeId::I32), TypeKind::I32);
        assert_eq!(types.kind(TypeId::I64), TypeKind::I64);
        assert_eq!(types.kind(TypeId::F32), TypeKind::F32);
        assert_eq!(types.kind(TypeId::F64), TypeKind::F64);
        assert_eq!(types.len(), 5);
        // Builtins self-reference in `underlying`.
        assert_eq!(types.get(TypeId::I32).unwrap().underlying, TypeId::I32);
        assert_eq!(types.display(TypeId::I64, &strings), "i64");
    }

    #[test]
    fn invalid_sentinel_never_resolves() {
        let (types, _) = store();
        assert!(types.get(TypeId::INVALID).is_none());
        assert!(!TypeId::INVALID.is_valid());
    }

    #[test]
    fn name_lookup_finds_builtins_and_user_types() {
        let (mut types, mut strings) = store();
        let i32_name = strings.intern("i32");
        assert_eq!(types.lookup(i32_name), Some(TypeId::I32));

        let meters = strings.intern("Meters");
        let id = types.register_distinct(meters, TypeId::I64, NodeId(0));
        assert_eq!(types.lookup(meters), Some(id));
        assert_eq!(types.kind(id), TypeKind::Distinct);
        assert_eq!(types.to_wasm_type(id), Some(WasmType::I64));
    }

    #[test]
    fn refined_types_intern_by_content() {
        let (mut types, _) = store();
        let c1 = Constraints {
            min: Some(0),
            max: Some(10),
        };
        let c2 = Constraints {
            min: Some(0),
            max: Some(11),
        };
        let a = types.register_refined(TypeId::I32, c1, NodeId(0));
        let b = types.register_refined(TypeId::I32, c1, NodeId(5));
        let c = types.register_refined(TypeId::I32, c2, NodeId(0));
        let d = types.register_refined(TypeId::I64, c1, NodeId(0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(types.to_wasm_type(a), Some(WasmType::I32));
    }

    #[test]
    fn refined_display_shows_bounds() {
        let (mut types, strings) = store();
        let id = types.register_refined(
            TypeId::I32,
            Constraints {
                min: Some(0),
                max: Some(10),
            },
            NodeId(0),
        );
        assert_eq!(types.display(id, &strings), "i32<min=0, max=10>");
    }

    #[test]
    fn list_types_intern_by_element_and_size() {
        let (mut types, _) = store();
        let a = types.register_list(TypeId::I32, 3, NodeId(0));
        let b = types.register_list(TypeId::I32, 3, NodeId(9));
        let c = types.register_list(TypeId::I32, 4, NodeId(0));
        let d = types.register_list(TypeId::I64, 3, NodeId(0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(types.to_wasm_type(a), Some(WasmType::I32));
    }

    #[test]
    fn records_are_nominal() {
        let (mut types, mut strings) = store();
        let point = strings.intern("Point");
        let x = strings.intern("x");
        let fields = vec![FieldInfo {
            name: x,
            ty: TypeId::I32,
            index: 0,
        }];
        let id = types.register_record(point, fields.clone(), NodeId(2));
        assert_eq!(types.kind(id), TypeKind::Record);
        assert_eq!(types.lookup(point), Some(id));
        assert_eq!(types.to_wasm_type(id), None);

        let other = strings.intern("Other");
        let id2 = types.register_record(other, fields, NodeId(3));
        assert!(!types.are_equal(id, id2));
    }

    #[test]
    fn alias_is_pure_renaming() {
        let (mut types, mut strings) = store();
        let alias = strings.intern("Alias");
        types.register_alias(alias, TypeId::F64);
        assert_eq!(types.lookup(alias), Some(TypeId::F64));
        // No new entry was allocated.
        assert_eq!(types.len(), 5);
    }
}
