//! String and float interners.
//!
//! Identifier and literal text is deduplicated into small integer ids so
//! tokens, symbols and types can refer to names without owning strings.
//! Float literal values are interned by bit pattern (so `0.5` appears once
//! no matter how often it is written, and NaNs with the same payload share
//! an id).

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Id of an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct StrId(pub u32);

/// Id of an interned float value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct FloatId(pub u32);

/// Maps strings to dense [`StrId`]s and back.
#[derive(Debug, Default)]
pub struct StringInterner {
    map: FxHashMap<String, StrId>,
    items: Vec<String>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the existing id if it was seen before.
    pub fn intern(&mut self, text: &str) -> StrId {
        if let Some(&id) = self.map.get(text) {
            return id;
        }
        let id = StrId(self.items.len() as u32);
        self.items.push(text.to_string());
        self.map.insert(text.to_string(), id);
        id
    }

    /// Resolve an id back to its text.
    pub fn resolve(&self, id: StrId) -> &str {
        &self.items[id.0 as usize]
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Maps `f64` values to dense [`FloatId`]s, keyed by bit pattern.
#[derive(Debug, Default)]
pub struct FloatInterner {
    map: FxHashMap<u64, FloatId>,
    items: Vec<f64>,
}

impl FloatInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a float value, returning the existing id for equal bits.
    pub fn intern(&mut self, value: f64) -> FloatId {
        let bits = value.to_bits();
        if let Some(&id) = self.map.get(&bits) {
            return id;
        }
        let id = FloatId(self.items.len() as u32);
        self.items.push(value);
        self.map.insert(bits, id);
        id
    }

    /// Resolve an id back to its value.
    pub fn resolve(&self, id: FloatId) -> f64 {
        self.items[id.0 as usize]
    }

    /// Number of distinct interned values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_deduplicate() {
        let mut interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        let c = interner.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "foo");
        assert_eq!(interner.resolve(b), "bar");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn ids_are_dense_in_insertion_order() {
        let mut interner = StringInterner::new();
        assert_eq!(interner.intern("a"), StrId(0));
        assert_eq!(interner.intern("b"), StrId(1));
        assert_eq!(interner.intern("a"), StrId(0));
        assert_eq!(interner.intern("c"), StrId(2));
    }

    #[test]
    fn floats_deduplicate_by_bits() {
        let mut interner = FloatInterner::new();
        let a = interner.intern(0.5);
        let b = interner.intern(1.5);
        let c = interner.intern(0.5);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(b), 1.5);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn negative_zero_is_distinct_from_zero() {
        let mut interner = FloatInterner::new();
        let pos = interner.intern(0.0);
        let neg = interner.intern(-0.0);
        assert_ne!(pos, neg);
    }
}
