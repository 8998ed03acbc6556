//! The scope store.
//!
//! A single root scope is created when checking starts; nested scopes are
//! reserved for function bodies. `reachable` is the only field ever
//! mutated after creation: a `panic` flips it off and every later
//! statement in the scope is flagged.

/// Id of a scope in a [`ScopeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ScopeId(pub u32);

/// One lexical scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub reachable: bool,
}

/// Dense scope storage.
#[derive(Debug, Default)]
pub struct ScopeStore {
    scopes: Vec<Scope>,
}

impl ScopeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new scope, reachable by default.
    pub fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            reachable: true,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Mark a scope (un)reachable.
    pub fn set_reachable(&mut self, id: ScopeId, reachable: bool) {
        self.scopes[id.0 as usize].reachable = reachable;
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_starts_reachable() {
        let mut scopes = ScopeStore::new();
        let root = scopes.push(None);
        assert!(scopes.get(root).reachable);
        assert_eq!(scopes.get(root).parent, None);
    }

    #[test]
    fn reachability_toggles() {
        let mut scopes = ScopeStore::new();
        let root = scopes.push(None);
        scopes.set_reachable(root, false);
        assert!(!scopes.get(root).reachable);
    }

    #[test]
    fn child_scopes_link_to_parents() {
        let mut scopes = ScopeStore::new();
        let root = scopes.push(None);
        let child = scopes.push(Some(root));
        assert_eq!(scopes.get(child).parent, Some(root));
    }
}
