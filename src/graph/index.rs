use std::collections::{HashMap, HashSet};
use std::fmt;

/// Fully-qualified name of a compilation unit or nested type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Queryable view of type nesting, consumed during graph consolidation.
///
/// Only the outermost enclosing unit is independently recompilable, so every
/// contributed edge endpoint is collapsed through this index before merging.
pub trait TypeIndex {
    /// The immediately enclosing type of `ty`, or `None` when `ty` is
    /// top-level or unknown to the index.
    fn enclosing_of(&self, ty: &TypeId) -> Option<TypeId>;

    /// Walk the enclosing chain to the outermost compilation unit. A type
    /// absent from the index resolves to itself — partial information must
    /// not block a consolidation pass.
    fn outermost_of(&self, ty: &TypeId) -> TypeId {
        let mut current = ty.clone();
        let mut seen: HashSet<TypeId> = HashSet::new();
        while let Some(outer) = self.enclosing_of(&current) {
            if !seen.insert(current.clone()) {
                // Malformed index with a nesting cycle; stop rather than spin.
                tracing::warn!("nesting cycle in type index at {current}");
                break;
            }
            current = outer;
        }
        current
    }
}

/// In-memory type index built once per pass from explicit nesting
/// declarations.
#[derive(Debug, Default)]
pub struct InMemoryTypeIndex {
    enclosing: HashMap<TypeId, TypeId>,
}

impl InMemoryTypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `inner` is declared inside `outer`.
    pub fn declare_nested(&mut self, inner: impl Into<TypeId>, outer: impl Into<TypeId>) {
        self.enclosing.insert(inner.into(), outer.into());
    }

    pub fn len(&self) -> usize {
        self.enclosing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enclosing.is_empty()
    }
}

impl TypeIndex for InMemoryTypeIndex {
    fn enclosing_of(&self, ty: &TypeId) -> Option<TypeId> {
        self.enclosing.get(ty).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_resolves_to_itself() {
        let index = InMemoryTypeIndex::new();
        let ty = TypeId::from("com.acme.Outer");
        assert_eq!(index.outermost_of(&ty), ty);
    }

    #[test]
    fn test_nested_chain_collapses_to_outermost() {
        let mut index = InMemoryTypeIndex::new();
        index.declare_nested("com.acme.Outer.Inner.Innermost", "com.acme.Outer.Inner");
        index.declare_nested("com.acme.Outer.Inner", "com.acme.Outer");

        assert_eq!(
            index.outermost_of(&TypeId::from("com.acme.Outer.Inner.Innermost")),
            TypeId::from("com.acme.Outer")
        );
    }

    #[test]
    fn test_unknown_type_resolves_to_itself() {
        let mut index = InMemoryTypeIndex::new();
        index.declare_nested("a.B.C", "a.B");
        assert_eq!(
            index.outermost_of(&TypeId::from("x.y.Unknown")),
            TypeId::from("x.y.Unknown")
        );
    }

    #[test]
    fn test_nesting_cycle_terminates() {
        let mut index = InMemoryTypeIndex::new();
        index.declare_nested("a.A", "a.B");
        index.declare_nested("a.B", "a.A");
        // Just must not hang; either endpoint is acceptable.
        let resolved = index.outermost_of(&TypeId::from("a.A"));
        assert!(resolved == TypeId::from("a.A") || resolved == TypeId::from("a.B"));
    }
}
