//! Entity kinds
//!
//! Kinds classify entities with single inheritance: a kind set of the world
//! contains the entities of that kind and of all kinds descending from it.
//! Every kind descends from the root kind `"Entity"`.

use rustc_hash::FxHashMap;

use super::KindId;
use crate::error::{GreaseError, Result};

#[derive(Debug, Clone)]
struct KindInfo {
    name: String,
    parent: Option<KindId>,
}

/// Registry of entity kinds for one world.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: Vec<KindInfo>,
    by_name: FxHashMap<String, KindId>,
}

impl KindRegistry {
    /// Name of the root kind
    pub const ROOT_NAME: &'static str = "Entity";

    /// Create a registry holding only the root kind
    #[must_use]
    pub fn new() -> Self {
        let mut by_name = FxHashMap::default();
        by_name.insert(Self::ROOT_NAME.to_string(), KindId::ROOT);
        Self {
            kinds: vec![KindInfo {
                name: Self::ROOT_NAME.to_string(),
                parent: None,
            }],
            by_name,
        }
    }

    /// Register a kind under `parent`. Registering an existing name returns
    /// its id unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKindId`] if the parent does not exist.
    pub fn register(&mut self, name: &str, parent: KindId) -> Result<KindId> {
        if let Some(&existing) = self.by_name.get(name) {
            return Ok(existing);
        }
        self.check(parent)?;
        let id = KindId(self.kinds.len() as u32);
        self.kinds.push(KindInfo {
            name: name.to_string(),
            parent: Some(parent),
        });
        self.by_name.insert(name.to_string(), id);
        log::debug!("Registered entity kind {name} as {}", id.0);
        Ok(id)
    }

    /// Fail unless `kind` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKindId`] for unregistered kinds.
    pub fn check(&self, kind: KindId) -> Result<()> {
        if (kind.0 as usize) < self.kinds.len() {
            Ok(())
        } else {
            Err(GreaseError::UnknownKindId(kind.0))
        }
    }

    /// Look up a kind by name.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKind`] if no kind has this name.
    pub fn by_name(&self, name: &str) -> Result<KindId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| GreaseError::UnknownKind(name.to_string()))
    }

    /// Name of a kind
    #[must_use]
    pub fn name(&self, kind: KindId) -> Option<&str> {
        self.kinds.get(kind.0 as usize).map(|info| info.name.as_str())
    }

    /// The kind followed by each of its ancestors, ending at the root.
    pub fn lineage(&self, kind: KindId) -> impl Iterator<Item = KindId> + '_ {
        let start = self.kinds.get(kind.0 as usize).map(|_| kind);
        std::iter::successors(start, move |k| self.kinds[k.0 as usize].parent)
    }

    /// Check if `kind` is `ancestor` or descends from it
    #[must_use]
    pub fn is_a(&self, kind: KindId, ancestor: KindId) -> bool {
        self.lineage(kind).any(|k| k == ancestor)
    }

    /// Number of registered kinds, including the root
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Always false: the root kind is always registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_kind() {
        let kinds = KindRegistry::new();
        assert_eq!(kinds.by_name("Entity"), Ok(KindId::ROOT));
        assert_eq!(kinds.lineage(KindId::ROOT).collect::<Vec<_>>(), vec![KindId::ROOT]);
    }

    #[test]
    fn test_lineage_and_is_a() {
        let mut kinds = KindRegistry::new();
        let ship = kinds.register("Ship", KindId::ROOT).unwrap();
        let player = kinds.register("PlayerShip", ship).unwrap();
        let rock = kinds.register("Asteroid", KindId::ROOT).unwrap();

        assert_eq!(
            kinds.lineage(player).collect::<Vec<_>>(),
            vec![player, ship, KindId::ROOT]
        );
        assert!(kinds.is_a(player, ship));
        assert!(!kinds.is_a(rock, ship));
        assert_eq!(kinds.name(player), Some("PlayerShip"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut kinds = KindRegistry::new();
        let a = kinds.register("Bullet", KindId::ROOT).unwrap();
        assert_eq!(kinds.register("Bullet", KindId::ROOT).unwrap(), a);
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn test_unknown_parent() {
        let mut kinds = KindRegistry::new();
        assert_eq!(
            kinds.register("Orphan", KindId(42)),
            Err(GreaseError::UnknownKindId(42))
        );
        assert!(kinds.by_name("Orphan").is_err());
        assert_eq!(kinds.lineage(KindId(42)).count(), 0);
    }
}
