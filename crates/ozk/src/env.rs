//! Lexical environments.
//!
//! An environment maps identifiers to store slots and is immutable from a
//! statement's viewpoint: a child scope gets a fresh mapping, so sibling
//! frames and captured closures always keep their pre-extension view.
//! Extension copies the underlying map; frames sharing an unextended
//! environment share it through the `Arc`.

use std::sync::Arc;

use ahash::AHashMap;

use crate::{intern::NameId, store::Slot};

#[derive(Debug, Clone, Default)]
pub(crate) struct Env(Arc<AHashMap<NameId, Slot>>);

impl Env {
    /// Resolves an identifier to its slot.
    ///
    /// Prepare rejects programs with free identifiers, so by the time a
    /// statement runs its environment covers every name it mentions.
    pub fn lookup(&self, name: NameId) -> Slot {
        *self
            .0
            .get(&name)
            .expect("identifier not in environment despite prepare-time check")
    }

    /// `self` extended with `name -> slot`, shadowing any outer binding.
    #[must_use]
    pub fn bind_new(&self, name: NameId, slot: Slot) -> Self {
        let mut map = (*self.0).clone();
        map.insert(name, slot);
        Self(Arc::new(map))
    }

    /// `self` extended with every pair, shadowing outer bindings.
    #[must_use]
    pub fn bind_all(&self, pairs: impl IntoIterator<Item = (NameId, Slot)>) -> Self {
        let mut map = (*self.0).clone();
        map.extend(pairs);
        Self(Arc::new(map))
    }

    /// The restriction of `self` to exactly `names`; used to build a
    /// procedure's capture environment from its free-identifier set.
    #[must_use]
    pub fn restrict(&self, names: &[NameId]) -> Self {
        Self(Arc::new(names.iter().map(|name| (*name, self.lookup(*name))).collect()))
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<NameId> {
        let mut names: Vec<NameId> = self.0.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
