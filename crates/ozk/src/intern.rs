//! Identifier and atom interning.
//!
//! Source-level names (identifiers and atom spellings) are interned once
//! while the program is prepared; the interpreter afterwards works with
//! `NameId` values. Lookups back to the string are needed only for error
//! messages and value rendering.

use ahash::AHashMap;

/// Index into the interner's name storage.
///
/// Uses `u32` to save space; programs with four billion distinct names are
/// not a concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NameId(u32);

impl NameId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner for identifier and atom spellings.
///
/// Owned by the prepared program; both the storage and the reverse index
/// are serialized so a loaded program can still resolve names.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct Interns {
    names: Vec<Box<str>>,
    index: AHashMap<Box<str>, NameId>,
}

impl Interns {
    /// Interns `name`, returning the existing id when it was seen before.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = NameId(u32::try_from(self.names.len()).expect("interner overflow"));
        self.names.push(name.into());
        self.index.insert(name.into(), id);
        id
    }

    /// Resolves an id back to its spelling.
    pub fn get(&self, id: NameId) -> &str {
        &self.names[id.index()]
    }

    /// Looks up the id of a spelling interned earlier, if any.
    pub fn lookup(&self, name: &str) -> Option<NameId> {
        self.index.get(name).copied()
    }
}
