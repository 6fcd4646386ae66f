//! Per-operation memo of source parts already resolved in the target.

use crate::ooxml::opc::PackURI;
use std::collections::{HashMap, HashSet};

/// Maps a source part to the target part standing in for it.
///
/// One cache lives for one top-level copy operation, so a master, layout,
/// theme or media part reachable from several slides is resolved once.
/// Source masters resolved by theme match rather than by copy are also
/// remembered, since their layouts are then matched by name.
#[derive(Debug, Default)]
pub(crate) struct IdentityCache {
    parts: HashMap<PackURI, PackURI>,
    reused_masters: HashSet<PackURI>,
}

impl IdentityCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, source: &PackURI) -> Option<&PackURI> {
        self.parts.get(source)
    }

    /// Record the target counterpart of a source part.
    pub(crate) fn insert(&mut self, source: PackURI, target: PackURI) {
        self.parts.insert(source, target);
    }

    /// Record a source master resolved to an existing target master.
    pub(crate) fn insert_reused_master(&mut self, source: PackURI, target: PackURI) {
        self.reused_masters.insert(source.clone());
        self.parts.insert(source, target);
    }

    pub(crate) fn is_reused_master(&self, source: &PackURI) -> bool {
        self.reused_masters.contains(source)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.parts.len()
    }
}
