//! Read-only published copy of a world's network.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use starlight_shared::BlockPos;

use super::source::IndependentCrystalSource;

#[derive(Default)]
struct Published {
    sources: HashMap<BlockPos, IndependentCrystalSource>,
    revision: u64,
}

/// Shared handle to the last published network state.
///
/// Cloning is cheap and every clone sees the same publication. Readers off
/// the simulation thread get a consistent but possibly one step old view.
#[derive(Clone, Default)]
pub struct NetworkView {
    inner: Arc<RwLock<Published>>,
}

impl NetworkView {
    pub(crate) fn publish(&self, sources: HashMap<BlockPos, IndependentCrystalSource>) {
        let mut published = self.inner.write();
        published.sources = sources;
        published.revision += 1;
    }

    /// Enhancement flag of the source at `pos`, if one is published.
    #[must_use]
    pub fn is_enhanced(&self, pos: BlockPos) -> Option<bool> {
        self.inner.read().sources.get(&pos).map(IndependentCrystalSource::is_enhanced)
    }

    /// Copy of the source at `pos`.
    #[must_use]
    pub fn source(&self, pos: BlockPos) -> Option<IndependentCrystalSource> {
        self.inner.read().sources.get(&pos).cloned()
    }

    /// Number of published sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().sources.len()
    }

    /// True if nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().sources.is_empty()
    }

    /// Publication counter; 0 before the first publish.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }
}
