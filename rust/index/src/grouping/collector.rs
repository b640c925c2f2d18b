use std::sync::Arc;

use super::{GroupedTopKHeap, IdSelector, ParentBitmap};
use crate::config::CollectorConfig;
use crate::Neighbor;

/// Sink the host traversal feeds candidates into during one query.
pub trait ResultCollector: Send {
    /// Offers a candidate. `k == 0` is a no-op.
    fn collect(&mut self, k: usize, leaf_id: u64, distance: f32);

    /// Ends collection and returns up to `k` unordered results. Collecting
    /// after this call is a misuse.
    fn finalize(&mut self) -> Vec<Neighbor>;

    /// Clears all state so a pooled collector can serve another query.
    fn reset(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collector backed by a [`GroupedTopKHeap`], translating internal leaf ids to
/// external ids on `finalize` when a translation table is present. With a
/// filter, leaves outside the [`IdSelector`] are dropped before grouping.
#[derive(Debug)]
pub struct GroupedCollector {
    heap: GroupedTopKHeap,
    id_map: Option<Arc<[u64]>>,
    filter: Option<Arc<IdSelector>>,
}

impl GroupedCollector {
    pub fn new(parents: Option<Arc<ParentBitmap>>, id_map: Option<Arc<[u64]>>) -> Self {
        Self {
            heap: GroupedTopKHeap::new(parents),
            id_map,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<Arc<IdSelector>>) -> Self {
        self.filter = filter;
        self
    }

    pub fn heap(&self) -> &GroupedTopKHeap {
        &self.heap
    }
}

impl ResultCollector for GroupedCollector {
    fn collect(&mut self, k: usize, leaf_id: u64, distance: f32) {
        if let Some(filter) = &self.filter {
            if !filter.is_member(leaf_id) {
                return;
            }
        }
        self.heap.collect(k, leaf_id, distance);
    }

    fn finalize(&mut self) -> Vec<Neighbor> {
        let mut results = self.heap.finalize();
        if let Some(id_map) = &self.id_map {
            for result in results.iter_mut() {
                // Leaves outside the table keep their internal id.
                if let Some(&external_id) = usize::try_from(result.id)
                    .ok()
                    .and_then(|index| id_map.get(index))
                {
                    result.id = external_id;
                }
            }
        }
        results
    }

    fn reset(&mut self) {
        self.heap.reset();
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Produces one fresh collector per query.
///
/// The parent bitmap, the id translation table and the optional leaf filter
/// are shared by reference count and never copied; collectors only read them. The factory itself holds
/// no mutable state, so `new_collector` may be called from any number of query
/// threads at once.
#[derive(Clone, Debug, Default)]
pub struct CollectorFactory {
    parents: Option<Arc<ParentBitmap>>,
    id_map: Option<Arc<[u64]>>,
    filter: Option<Arc<IdSelector>>,
}

impl CollectorFactory {
    pub fn new(parents: Option<Arc<ParentBitmap>>, id_map: Option<Arc<[u64]>>) -> Self {
        tracing::debug!(
            grouped = parents.is_some(),
            groups = parents.as_ref().map(|p| p.len()).unwrap_or_default(),
            translated = id_map.is_some(),
            "Created collector factory"
        );
        Self {
            parents,
            id_map,
            filter: None,
        }
    }

    /// Restricts every collector from this factory to leaves in `filter`.
    pub fn with_filter(mut self, filter: Arc<IdSelector>) -> Self {
        tracing::debug!(selected = filter.len(), "Attached leaf filter");
        self.filter = Some(filter);
        self
    }

    pub fn ungrouped() -> Self {
        Self::new(None, None)
    }

    /// Builds a factory honoring `grouping_enabled`: when grouping is turned
    /// off the parent bitmap is ignored and every leaf is its own group.
    pub fn from_config(
        config: &CollectorConfig,
        parents: Option<Arc<ParentBitmap>>,
        id_map: Option<Arc<[u64]>>,
    ) -> Self {
        let parents = parents.filter(|_| config.grouping_enabled);
        Self::new(parents, id_map)
    }

    pub fn new_collector(&self) -> Box<dyn ResultCollector> {
        Box::new(
            GroupedCollector::new(self.parents.clone(), self.id_map.clone())
                .with_filter(self.filter.clone()),
        )
    }

    /// Releases a collector's own state. The shared bitmap stays alive for as
    /// long as its owner holds it.
    pub fn delete_collector(&self, collector: Box<dyn ResultCollector>) {
        drop(collector);
    }

    pub fn parents(&self) -> Option<&Arc<ParentBitmap>> {
        self.parents.as_ref()
    }

    pub fn filter(&self) -> Option<&Arc<IdSelector>> {
        self.filter.as_ref()
    }
}
