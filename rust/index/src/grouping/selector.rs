use roaring::RoaringTreemap;

use super::GroupingError;

/// Filter over leaf ids. Only members may enter a collector.
///
/// Backed by a roaring treemap, which picks array or bitmap containers per
/// chunk depending on how dense the ids are.
#[derive(Clone, Debug, PartialEq)]
pub struct IdSelector {
    ids: RoaringTreemap,
}

impl IdSelector {
    pub fn from_ids(ids: &[i64]) -> Result<Self, GroupingError> {
        let mut selected = RoaringTreemap::new();
        for &id in ids {
            if id < 0 {
                return Err(GroupingError::NegativeId(id));
            }
            selected.insert(id as u64);
        }
        Ok(Self { ids: selected })
    }

    pub fn is_member(&self, id: u64) -> bool {
        self.ids.contains(id)
    }

    /// Number of distinct ids selected.
    pub fn len(&self) -> u64 {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<RoaringTreemap> for IdSelector {
    fn from(ids: RoaringTreemap) -> Self {
        Self { ids }
    }
}
