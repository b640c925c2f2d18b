use super::GroupingError;

const WORD_BITS: u64 = 64;

/// Immutable set of group (parent) ids stored as 64-bit words.
///
/// Built once per query from the host's parent id list and shared read-only by
/// every collector of that query. Bit `i` lives in word `i / 64` at position
/// `i % 64`, so a successor scan is a shift plus `trailing_zeros`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParentBitmap {
    words: Vec<u64>,
    num_bits: u64,
    len: usize,
}

impl ParentBitmap {
    /// Builds the bitmap from an ordered or unordered id list. Duplicates are
    /// harmless. `num_bits` is `max(id) + 1`, or zero for an empty list.
    pub fn build(ids: &[i64]) -> Result<Self, GroupingError> {
        let mut max_id = None;
        for &id in ids {
            if id < 0 {
                return Err(GroupingError::NegativeId(id));
            }
            max_id = max_id.max(Some(id as u64));
        }
        let Some(max_id) = max_id else {
            return Ok(Self::default());
        };

        let num_bits = max_id + 1;
        let mut words = vec![0u64; num_bits.div_ceil(WORD_BITS) as usize];
        for &id in ids {
            let id = id as u64;
            words[(id / WORD_BITS) as usize] |= 1u64 << (id % WORD_BITS);
        }
        let len = words.iter().map(|word| word.count_ones() as usize).sum();

        Ok(Self {
            words,
            num_bits,
            len,
        })
    }

    /// Returns the smallest set id `>= from_index`, or `None` when there is no
    /// such id. Any `from_index >= num_bits` yields `None`.
    ///
    /// O(1) when the answer shares a word with `from_index`, O(num_words) worst case.
    pub fn next_set_bit(&self, from_index: u64) -> Option<u64> {
        if from_index >= self.num_bits {
            return None;
        }
        let word_index = (from_index / WORD_BITS) as usize;
        let shifted = self.words[word_index] >> (from_index % WORD_BITS);
        if shifted != 0 {
            return Some(from_index + shifted.trailing_zeros() as u64);
        }
        self.words[word_index + 1..]
            .iter()
            .enumerate()
            .find(|&(_, &word)| word != 0)
            .map(|(offset, word)| {
                (word_index + 1 + offset) as u64 * WORD_BITS + word.trailing_zeros() as u64
            })
    }

    /// The group that owns `leaf_id`. Parents are laid out after their children,
    /// so this is the first set id strictly greater than the leaf.
    pub fn parent_of(&self, leaf_id: u64) -> Option<u64> {
        leaf_id
            .checked_add(1)
            .and_then(|from_index| self.next_set_bit(from_index))
    }

    pub fn contains(&self, id: u64) -> bool {
        id < self.num_bits
            && self.words[(id / WORD_BITS) as usize] & (1u64 << (id % WORD_BITS)) != 0
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of distinct ids in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::successors(self.next_set_bit(0), move |&id| self.parent_of(id))
    }
}
