use annex_distance::DistanceFunction;

use super::{AdcError, BinaryCodeStore};
use crate::config::AdcConfig;

const TABLE_SIZE: usize = 256;

/// Scores stored codes against one full-precision query at a time.
pub trait QueryDistanceComputer {
    /// Prepares the computer for `query`. Replaces any previous query.
    fn set_query(&mut self, query: &[f32]) -> Result<(), AdcError>;

    /// Distance from the current query to one packed code.
    fn distance_to_code(&self, code: &[u8]) -> f32;

    /// Distance between two stored codes.
    fn symmetric_distance(&self, i: usize, j: usize) -> Result<f32, AdcError>;
}

/// Per-coordinate contribution of a set bit, fixed once per metric.
#[derive(Clone, Copy, Debug)]
enum BitScoring {
    /// `(q - b)² = q² + b · (1 - 2q)` for `b ∈ {0, 1}`.
    Euclidean,
    /// `q · b`.
    InnerProduct,
}

impl BitScoring {
    fn coordinate_score(&self, value: f32) -> f32 {
        match self {
            BitScoring::Euclidean => 1.0 - 2.0 * value,
            BitScoring::InnerProduct => value,
        }
    }

    fn correction(&self, query: &[f32]) -> f32 {
        match self {
            BitScoring::Euclidean => query.iter().map(|v| v * v).sum(),
            BitScoring::InnerProduct => 0.0,
        }
    }
}

impl From<DistanceFunction> for BitScoring {
    fn from(distance_function: DistanceFunction) -> Self {
        match distance_function {
            DistanceFunction::Euclidean => BitScoring::Euclidean,
            DistanceFunction::InnerProduct => BitScoring::InnerProduct,
        }
    }
}

/// Asymmetric distance computer over a [`BinaryCodeStore`].
///
/// `set_query` builds one 256-entry table per byte of code: `table[b][v]` is
/// the summed score of the coordinates whose bits are set in byte value `v`.
/// Scoring a code is then `dimension / 8` lookups plus a per-query constant.
///
/// A computer serves one query thread. It may be reused for further queries
/// through `set_query` or `reset`.
#[derive(Debug)]
pub struct AdcDistanceComputer<'a, T> {
    store: &'a BinaryCodeStore<T>,
    scoring: BitScoring,
    coordinate_scores: Vec<f32>,
    table: Vec<f32>,
    correction: f32,
    query_set: bool,
}

impl<'a, T: AsRef<[u8]>> AdcDistanceComputer<'a, T> {
    pub fn new(store: &'a BinaryCodeStore<T>, distance_function: DistanceFunction) -> Self {
        tracing::debug!(
            dimension = store.dimension(),
            codes = store.len(),
            distance_function = %String::from(distance_function),
            "Created ADC distance computer"
        );
        Self {
            store,
            scoring: distance_function.into(),
            coordinate_scores: Vec::with_capacity(store.dimension()),
            table: Vec::with_capacity(store.code_size() * TABLE_SIZE),
            correction: 0.0,
            query_set: false,
        }
    }

    /// Builds a computer for the configured metric. The store must have the
    /// configured dimension.
    pub fn from_config(store: &'a BinaryCodeStore<T>, config: &AdcConfig) -> Result<Self, AdcError> {
        if store.dimension() != config.dimension {
            return Err(AdcError::DimensionMismatch {
                expected: config.dimension,
                got: store.dimension(),
            });
        }
        Ok(Self::new(store, config.distance_function))
    }

    pub fn store(&self) -> &BinaryCodeStore<T> {
        self.store
    }

    pub fn has_query(&self) -> bool {
        self.query_set
    }

    /// Distance from the current query to stored vector `index`, or `None`
    /// past the end of the store.
    pub fn distance_to_index(&self, index: usize) -> Option<f32> {
        self.store
            .code(index)
            .map(|code| self.distance_to_code(code))
    }

    /// Scores four stored vectors in one pass over the tables, the shape in
    /// which graph traversal visits neighbor lists. Returns `None` if any
    /// index is past the end of the store.
    pub fn distances_batch_4(&self, indices: [usize; 4]) -> Option<[f32; 4]> {
        debug_assert!(self.query_set, "set_query must be called before scoring");
        let codes = [
            self.store.code(indices[0])?,
            self.store.code(indices[1])?,
            self.store.code(indices[2])?,
            self.store.code(indices[3])?,
        ];

        let mut sums = [0.0f32; 4];
        for (batch, table) in self.table.chunks_exact(TABLE_SIZE).enumerate() {
            for (sum, code) in sums.iter_mut().zip(codes.iter()) {
                *sum += table[code[batch] as usize];
            }
        }
        Some(sums.map(|sum| sum + self.correction))
    }

    /// Drops the current query. The next `set_query` rebuilds everything.
    pub fn reset(&mut self) {
        self.coordinate_scores.clear();
        self.table.clear();
        self.correction = 0.0;
        self.query_set = false;
    }

    fn build_tables(&mut self) {
        self.table.clear();
        self.table.resize(self.store.code_size() * TABLE_SIZE, 0.0);
        for (batch, table) in self.table.chunks_exact_mut(TABLE_SIZE).enumerate() {
            let scores = &self.coordinate_scores[batch * 8..batch * 8 + 8];
            // Byte bit `i` holds coordinate `7 - i`. Every value with top bit
            // `i` extends an already filled value below `1 << i`.
            for i in 0..8 {
                let high = 1usize << i;
                let score = scores[7 - i];
                for suffix in 0..high {
                    table[high | suffix] = table[suffix] + score;
                }
            }
        }
    }
}

impl<T: AsRef<[u8]>> QueryDistanceComputer for AdcDistanceComputer<'_, T> {
    fn set_query(&mut self, query: &[f32]) -> Result<(), AdcError> {
        if query.len() != self.store.dimension() {
            return Err(AdcError::DimensionMismatch {
                expected: self.store.dimension(),
                got: query.len(),
            });
        }
        let scoring = self.scoring;
        self.coordinate_scores.clear();
        self.coordinate_scores
            .extend(query.iter().map(|&value| scoring.coordinate_score(value)));
        self.correction = scoring.correction(query);
        self.build_tables();
        self.query_set = true;
        Ok(())
    }

    fn distance_to_code(&self, code: &[u8]) -> f32 {
        debug_assert!(self.query_set, "set_query must be called before scoring");
        debug_assert_eq!(code.len(), self.store.code_size());

        let mut sums = [0.0f32; 4];
        let mut tables = self.table.chunks_exact(4 * TABLE_SIZE);
        let mut bytes = code.chunks_exact(4);
        for (table, byte) in tables.by_ref().zip(bytes.by_ref()) {
            sums[0] += table[byte[0] as usize];
            sums[1] += table[TABLE_SIZE + byte[1] as usize];
            sums[2] += table[2 * TABLE_SIZE + byte[2] as usize];
            sums[3] += table[3 * TABLE_SIZE + byte[3] as usize];
        }
        for (table, &byte) in tables
            .remainder()
            .chunks_exact(TABLE_SIZE)
            .zip(bytes.remainder())
        {
            sums[0] += table[byte as usize];
        }
        sums[0] + sums[1] + sums[2] + sums[3] + self.correction
    }

    fn symmetric_distance(&self, _i: usize, _j: usize) -> Result<f32, AdcError> {
        Err(AdcError::UnsupportedOperation(
            "symmetric distance between binary codes",
        ))
    }
}
