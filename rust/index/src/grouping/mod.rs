//! Grouped top-k collection.
//!
//! Nested documents index several vectors under one parent record. During a
//! query the traversal reports every visited vector (a *leaf*); the collectors
//! here keep only the best leaf of each parent (a *group*) while still
//! returning the global top-k groups.
//!
//! - [`ParentBitmap`]: read-only set of group ids with successor lookup.
//! - [`GroupedTopKHeap`]: bounded max-heap with one slot per group.
//! - [`CollectorFactory`]: hands out one independent collector per query.
//! - [`IdSelector`]: leaf id filter applied by collectors before grouping.

mod collector;
mod heap;
mod parent_bitmap;
mod selector;

use annex_error::{AnnexError, ErrorCodes};
use thiserror::Error;

pub use collector::*;
pub use heap::*;
pub use parent_bitmap::*;
pub use selector::*;

#[derive(Error, Debug)]
pub enum GroupingError {
    #[error("Ids must be non-negative, got {0}")]
    NegativeId(i64),
}

impl AnnexError for GroupingError {
    fn code(&self) -> ErrorCodes {
        match self {
            GroupingError::NegativeId(_) => ErrorCodes::InvalidArgument,
        }
    }
}
