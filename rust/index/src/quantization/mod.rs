//! Asymmetric distance computation over 1-bit binary codes.
//!
//! Every coordinate of a stored vector is a single bit. A query stays in full
//! precision, so the distance to a code is
//!
//! ```text
//! L2:           Σ (q[i] - b[i])² = Σ q[i]² + Σ b[i] · (1 - 2·q[i])
//! InnerProduct: Σ q[i] · b[i]
//! ```
//!
//! The sum over set bits splits into independent bytes. For each byte of the
//! code we precompute all 256 partial sums once per query, so scoring a code is
//! one table lookup per 8 dimensions.
//!
//! ## Bit order
//!
//! Coordinate `8·batch + p` is stored in byte `batch` at bit `7 - p`
//! (most significant bit first). [`pack_bits`] and [`unpack_bits`] implement
//! this convention.
//!
//! This module contains:
//! - [`BinaryCodeStore`]: read-only, row-major view over packed codes.
//! - [`AdcDistanceComputer`]: per-query lookup tables and scoring.

mod adc;
mod code_store;

use annex_error::{AnnexError, ErrorCodes};
use thiserror::Error;

pub use adc::{AdcDistanceComputer, QueryDistanceComputer};
pub use code_store::{pack_bits, unpack_bits, BinaryCodeStore};

#[derive(Error, Debug)]
pub enum AdcError {
    #[error("Dimension must be a positive multiple of 8, got {0}")]
    InvalidDimension(usize),
    #[error("Code buffer of {len} bytes is not a multiple of the code size {code_size}")]
    MisalignedCodes { len: usize, code_size: usize },
    #[error("Query has dimension {got}, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

impl AnnexError for AdcError {
    fn code(&self) -> ErrorCodes {
        match self {
            AdcError::InvalidDimension(_) => ErrorCodes::InvalidArgument,
            AdcError::MisalignedCodes { .. } => ErrorCodes::InvalidArgument,
            AdcError::DimensionMismatch { .. } => ErrorCodes::InvalidArgument,
            AdcError::UnsupportedOperation(_) => ErrorCodes::Unimplemented,
        }
    }
}
