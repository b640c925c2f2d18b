use annex_error::{AnnexError, ErrorCodes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{euclidean_distance_scalar, inner_product_scalar};

/// The distance function enum.
/// # Description
/// This enum defines the metrics the query-time extensions understand.
/// # Variants
/// - `Euclidean` - The squared Euclidean (l2) distance. Smaller is closer.
/// - `InnerProduct` - The raw inner product. Larger is closer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceFunction {
    #[default]
    #[serde(rename = "l2")]
    Euclidean,
    #[serde(rename = "ip")]
    InnerProduct,
}

impl DistanceFunction {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceFunction::Euclidean => euclidean_distance_scalar(a, b),
            DistanceFunction::InnerProduct => inner_product_scalar(a, b),
        }
    }
}

#[derive(Error, Debug)]
pub enum DistanceFunctionError {
    #[error("Invalid distance function `{0}`")]
    InvalidDistanceFunction(String),
}

impl AnnexError for DistanceFunctionError {
    fn code(&self) -> ErrorCodes {
        match self {
            DistanceFunctionError::InvalidDistanceFunction(_) => ErrorCodes::InvalidArgument,
        }
    }
}

impl TryFrom<&str> for DistanceFunction {
    type Error = DistanceFunctionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "l2" => Ok(DistanceFunction::Euclidean),
            "ip" => Ok(DistanceFunction::InnerProduct),
            _ => Err(DistanceFunctionError::InvalidDistanceFunction(
                value.to_string(),
            )),
        }
    }
}

impl From<DistanceFunction> for String {
    fn from(value: DistanceFunction) -> Self {
        match value {
            DistanceFunction::Euclidean => "l2".to_string(),
            DistanceFunction::InnerProduct => "ip".to_string(),
        }
    }
}
