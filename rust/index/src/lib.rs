pub mod config;
pub mod grouping;
pub mod quantization;
mod types;

// Re-export types

pub use types::*;
