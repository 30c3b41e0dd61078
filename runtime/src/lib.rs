//! lotmap: fetch facility locations per region, thin them with k-means, and
//! publish an interactive map alongside a CSV of the data.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod reduction;

pub use error::{ExtractError, PipelineError, Result};
