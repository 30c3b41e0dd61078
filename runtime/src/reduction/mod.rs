//! Marker density reduction: grouping, clustering, and representative selection.

pub mod kmeans;
pub mod partition;
pub mod reducer;

pub use partition::{partition, Partitions};
pub use reducer::{target_count, Reducer};
