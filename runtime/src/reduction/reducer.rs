//! Density reduction: replace each cluster of nearby facilities with the
//! single real facility closest to the cluster's centroid.

use super::kmeans::{sq_dist, KMeans};
use crate::error::{PipelineError, Result};
use crate::model::{FacilityRecord, GroupKey};
use tracing::{debug, info};

/// Markers to show for a group: `max(1, len / divisor)`.
pub fn target_count(len: usize, divisor: usize) -> usize {
    (len / divisor.max(1)).max(1)
}

/// Seeded reducer. Identical input always yields identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reducer {
    pub seed: u64,
    pub restarts: usize,
}

impl Default for Reducer {
    fn default() -> Self {
        Self {
            seed: 42,
            restarts: 10,
        }
    }
}

impl Reducer {
    pub fn new(seed: u64, restarts: usize) -> Self {
        Self { seed, restarts }
    }

    /// Reduce one group to at most `target_count(records.len(), divisor)`
    /// representatives, emitted in ascending cluster order.
    ///
    /// Groups already at or below the target are returned unchanged.
    pub fn reduce(
        &self,
        group_key: &GroupKey,
        records: &[FacilityRecord],
        divisor: usize,
    ) -> Result<Vec<FacilityRecord>> {
        if divisor == 0 {
            return Err(PipelineError::InvalidDivisor {
                region: group_key.to_string(),
            });
        }

        let count = records.len();
        let target = target_count(count, divisor);
        info!("{group_key}: {count} facilities, showing {} markers", target.min(count));

        if count <= target {
            return Ok(records.to_vec());
        }

        let points: Vec<[f64; 2]> = records.iter().map(FacilityRecord::coords).collect();
        let fit = KMeans::new(target, self.seed)
            .with_restarts(self.restarts)
            .fit(&points);

        let mut best: Vec<Option<(usize, f64)>> = vec![None; fit.centroids.len()];
        for (i, (point, &cluster)) in points.iter().zip(&fit.assignments).enumerate() {
            let dist = sq_dist(point, &fit.centroids[cluster]);
            // Strict comparison: the first minimal record wins
            let closer = best[cluster].map_or(true, |(_, d)| dist < d);
            if closer {
                best[cluster] = Some((i, dist));
            }
        }

        let empty = best.iter().filter(|b| b.is_none()).count();
        if empty > 0 {
            debug!("{group_key}: {empty} empty cluster(s) contribute no marker");
        }

        Ok(best
            .into_iter()
            .flatten()
            .map(|(i, _)| records[i].clone())
            .collect())
    }
}
