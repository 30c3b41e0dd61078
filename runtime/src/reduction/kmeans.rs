//! Seeded k-means over 2-D coordinates.
//!
//! Centroids are initialized with k-means++ from a `StdRng` seeded by the
//! caller, and the fit is repeated `restarts` times keeping the run with the
//! lowest inertia. Same points, same `k`, same seed: same result.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Squared Euclidean distance between two coordinate pairs.
#[inline]
pub fn sq_dist(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0 * d0 + d1 * d1
}

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster id for each input point, in input order.
    pub assignments: Vec<usize>,
    pub centroids: Vec<[f64; 2]>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
}

impl KMeansFit {
    /// Indices of the points assigned to `cluster`, in input order.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, &a)| a == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// K-means configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            restarts: 10,
            max_iterations: 300,
        }
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    /// Fit `points`. `k` is clamped to `1..=points.len()`.
    pub fn fit(&self, points: &[[f64; 2]]) -> KMeansFit {
        if points.is_empty() {
            return KMeansFit {
                assignments: Vec::new(),
                centroids: Vec::new(),
                inertia: 0.0,
            };
        }

        let k = self.k.clamp(1, points.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best = lloyd(points, init_plus_plus(points, k, &mut rng), self.max_iterations);
        for _ in 1..self.restarts {
            let fit = lloyd(points, init_plus_plus(points, k, &mut rng), self.max_iterations);
            // Strict comparison: the earliest run wins ties
            if fit.inertia < best.inertia {
                best = fit;
            }
        }
        best
    }
}

/// k-means++ seeding: each new center is drawn with probability proportional
/// to its squared distance from the nearest existing center.
fn init_plus_plus(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut nearest: Vec<f64> = points.iter().map(|p| sq_dist(p, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point coincides with a center already
            rng.gen_range(0..n)
        };

        let center = points[idx];
        for (d, p) in nearest.iter_mut().zip(points) {
            let nd = sq_dist(p, &center);
            if nd < *d {
                *d = nd;
            }
        }
        centroids.push(center);
    }

    centroids
}

/// Lloyd iterations from the given starting centroids.
///
/// A cluster that loses all its points keeps its previous centroid and may
/// finish empty.
fn lloyd(points: &[[f64; 2]], mut centroids: Vec<[f64; 2]>, max_iterations: usize) -> KMeansFit {
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;

        // Assign each point to nearest centroid; lowest id wins ties
        for (i, p) in points.iter().enumerate() {
            let mut best_cluster = 0;
            let mut best_dist = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = sq_dist(p, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            if assignments[i] != best_cluster {
                assignments[i] = best_cluster;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (i, p) in points.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            sums[c][0] += p[0];
            sums[c][1] += p[1];
        }
        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64];
            }
        }
    }

    let inertia = points
        .iter()
        .zip(&assignments)
        .map(|(p, &c)| sq_dist(p, &centroids[c]))
        .sum();

    KMeansFit {
        assignments,
        centroids,
        inertia,
    }
}
