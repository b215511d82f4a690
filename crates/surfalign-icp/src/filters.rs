use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pointcloud::DataPoints;

/// Filters applied once to a point cloud before the iterations start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DataPointsFilter {
    /// Remove points whose distance to the origin is below `min_dist`.
    MinDist {
        /// Minimum euclidean norm of a kept point.
        min_dist: f64,
    },
    /// Keep every point independently with probability `prob`.
    RandomSampling {
        /// Probability of keeping a point, in `[0, 1]`.
        prob: f64,
    },
}

impl DataPointsFilter {
    /// Minimum distance filter with the default threshold of `1e-9`.
    pub fn min_dist() -> Self {
        DataPointsFilter::MinDist { min_dist: 1e-9 }
    }

    /// Random sampling filter with the default keep probability of `0.5`.
    pub fn random_sampling() -> Self {
        DataPointsFilter::RandomSampling { prob: 0.5 }
    }

    /// Apply the filter and return the kept points.
    ///
    /// # Arguments
    ///
    /// * `cloud` - The input point cloud.
    /// * `rng` - Random source for the sampling filter.
    pub fn apply<R: Rng + ?Sized>(&self, cloud: &DataPoints, rng: &mut R) -> DataPoints {
        let kept = match *self {
            DataPointsFilter::MinDist { min_dist } => (0..cloud.len())
                .filter(|&j| cloud.point(j).length() >= min_dist)
                .collect::<Vec<_>>(),
            DataPointsFilter::RandomSampling { prob } => {
                let prob = prob.clamp(0.0, 1.0);
                (0..cloud.len())
                    .filter(|_| rng.random_bool(prob))
                    .collect::<Vec<_>>()
            }
        };

        log::debug!("{:?}: kept {} of {} points", self, kept.len(), cloud.len());

        cloud.select(&kept)
    }
}

/// Apply a chain of filters in order.
pub fn apply_filters<R: Rng + ?Sized>(
    filters: &[DataPointsFilter],
    cloud: &DataPoints,
    rng: &mut R,
) -> DataPoints {
    filters
        .iter()
        .fold(cloud.clone(), |acc, filter| filter.apply(&acc, rng))
}
