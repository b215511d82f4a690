use serde::{Deserialize, Serialize};

use crate::matcher::Matches;

/// Rejection rule for correspondences.
///
/// Every filter produces one weight per match; the weights of several filters
/// are multiplied together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierFilter {
    /// Keep the `ratio` fraction of matches with the smallest distances.
    TrimmedDist {
        /// Fraction of matches to keep, in `(0, 1]`.
        ratio: f64,
    },
    /// Reject matches farther than `max_dist`.
    MaxDist {
        /// Maximum distance of a kept match.
        max_dist: f64,
    },
    /// Reject matches whose squared distance is above `median + factor * 1.4826 * MAD`.
    MedianAbsoluteDeviation {
        /// Number of robust standard deviations to accept.
        factor: f64,
    },
}

fn median(sorted: &[f64]) -> f64 {
    sorted[sorted.len() / 2]
}

impl OutlierFilter {
    /// Compute the weight of every match, 1 for kept and 0 for rejected.
    pub fn compute(&self, matches: &Matches) -> Vec<f64> {
        let n = matches.len();
        if n == 0 {
            return Vec::new();
        }

        match *self {
            OutlierFilter::TrimmedDist { ratio } => {
                let keep = ((ratio * n as f64).floor() as usize).clamp(1, n);
                let mut order = (0..n).collect::<Vec<_>>();
                // stable sort so equal distances keep the source order
                order.sort_by(|&a, &b| matches.dists[a].total_cmp(&matches.dists[b]));

                let mut weights = vec![0.0; n];
                for &i in &order[..keep] {
                    weights[i] = 1.0;
                }
                weights
            }
            OutlierFilter::MaxDist { max_dist } => {
                let limit = max_dist * max_dist;
                matches
                    .dists
                    .iter()
                    .map(|&d| if d <= limit { 1.0 } else { 0.0 })
                    .collect()
            }
            OutlierFilter::MedianAbsoluteDeviation { factor } => {
                let mut sorted = matches.dists.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let median_dist = median(&sorted);

                let mut deviations = sorted
                    .iter()
                    .map(|d| (d - median_dist).abs())
                    .collect::<Vec<_>>();
                deviations.sort_by(|a, b| a.total_cmp(b));
                let sigma = 1.4826 * median(&deviations);

                let limit = median_dist + factor * sigma;
                matches
                    .dists
                    .iter()
                    .map(|&d| if d <= limit { 1.0 } else { 0.0 })
                    .collect()
            }
        }
    }
}

/// Combine the matcher rejections and all filters into a single weight vector.
pub fn compute_weights(filters: &[OutlierFilter], matches: &Matches) -> Vec<f64> {
    let mut weights = matches.initial_weights();
    for filter in filters {
        for (w, f) in weights.iter_mut().zip(filter.compute(matches)) {
            *w *= f;
        }
    }
    weights
}
