use kiddo::immutable::float::kdtree::ImmutableKdTree;
use serde::{Deserialize, Serialize};

use crate::pointcloud::DataPoints;

/// Parameters of the k-d tree matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeMatcherParams {
    /// Matches farther than this distance are rejected.
    pub max_dist: f64,
}

impl Default for KdTreeMatcherParams {
    fn default() -> Self {
        Self {
            max_dist: f64::INFINITY,
        }
    }
}

/// Nearest neighbor search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Matcher {
    /// Exact single nearest neighbor with a k-d tree.
    KdTree(KdTreeMatcherParams),
    /// Exact linear scan over the reference, mostly useful for testing.
    BruteForce,
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::KdTree(KdTreeMatcherParams::default())
    }
}

/// Correspondences from every source point to its nearest reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct Matches {
    /// Index of the matched reference point, one per source point.
    pub ids: Vec<usize>,
    /// Squared distance to the matched reference point.
    pub dists: Vec<f64>,
    max_dist_sq: f64,
}

impl Matches {
    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if there are no correspondences.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Weight of every match: zero when rejected by the matcher distance limit.
    pub fn initial_weights(&self) -> Vec<f64> {
        self.dists
            .iter()
            .map(|&d| if d <= self.max_dist_sq { 1.0 } else { 0.0 })
            .collect()
    }
}

enum Index {
    KdTree(ImmutableKdTree<f64, u32, 3, 32>),
    BruteForce,
}

/// A search structure built over a reference point cloud.
pub struct MatcherIndex {
    index: Index,
    reference: Vec<[f64; 3]>,
    max_dist_sq: f64,
}

impl Matcher {
    /// Build the search structure over the reference cloud.
    pub fn build(&self, reference: &DataPoints) -> MatcherIndex {
        let points = reference.to_points();
        match self {
            Matcher::KdTree(params) => MatcherIndex {
                index: Index::KdTree(ImmutableKdTree::new_from_slice(&points)),
                reference: points,
                max_dist_sq: params.max_dist * params.max_dist,
            },
            Matcher::BruteForce => MatcherIndex {
                index: Index::BruteForce,
                reference: points,
                max_dist_sq: f64::INFINITY,
            },
        }
    }
}

impl MatcherIndex {
    /// Number of indexed reference points.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// Check if the index holds no reference point.
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Find the nearest reference point of every source point.
    pub fn find(&self, source: &DataPoints) -> Matches {
        let mut ids = Vec::with_capacity(source.len());
        let mut dists = Vec::with_capacity(source.len());

        for j in 0..source.len() {
            let query = source.point(j).to_array();
            let (id, dist) = match &self.index {
                Index::KdTree(tree) => {
                    let nn = tree.nearest_one::<kiddo::SquaredEuclidean>(&query);
                    (nn.item as usize, nn.distance)
                }
                Index::BruteForce => brute_force_nearest(&self.reference, &query),
            };
            ids.push(id);
            dists.push(dist);
        }

        Matches {
            ids,
            dists,
            max_dist_sq: self.max_dist_sq,
        }
    }
}

// first index wins on ties
fn brute_force_nearest(reference: &[[f64; 3]], query: &[f64; 3]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, p) in reference.iter().enumerate() {
        let d = (p[0] - query[0]).powi(2) + (p[1] - query[1]).powi(2) + (p[2] - query[2]).powi(2);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_points(n: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
        (0..n)
            .map(|_| [rng.random::<f64>(), rng.random::<f64>(), rng.random::<f64>()])
            .collect()
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(11);
        let reference = DataPoints::from_points(&random_points(500, &mut rng));
        let source = DataPoints::from_points(&random_points(100, &mut rng));

        let kd = Matcher::default().build(&reference).find(&source);
        let bf = Matcher::BruteForce.build(&reference).find(&source);

        assert_eq!(kd.len(), 100);
        for j in 0..kd.len() {
            assert_relative_eq!(kd.dists[j], bf.dists[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let cloud = DataPoints::from_points(&points);
        let matches = Matcher::default().build(&cloud).find(&cloud);
        assert_eq!(matches.ids, vec![0, 1, 2]);
        assert!(matches.dists.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_brute_force_ties_lowest_index() {
        let reference = DataPoints::from_points(&[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]);
        let source = DataPoints::from_points(&[[0.0, 0.0, 0.0]]);
        let matches = Matcher::BruteForce.build(&reference).find(&source);
        assert_eq!(matches.ids, vec![0]);
        assert_relative_eq!(matches.dists[0], 1.0);
    }

    #[test]
    fn test_max_dist_rejects() {
        let reference = DataPoints::from_points(&[[0.0, 0.0, 0.0]]);
        let source = DataPoints::from_points(&[[0.5, 0.0, 0.0], [3.0, 0.0, 0.0]]);
        let matcher = Matcher::KdTree(KdTreeMatcherParams { max_dist: 1.0 });
        let matches = matcher.build(&reference).find(&source);
        assert_eq!(matches.initial_weights(), vec![1.0, 0.0]);
    }
}
