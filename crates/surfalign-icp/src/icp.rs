use glam::DMat4;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    checker::{CheckOutcome, ConvergenceController, TransformationChecker},
    filters::{apply_filters, DataPointsFilter},
    matcher::Matcher,
    minimizer::ErrorMinimizer,
    outlier::{compute_weights, OutlierFilter},
    pointcloud::DataPoints,
    IcpError,
};

/// Result of an ICP run.
///
/// The transform maps reading points into the reference frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpOutcome {
    /// Estimated transform from the reading to the reference frame.
    pub transform: DMat4,
    /// The number of iterations performed.
    pub num_iterations: usize,
    /// Why the loop stopped, either converged or capped.
    pub stop_reason: CheckOutcome,
    /// Weighted root mean squared match distance of the last iteration.
    pub rmse: f64,
}

/// An ICP pipeline made of data filters, a matcher, outlier filters, an error
/// minimizer and stopping rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Icp {
    /// Filters applied once to the reading cloud.
    pub reading_filters: Vec<DataPointsFilter>,
    /// Filters applied once to the reference cloud.
    pub reference_filters: Vec<DataPointsFilter>,
    /// Nearest neighbor search.
    pub matcher: Matcher,
    /// Rejection rules, their weights are multiplied.
    pub outlier_filters: Vec<OutlierFilter>,
    /// Transform estimator.
    pub error_minimizer: ErrorMinimizer,
    /// Stopping rules, the loop stops when any of them fires.
    pub checkers: Vec<TransformationChecker>,
}

impl Default for Icp {
    fn default() -> Self {
        Self::similarity(0.85, 100)
    }
}

impl Icp {
    /// Similarity pipeline: light random subsampling of both clouds, k-d tree
    /// matching, trimmed outlier rejection and scale estimation.
    ///
    /// # Arguments
    ///
    /// * `trim_ratio` - Fraction of the closest matches kept every iteration.
    /// * `max_iter` - Iteration cap.
    pub fn similarity(trim_ratio: f64, max_iter: usize) -> Self {
        let data_filters = vec![
            DataPointsFilter::min_dist(),
            DataPointsFilter::random_sampling(),
        ];
        Self {
            reading_filters: data_filters.clone(),
            reference_filters: data_filters,
            matcher: Matcher::default(),
            outlier_filters: vec![OutlierFilter::TrimmedDist { ratio: trim_ratio }],
            error_minimizer: ErrorMinimizer::PointToPointSimilarity,
            checkers: vec![
                TransformationChecker::counter(max_iter),
                TransformationChecker::differential(),
            ],
        }
    }

    /// Same as [`Icp::similarity`] without scale estimation.
    pub fn rigid(trim_ratio: f64, max_iter: usize) -> Self {
        Self {
            error_minimizer: ErrorMinimizer::PointToPoint,
            ..Self::similarity(trim_ratio, max_iter)
        }
    }

    fn validate(&self) -> Result<(), IcpError> {
        if !self
            .checkers
            .iter()
            .any(|c| matches!(c, TransformationChecker::Counter { .. }))
        {
            return Err(IcpError::InvalidInput(
                "an iteration counter is required to bound the loop".to_string(),
            ));
        }

        for filter in &self.outlier_filters {
            if let OutlierFilter::TrimmedDist { ratio } = filter {
                if !(*ratio > 0.0 && *ratio <= 1.0) {
                    return Err(IcpError::InvalidInput(format!(
                        "trim ratio must be in (0, 1], got {ratio}"
                    )));
                }
            }
        }

        for filter in self.reading_filters.iter().chain(&self.reference_filters) {
            if let DataPointsFilter::RandomSampling { prob } = filter {
                if !(0.0..=1.0).contains(prob) {
                    return Err(IcpError::InvalidInput(format!(
                        "sampling probability must be in [0, 1], got {prob}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Register the reading cloud onto the reference cloud.
    ///
    /// # Arguments
    ///
    /// * `reading` - The cloud to move.
    /// * `reference` - The fixed cloud.
    /// * `initial` - Initial guess of the reading to reference transform.
    /// * `rng` - Random source for the data filters.
    ///
    /// # Returns
    ///
    /// The transform mapping the reading into the reference frame.
    pub fn compute<R: Rng + ?Sized>(
        &self,
        reading: &DataPoints,
        reference: &DataPoints,
        initial: &DMat4,
        rng: &mut R,
    ) -> Result<IcpOutcome, IcpError> {
        self.validate()?;
        if reading.is_empty() || reference.is_empty() {
            return Err(IcpError::InvalidInput(format!(
                "cannot register empty clouds (reading {}, reference {})",
                reading.len(),
                reference.len()
            )));
        }

        let reference = apply_filters(&self.reference_filters, reference, rng);
        if reference.is_empty() {
            return Err(IcpError::InvalidInput(
                "no reference point left after filtering".to_string(),
            ));
        }

        // work in a frame centered on the reference mean
        let mean = reference.centroid();
        let ref_from_centered = DMat4::from_translation(mean);
        let centered_from_ref = DMat4::from_translation(-mean);
        let reference = reference.transformed(&centered_from_ref);

        let centered_from_reading = centered_from_ref * *initial;
        let reading = apply_filters(
            &self.reading_filters,
            &reading.transformed(&centered_from_reading),
            rng,
        );
        if reading.is_empty() {
            return Err(IcpError::InvalidInput(
                "no reading point left after filtering".to_string(),
            ));
        }

        log::debug!(
            "ICP on {} reading and {} reference points",
            reading.len(),
            reference.len()
        );

        let index = self.matcher.build(&reference);

        let mut t_iter = DMat4::IDENTITY;
        let mut controller = ConvergenceController::new(self.checkers.clone());
        controller.init(&t_iter);

        let (stop_reason, rmse) = loop {
            let now = std::time::Instant::now();

            let step_reading = reading.transformed(&t_iter);
            let matches = index.find(&step_reading);
            let weights = compute_weights(&self.outlier_filters, &matches);

            let total_weight = weights.iter().sum::<f64>();
            let rmse = if total_weight > 0.0 {
                let sum = weights
                    .iter()
                    .zip(&matches.dists)
                    .map(|(w, d)| w * d)
                    .sum::<f64>();
                (sum / total_weight).sqrt()
            } else {
                f64::INFINITY
            };

            let delta = self
                .error_minimizer
                .compute(&step_reading, &reference, &matches, &weights)?;
            t_iter = delta * t_iter;

            let outcome = controller.check(&t_iter);

            log::debug!(
                "Iteration {}: kept {} of {} matches, rmse {:.6e}, elapsed {:?}",
                controller.iteration(),
                weights.iter().filter(|&&w| w > 0.0).count(),
                matches.len(),
                rmse,
                now.elapsed()
            );

            match outcome {
                CheckOutcome::Continue => {}
                stop => break (stop, rmse),
            }
        };

        if stop_reason == CheckOutcome::MaxIterationsReached {
            log::warn!(
                "ICP stopped at the iteration cap ({}) before converging",
                controller.iteration()
            );
        } else {
            log::debug!("ICP converged in {} iterations", controller.iteration());
        }

        Ok(IcpOutcome {
            transform: ref_from_centered * t_iter * centered_from_reading,
            num_iterations: controller.iteration(),
            stop_reason,
            rmse,
        })
    }
}
