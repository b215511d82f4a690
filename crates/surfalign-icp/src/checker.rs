use glam::{DMat3, DMat4, DVec3};
use serde::{Deserialize, Serialize};
use surfalign_3d::{
    linalg::orthonormalize_with_consistent_handedness,
    transforms::{angular_distance, linear_part, translation_part},
};

/// Stopping rule evaluated after every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformationChecker {
    /// Stop after a fixed number of iterations.
    Counter {
        /// Number of iterations after which the loop stops.
        max_iteration_count: usize,
    },
    /// Stop when the transform stops changing.
    ///
    /// The mean rotation angle and translation norm differences over the last
    /// `smooth_length` iterations must both fall below their thresholds.
    Differential {
        /// Threshold on the mean rotation change in radians.
        min_diff_rot_err: f64,
        /// Threshold on the mean translation change.
        min_diff_trans_err: f64,
        /// Number of successive differences averaged.
        smooth_length: usize,
    },
}

impl TransformationChecker {
    /// Iteration counter with the given cap.
    pub fn counter(max_iteration_count: usize) -> Self {
        TransformationChecker::Counter {
            max_iteration_count,
        }
    }

    /// Differential checker with thresholds of `1e-6` over 4 iterations.
    pub fn differential() -> Self {
        TransformationChecker::Differential {
            min_diff_rot_err: 1e-6,
            min_diff_trans_err: 1e-6,
            smooth_length: 4,
        }
    }
}

/// State of the iteration after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// Keep iterating.
    Continue,
    /// The transform stopped changing.
    Converged,
    /// The iteration cap was reached before convergence.
    MaxIterationsReached,
}

/// Rotation of a transform after removing its uniform scale.
fn rotation_of(transform: &DMat4) -> DMat3 {
    let linear = linear_part(transform);
    let scale =
        (linear.x_axis.length() + linear.y_axis.length() + linear.z_axis.length()) / 3.0;
    if scale == 0.0 {
        return DMat3::IDENTITY;
    }
    orthonormalize_with_consistent_handedness(&(linear / scale)).0
}

/// Evaluates a set of checkers on the sequence of transforms produced by the loop.
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    checkers: Vec<TransformationChecker>,
    iteration: usize,
    rotations: Vec<DMat3>,
    translations: Vec<DVec3>,
}

impl ConvergenceController {
    /// Create a controller over the given checkers.
    pub fn new(checkers: Vec<TransformationChecker>) -> Self {
        Self {
            checkers,
            iteration: 0,
            rotations: Vec::new(),
            translations: Vec::new(),
        }
    }

    /// Number of checks performed since the last [`ConvergenceController::init`].
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Reset the state and record the initial transform.
    pub fn init(&mut self, transform: &DMat4) {
        self.iteration = 0;
        self.rotations.clear();
        self.translations.clear();
        self.rotations.push(rotation_of(transform));
        self.translations.push(translation_part(transform));
    }

    /// Record the latest transform and decide whether to stop.
    ///
    /// Convergence has precedence when several checkers fire together.
    pub fn check(&mut self, transform: &DMat4) -> CheckOutcome {
        self.iteration += 1;
        self.rotations.push(rotation_of(transform));
        self.translations.push(translation_part(transform));

        let mut converged = false;
        let mut capped = false;

        for checker in &self.checkers {
            match *checker {
                TransformationChecker::Counter {
                    max_iteration_count,
                } => {
                    if self.iteration >= max_iteration_count {
                        capped = true;
                    }
                }
                TransformationChecker::Differential {
                    min_diff_rot_err,
                    min_diff_trans_err,
                    smooth_length,
                } => {
                    let n = self.rotations.len();
                    if smooth_length == 0 || n <= smooth_length {
                        continue;
                    }
                    let (mut rot_diff, mut trans_diff) = (0.0, 0.0);
                    for i in (n - smooth_length)..n {
                        rot_diff += angular_distance(&self.rotations[i - 1], &self.rotations[i]);
                        trans_diff += (self.translations[i] - self.translations[i - 1]).length();
                    }
                    rot_diff /= smooth_length as f64;
                    trans_diff /= smooth_length as f64;

                    log::trace!(
                        "differential check: rotation {rot_diff:e}, translation {trans_diff:e}"
                    );

                    if rot_diff < min_diff_rot_err && trans_diff < min_diff_trans_err {
                        converged = true;
                    }
                }
            }
        }

        if converged {
            CheckOutcome::Converged
        } else if capped {
            CheckOutcome::MaxIterationsReached
        } else {
            CheckOutcome::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surfalign_3d::transforms::{axis_angle_to_rotation_matrix, similarity_transform};

    #[test]
    fn test_counter() {
        let mut controller = ConvergenceController::new(vec![TransformationChecker::counter(3)]);
        controller.init(&DMat4::IDENTITY);
        assert_eq!(controller.check(&DMat4::IDENTITY), CheckOutcome::Continue);
        assert_eq!(controller.check(&DMat4::IDENTITY), CheckOutcome::Continue);
        assert_eq!(
            controller.check(&DMat4::IDENTITY),
            CheckOutcome::MaxIterationsReached
        );
        assert_eq!(controller.iteration(), 3);
    }

    #[test]
    fn test_differential_fires_after_smooth_length_still_steps() {
        let mut controller =
            ConvergenceController::new(vec![TransformationChecker::differential()]);
        controller.init(&DMat4::IDENTITY);
        for _ in 0..3 {
            assert_eq!(controller.check(&DMat4::IDENTITY), CheckOutcome::Continue);
        }
        assert_eq!(controller.check(&DMat4::IDENTITY), CheckOutcome::Converged);
    }

    #[test]
    fn test_differential_waits_for_large_step_to_leave_window(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let rotation = axis_angle_to_rotation_matrix(&DVec3::Y, 0.2)?;
        let moved = similarity_transform(2.0, &rotation, &DVec3::new(1.0, 0.0, 0.0));

        let mut controller =
            ConvergenceController::new(vec![TransformationChecker::differential()]);
        controller.init(&DMat4::IDENTITY);
        // the jump from the initial transform is in the window for 4 checks
        for _ in 0..4 {
            assert_eq!(controller.check(&moved), CheckOutcome::Continue);
        }
        assert_eq!(controller.check(&moved), CheckOutcome::Converged);
        Ok(())
    }

    #[test]
    fn test_scale_change_alone_is_not_a_rotation() {
        let a = similarity_transform(1.0, &DMat3::IDENTITY, &DVec3::ZERO);
        let b = similarity_transform(3.0, &DMat3::IDENTITY, &DVec3::ZERO);
        assert!(angular_distance(&rotation_of(&a), &rotation_of(&b)) < 1e-12);
    }

    #[test]
    fn test_converged_wins_over_counter() {
        let mut controller = ConvergenceController::new(vec![
            TransformationChecker::counter(4),
            TransformationChecker::differential(),
        ]);
        controller.init(&DMat4::IDENTITY);
        for _ in 0..3 {
            controller.check(&DMat4::IDENTITY);
        }
        assert_eq!(controller.check(&DMat4::IDENTITY), CheckOutcome::Converged);
    }
}
