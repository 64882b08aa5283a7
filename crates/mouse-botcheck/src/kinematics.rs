/*!
# Kinematic Analyzer

Per-interval speed and its aggregate statistics over a sample sequence.
*/

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Fewest samples for which any interval exists.
pub const MIN_KINEMATIC_SAMPLES: usize = 2;

/// Aggregate speed statistics for one trajectory.
///
/// Speeds are in pixels per second, distances in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicMetrics {
    /// Arithmetic mean of the per-interval speeds.
    pub avg_speed: f64,
    /// Population standard deviation of the per-interval speeds.
    pub std_dev: f64,
    /// Sum of all interval displacements.
    pub total_distance: f64,
    /// Largest per-interval speed.
    pub peak_speed: f64,
}

/// Euclidean displacement between two consecutive samples.
pub(crate) fn displacement(previous: &Sample, current: &Sample) -> f64 {
    let dx: f64 = current.x - previous.x;
    let dy: f64 = current.y - previous.y;
    (dx * dx + dy * dy).sqrt()
}

/// Instantaneous speed of one interval.
///
/// A non-positive elapsed time (duplicate or out-of-order timestamps) yields a
/// speed of zero rather than an infinite or NaN value.
pub fn interval_speed(previous: &Sample, current: &Sample) -> f64 {
    let distance: f64 = displacement(previous, current);
    let dt_seconds: f64 = current.t.saturating_sub(previous.t) as f64 / 1000.0;
    if dt_seconds > 0.0 {
        distance / dt_seconds
    } else {
        0.0
    }
}

/// Per-interval speeds in arrival order.
///
/// # Returns
/// `samples.len() - 1` speeds, or an empty vector for fewer than two samples.
pub fn interval_speeds(samples: &[Sample]) -> Vec<f64> {
    samples
        .windows(2)
        .map(|w| interval_speed(&w[0], &w[1]))
        .collect()
}

/// Computes speed statistics for a trajectory.
///
/// Fewer than [`MIN_KINEMATIC_SAMPLES`] samples is a defined edge case and
/// yields all-zero metrics.
///
/// # Parameters
/// - `samples`: the trajectory in arrival order.
///
/// # Returns
/// Mean speed, population standard deviation of speed (divided by N, not
/// N - 1), total path length and peak speed.
pub fn analyze(samples: &[Sample]) -> KinematicMetrics {
    if samples.len() < MIN_KINEMATIC_SAMPLES {
        return KinematicMetrics::default();
    }

    let mut speeds: Vec<f64> = Vec::with_capacity(samples.len() - 1);
    let mut total_distance: f64 = 0.0;
    for window in samples.windows(2) {
        total_distance += displacement(&window[0], &window[1]);
        speeds.push(interval_speed(&window[0], &window[1]));
    }

    let count: f64 = speeds.len() as f64;
    let avg_speed: f64 = speeds.iter().sum::<f64>() / count;
    let variance: f64 = speeds
        .iter()
        .map(|speed| {
            let diff = speed - avg_speed;
            diff * diff
        })
        .sum::<f64>()
        / count;
    let peak_speed: f64 = speeds.iter().copied().fold(0.0, f64::max);

    KinematicMetrics {
        avg_speed,
        std_dev: variance.sqrt(),
        total_distance,
        peak_speed,
    }
}
