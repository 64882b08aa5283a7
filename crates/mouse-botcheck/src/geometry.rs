/*!
# Geometry/Timing Analyzer

Turning-angle and idle-interval statistics over a sample sequence.
*/

use serde::{Deserialize, Serialize};

use crate::kinematics::displacement;
use crate::sample::Sample;

/// Fewest samples for which a turn between two intervals can exist.
pub const MIN_GEOMETRY_SAMPLES: usize = 3;

/// Path-geometry and dwell-time features for one trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryMetrics {
    /// Mean undirected turning angle between consecutive moving intervals, in degrees `[0, 180]`.
    pub avg_turn_angle: f64,
    /// Fraction of intervals whose elapsed time exceeds the idle threshold, in `[0, 1]`.
    pub idle_ratio: f64,
}

/// Folds an absolute heading difference into `[0, 180]` degrees.
///
/// A left turn and the equivalent right turn have the same magnitude, so 190°
/// and 170° both become 170°.
pub fn normalize_turn(diff_degrees: f64) -> f64 {
    let diff: f64 = diff_degrees.abs();
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Computes turning-angle and idle-ratio features.
///
/// Zero-displacement intervals are skipped for the turning angle: they neither
/// contribute a turn nor update the previous heading. Idleness is judged on
/// elapsed time alone, moving or not.
///
/// # Parameters
/// - `samples`: the trajectory in arrival order.
/// - `idle_threshold_ms`: an interval strictly longer than this is idle.
///
/// # Returns
/// All-zero metrics for fewer than [`MIN_GEOMETRY_SAMPLES`] samples.
pub fn analyze(samples: &[Sample], idle_threshold_ms: i64) -> GeometryMetrics {
    if samples.len() < MIN_GEOMETRY_SAMPLES {
        return GeometryMetrics::default();
    }

    let total_intervals: usize = samples.len() - 1;
    let mut idle_count: usize = 0;
    let mut turn_sum: f64 = 0.0;
    let mut turn_count: usize = 0;
    let mut previous_heading: Option<f64> = None;

    for window in samples.windows(2) {
        let (previous, current) = (&window[0], &window[1]);

        if current.t.saturating_sub(previous.t) > idle_threshold_ms {
            idle_count += 1;
        }

        if displacement(previous, current) == 0.0 {
            continue;
        }
        let heading: f64 = (current.y - previous.y)
            .atan2(current.x - previous.x)
            .to_degrees();
        if let Some(last) = previous_heading {
            turn_sum += normalize_turn(heading - last);
            turn_count += 1;
        }
        previous_heading = Some(heading);
    }

    GeometryMetrics {
        avg_turn_angle: if turn_count > 0 {
            turn_sum / turn_count as f64
        } else {
            0.0
        },
        idle_ratio: idle_count as f64 / total_intervals as f64,
    }
}
