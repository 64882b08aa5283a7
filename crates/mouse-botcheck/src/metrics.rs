/*!
# Metrics Report

Combined metrics bundle for one session.
*/

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, GeometryMetrics};
use crate::kinematics::{self, KinematicMetrics};
use crate::sample::{Sample, non_monotonic_steps};

/// Every feature derived from a session's final buffer.
///
/// The kinematic and geometric groups feed the decision; `sample_count`,
/// `trusted_ratio` and `non_monotonic_steps` are diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub sample_count: usize,
    pub kinematics: KinematicMetrics,
    pub geometry: GeometryMetrics,
    /// Fraction of samples the event source marked as user-initiated.
    pub trusted_ratio: f64,
    /// Consecutive pairs whose timestamp went backwards.
    pub non_monotonic_steps: usize,
}

impl MetricsReport {
    /// Runs both analyzers over `samples` once.
    pub fn compute(samples: &[Sample], idle_threshold_ms: i64) -> Self {
        let trusted_ratio: f64 = if samples.is_empty() {
            0.0
        } else {
            samples.iter().filter(|s| s.trusted).count() as f64 / samples.len() as f64
        };

        Self {
            sample_count: samples.len(),
            kinematics: kinematics::analyze(samples),
            geometry: geometry::analyze(samples, idle_threshold_ms),
            trusted_ratio,
            non_monotonic_steps: non_monotonic_steps(samples),
        }
    }

    pub fn avg_speed(&self) -> f64 {
        self.kinematics.avg_speed
    }

    pub fn std_dev(&self) -> f64 {
        self.kinematics.std_dev
    }

    pub fn total_distance(&self) -> f64 {
        self.kinematics.total_distance
    }

    pub fn avg_turn_angle(&self) -> f64 {
        self.geometry.avg_turn_angle
    }

    pub fn idle_ratio(&self) -> f64 {
        self.geometry.idle_ratio
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total data points: {}", self.sample_count)?;
        writeln!(f, "Average speed: {:.2} pixels/sec", self.avg_speed())?;
        writeln!(f, "Speed std dev: {:.2}", self.std_dev())?;
        writeln!(f, "Peak speed: {:.2} pixels/sec", self.kinematics.peak_speed)?;
        writeln!(f, "Total distance: {:.2} pixels", self.total_distance())?;
        writeln!(f, "Average turning angle: {:.2} degrees", self.avg_turn_angle())?;
        writeln!(f, "Idle time ratio: {:.2}", self.idle_ratio())?;
        write!(f, "Trusted ratio: {:.2}", self.trusted_ratio)
    }
}
