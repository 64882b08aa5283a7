/*!
# Local Classifier

Fixed-threshold verdict over the kinematic features of a session.

Automated pointer control tends to move fast and with erratic speed, while
natural motion in short bursts is slower and smoother. The rule requires both
signals at once so a fast but smooth human swipe is not flagged.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Thresholds;
use crate::metrics::MetricsReport;
use crate::sample::Sample;

/// Verdict of a classifier.
///
/// `Unknown` is "no opinion": too little data locally, or a failed remote
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Human,
    Bot,
    Unknown,
}

impl Classification {
    /// Wire code of a definite verdict: 0 for human, 1 for bot.
    pub fn code(&self) -> Option<u8> {
        match self {
            Classification::Human => Some(0),
            Classification::Bot => Some(1),
            Classification::Unknown => None,
        }
    }

    /// Parses a wire code; anything other than 0 or 1 is `Unknown`.
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Classification::Human,
            1 => Classification::Bot,
            _ => Classification::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Classification::Unknown)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = match self {
            Classification::Human => "HUMAN",
            Classification::Bot => "BOT",
            Classification::Unknown => "UNKNOWN",
        };
        write!(f, "{output}")
    }
}

/// Local verdict together with the metrics it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalVerdict {
    pub classification: Classification,
    pub metrics: MetricsReport,
}

/// Two-factor threshold rule over mean speed and speed deviation.
#[derive(Debug, Clone, Default)]
pub struct LocalClassifier {
    thresholds: Thresholds,
}

impl LocalClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Applies the rule to already-computed metrics.
    ///
    /// BOT iff the mean speed and the speed deviation both strictly exceed
    /// their thresholds; HUMAN otherwise; UNKNOWN below the minimum sample
    /// count.
    pub fn decide(&self, metrics: &MetricsReport) -> Classification {
        if metrics.sample_count < self.thresholds.min_samples {
            return Classification::Unknown;
        }
        if metrics.avg_speed() > self.thresholds.speed_px_per_s
            && metrics.std_dev() > self.thresholds.std_dev_px_per_s
        {
            Classification::Bot
        } else {
            Classification::Human
        }
    }

    /// Runs both analyzers once over `samples` and classifies the result.
    pub fn classify(&self, samples: &[Sample]) -> LocalVerdict {
        let metrics: MetricsReport = MetricsReport::compute(samples, self.thresholds.idle_interval_ms);

        if metrics.sample_count < self.thresholds.min_samples {
            info!(
                samples = metrics.sample_count,
                required = self.thresholds.min_samples,
                "not enough mouse movement data to evaluate locally"
            );
            return LocalVerdict {
                classification: Classification::Unknown,
                metrics,
            };
        }

        if metrics.non_monotonic_steps > 0 {
            warn!(
                steps = metrics.non_monotonic_steps,
                "sample timestamps go backwards; affected intervals count as zero speed"
            );
        }

        let classification: Classification = self.decide(&metrics);
        info!(
            samples = metrics.sample_count,
            avg_speed = format_args!("{:.2}", metrics.avg_speed()),
            std_dev = format_args!("{:.2}", metrics.std_dev()),
            total_distance = format_args!("{:.2}", metrics.total_distance()),
            avg_turn_angle = format_args!("{:.2}", metrics.avg_turn_angle()),
            idle_ratio = format_args!("{:.2}", metrics.idle_ratio()),
            trusted_ratio = format_args!("{:.2}", metrics.trusted_ratio),
            %classification,
            "local classification"
        );

        LocalVerdict {
            classification,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(points: &[(f64, f64, i64)]) -> Vec<Sample> {
        points.iter().map(|&(x, y, t)| Sample::new(x, y, t)).collect()
    }

    #[test]
    fn test_fewer_than_five_samples_is_unknown() {
        let classifier = LocalClassifier::default();
        let four = samples(&[(0.0, 0.0, 0), (500.0, 0.0, 10), (0.0, 0.0, 20), (900.0, 0.0, 30)]);

        let verdict = classifier.classify(&four);
        assert_eq!(verdict.classification, Classification::Unknown);
        assert_eq!(verdict.metrics.sample_count, 4);
        assert_eq!(classifier.classify(&[]).classification, Classification::Unknown);
    }

    #[test]
    fn test_fast_constant_speed_is_human() {
        let classifier = LocalClassifier::default();
        let trajectory = samples(&[
            (0.0, 0.0, 0),
            (100.0, 0.0, 100),
            (200.0, 0.0, 200),
            (300.0, 0.0, 300),
            (400.0, 0.0, 400),
        ]);

        let verdict = classifier.classify(&trajectory);
        assert!(verdict.metrics.avg_speed() > 30.0);
        assert_eq!(verdict.metrics.std_dev(), 0.0);
        assert_eq!(verdict.classification, Classification::Human);
    }

    #[test]
    fn test_fast_erratic_speed_is_bot() {
        let classifier = LocalClassifier::default();
        let trajectory = samples(&[
            (0.0, 0.0, 0),
            (10.0, 0.0, 50),
            (10.0, 10.0, 450),
            (110.0, 10.0, 500),
            (110.0, 110.0, 900),
        ]);

        let verdict = classifier.classify(&trajectory);
        assert!(verdict.metrics.avg_speed() > 30.0);
        assert!(verdict.metrics.std_dev() > 10.0);
        assert_eq!(verdict.classification, Classification::Bot);
    }

    #[test]
    fn test_slow_erratic_speed_is_human() {
        let classifier = LocalClassifier::default();
        // Speeds alternate 5 and 25 px/s: erratic but below the speed threshold.
        let trajectory = samples(&[
            (0.0, 0.0, 0),
            (1.0, 0.0, 200),
            (6.0, 0.0, 400),
            (7.0, 0.0, 600),
            (12.0, 0.0, 800),
        ]);

        let verdict = classifier.classify(&trajectory);
        assert!(verdict.metrics.avg_speed() < 30.0);
        assert!(verdict.metrics.std_dev() > 0.0);
        assert_eq!(verdict.classification, Classification::Human);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let classifier = LocalClassifier::new(Thresholds {
            speed_px_per_s: 1000.0,
            ..Thresholds::default()
        });
        let mut metrics = MetricsReport {
            sample_count: 5,
            ..MetricsReport::default()
        };
        metrics.kinematics.avg_speed = 1000.0;
        metrics.kinematics.std_dev = 50.0;
        assert_eq!(classifier.decide(&metrics), Classification::Human);

        metrics.kinematics.avg_speed = 1000.5;
        assert_eq!(classifier.decide(&metrics), Classification::Bot);
    }

    #[test]
    fn test_classification_codes() {
        assert_eq!(Classification::Human.code(), Some(0));
        assert_eq!(Classification::Bot.code(), Some(1));
        assert_eq!(Classification::Unknown.code(), None);
        assert_eq!(Classification::from_code(1), Classification::Bot);
        assert_eq!(Classification::from_code(7), Classification::Unknown);
    }
}
