/*!
# Mouse Botcheck

Client-side bot-detection heuristics over pointer-movement trajectories.

A session observes pointer samples for a fixed window, derives kinematic
(speed, speed deviation, path length) and geometric/timing (turning angle,
idle ratio) features from the trajectory, applies a fixed two-factor
threshold rule locally, and reconciles that verdict with a second opinion
from a remote model-based classifier.

```text
 pointer events ──▶ SampleSink ──▶ SampleBuffer ──┬──▶ kinematics ──┐
                                   (diagnostic     └──▶ geometry  ───┤
                                    store writes)                    ▼
                                                            LocalClassifier
                                                                     │
                            RemoteClassifier (async) ──▶  reconcile ◀┘
                                                                     │
                                                                     ▼
                                                         FinalClassification
```

The thresholds are constants lifted into [`DetectorConfig`]; nothing here is
learned, and the heuristic is not a security boundary.
*/

pub mod classifier;
pub mod config;
pub mod geometry;
pub mod kinematics;
pub mod metrics;
pub mod reconcile;
pub mod remote;
pub mod sample;
pub mod session;
pub mod source;
pub mod store;
pub mod synthetic;

pub use classifier::{Classification, LocalClassifier, LocalVerdict};
pub use config::{DetectorConfig, DiagnosticsConfig, RemoteConfig, SessionConfig, Thresholds};
pub use geometry::GeometryMetrics;
pub use kinematics::KinematicMetrics;
pub use metrics::MetricsReport;
pub use reconcile::{ConflictPolicy, DecisionBasis, FinalClassification, reconcile};
pub use remote::{HttpRemoteClassifier, RemoteClassifier};
pub use sample::{Sample, SampleBuffer};
pub use session::{Evaluator, SessionController, SessionOutcome, SessionState};
pub use source::{SampleSink, SampleStream, sample_channel, sample_channel_until};
pub use store::{DiagnosticStore, FileStore, MemoryStore, StoreFormat};
pub use synthetic::{Profile, TrajectoryGenerator};

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the crate.
///
/// Analyzer-level degeneracies (too few samples, zero elapsed time) and remote
/// classifier failures are absent: they resolve to zero-valued
/// metrics or [`Classification::Unknown`] instead of errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid session state: expected {expected}, found {found}")]
    InvalidState {
        expected: SessionState,
        found: SessionState,
    },

    #[error("Sample source detached; observation window is closed")]
    SourceDetached,

    #[error("Diagnostic store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
