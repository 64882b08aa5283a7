/*!
# Session Controller

Lifecycle of one observation session:

```text
IDLE ──start()──▶ COLLECTING ──window expiry──▶ EVALUATING ──remote settles──▶ DONE
```

The controller owns the session's [`SampleBuffer`] exclusively. Evaluation is
delegated to an [`Evaluator`], which can also be used on its own to classify
an already-collected trajectory (replay).
*/

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::classifier::{Classification, LocalClassifier, LocalVerdict};
use crate::config::DetectorConfig;
use crate::reconcile::{ConflictPolicy, FinalClassification, reconcile};
use crate::remote::RemoteClassifier;
use crate::sample::{Sample, SampleBuffer};
use crate::source::{SampleSink, SampleStream, sample_channel_until};
use crate::store::DiagnosticStore;
use crate::{Error, Result};

/// Lifecycle state of a [`SessionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Collecting,
    Evaluating,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = match self {
            SessionState::Idle => "IDLE",
            SessionState::Collecting => "COLLECTING",
            SessionState::Evaluating => "EVALUATING",
            SessionState::Done => "DONE",
        };
        write!(f, "{output}")
    }
}

/// Everything a finished session decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub local: LocalVerdict,
    pub remote: Classification,
    pub final_classification: FinalClassification,
}

impl SessionOutcome {
    /// The single enumerated value surfaced to callers.
    pub fn classification(&self) -> Classification {
        self.final_classification.classification
    }
}

/// EVALUATING→DONE: analyzers, local rule, remote call, reconciliation.
#[derive(Debug, Clone)]
pub struct Evaluator<R> {
    classifier: LocalClassifier,
    remote: R,
    remote_timeout: Duration,
    policy: ConflictPolicy,
}

impl<R: RemoteClassifier> Evaluator<R> {
    pub fn new(config: &DetectorConfig, remote: R) -> Self {
        Self {
            classifier: LocalClassifier::new(config.thresholds.clone()),
            remote,
            remote_timeout: config.session.remote_timeout(),
            policy: config.session.conflict_policy,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Classifies a finished trajectory.
    ///
    /// The local classifier runs first. If it has no opinion the remote is
    /// not consulted at all. Otherwise the remote call is awaited for at most
    /// the configured timeout; expiry counts as a remote `Unknown`.
    pub async fn evaluate(&self, samples: &[Sample]) -> SessionOutcome {
        let local: LocalVerdict = self.classifier.classify(samples);

        let remote: Classification = if local.classification.is_known() {
            match tokio::time::timeout(self.remote_timeout, self.remote.classify(samples)).await {
                Ok(classification) => classification,
                Err(_) => {
                    warn!(
                        timeout_ms = self.remote_timeout.as_millis() as u64,
                        "remote classifier did not settle in time"
                    );
                    Classification::Unknown
                }
            }
        } else {
            info!("not enough data for remote evaluation");
            Classification::Unknown
        };

        let final_classification: FinalClassification =
            reconcile(local.classification, remote, self.policy);
        info!(
            classification = %final_classification.classification,
            basis = %final_classification.basis,
            "final classification"
        );

        SessionOutcome {
            local,
            remote,
            final_classification,
        }
    }
}

/// Drives one observation session from IDLE to DONE.
///
/// Single use: once DONE, a new session needs a new controller.
pub struct SessionController<R> {
    state: SessionState,
    window: Duration,
    clear_diagnostics_on_done: bool,
    buffer: SampleBuffer,
    stream: Option<SampleStream>,
    deadline: Option<Instant>,
    evaluator: Evaluator<R>,
}

impl<R> fmt::Debug for SessionController<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("window", &self.window)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl<R: RemoteClassifier> SessionController<R> {
    /// Creates an idle session.
    ///
    /// # Parameters
    /// - `config`: thresholds, window length, remote timeout and conflict policy.
    /// - `remote`: second-opinion classifier; `None::<R>` works for local-only.
    /// - `store`: when given, the buffer is mirrored under
    ///   `config.diagnostics.key` on every append.
    pub fn new(
        config: &DetectorConfig,
        remote: R,
        store: Option<Arc<dyn DiagnosticStore>>,
    ) -> Self {
        let buffer: SampleBuffer = match store {
            Some(store) => SampleBuffer::with_store(store, config.diagnostics.key.clone()),
            None => SampleBuffer::new(),
        };
        Self {
            state: SessionState::Idle,
            window: config.session.window(),
            clear_diagnostics_on_done: config.session.clear_diagnostics_on_done,
            buffer,
            stream: None,
            deadline: None,
            evaluator: Evaluator::new(config, remote),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Samples collected so far; the full window once DONE.
    pub fn samples(&self) -> &[Sample] {
        self.buffer.snapshot()
    }

    /// IDLE→COLLECTING: attaches a fresh sample source and starts the window
    /// timer.
    ///
    /// # Returns
    /// The sink the event producer pushes samples into. It rejects every push
    /// from the moment the window expires, even before
    /// [`SessionController::run`] is awaited.
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless the session is IDLE.
    pub fn start(&mut self) -> Result<SampleSink> {
        self.expect_state(SessionState::Idle)?;
        let deadline: Instant = Instant::now() + self.window;
        let (sink, stream) = sample_channel_until(deadline);
        self.stream = Some(stream);
        self.deadline = Some(deadline);
        self.state = SessionState::Collecting;
        info!(window_ms = self.window.as_millis() as u64, "observation window started");
        Ok(sink)
    }

    /// Collects until the window started by [`SessionController::start`]
    /// expires, then evaluates.
    ///
    /// The window always runs to expiry, even if every sink is dropped early.
    /// Samples pushed before expiry are kept; anything pushed afterwards is
    /// rejected at the sink.
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless the session is COLLECTING.
    pub async fn run(&mut self) -> Result<SessionOutcome> {
        self.expect_state(SessionState::Collecting)?;
        let (Some(mut stream), Some(deadline)) = (self.stream.take(), self.deadline) else {
            return Err(Error::InvalidState {
                expected: SessionState::Collecting,
                found: self.state,
            });
        };

        let deadline = tokio::time::sleep_until(deadline);
        tokio::pin!(deadline);
        let mut source_open: bool = true;
        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => break,
                next = stream.recv(), if source_open => match next {
                    Some(sample) => self.buffer.append(sample)?,
                    None => source_open = false,
                },
            }
        }

        for sample in stream.detach() {
            self.buffer.append(sample)?;
        }
        self.buffer.seal();
        self.state = SessionState::Evaluating;
        info!(samples = self.buffer.len(), "observation window closed");

        let outcome: SessionOutcome = self.evaluator.evaluate(self.buffer.snapshot()).await;

        if self.clear_diagnostics_on_done
            && let Err(e) = self.buffer.clear_diagnostics()
        {
            warn!(error = %e, "failed to clear stored sample buffer");
        }
        self.state = SessionState::Done;
        Ok(outcome)
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected,
                found: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::DecisionBasis;
    use crate::store::MemoryStore;

    struct Fixed(Classification);

    impl RemoteClassifier for Fixed {
        async fn classify(&self, _samples: &[Sample]) -> Classification {
            self.0
        }
    }

    struct Stalled;

    impl RemoteClassifier for Stalled {
        async fn classify(&self, _samples: &[Sample]) -> Classification {
            std::future::pending::<()>().await;
            Classification::Bot
        }
    }

    fn erratic_fast() -> Vec<Sample> {
        vec![
            Sample::new(0.0, 0.0, 0),
            Sample::new(10.0, 0.0, 50),
            Sample::new(10.0, 10.0, 450),
            Sample::new(110.0, 10.0, 500),
            Sample::new(110.0, 110.0, 900),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_before_start_is_invalid() {
        let mut session = SessionController::new(&DetectorConfig::default(), Fixed(Classification::Human), None);
        let result = session.run().await;
        assert!(matches!(
            result,
            Err(Error::InvalidState {
                expected: SessionState::Collecting,
                found: SessionState::Idle
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_single_use() {
        let mut session = SessionController::new(&DetectorConfig::default(), Fixed(Classification::Human), None);
        let _sink = session.start().unwrap();
        assert!(session.start().is_err());

        session.run().await.unwrap();
        assert_eq!(session.state(), SessionState::Done);
        assert!(matches!(
            session.start(),
            Err(Error::InvalidState {
                found: SessionState::Done,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_after_window_are_rejected() {
        let mut session = SessionController::new(&DetectorConfig::default(), Fixed(Classification::Human), None);
        let sink = session.start().unwrap();
        for sample in erratic_fast() {
            sink.push(sample).unwrap();
        }

        let outcome = session.run().await.unwrap();
        assert_eq!(session.samples().len(), 5);
        assert_eq!(outcome.local.classification, Classification::Bot);
        assert!(matches!(
            sink.push(Sample::new(1.0, 1.0, 10)),
            Err(Error::SourceDetached)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_timed_from_start() {
        let mut session = SessionController::new(&DetectorConfig::default(), Fixed(Classification::Human), None);
        let sink = session.start().unwrap();
        sink.push(Sample::new(0.0, 0.0, 0)).unwrap();

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(matches!(
            sink.push(Sample::new(5.0, 5.0, 100)),
            Err(Error::SourceDetached)
        ));

        let started = Instant::now();
        let outcome = session.run().await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(session.samples().len(), 1);
        assert_eq!(outcome.classification(), Classification::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_remote_times_out_to_local() {
        let config = DetectorConfig::default();
        let evaluator = Evaluator::new(&config, Stalled);

        let outcome = evaluator.evaluate(&erratic_fast()).await;
        assert_eq!(outcome.remote, Classification::Unknown);
        assert_eq!(outcome.classification(), Classification::Bot);
        assert_eq!(outcome.final_classification.basis, DecisionBasis::LocalOnly);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_data_skips_remote() {
        let evaluator = Evaluator::new(&DetectorConfig::default(), Stalled);
        let outcome = evaluator.evaluate(&erratic_fast()[..3]).await;

        assert_eq!(outcome.classification(), Classification::Unknown);
        assert_eq!(outcome.final_classification.basis, DecisionBasis::InsufficientData);
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_cleared_when_done() {
        let mut config = DetectorConfig::default();
        config.session.clear_diagnostics_on_done = true;
        let store = Arc::new(MemoryStore::new());
        let mut session = SessionController::new(&config, Fixed(Classification::Bot), Some(store.clone()));

        let sink = session.start().unwrap();
        sink.push(Sample::new(0.0, 0.0, 0)).unwrap();
        session.run().await.unwrap();

        assert_eq!(store.save_count(), 1);
        assert!(store.load(&config.diagnostics.key).unwrap().is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Evaluating.to_string(), "EVALUATING");
    }
}
