/*!
# Sample Buffer

Timestamped pointer positions and the append-only buffer that owns them for
the lifetime of one observation session.
*/

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::DiagnosticStore;
use crate::{Error, Result};

/// One observed pointer position.
///
/// `t` is a wall-clock timestamp in milliseconds. `trusted` records whether
/// the event source vouched for the event as user-initiated rather than
/// synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub t: i64,
    pub trusted: bool,
}

impl Sample {
    /// Creates a trusted sample.
    pub fn new(x: f64, y: f64, t: i64) -> Self {
        Self {
            x,
            y,
            t,
            trusted: true,
        }
    }

    /// Creates a sample with an explicit trust flag.
    pub fn with_trust(x: f64, y: f64, t: i64, trusted: bool) -> Self {
        Self { x, y, t, trusted }
    }

    /// Creates a trusted sample stamped with the current wall-clock time.
    pub fn now(x: f64, y: f64) -> Self {
        Self::new(x, y, chrono::Utc::now().timestamp_millis())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}) @ {}ms{}",
            self.x,
            self.y,
            self.t,
            if self.trusted { "" } else { " [untrusted]" }
        )
    }
}

/// Append-only ordered sequence of samples for one session.
///
/// Samples are kept in arrival order, never in timestamp order. When a
/// diagnostic store is attached, every append rewrites the entire accumulated
/// sequence under the configured key, an O(n) cost per append that is only
/// acceptable because observation windows are short.
///
/// Once [`SampleBuffer::seal`] has been called the buffer is read-only and
/// further appends fail with [`Error::SourceDetached`].
#[derive(Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    sealed: bool,
    store: Option<(Arc<dyn DiagnosticStore>, String)>,
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("sealed", &self.sealed)
            .field("store_key", &self.store.as_ref().map(|(_, key)| key))
            .finish()
    }
}

impl SampleBuffer {
    /// Creates an empty buffer with no diagnostic persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer that mirrors itself into `store` under `key`
    /// on every append.
    pub fn with_store(store: Arc<dyn DiagnosticStore>, key: impl Into<String>) -> Self {
        Self {
            samples: Vec::new(),
            sealed: false,
            store: Some((store, key.into())),
        }
    }

    /// Creates a sealed buffer over an already-collected sequence, e.g. one
    /// loaded back from a diagnostic store for replay.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            sealed: true,
            store: None,
        }
    }

    /// Appends a sample to the tail of the buffer.
    ///
    /// A diagnostic-store failure is logged and does not reject the sample;
    /// persistence is for replay only and never part of the decision path.
    ///
    /// # Errors
    /// [`Error::SourceDetached`] if the buffer has been sealed.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        if self.sealed {
            return Err(Error::SourceDetached);
        }
        self.samples.push(sample);
        debug!(sample = %sample, len = self.samples.len(), "pointer sample appended");

        if let Some((store, key)) = &self.store
            && let Err(e) = store.save(key, &self.samples)
        {
            warn!(key = %key, error = %e, "failed to persist sample buffer");
        }
        Ok(())
    }

    /// Read view of the full ordered sequence.
    pub fn snapshot(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Closes the buffer to further appends.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Removes the mirrored copy from the diagnostic store, if any.
    pub fn clear_diagnostics(&self) -> Result<()> {
        match &self.store {
            Some((store, key)) => store.clear(key),
            None => Ok(()),
        }
    }

    /// Consumes the buffer and returns the collected samples.
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// Counts consecutive pairs whose timestamp goes backwards.
///
/// Timestamp order is the caller's responsibility; this exists for diagnostics
/// only and nothing is reordered or rejected based on it.
pub fn non_monotonic_steps(samples: &[Sample]) -> usize {
    samples.windows(2).filter(|w| w[1].t < w[0].t).count()
}
