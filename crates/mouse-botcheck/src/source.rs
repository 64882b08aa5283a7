/*!
# Sample Source

Push-style delivery of pointer samples. The event producer holds a
[`SampleSink`] and pushes one sample per pointer notification; the session
holds the matching [`SampleStream`]. Once the sink's deadline passes, or the
stream is detached, every push is rejected.
*/

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::sample::Sample;
use crate::{Error, Result};

/// Producer half, handed to whatever observes pointer movement.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: UnboundedSender<Sample>,
    deadline: Option<Instant>,
}

impl SampleSink {
    /// Delivers one sample to the session.
    ///
    /// # Errors
    /// [`Error::SourceDetached`] once the observation window has closed; the
    /// sample is dropped.
    pub fn push(&self, sample: Sample) -> Result<()> {
        if self.is_expired() {
            return Err(Error::SourceDetached);
        }
        self.tx.send(sample).map_err(|_| Error::SourceDetached)
    }

    /// True once the window deadline has passed or the session has detached.
    pub fn is_detached(&self) -> bool {
        self.is_expired() || self.tx.is_closed()
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Consumer half, attached to a session.
#[derive(Debug)]
pub struct SampleStream {
    rx: UnboundedReceiver<Sample>,
}

impl SampleStream {
    /// Next sample in arrival order, or `None` once every sink is gone.
    pub async fn recv(&mut self) -> Option<Sample> {
        self.rx.recv().await
    }

    /// Closes the source and returns the samples already queued.
    ///
    /// Samples delivered before this call were observed inside the window and
    /// are kept; any push after it fails.
    pub fn detach(&mut self) -> Vec<Sample> {
        self.rx.close();
        let mut pending: Vec<Sample> = Vec::new();
        while let Ok(sample) = self.rx.try_recv() {
            pending.push(sample);
        }
        pending
    }
}

/// Creates a connected sink/stream pair with no deadline.
pub fn sample_channel() -> (SampleSink, SampleStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SampleSink { tx, deadline: None }, SampleStream { rx })
}

/// Creates a connected pair whose sink stops accepting samples at `deadline`,
/// whether or not anyone is reading the stream yet.
pub fn sample_channel_until(deadline: Instant) -> (SampleSink, SampleStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SampleSink {
            tx,
            deadline: Some(deadline),
        },
        SampleStream { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_samples_arrive_in_push_order() {
        let (sink, mut stream) = sample_channel();
        sink.push(Sample::new(0.0, 0.0, 30)).unwrap();
        sink.push(Sample::new(1.0, 0.0, 10)).unwrap();

        assert_eq!(stream.recv().await.unwrap().t, 30);
        assert_eq!(stream.recv().await.unwrap().t, 10);
    }

    #[tokio::test]
    async fn test_detach_drains_queue_then_rejects() {
        let (sink, mut stream) = sample_channel();
        let other = sink.clone();
        sink.push(Sample::new(0.0, 0.0, 0)).unwrap();
        other.push(Sample::new(1.0, 1.0, 5)).unwrap();

        let pending = stream.detach();
        assert_eq!(pending.len(), 2);
        assert!(sink.is_detached());
        assert!(matches!(
            other.push(Sample::new(2.0, 2.0, 10)),
            Err(Error::SourceDetached)
        ));
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_rejects_after_deadline() {
        let deadline = Instant::now() + std::time::Duration::from_secs(15);
        let (sink, mut stream) = sample_channel_until(deadline);
        sink.push(Sample::new(0.0, 0.0, 0)).unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(16)).await;
        assert!(sink.is_detached());
        assert!(matches!(
            sink.push(Sample::new(1.0, 1.0, 5)),
            Err(Error::SourceDetached)
        ));
        assert_eq!(stream.detach().len(), 1);
    }

    #[tokio::test]
    async fn test_recv_ends_when_sinks_dropped() {
        let (sink, mut stream) = sample_channel();
        sink.push(Sample::new(0.0, 0.0, 0)).unwrap();
        drop(sink);

        assert!(stream.recv().await.is_some());
        assert!(stream.recv().await.is_none());
    }
}
