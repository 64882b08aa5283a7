/*!
# Standard Input Source

JSON-lines sample source.

One object per line: `{"x": .., "y": .., "t": .., "trusted": ..}`. `t`
defaults to the arrival time and `trusted` to `true`.
*/

use mouse_botcheck::{Sample, SampleSink};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct LineSample {
    x: f64,
    y: f64,
    t: Option<i64>,
    trusted: Option<bool>,
}

/// Parses one input line into a sample.
pub fn parse_line(line: &str) -> serde_json::Result<Sample> {
    let raw: LineSample = serde_json::from_str(line)?;
    let t: i64 = raw
        .t
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    Ok(Sample::with_trust(raw.x, raw.y, t, raw.trusted.unwrap_or(true)))
}

/// Pushes every parseable line into `sink` until the input ends or the
/// session detaches.
///
/// # Returns
/// Number of samples the session accepted.
pub async fn forward_lines<R: AsyncRead + Unpin>(input: R, sink: SampleSink) -> usize {
    let mut lines = BufReader::new(input).lines();
    let mut accepted: usize = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(&line) {
                    Ok(sample) => {
                        if sink.push(sample).is_err() {
                            debug!("observation window closed; ignoring remaining input");
                            break;
                        }
                        accepted += 1;
                    }
                    Err(e) => warn!("skipping malformed sample line: {}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("failed to read standard input: {}", e);
                break;
            }
        }
    }
    accepted
}
