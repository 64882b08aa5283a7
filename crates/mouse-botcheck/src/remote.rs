/*!
# Remote Classifier

A remote verdict is a second opinion only. Every failure mode (transport
error, non-success status, malformed body, out-of-range code) resolves to
[`Classification::Unknown`] and is logged here; none crosses this module
as an error.
*/

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::Classification;
use crate::config::RemoteConfig;
use crate::sample::Sample;
use crate::{Error, Result};

/// Externally hosted classifier consulted once per session.
pub trait RemoteClassifier: Send + Sync {
    /// Classifies the full trajectory. Never fails: unavailability is
    /// reported as `Classification::Unknown`.
    fn classify(&self, samples: &[Sample]) -> impl Future<Output = Classification> + Send;
}

/// No remote configured: every call reports `Unknown`.
impl<R: RemoteClassifier> RemoteClassifier for Option<R> {
    async fn classify(&self, samples: &[Sample]) -> Classification {
        match self {
            Some(remote) => remote.classify(samples).await,
            None => Classification::Unknown,
        }
    }
}

/// Request body: the instruction plus the full trajectory.
#[derive(Debug, Serialize)]
pub struct RemoteRequest<'a> {
    pub prompt: &'a str,
    #[serde(rename = "mouseData")]
    pub mouse_data: &'a [Sample],
}

/// Classifier reached over HTTP with a JSON `POST`.
///
/// Expects a JSON object response carrying `classification: 0 | 1`; other
/// fields are ignored.
#[derive(Debug, Clone)]
pub struct HttpRemoteClassifier {
    client: Client,
    endpoint: String,
    prompt: String,
    max_attempts: u32,
}

impl HttpRemoteClassifier {
    /// Builds a classifier from settings, or `None` when no endpoint is configured.
    ///
    /// # Errors
    /// [`Error::Config`] when `max_attempts` is zero or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };
        if config.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be >= 1".to_string()));
        }
        let client: Client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Some(Self {
            client,
            endpoint: endpoint.clone(),
            prompt: config.prompt.clone(),
            max_attempts: config.max_attempts,
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteClassifier for HttpRemoteClassifier {
    async fn classify(&self, samples: &[Sample]) -> Classification {
        let request = RemoteRequest {
            prompt: &self.prompt,
            mouse_data: samples,
        };
        let Some(response) = send_with_retry(
            &self.client,
            |c| c.post(&self.endpoint).json(&request),
            self.max_attempts,
            "remote classifier",
        )
        .await
        else {
            return Classification::Unknown;
        };

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("remote classifier: unreadable response body: {}", e);
                return Classification::Unknown;
            }
        };
        debug!(response = %body, "full remote classifier response");

        let classification: Classification = parse_response(&body);
        info!(%classification, "remote classification");
        classification
    }
}

/// Extracts the verdict from a response body.
///
/// Accepts `classification` as the number 0 or 1, or as a string holding one
/// of them (model output is sometimes quoted). Anything else is `Unknown`.
pub fn parse_response(body: &serde_json::Value) -> Classification {
    match body.get("classification") {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Classification::from_code)
            .unwrap_or(Classification::Unknown),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Classification::from_code)
            .unwrap_or(Classification::Unknown),
        Some(other) => {
            warn!(value = %other, "remote classifier: unexpected classification value");
            Classification::Unknown
        }
        None => {
            warn!("remote classifier: response has no classification field");
            Classification::Unknown
        }
    }
}

/// Send an HTTP request with retry and exponential backoff.
///
/// Makes at most `max_attempts` requests. Returns `Some(Response)` on
/// success, `None` once every attempt failed or a non-retriable error occurs.
///
/// Retry behavior:
/// - 429 (rate limited): backoff 2s, 4s, 8s
/// - 5xx (server error): backoff 1s, 2s, 4s
/// - Timeout/connect error: backoff 1s, 2s, 4s
/// - Other 4xx: non-retriable, returns None immediately
///
/// No backoff follows the final attempt.
pub async fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    max_attempts: u32,
    context: &str,
) -> Option<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    for attempt in 0..max_attempts {
        let last_attempt: bool = attempt + 1 == max_attempts;
        let delay: Duration = match build_request(client).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Some(resp);
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    let delay = Duration::from_secs(2u64.pow(attempt + 1));
                    warn!("{}: rate limited (429)", context);
                    delay
                } else if status.is_server_error() {
                    warn!("{}: server error ({})", context, status);
                    Duration::from_secs(2u64.pow(attempt))
                } else {
                    warn!("{}: non-retriable error ({})", context, status);
                    return None;
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!("{}: network error ({})", context, e);
                Duration::from_secs(2u64.pow(attempt))
            }
            Err(e) => {
                warn!("{}: request failed: {}", context, e);
                return None;
            }
        };
        if !last_attempt {
            debug!("{}: retrying in {:?}", context, delay);
            tokio::time::sleep(delay).await;
        }
    }

    warn!("{}: failed after {} attempts", context, max_attempts);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numeric_classification() {
        assert_eq!(parse_response(&json!({"classification": 0})), Classification::Human);
        assert_eq!(
            parse_response(&json!({"classification": 1, "model": "x"})),
            Classification::Bot
        );
    }

    #[test]
    fn test_parse_quoted_classification() {
        assert_eq!(parse_response(&json!({"classification": " 1\n"})), Classification::Bot);
        assert_eq!(parse_response(&json!({"classification": "0"})), Classification::Human);
    }

    #[test]
    fn test_parse_malformed_is_unknown() {
        assert_eq!(parse_response(&json!({})), Classification::Unknown);
        assert_eq!(parse_response(&json!({"classification": 2})), Classification::Unknown);
        assert_eq!(parse_response(&json!({"classification": -1})), Classification::Unknown);
        assert_eq!(parse_response(&json!({"classification": "bot"})), Classification::Unknown);
        assert_eq!(parse_response(&json!({"classification": null})), Classification::Unknown);
        assert_eq!(parse_response(&json!([1])), Classification::Unknown);
    }

    #[test]
    fn test_request_body_shape() {
        let samples = [Sample::with_trust(1.0, 2.0, 3, false)];
        let request = RemoteRequest {
            prompt: "classify",
            mouse_data: &samples,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["prompt"], "classify");
        assert_eq!(value["mouseData"][0]["trusted"], false);
        assert_eq!(value["mouseData"][0]["t"], 3);
    }

    #[test]
    fn test_from_config_without_endpoint() {
        let remote = HttpRemoteClassifier::from_config(&RemoteConfig::default()).unwrap();
        assert!(remote.is_none());
    }

    #[test]
    fn test_from_config_rejects_zero_attempts() {
        let config = RemoteConfig {
            endpoint: Some("http://127.0.0.1:1/classify".to_string()),
            max_attempts: 0,
            ..RemoteConfig::default()
        };
        assert!(matches!(
            HttpRemoteClassifier::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_remote_is_unknown() {
        let remote: Option<HttpRemoteClassifier> = None;
        assert_eq!(remote.classify(&[]).await, Classification::Unknown);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unknown() {
        let config = RemoteConfig {
            endpoint: Some("http://127.0.0.1:1/classify".to_string()),
            max_attempts: 1,
            request_timeout_ms: 500,
            ..RemoteConfig::default()
        };
        let remote = HttpRemoteClassifier::from_config(&config).unwrap().unwrap();
        let samples = [Sample::new(0.0, 0.0, 0), Sample::new(5.0, 5.0, 16)];

        assert_eq!(remote.classify(&samples).await, Classification::Unknown);
    }

    #[tokio::test]
    async fn test_send_with_retry_zero_attempts_returns_none() {
        let client = Client::new();
        let result = send_with_retry(&client, |c| c.get("http://127.0.0.1:1/"), 0, "test").await;
        assert!(result.is_none());
    }
}
