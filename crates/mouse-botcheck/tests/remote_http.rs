//! HTTP remote classifier against a throwaway local server.

use mouse_botcheck::{Classification, HttpRemoteClassifier, RemoteClassifier, RemoteConfig, Sample};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves exactly one request with `status` and `body`, returning the raw
/// request body the client sent.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];
        let request_body = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            raw.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&raw).to_string();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length: usize = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse().ok())?
                })
                .unwrap_or(0);
            let body_start = header_end + 4;
            if raw.len() >= body_start + content_length {
                break String::from_utf8_lossy(&raw[body_start..body_start + content_length]).to_string();
            }
        };

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        request_body
    });

    (format!("http://{addr}/classify"), handle)
}

fn classifier(endpoint: String) -> HttpRemoteClassifier {
    let config = RemoteConfig {
        endpoint: Some(endpoint),
        max_attempts: 1,
        request_timeout_ms: 2_000,
        ..RemoteConfig::default()
    };
    HttpRemoteClassifier::from_config(&config).unwrap().unwrap()
}

fn trajectory() -> Vec<Sample> {
    vec![
        Sample::new(0.0, 0.0, 0),
        Sample::with_trust(10.0, 0.0, 50, false),
        Sample::new(10.0, 10.0, 450),
    ]
}

#[tokio::test]
async fn bot_response_is_parsed() {
    let (endpoint, server) = serve_once("200 OK", r#"{"classification": 1, "model": "test"}"#).await;
    let verdict = classifier(endpoint).classify(&trajectory()).await;
    assert_eq!(verdict, Classification::Bot);

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert!(sent["prompt"].as_str().unwrap().contains("mouse movement data"));
    assert_eq!(sent["mouseData"].as_array().unwrap().len(), 3);
    assert_eq!(sent["mouseData"][1]["trusted"], false);
}

#[tokio::test]
async fn human_response_is_parsed() {
    let (endpoint, server) = serve_once("200 OK", r#"{"classification": "0"}"#).await;
    assert_eq!(classifier(endpoint).classify(&trajectory()).await, Classification::Human);
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_response_is_unknown() {
    let (endpoint, server) = serve_once("200 OK", "not json").await;
    assert_eq!(classifier(endpoint).classify(&trajectory()).await, Classification::Unknown);
    server.await.unwrap();
}

#[tokio::test]
async fn client_error_status_is_unknown() {
    let (endpoint, server) = serve_once("400 Bad Request", r#"{"error": "bad"}"#).await;
    assert_eq!(classifier(endpoint).classify(&trajectory()).await, Classification::Unknown);
    server.await.unwrap();
}
