// Retry and refusal behavior of the translation client against a canned
// HTTP server.

use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ytsub::YtSubError;
use ytsub::config::LlmConfig;
use ytsub::translate::{TranslationClient, Translator};

fn chat_json(content: &str) -> String {
    format!(
        r#"{{"choices":[{{"message":{{"role":"assistant","content":"{}"}},"finish_reason":"stop"}}]}}"#,
        content
    )
}

/// Serve one canned response per connection, in order, then stop.
async fn spawn_server(responses: Vec<(u16, &'static str, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for (status, reason, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    format!("http://{}", addr)
}

/// Read a full HTTP request (headers plus Content-Length body).
async fn read_request(socket: &mut TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= pos + 4 + content_length {
                return;
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn client(base_url: String) -> TranslationClient {
    // PATH is always set, which makes it a convenient stand-in key source.
    TranslationClient::new(LlmConfig {
        base_url,
        model: "test-model".to_string(),
        api_key_env: "PATH".to_string(),
        timeout_secs: 10,
        max_retries: 3,
    })
    .unwrap()
}

#[tokio::test]
async fn test_429_is_retried_with_backoff() {
    let base_url = spawn_server(vec![
        (429, "Too Many Requests", r#"{"error":"slow down"}"#.to_string()),
        (200, "OK", chat_json("Hola")),
    ])
    .await;

    let started = Instant::now();
    let result = client(base_url)
        .translate("Hello", "en", "es", false)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result, "Hola");
    // One backoff interval of 2 s between the two attempts.
    assert!(elapsed >= Duration::from_millis(1900), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let base_url = spawn_server(vec![(
        404,
        "Not Found",
        r#"{"error":"no such model"}"#.to_string(),
    )])
    .await;

    let started = Instant::now();
    let err = client(base_url)
        .translate("Hello", "en", "es", false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("404"), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_refusal_fails_despite_http_200() {
    let base_url = spawn_server(vec![(
        200,
        "OK",
        chat_json("I cannot translate this content."),
    )])
    .await;

    let err = client(base_url)
        .translate("Hello", "en", "es", false)
        .await
        .unwrap_err();

    assert!(matches!(err, YtSubError::Translation(_)));
    assert!(err.to_string().to_lowercase().contains("refused"), "{}", err);
}

#[tokio::test]
async fn test_empty_content_is_a_failure() {
    let base_url = spawn_server(vec![(200, "OK", chat_json(""))]).await;

    let err = client(base_url)
        .translate("Hello", "en", "es", false)
        .await
        .unwrap_err();
    assert!(matches!(err, YtSubError::Translation(_)));
}
