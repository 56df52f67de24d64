//! End-to-end tests through the real Gemini client.
//!
//! The `test_fake_gemini_*` tests run against a one-shot HTTP server on
//! localhost that records the request and replies with canned JSON, so they
//! exercise the wire format without credentials.
//!
//! `test_live_gemini_diagnosis` calls the real API. It is gated behind the
//! `E2E_ENABLED` environment variable and needs `GOOGLE_API_KEY`:
//!   E2E_ENABLED=1 GOOGLE_API_KEY=... cargo test --test e2e -- --nocapture

use leafdoc::{diagnose, DiagnosisConfig, DiagnosisError};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Request as seen by the fake server.
struct Captured {
    head: String,
    body: serde_json::Value,
}

/// Serve one request with `status` and `body`, then stop.
async fn fake_gemini(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];

        let header_end = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let length: usize = head
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();

        let reply = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(reply.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();

        Captured {
            head,
            body: request_body,
        }
    });

    (endpoint, handle)
}

fn leaf_image(dir: &Path) -> PathBuf {
    let path = dir.join("leaf.jpg");
    image::RgbImage::from_pixel(8, 8, image::Rgb([30, 120, 30]))
        .save(&path)
        .unwrap();
    path
}

fn config(endpoint: &str, out: &Path) -> DiagnosisConfig {
    DiagnosisConfig::builder()
        .api_key("test-key")
        .endpoint(endpoint)
        .output_dir(out)
        .api_timeout_secs(10)
        .build()
        .unwrap()
}

const OK_BODY: &str = r#"{
  "candidates": [{
    "content": {"parts": [
      {"text": "Powdery Mildew\n\nSymptoms:\nWhite powder on leaves\n\n"},
      {"text": "Causes:\nErysiphales fungi\n\nTreatment:\nSulfur spray\n\nPrevention:\nAirflow"}
    ]},
    "finishReason": "STOP"
  }]
}"#;

// ── Fake server ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fake_gemini_request_shape_and_answer() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (endpoint, server) = fake_gemini(200, OK_BODY).await;

    let output = diagnose(leaf_image(input.path()), &config(&endpoint, out.path()))
        .await
        .unwrap();
    let captured = server.await.unwrap();

    // Request line, auth header
    assert!(
        captured
            .head
            .starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent "),
        "head: {}",
        captured.head
    );
    assert!(captured.head.to_ascii_lowercase().contains("x-goog-api-key: test-key"));

    // Body
    let parts = &captured.body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("plant pathologist"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert!(!parts[1]["inlineData"]["data"].as_str().unwrap().is_empty());
    assert_eq!(captured.body["generationConfig"]["temperature"], 0.4);
    assert_eq!(captured.body["generationConfig"]["topK"], 32);
    assert_eq!(captured.body["generationConfig"]["maxOutputTokens"], 4096);
    assert_eq!(captured.body["safetySettings"].as_array().unwrap().len(), 4);
    assert_eq!(
        captured.body["safetySettings"][0]["threshold"],
        "BLOCK_MEDIUM_AND_ABOVE"
    );

    // Answer
    assert_eq!(output.record.disease_name(), "Powdery Mildew");
    assert_eq!(output.record.symptoms(), "White powder on leaves");
    assert_eq!(output.record.causes(), "Erysiphales fungi");
    assert_eq!(output.record.treatment(), "Sulfur spray");
    assert_eq!(output.record.prevention(), "Airflow");
    assert!(output.report_path.is_some());
}

#[tokio::test]
async fn test_fake_gemini_http_error_is_generation_failure() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (endpoint, server) = fake_gemini(
        403,
        r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#,
    )
    .await;

    let err = diagnose(leaf_image(input.path()), &config(&endpoint, out.path()))
        .await
        .unwrap_err();
    server.await.unwrap();

    match err {
        DiagnosisError::GenerationFailed { detail } => {
            assert!(detail.contains("403"), "detail: {detail}");
            assert!(detail.contains("API key not valid"), "detail: {detail}");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_fake_gemini_blocked_prompt_is_generation_failure() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (endpoint, server) =
        fake_gemini(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).await;

    let err = diagnose(leaf_image(input.path()), &config(&endpoint, out.path()))
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(
        matches!(err, DiagnosisError::GenerationFailed { ref detail } if detail.contains("SAFETY")),
        "got {err:?}"
    );
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_generation_failure() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };
    let endpoint = format!("http://127.0.0.1:{port}/v1beta");

    let err = diagnose(leaf_image(input.path()), &config(&endpoint, out.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, DiagnosisError::GenerationFailed { .. }), "got {err:?}");
}

// ── Live API ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_gemini_diagnosis() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 and GOOGLE_API_KEY to run");
        return;
    }
    if std::env::var("GOOGLE_API_KEY").is_err() {
        println!("SKIP — GOOGLE_API_KEY not set");
        return;
    }

    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let config = DiagnosisConfig::builder()
        .output_dir(out.path())
        .build()
        .unwrap();

    let output = diagnose(leaf_image(input.path()), &config).await.unwrap();
    println!("{}", output.raw_response);

    assert!(!output.raw_response.trim().is_empty());
    assert!(!output.record.disease_name().is_empty());
    assert!(output.html.contains("report-section"));
    let path = output.report_path.expect("report written");
    assert!(std::fs::read(path).unwrap().starts_with(b"%PDF"));
}
