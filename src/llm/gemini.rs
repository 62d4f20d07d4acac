use super::extract::{extract_text, text_increments};
use super::{GenerationRequest, GenerationResponse, LlmError, StreamChunk};
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Wall-clock limit for batch calls. Streaming calls are not limited.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }
}

pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerationResponse, LlmError>> + Send>>;

async fn check_status(resp: Response) -> Result<Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        message: text,
    })
}

/// Single batch call; the whole payload is read before returning.
pub async fn generate(
    config: &GeminiConfig,
    request: &GenerationRequest,
) -> Result<GenerationResponse, LlmError> {
    let client = Client::new();
    debug!(model = %config.model, turns = request.contents.len(), "generateContent");

    let resp = client
        .post(config.endpoint("generateContent"))
        .query(&[("key", config.api_key.as_str())])
        .header("Content-Type", "application/json")
        .timeout(config.timeout)
        .json(request)
        .send()
        .await?;
    let resp = check_status(resp).await?;

    let body = resp.text().await?;
    GenerationResponse::from_json(&body)
}

/// Open a server-sent-event stream. Each `data:` line carries one complete
/// response payload holding the next increment.
pub async fn generate_stream(
    config: &GeminiConfig,
    request: &GenerationRequest,
) -> Result<ResponseStream, LlmError> {
    let client = Client::new();
    debug!(model = %config.model, turns = request.contents.len(), "streamGenerateContent");

    let resp = client
        .post(config.endpoint("streamGenerateContent"))
        .query(&[("alt", "sse"), ("key", config.api_key.as_str())])
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await?;
    let resp = check_status(resp).await?;

    let mut bytes = resp.bytes_stream();
    let stream = async_stream::stream! {
        // Raw bytes are buffered so multi-byte characters split across
        // network chunks decode intact.
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::Stream(e.without_url().to_string()));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(event) = parse_sse_line(&line) {
                    yield event;
                }
            }
        }

        if let Some(event) = parse_sse_line(&buffer) {
            yield event;
        }
    };

    Ok(Box::pin(stream))
}

fn parse_sse_line(line: &[u8]) -> Option<Result<GenerationResponse, LlmError>> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim().strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(GenerationResponse::from_json(data))
}

async fn stream_text(
    config: &GeminiConfig,
    request: &GenerationRequest,
    on_chunk: &mut impl FnMut(StreamChunk),
) -> Result<String, LlmError> {
    let events = generate_stream(config, request).await?;
    let mut increments = std::pin::pin!(text_increments(events));
    let mut full_content = String::new();

    while let Some(fragment) = increments.next().await {
        let fragment = fragment?;
        full_content.push_str(&fragment);
        on_chunk(StreamChunk::delta(fragment));
    }

    Ok(full_content)
}

/// Stream the answer, falling back to one batch call if streaming fails at
/// any point. Returns the full text that was (finally) displayed.
pub async fn generate_with_fallback(
    config: &GeminiConfig,
    request: &GenerationRequest,
    mut on_chunk: impl FnMut(StreamChunk),
) -> Result<String, LlmError> {
    match stream_text(config, request, &mut on_chunk).await {
        Ok(full_content) => {
            on_chunk(StreamChunk::done());
            Ok(full_content)
        }
        Err(err) => {
            warn!(error = %err, "streaming failed, retrying once without streaming");
            on_chunk(StreamChunk::restart());

            let response = generate(config, request).await?;
            let content = extract_text(&response);
            if !content.is_empty() {
                on_chunk(StreamChunk::delta(content.clone()));
            }
            on_chunk(StreamChunk::done());
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    const BATCH_PATH: &str = "/v1beta/models/test-model:generateContent";
    const STREAM_PATH: &str = "/v1beta/models/test-model:streamGenerateContent";

    fn config(server: &mockito::Server) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".into(),
            base_url: server.url(),
            model: "test-model".into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn sse(fragments: &[&str]) -> String {
        fragments
            .iter()
            .map(|text| {
                let payload = serde_json::json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
                });
                format!("data: {}\r\n\r\n", payload)
            })
            .collect()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = GeminiConfig::new("k");
        config.base_url = "http://localhost:1234/".into();
        config.model = "m".into();
        assert_eq!(
            config.endpoint("generateContent"),
            "http://localhost:1234/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn test_parse_sse_line() {
        assert!(parse_sse_line(b": keep-alive\n").is_none());
        assert!(parse_sse_line(b"\r\n").is_none());
        assert!(parse_sse_line(b"data: [DONE]\n").is_none());

        let event = parse_sse_line(br#"data: {"candidates":[{"content":{"parts":[{"text":"x"}]}}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(extract_text(&event), "x");
    }

    #[tokio::test]
    async fn test_generate_sends_key_as_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Regex("\"contents\"".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"A"},{"text":"B"}]}}]}"#)
            .create_async()
            .await;

        let request = GenerationRequest::single_turn("question");
        let response = generate(&config(&server), &request).await.unwrap();
        assert_eq!(extract_text(&response), "AB");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_surfaces_status_and_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("model not found")
            .create_async()
            .await;

        let err = generate(&config(&server), &GenerationRequest::single_turn("q"))
            .await
            .unwrap_err();
        match err {
            LlmError::Api {
                status,
                reason,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_delivers_fragments_in_order() {
        let mut server = mockito::Server::new_async().await;
        let stream_mock = server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("alt".into(), "sse".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse(&["こんに", "ちは", " world"]))
            .create_async()
            .await;
        let batch_mock = server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut chunks = Vec::new();
        let text = generate_with_fallback(
            &config(&server),
            &GenerationRequest::single_turn("q"),
            |chunk| chunks.push(chunk),
        )
        .await
        .unwrap();

        assert_eq!(text, "こんにちは world");
        assert_eq!(
            chunks,
            vec![
                StreamChunk::delta("こんに"),
                StreamChunk::delta("ちは"),
                StreamChunk::delta(" world"),
                StreamChunk::done(),
            ]
        );
        stream_mock.assert_async().await;
        batch_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_failure_falls_back_to_batch_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;
        let batch_mock = server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"full answer"}]}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut chunks = Vec::new();
        let text = generate_with_fallback(
            &config(&server),
            &GenerationRequest::single_turn("q"),
            |chunk| chunks.push(chunk),
        )
        .await
        .unwrap();

        assert_eq!(text, "full answer");
        assert_eq!(
            chunks,
            vec![
                StreamChunk::restart(),
                StreamChunk::delta("full answer"),
                StreamChunk::done(),
            ]
        );
        batch_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_stream_event_triggers_fallback() {
        let mut server = mockito::Server::new_async().await;
        let mut body = sse(&["partial"]);
        body.push_str("data: {not json\n\n");
        server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"recovered"}]}}]}"#)
            .create_async()
            .await;

        let mut chunks = Vec::new();
        let text = generate_with_fallback(
            &config(&server),
            &GenerationRequest::single_turn("q"),
            |chunk| chunks.push(chunk),
        )
        .await
        .unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(chunks[0], StreamChunk::delta("partial"));
        assert_eq!(chunks[1], StreamChunk::restart());
    }

    #[tokio::test]
    async fn test_fallback_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("quota")
            .expect(1)
            .create_async()
            .await;

        let err = generate_with_fallback(
            &config(&server),
            &GenerationRequest::single_turn("q"),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_connection_errors_do_not_show_api_key() {
        let config = GeminiConfig {
            api_key: "SECRET-KEY-123".into(),
            base_url: "http://127.0.0.1:1".into(),
            model: "m".into(),
            timeout: Duration::from_secs(5),
        };
        let request = GenerationRequest::single_turn("q");

        let err = generate_stream(&config, &request).await.err().unwrap();
        assert!(matches!(err, LlmError::Http(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));

        let err = generate_with_fallback(&config, &request, |_| {})
            .await
            .unwrap_err();
        let shown = crate::error::AppError::from(err).to_string();
        assert!(shown.starts_with("HTTP error"));
        assert!(!shown.contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_timeout_applies_to_batch_calls_only() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", BATCH_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(2500));
                w.write_all(br#"{"candidates":[]}"#)
            })
            .create_async()
            .await;
        let slow_first = sse(&["slow"]);
        let slow_second = sse(&[" but complete"]);
        server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(move |w| {
                w.write_all(slow_first.as_bytes())?;
                w.flush()?;
                std::thread::sleep(Duration::from_millis(1500));
                w.write_all(slow_second.as_bytes())
            })
            .create_async()
            .await;

        let mut config = config(&server);
        config.timeout = Duration::from_secs(1);
        let request = GenerationRequest::single_turn("q");

        let err = generate(&config, &request).await.unwrap_err();
        match err {
            LlmError::Http(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }

        let mut chunks = Vec::new();
        let text = generate_with_fallback(&config, &request, |chunk| chunks.push(chunk))
            .await
            .unwrap();
        assert_eq!(text, "slow but complete");
        assert!(!chunks.contains(&StreamChunk::restart()));
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", STREAM_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("data: {\"candidates\":[]}\n\n")
            .create_async()
            .await;

        let text = generate_with_fallback(
            &config(&server),
            &GenerationRequest::single_turn("q"),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(text, "");
    }
}
