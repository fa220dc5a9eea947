//! HTTP client for `models/{model}:streamGenerateContent?alt=sse`.

use std::pin::Pin;

use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::{debug, instrument, warn};

use crate::config::{mask_token, GeminiConfig};
use crate::error::GenerationError;
use crate::sse::{drain_next_event, extract_data};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Stream of decoded response chunks.
pub type ChunkStream = BoxStream<'static, Result<GenerateContentResponse, GenerationError>>;

/// Largest error body kept for the error message.
const MAX_ERROR_BODY: usize = 2048;

/// Gemini REST client. Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        debug!(
            base_url = %config.base_url,
            api_key = %mask_token(&config.api_key),
            "Creating Gemini client"
        );
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Starts a streamed generation and returns the decoded chunk stream.
    ///
    /// Connection failures map to [`GenerationError::Transport`], non-2xx answers to
    /// [`GenerationError::Api`]. Chunks that are not valid JSON surface as
    /// [`GenerationError::UnsupportedShape`] items inside the stream.
    #[instrument(skip(self, request), fields(turns = request.contents.len()))]
    pub async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream, GenerationError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            warn!(status = status.as_u16(), "Gemini request failed");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()))
            .boxed();
        Ok(sse_chunks(body))
    }
}

struct SseState {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>,
    buffer: Vec<u8>,
    done: bool,
}

fn parse_event(event: &[u8]) -> Option<Result<GenerateContentResponse, GenerationError>> {
    let event = String::from_utf8_lossy(event);
    let data = extract_data(&event)?;
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(data).map_err(|e| {
        GenerationError::UnsupportedShape(format!("malformed response chunk: {}", e))
    }))
}

/// Turns a byte stream into decoded chunks. A transport error ends the stream after it is yielded.
fn sse_chunks(body: Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>) -> ChunkStream {
    let state = SseState {
        body,
        buffer: Vec::new(),
        done: false,
    };
    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = drain_next_event(&mut st.buffer) {
                match parse_event(&event) {
                    Some(item) => return Some((item, st)),
                    None => continue,
                }
            }
            if st.done {
                if st.buffer.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let tail = std::mem::take(&mut st.buffer);
                return parse_event(&tail).map(|item| (item, st));
            }
            match st.body.next().await {
                Some(Ok(bytes)) => st.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.done = true;
                    st.buffer.clear();
                    return Some((Err(GenerationError::Transport(e.to_string())), st));
                }
                None => st.done = true,
            }
        }
    })
    .boxed()
}
