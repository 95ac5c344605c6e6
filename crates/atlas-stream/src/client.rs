//! HTTP client for the analysis service

use crate::{
    decoder::FrameDecoder,
    error::{Error, Result},
};
use async_stream::stream;
use futures::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use tokio_stream::Stream;

/// A stream of raw frame payloads, in arrival order.
///
/// Items are the undecoded JSON texts carried by each frame; interpreting
/// them (including rejecting malformed ones) is the consumer's concern.
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    #[serde(rename = "businessId")]
    business_id: &'a str,
    user_query: &'a str,
}

/// Client for the `/analyze` streaming endpoint
#[derive(Clone)]
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    /// Create a new client for the given service base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Submit a query and stream back the decoded frame payloads.
    ///
    /// A non-success status fails here, before any payload is yielded.
    /// Dropping the returned stream aborts the underlying request.
    pub async fn analyze(&self, business_id: &str, user_query: &str) -> Result<PayloadStream> {
        let url = format!("{}/analyze", self.base_url);
        tracing::debug!("Analysis request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("accept", "text/event-stream")
            .json(&AnalyzeRequest {
                business_id,
                user_query,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let mut bytes = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut decoder = FrameDecoder::new();
            let mut carry = Utf8Carry::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(Error::Http(e));
                        return;
                    }
                };

                let text = carry.push(&chunk);
                if !text.is_empty() {
                    for payload in decoder.push(&text) {
                        yield Ok(payload);
                    }
                }
            }

            let trailing = carry.finish();
            if !trailing.is_empty() {
                for payload in decoder.push(&trailing) {
                    yield Ok(payload);
                }
            }

            if let Some(payload) = decoder.finish() {
                yield Ok(payload);
            }
        }))
    }
}

/// Carries the bytes of a UTF-8 sequence split across chunk boundaries.
///
/// Only a truncated sequence at the tail is held back for the next chunk;
/// a genuinely invalid sequence is replaced with U+FFFD and decoding keeps
/// moving, so one bad byte cannot dam up the rest of the stream.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Feed one chunk of bytes, returning all text decodable so far
    fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    match e.error_len() {
                        // Invalid sequence: replace it and keep draining.
                        Some(len) => {
                            let end = valid + len;
                            out.push_str(&String::from_utf8_lossy(&self.pending[..end]));
                            self.pending.drain(..end);
                        }
                        // Truncated sequence at the tail; wait for more bytes.
                        None => {
                            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end-of-stream; a held-back truncated sequence decodes lossily
    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}
