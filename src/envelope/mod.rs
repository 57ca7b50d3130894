//! Response envelope: the uniform result of a model backend call.
//!
//! A [`ResponseEnvelope`] aligns the return shapes of different backends so
//! downstream callers consume one object regardless of whether the backend
//! answered with settled text, structured output, or an incremental stream.
//! For streaming responses the envelope owns the decoder and exposes two
//! views that converge on the same accumulation logic: the incremental view
//! ([`ResponseEnvelope::stream`]) and the settled view
//! ([`ResponseEnvelope::text`]).

use serde::Serialize;

use crate::error::StreamError;
use crate::streaming::{Chunk, StreamDecoder, StreamProgress};
use crate::ToolInvocation;

/// Raw backend payload, carried untouched for diagnostics
///
/// The backend adapter decides the case up front: structurally serializable
/// payloads travel as [`RawPayload::Json`] and embed directly in the
/// diagnostic form, anything else is coerced to its display string first.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// A payload that serializes structurally
    Json(serde_json::Value),
    /// The display-string form of a non-serializable payload
    Text(String),
}

impl RawPayload {
    /// Coerce a displayable payload to its string form
    pub fn text(value: impl ToString) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for RawPayload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Stream lifecycle held by the envelope.
///
/// `Absent` never transitions; `Ready` moves to `Open` when a view is handed
/// out and to `Exhausted` only when the sequence is consumed to completion.
/// A view dropped mid-drain leaves the slot `Open`, so any later consumption
/// attempt is rejected as a reuse instead of silently reading a torn stream.
enum StreamSlot {
    Absent,
    Ready(StreamDecoder),
    Open,
    Exhausted,
}

/// Encapsulation of data returned by a model backend
///
/// Acts as the bridge between backends and their callers: constructed once
/// by the backend adapter, either already settled (non-streaming case) or
/// open (carrying a live chunk sequence), and settled exactly once after
/// that - explicitly through the incremental view or implicitly on the first
/// settled-text read.
pub struct ResponseEnvelope {
    text: Option<String>,
    /// Embedding vector returned by the backend, passed through untouched
    pub embedding: Option<Vec<f64>>,
    /// Image URLs returned by the backend, passed through untouched
    pub image_urls: Option<Vec<String>>,
    /// Raw backend payload, passed through untouched
    pub raw: Option<RawPayload>,
    /// Parsed structured value, passed through untouched
    pub parsed: Option<serde_json::Value>,
    tool_invocations: Vec<ToolInvocation>,
    slot: StreamSlot,
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self {
            text: None,
            embedding: None,
            image_urls: None,
            raw: None,
            parsed: None,
            tool_invocations: Vec::new(),
            slot: StreamSlot::Absent,
        }
    }
}

impl std::fmt::Debug for ResponseEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseEnvelope")
            .field("text", &self.text)
            .field("tool_invocations", &self.tool_invocations)
            .field("exhausted", &self.is_stream_exhausted())
            .finish_non_exhaustive()
    }
}

impl ResponseEnvelope {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a settled envelope from backend text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Create an open envelope over a live chunk sequence
    ///
    /// The sequence is pulled lazily: nothing is consumed until the caller
    /// opens the incremental view or reads the settled text.
    pub fn from_stream(source: impl Iterator<Item = Chunk> + Send + 'static) -> Self {
        Self {
            slot: StreamSlot::Ready(StreamDecoder::new(source)),
            ..Self::default()
        }
    }

    /// Attach an embedding vector
    pub fn with_embedding(mut self, embedding: Vec<f64>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Attach image URLs
    pub fn with_image_urls(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = Some(image_urls);
        self
    }

    /// Attach the raw backend payload
    pub fn with_raw(mut self, raw: impl Into<RawPayload>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Attach a parsed structured value
    pub fn with_parsed(mut self, parsed: serde_json::Value) -> Self {
        self.parsed = Some(parsed);
        self
    }

    /// Attach already-settled tool invocations (non-streaming case)
    pub fn with_tool_invocations(mut self, tool_invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = tool_invocations;
        self
    }

    /// Return the settled text, draining the stream first if necessary.
    ///
    /// Text supplied at construction (or through [`set_text`]) is returned
    /// immediately with no side effect. Otherwise, if an untouched stream
    /// exists it is consumed to completion here, which also finalizes tool
    /// invocations and flips the exhaustion flag. Reading through this
    /// accessor after a partial drain is a second consumption attempt and
    /// fails with [`StreamError::ReuseViolation`].
    ///
    /// [`set_text`]: ResponseEnvelope::set_text
    pub fn text(&mut self) -> Result<Option<&str>, StreamError> {
        if self.text.is_none() && !matches!(self.slot, StreamSlot::Absent | StreamSlot::Exhausted) {
            if let Some(view) = self.stream()? {
                for progress in view {
                    progress?;
                }
            }
        }
        Ok(self.text.as_deref())
    }

    /// Override the settled text directly, bypassing all stream logic
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Whether the stream has been consumed to completion
    ///
    /// Always `false` for non-streaming responses. Pure query, never pulls.
    pub fn is_stream_exhausted(&self) -> bool {
        matches!(self.slot, StreamSlot::Exhausted)
    }

    /// Tool invocations finalized so far, in index order
    ///
    /// Empty until the stream drains (if a stream is present); entries are
    /// appended at finalization and never rewritten.
    pub fn tool_invocations(&self) -> &[ToolInvocation] {
        &self.tool_invocations
    }

    /// Open the incremental view over the chunk sequence.
    ///
    /// Returns `Ok(None)` for non-streaming responses. The view yields one
    /// [`StreamProgress`] per chunk and updates this envelope's settled text
    /// as each delta is emitted, so mid-stream reads of the envelope observe
    /// live progress. A second open - after exhaustion or after a view was
    /// dropped mid-drain - fails with [`StreamError::ReuseViolation`] rather
    /// than yielding an empty sequence that would mask the bug.
    pub fn stream(&mut self) -> Result<Option<StreamView<'_>>, StreamError> {
        match std::mem::replace(&mut self.slot, StreamSlot::Open) {
            StreamSlot::Absent => {
                self.slot = StreamSlot::Absent;
                Ok(None)
            }
            StreamSlot::Ready(decoder) => Ok(Some(StreamView {
                envelope: self,
                decoder: Some(decoder),
            })),
            StreamSlot::Open => Err(StreamError::ReuseViolation),
            StreamSlot::Exhausted => {
                self.slot = StreamSlot::Exhausted;
                Err(StreamError::ReuseViolation)
            }
        }
    }

    /// Serialize the settled fields as pretty-printed JSON for diagnostics.
    ///
    /// Settles the text first (same rules as [`text`]), then renders
    /// `{text, embedding, image_urls, parsed, raw}` in that order.
    /// [`RawPayload::Json`] embeds structurally; [`RawPayload::Text`] embeds
    /// as its display string. Not a wire format.
    ///
    /// [`text`]: ResponseEnvelope::text
    pub fn to_diagnostic_string(&mut self) -> Result<String, StreamError> {
        #[derive(Serialize)]
        struct DiagnosticView<'a> {
            text: Option<&'a str>,
            embedding: &'a Option<Vec<f64>>,
            image_urls: &'a Option<Vec<String>>,
            parsed: &'a Option<serde_json::Value>,
            raw: &'a Option<RawPayload>,
        }

        self.text()?;
        let view = DiagnosticView {
            text: self.text.as_deref(),
            embedding: &self.embedding,
            image_urls: &self.image_urls,
            parsed: &self.parsed,
            raw: &self.raw,
        };
        Ok(serde_json::to_string_pretty(&view)
            .unwrap_or_else(|error| format!("{{\"error\": \"{error}\"}}")))
    }
}

/// Borrowing iterator over the incremental view of an open envelope.
///
/// Yields `Result<StreamProgress, StreamError>`; exactly one `Ok` item per
/// drain has `is_final = true` and it is always the last. Dropping the view
/// before completion leaves the envelope's stream slot `Open`, permanently
/// rejecting further consumption.
pub struct StreamView<'a> {
    envelope: &'a mut ResponseEnvelope,
    decoder: Option<StreamDecoder>,
}

impl StreamView<'_> {
    /// Mark the sequence fully consumed and drop the decoder.
    fn finish(&mut self) {
        self.decoder = None;
        self.envelope.slot = StreamSlot::Exhausted;
    }
}

impl Iterator for StreamView<'_> {
    type Item = Result<StreamProgress, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoder = self.decoder.as_mut()?;
        match decoder.advance() {
            Some(Ok(progress)) => {
                self.envelope.text = Some(decoder.text_so_far().to_string());
                if progress.is_final {
                    let invocations = decoder.take_invocations();
                    self.envelope.tool_invocations.extend(invocations);
                    self.finish();
                }
                Some(Ok(progress))
            }
            Some(Err(error)) => {
                // The text deltas observed so far still settle; only the
                // malformed invocation is withheld, and loudly.
                self.envelope.text = Some(decoder.text_so_far().to_string());
                self.finish();
                Some(Err(error))
            }
            None => {
                // Zero-chunk source: consumed to completion with no
                // emissions, settled text left at its prior value.
                self.finish();
                None
            }
        }
    }
}
