//! Lazy one-shot decoder for chunk sequences.

use std::collections::BTreeMap;

use super::types::{Chunk, StreamProgress, ToolCallFragment};
use crate::error::StreamError;
use crate::ToolInvocation;

/// In-progress invocation builder, one per fragment index.
#[derive(Debug, Default)]
struct PendingInvocation {
    id: String,
    r#type: String,
    name: String,
    arguments: String,
}

impl PendingInvocation {
    /// Merge one fragment into this builder.
    ///
    /// `id`, `type` and `name` fill in once and keep their first non-empty
    /// value; `arguments` deltas append in arrival order, never reordered.
    fn merge(&mut self, fragment: ToolCallFragment) {
        if self.id.is_empty() && !fragment.id.is_empty() {
            self.id = fragment.id;
        }
        if self.r#type.is_empty() && !fragment.r#type.is_empty() {
            self.r#type = fragment.r#type;
        }
        if let Some(function) = fragment.function {
            if self.name.is_empty() && !function.name.is_empty() {
                self.name = function.name;
            }
            self.arguments.push_str(&function.arguments);
        }
    }
}

/// Ordered accumulator for tool-call fragments, keyed by index.
///
/// Owned exclusively by one decoder for the lifetime of one drain; nothing is
/// visible to callers until finalization. A BTreeMap keeps sparse indices in
/// order (a backend may open an invocation at index 1 when index 0 was a text
/// block).
#[derive(Debug, Default)]
pub(crate) struct FragmentAccumulator {
    pending: BTreeMap<usize, PendingInvocation>,
}

impl FragmentAccumulator {
    /// Merge one fragment into the builder for its index
    pub(crate) fn merge(&mut self, fragment: ToolCallFragment) {
        self.pending.entry(fragment.index).or_default().merge(fragment);
    }

    /// Materialize every accumulated builder into a finished invocation
    ///
    /// Fails on the first builder whose accumulated argument string is not
    /// valid JSON, attributing the error to that builder's index.
    pub(crate) fn finalize(&mut self) -> Result<Vec<ToolInvocation>, StreamError> {
        let pending = std::mem::take(&mut self.pending);
        let mut invocations = Vec::with_capacity(pending.len());
        for (index, entry) in pending {
            let input = serde_json::from_str(&entry.arguments)
                .map_err(|source| StreamError::MalformedToolArguments { index, source })?;
            invocations.push(ToolInvocation {
                id: entry.id,
                name: entry.name,
                input,
            });
        }
        Ok(invocations)
    }
}

/// Lazy decoder over a pull-based chunk sequence.
///
/// Emits one [`StreamProgress`] per chunk, one chunk behind consumption: the
/// only reliable signal of "last chunk" in a pull-based sequence is exhaustion
/// of the source itself, so one delta stays buffered until the next pull
/// either replaces it or proves it was the last. Finite and not restartable;
/// the reuse guard lives in [`ResponseEnvelope`](crate::ResponseEnvelope),
/// which owns the decoder.
pub struct StreamDecoder {
    source: Box<dyn Iterator<Item = Chunk> + Send>,
    fragments: FragmentAccumulator,
    /// Delta held back for one-behind emission
    buffered: Option<String>,
    text: String,
    invocations: Vec<ToolInvocation>,
    finished: bool,
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("text", &self.text)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl StreamDecoder {
    /// Create a decoder over a chunk source
    pub fn new(source: impl Iterator<Item = Chunk> + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            fragments: FragmentAccumulator::default(),
            buffered: None,
            text: String::new(),
            invocations: Vec::new(),
            finished: false,
        }
    }

    /// Concatenation of all deltas emitted so far
    pub fn text_so_far(&self) -> &str {
        &self.text
    }

    /// Whether the underlying sequence has been consumed to completion
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the invocations finalized at stream completion
    pub(crate) fn take_invocations(&mut self) -> Vec<ToolInvocation> {
        std::mem::take(&mut self.invocations)
    }

    /// Pull chunks until one emission is due, or the source ends.
    ///
    /// Returns `None` once the sequence is fully consumed; a zero-chunk
    /// source finishes with no emissions at all.
    pub fn advance(&mut self) -> Option<Result<StreamProgress, StreamError>> {
        if self.finished {
            return None;
        }
        loop {
            match self.source.next() {
                Some(chunk) => {
                    let delta = match chunk {
                        Chunk::Text(text) => text,
                        Chunk::Structured { text, tool_calls } => {
                            for fragment in tool_calls {
                                self.fragments.merge(fragment);
                            }
                            text
                        }
                    };
                    // The very first chunk only primes the buffer; every later
                    // chunk releases the previous delta.
                    if let Some(previous) = self.buffered.replace(delta) {
                        self.text.push_str(&previous);
                        return Some(Ok(StreamProgress {
                            is_final: false,
                            text: previous,
                        }));
                    }
                }
                None => {
                    self.finished = true;
                    let last = self.buffered.take()?;
                    self.text.push_str(&last);
                    match self.fragments.finalize() {
                        Ok(invocations) => self.invocations = invocations,
                        Err(error) => return Some(Err(error)),
                    }
                    return Some(Ok(StreamProgress {
                        is_final: true,
                        text: last,
                    }));
                }
            }
        }
    }
}

/// Drain an entire async chunk stream into its settled form.
///
/// The async counterpart of handing a chunk iterator to a
/// [`ResponseEnvelope`](crate::ResponseEnvelope) and reading the settled
/// text: the whole stream is consumed and only the final view is returned.
/// Use the envelope's incremental view when progressive display matters.
#[cfg(feature = "streaming")]
pub async fn decode_stream<S>(mut stream: S) -> Result<super::DecodedStream, StreamError>
where
    S: futures_util::Stream<Item = Chunk> + Unpin,
{
    use futures_util::StreamExt;

    let mut fragments = FragmentAccumulator::default();
    let mut text = String::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Chunk::Text(delta) => text.push_str(&delta),
            Chunk::Structured {
                text: delta,
                tool_calls,
            } => {
                text.push_str(&delta);
                for fragment in tool_calls {
                    fragments.merge(fragment);
                }
            }
        }
    }

    Ok(super::DecodedStream {
        text,
        tool_invocations: fragments.finalize()?,
    })
}
