//! Type definitions for streaming responses.

use serde::{Deserialize, Serialize};

/// One increment of streamed model output
///
/// Backend adapters resolve their wire format into one of these two cases
/// before the chunk enters the decoder, so no runtime shape probing happens
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Chunk {
    /// A bare text delta
    Text(String),
    /// A text delta (possibly empty) plus partial tool-call data
    Structured {
        /// Newly generated text since the previous chunk
        #[serde(default)]
        text: String,
        /// Partial tool invocations carried by this chunk, in arrival order
        #[serde(default)]
        tool_calls: Vec<ToolCallFragment>,
    },
}

impl Chunk {
    /// Create a bare text chunk
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a structured chunk carrying text and/or tool-call fragments
    pub fn structured(text: impl Into<String>, tool_calls: Vec<ToolCallFragment>) -> Self {
        Self::Structured {
            text: text.into(),
            tool_calls,
        }
    }
}

/// A partial tool invocation carried by one chunk
///
/// Fragments sharing an `index` extend the same in-progress invocation across
/// chunks. `id`, `r#type` and the function `name` typically arrive once on the
/// first fragment; `arguments` arrives in pieces that must be concatenated in
/// arrival order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Position identifying which in-progress invocation this fragment extends
    pub index: usize,
    /// Invocation identifier, empty until the backend supplies it
    #[serde(default)]
    pub id: String,
    /// Vendor-defined invocation kind, passed through opaquely
    #[serde(default, rename = "type")]
    pub r#type: String,
    /// Partial function name/arguments, if this fragment carries any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionFragment>,
}

impl ToolCallFragment {
    /// Create a fragment that opens an invocation at `index`
    pub fn opening(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            r#type: "function".to_string(),
            function: Some(FunctionFragment {
                name: name.into(),
                arguments: String::new(),
            }),
        }
    }

    /// Create a fragment that appends an arguments delta to `index`
    pub fn arguments(index: usize, delta: impl Into<String>) -> Self {
        Self {
            index,
            id: String::new(),
            r#type: String::new(),
            function: Some(FunctionFragment {
                name: String::new(),
                arguments: delta.into(),
            }),
        }
    }
}

/// Partial function data within a tool-call fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionFragment {
    /// Function name, empty if this fragment does not carry it
    #[serde(default)]
    pub name: String,
    /// A piece of the JSON-encoded argument string
    #[serde(default)]
    pub arguments: String,
}

/// One emission of the incremental stream view
///
/// `text` is the delta for a single chunk, not the accumulated total; the
/// envelope's settled text carries the concatenation. Exactly one progress
/// item per drain has `is_final = true`, and it is always the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProgress {
    /// Whether this is the last emission of the stream
    pub is_final: bool,
    /// The text delta carried by the corresponding chunk
    pub text: String,
}

/// Settled output of an async whole-stream drain
///
/// Returned by [`decode_stream`](super::decode_stream).
#[cfg(feature = "streaming")]
#[derive(Debug, Clone)]
pub struct DecodedStream {
    /// Concatenation of every text delta in the stream
    pub text: String,
    /// Finalized tool invocations, in index order
    pub tool_invocations: Vec<crate::ToolInvocation>,
}
