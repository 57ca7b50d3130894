//! Unified Response Format (URF)
//!
//! This crate provides a provider-agnostic result representation for generative
//! model backends. Whatever shape a backend produces - synchronous text,
//! synchronous structured output, or an incremental token/tool-call stream -
//! the caller receives the same [`ResponseEnvelope`] and never needs to know
//! which backend produced it.
//!
//! ## Core Principles
//!
//! 1. **One Result Shape**: every backend adapter settles into a [`ResponseEnvelope`]
//! 2. **Lazy Streaming**: a stream is decoded on demand, incrementally or all at once
//! 3. **One-Shot Consumption**: a chunk sequence is drained at most once; reuse is
//!    a surfaced error, never a silent empty result
//! 4. **Tool Calling Support**: partial tool-call fragments accumulate into
//!    fully-formed invocations at stream completion
//!
//! ## Usage
//!
//! ```rust
//! use urf::{Chunk, ResponseEnvelope};
//!
//! // A backend adapter wraps its wire format into chunks.
//! let chunks = vec![Chunk::text("Hel"), Chunk::text("lo")];
//! let mut response = ResponseEnvelope::from_stream(chunks.into_iter());
//!
//! // Reading the settled text drains the stream behind the scenes.
//! assert_eq!(response.text().unwrap(), Some("Hello"));
//! assert!(response.is_stream_exhausted());
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Modules
// ============================================================================

pub mod envelope;
pub mod error;
pub mod streaming;

pub use envelope::{RawPayload, ResponseEnvelope, StreamView};
pub use error::StreamError;
pub use streaming::{Chunk, FunctionFragment, StreamProgress, ToolCallFragment};

#[cfg(feature = "streaming")]
pub use streaming::{decode_stream, DecodedStream};

// ============================================================================
// Core Value Types
// ============================================================================

/// A fully-formed tool invocation produced at stream finalization
///
/// Invocations only exist once every fragment for their index has arrived and
/// the accumulated argument string parsed as JSON. Before that point the
/// in-progress state is private to the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique identifier for this invocation, assigned by the backend
    pub id: String,
    /// Name of the tool being invoked
    pub name: String,
    /// Parsed input arguments for the tool
    pub input: serde_json::Value,
}

impl ToolInvocation {
    /// Create a tool invocation
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
