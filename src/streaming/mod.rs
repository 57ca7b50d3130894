//! Streaming response decoding.
//!
//! This module turns a pull-based sequence of incremental chunks into a final
//! text value and a final list of tool invocations. Text deltas surface to
//! the caller as they arrive; tool-call fragments accumulate keyed by index
//! and materialize only once the sequence is consumed to completion.

mod decoder;
mod types;

pub use decoder::StreamDecoder;
pub use types::{Chunk, FunctionFragment, StreamProgress, ToolCallFragment};

#[cfg(feature = "streaming")]
pub use decoder::decode_stream;
#[cfg(feature = "streaming")]
pub use types::DecodedStream;

#[cfg(test)]
mod tests;
