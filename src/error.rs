//! Error types for stream decoding.

use thiserror::Error;

/// Errors surfaced while decoding a chunk stream.
///
/// Upstream exhaustion is not represented here: a chunk source simply ending
/// is the expected terminal condition, not a failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreamError {
    /// The stream has been consumed already. Obtain the result from the
    /// settled text field instead of iterating again.
    ///
    /// This is a programming-contract breach, not a data problem, so it is
    /// always surfaced rather than mapped to an empty sequence.
    #[error("the stream has been consumed already; obtain the result from the settled text field")]
    ReuseViolation,

    /// The accumulated argument string for a tool call failed to parse as
    /// JSON at finalization.
    #[error("tool call at index {index}: accumulated arguments are not valid JSON")]
    MalformedToolArguments {
        /// Index of the offending in-progress invocation
        index: usize,
        /// The underlying JSON parse error
        #[source]
        source: serde_json::Error,
    },
}
