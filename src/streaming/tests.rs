//! Tests for the stream decoder

use super::decoder::FragmentAccumulator;
use super::*;
use crate::error::StreamError;

fn chunks(deltas: &[&str]) -> std::vec::IntoIter<Chunk> {
    deltas
        .iter()
        .map(|delta| Chunk::text(*delta))
        .collect::<Vec<_>>()
        .into_iter()
}

#[test]
fn test_one_behind_emission() {
    let mut decoder = StreamDecoder::new(chunks(&["Hel", "lo"]));

    let first = decoder.advance().unwrap().unwrap();
    assert_eq!(
        first,
        StreamProgress {
            is_final: false,
            text: "Hel".to_string()
        }
    );
    assert_eq!(decoder.text_so_far(), "Hel");

    let second = decoder.advance().unwrap().unwrap();
    assert_eq!(
        second,
        StreamProgress {
            is_final: true,
            text: "lo".to_string()
        }
    );
    assert_eq!(decoder.text_so_far(), "Hello");

    assert!(decoder.advance().is_none());
    assert!(decoder.is_finished());
}

#[test]
fn test_single_chunk_is_final() {
    let mut decoder = StreamDecoder::new(chunks(&["only"]));

    let progress = decoder.advance().unwrap().unwrap();
    assert!(progress.is_final);
    assert_eq!(progress.text, "only");
    assert!(decoder.advance().is_none());
}

#[test]
fn test_zero_chunks_finish_without_emission() {
    let mut decoder = StreamDecoder::new(chunks(&[]));

    assert!(decoder.advance().is_none());
    assert!(decoder.is_finished());
    assert_eq!(decoder.text_so_far(), "");
}

#[test]
fn test_arguments_concatenate_in_arrival_order() {
    let mut acc = FragmentAccumulator::default();
    acc.merge(ToolCallFragment::opening(0, "call_123", "search"));
    acc.merge(ToolCallFragment::arguments(0, "{\"a\":"));
    acc.merge(ToolCallFragment::arguments(0, "1}"));

    let invocations = acc.finalize().unwrap();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].id, "call_123");
    assert_eq!(invocations[0].name, "search");
    assert_eq!(invocations[0].input, serde_json::json!({"a": 1}));
}

#[test]
fn test_late_id_and_name_fill_in_once() {
    let mut acc = FragmentAccumulator::default();
    acc.merge(ToolCallFragment::arguments(0, "{"));
    acc.merge(ToolCallFragment::opening(0, "call_1", "open"));
    acc.merge(ToolCallFragment::arguments(0, "}"));
    // A second id/name for the same index must not overwrite the first.
    acc.merge(ToolCallFragment::opening(0, "call_ignored", "ignored"));

    let invocations = acc.finalize().unwrap();
    assert_eq!(invocations[0].id, "call_1");
    assert_eq!(invocations[0].name, "open");
    assert_eq!(invocations[0].input, serde_json::json!({}));
}

#[test]
fn test_sparse_indices_finalize_in_index_order() {
    // A backend may open an invocation at index 2 when earlier indices were
    // text blocks, and fragments may arrive out of index order.
    let mut acc = FragmentAccumulator::default();
    acc.merge(ToolCallFragment::opening(2, "call_b", "tool_b"));
    acc.merge(ToolCallFragment::arguments(2, "{\"b\": 2}"));
    acc.merge(ToolCallFragment::opening(0, "call_a", "tool_a"));
    acc.merge(ToolCallFragment::arguments(0, "{\"a\": 1}"));

    let invocations = acc.finalize().unwrap();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].id, "call_a");
    assert_eq!(invocations[1].id, "call_b");
}

#[test]
fn test_malformed_arguments_surface_with_index() {
    let mut decoder = StreamDecoder::new(
        vec![Chunk::structured(
            "",
            vec![
                ToolCallFragment::opening(3, "call_bad", "broken"),
                ToolCallFragment::arguments(3, "{not json"),
            ],
        )]
        .into_iter(),
    );

    let error = decoder.advance().unwrap().unwrap_err();
    match error {
        StreamError::MalformedToolArguments { index, .. } => assert_eq!(index, 3),
        other => panic!("expected MalformedToolArguments, got {other:?}"),
    }
    // The text deltas observed before the failure still settled.
    assert_eq!(decoder.text_so_far(), "");
    assert!(decoder.is_finished());
}

#[test]
fn test_tool_only_chunks_emit_empty_deltas() {
    let mut decoder = StreamDecoder::new(
        vec![
            Chunk::structured("", vec![ToolCallFragment::opening(0, "call_1", "noop")]),
            Chunk::structured("", vec![ToolCallFragment::arguments(0, "{}")]),
        ]
        .into_iter(),
    );

    let first = decoder.advance().unwrap().unwrap();
    assert!(!first.is_final);
    assert_eq!(first.text, "");

    let last = decoder.advance().unwrap().unwrap();
    assert!(last.is_final);
    assert_eq!(last.text, "");
    assert_eq!(decoder.text_so_far(), "");
}

#[test]
fn test_chunk_deserializes_from_wire_shape() {
    let json = r#"{
        "Structured": {
            "text": "",
            "tool_calls": [
                {"index": 0, "id": "call_9", "type": "function",
                 "function": {"name": "search", "arguments": "{\"q\": \"x\"}"}}
            ]
        }
    }"#;

    let chunk: Chunk = serde_json::from_str(json).unwrap();
    match chunk {
        Chunk::Structured { text, tool_calls } => {
            assert_eq!(text, "");
            assert_eq!(tool_calls.len(), 1);
            assert_eq!(tool_calls[0].id, "call_9");
            assert_eq!(tool_calls[0].r#type, "function");
            let function = tool_calls[0].function.as_ref().unwrap();
            assert_eq!(function.name, "search");
        }
        other => panic!("expected structured chunk, got {other:?}"),
    }
}
