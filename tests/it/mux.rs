//! Tests for rendering all formats at once

use crate::utils::{nested_call_trace, render_json, MemState};
use evm_trace_session::tracing::{DebugOptions, MuxTraceBuilder, TracerKind};
use serde_json::json;

#[test]
fn test_all_tracer_keys() {
    let trace = nested_call_trace(DebugOptions::default().with_tracer(TracerKind::All));
    let frame = render_json(&trace, &MemState::default(), &MemState::default());

    let mut keys = frame.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
    keys.sort();
    assert_eq!(
        keys,
        ["4byteTrace", "callTrace", "defaultTrace", "noopTrace", "prestateTrace", "replayTrace"]
    );
    assert_eq!(frame["noopTrace"], json!({}));
    assert_eq!(frame["4byteTrace"], json!({ "0xa9059cbb-64": "1", "0xd09de08a-0": "1" }));
    assert_eq!(frame["callTrace"]["calls"][0]["gasUsed"], "0x3");
    assert_eq!(frame["replayTrace"]["trace"][1]["traceAddress"], json!([0]));
    assert_eq!(frame["defaultTrace"]["structLogs"].as_array().unwrap().len(), 6);
    // no account exists in the empty state
    assert_eq!(frame["prestateTrace"], json!({}));
}

#[test]
fn test_all_tracer_matches_single_tracers() {
    let pre = MemState::default();
    let post = MemState::default();
    let all = nested_call_trace(DebugOptions::default().with_tracer(TracerKind::All));
    let frame = MuxTraceBuilder::new(&all).build(&pre, &post);

    for (kind, rendered) in [
        (TracerKind::Call, serde_json::to_value(&frame.call_trace).unwrap()),
        (TracerKind::Replay, serde_json::to_value(&frame.replay_trace).unwrap()),
        (TracerKind::FourByte, serde_json::to_value(&frame.four_byte_trace).unwrap()),
        (TracerKind::Default, serde_json::to_value(&frame.default_trace).unwrap()),
    ] {
        let single = nested_call_trace(DebugOptions::default().with_tracer(kind));
        assert_eq!(render_json(&single, &pre, &post), rendered, "{kind:?}");
    }
}

#[test]
fn test_noop_tracer() {
    let trace = nested_call_trace(DebugOptions::default().with_tracer(TracerKind::Noop));
    assert!(trace.struct_logs().is_empty());
    let frame = render_json(&trace, &MemState::default(), &MemState::default());
    assert_eq!(frame, json!({}));
}
