//! Trace session tests

use crate::utils::{
    call_stack, nested_call_trace, render_json, success, Driver, MemState, MockExt, MockVm,
    CONTRACT_C, CONTRACT_D, SENDER,
};
use alloy_primitives::{address, U256};
use evm_trace_session::{
    interp::TxEnv,
    tracing::{types::CallKind, DebugOptions, TraceOptionsError, TracerKind, INVALID_PARAMS_CODE},
};
use revm::bytecode::opcode;
use serde_json::json;

fn tx() -> TxEnv {
    TxEnv { from: SENDER, to: Some(CONTRACT_C), gas_limit: 100_000, ..Default::default() }
}

#[test]
fn test_session_tracks_call_tree() {
    let trace = nested_call_trace(DebugOptions::default().with_tracer(TracerKind::Call));
    let nodes = trace.traces().nodes();
    assert_eq!(nodes.len(), 2);

    let root = trace.traces().root().unwrap();
    assert!(root.is_root());
    assert_eq!(root.children, vec![1]);
    assert_eq!(root.trace.gas_used(), 30_000);

    let child = &nodes[1];
    assert_eq!(child.parent, Some(0));
    assert_eq!(child.trace.depth, 1);
    assert_eq!(child.kind(), CallKind::Call);
    assert_eq!(child.trace.gas_limit, 50_000);
    assert_eq!(child.trace.gas_remaining_before_call, 78_997);
    assert!(child.trace.is_sealed());
    assert!(!child.trace.is_error());

    // only the default and all tracers keep struct logs
    assert!(trace.struct_logs().is_empty());
}

#[test]
fn test_session_records_touched_accounts() {
    let other = address!("00000000000000000000000000000000000000f0");
    let c = MockExt::new(SENDER, CONTRACT_C, 0);

    let mut driver = Driver::new(tx(), DebugOptions::default());
    let balance = MockVm::new().stack_top_first([U256::from_be_slice(other.as_slice())]);
    driver.exec(&c, &balance, opcode::BALANCE, 79_000, 2_600);
    // calling an account without code never enters a new frame
    driver.exec(&c, &call_stack(10_000, CONTRACT_D), opcode::CALL, 76_400, 2_600);
    driver.exec(&c, &MockVm::new(), opcode::STOP, 73_800, 0);

    assert_eq!(
        driver.session.access().accounts_touched().collect::<Vec<_>>(),
        vec![SENDER, CONTRACT_C, other, CONTRACT_D]
    );
    assert_eq!(driver.session.traces().len(), 1);
    assert_eq!(driver.session.struct_logs().len(), 3);

    let trace = driver.finish(&success(26_200));
    assert!(trace.traces().root().unwrap().children.is_empty());
}

#[test]
fn test_session_options_from_json() {
    let opts = DebugOptions::from_json(&json!({
        "tracer": "callTracer",
        "tracerConfig": { "onlyTopCall": true }
    }))
    .unwrap();
    let trace = nested_call_trace(opts);
    let frame = render_json(&trace, &MemState::default(), &MemState::default());
    assert_eq!(frame["type"], "CALL");
    assert!(frame.get("calls").is_none());

    let err = DebugOptions::from_json(&json!({ "tracer": "opcountTracer" })).unwrap_err();
    assert_eq!(err, TraceOptionsError::UnknownTracer("opcountTracer".into()));
    assert_eq!(err.code(), INVALID_PARAMS_CODE);
}

#[test]
#[should_panic(expected = "State check failed::depth == last_depth")]
fn test_session_depth_jump() {
    let c = MockExt::new(SENDER, CONTRACT_C, 0);
    let deep = MockExt::new(CONTRACT_C, CONTRACT_D, 2);

    let mut driver = Driver::new(tx(), DebugOptions::default());
    driver.exec(&c, &MockVm::new(), opcode::PUSH1, 79_000, 3);
    driver.exec(&deep, &MockVm::new(), opcode::PUSH1, 50_000, 3);
}

#[test]
#[should_panic(expected = "State check failed::vm.is_traceable()")]
fn test_session_untraceable_interpreter() {
    let c = MockExt::new(SENDER, CONTRACT_C, 0);
    let vm = MockVm { traceable: false, ..MockVm::new() };

    let mut driver = Driver::new(tx(), DebugOptions::default());
    driver.exec(&c, &vm, opcode::PUSH1, 79_000, 3);
}

#[test]
#[should_panic(expected = "State check failed::self.current == Some(root)")]
fn test_session_finalize_with_open_call() {
    let c = MockExt::new(SENDER, CONTRACT_C, 0);
    let d = MockExt::new(CONTRACT_C, CONTRACT_D, 1);

    let mut driver = Driver::new(tx(), DebugOptions::default());
    driver.exec(&c, &call_stack(50_000, CONTRACT_D), opcode::CALL, 79_000, 700);
    driver.exec(&d, &MockVm::new(), opcode::PUSH1, 50_000, 3);
    driver.finish(&success(30_000));
}
