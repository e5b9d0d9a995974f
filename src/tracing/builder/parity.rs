use super::walker::CallTraceNodeWalkerDF;
use crate::{
    interp::{ExecutionResult, TxEnv},
    tracing::{
        frame::{CallAction, CallOutput, ReplayFrame, TransactionTrace},
        types::CallTraceNode,
    },
};
use alloc::{borrow::Cow, vec::Vec};
use alloy_primitives::U64;

/// A type for creating parity style traces
#[derive(Clone, Debug)]
pub struct ParityTraceBuilder<'a> {
    /// Recorded trace nodes
    nodes: Cow<'a, [CallTraceNode]>,
}

impl ParityTraceBuilder<'static> {
    /// Returns a new instance of the builder from [`Cow::Owned`]
    pub fn new(nodes: Vec<CallTraceNode>) -> ParityTraceBuilder<'static> {
        Self { nodes: Cow::Owned(nodes) }
    }
}

impl<'a> ParityTraceBuilder<'a> {
    /// Returns a new instance of the builder from [`Cow::Borrowed`]
    pub fn new_borrowed(nodes: &'a [CallTraceNode]) -> ParityTraceBuilder<'a> {
        Self { nodes: Cow::Borrowed(nodes) }
    }

    /// Returns the `traceAddress` of the node in the arena
    ///
    /// The `traceAddress` field of all returned traces, gives the exact location in the call trace
    /// [index in root, index in first CALL, index in second CALL, …].
    ///
    /// # Panics
    ///
    /// if the `idx` does not belong to a node
    pub fn trace_address(&self, idx: usize) -> Vec<usize> {
        let mut graph = Vec::new();
        let mut node = &self.nodes[idx];
        while let Some(parent) = node.parent {
            // the index of the child call in the arena
            let child_idx = node.idx;
            node = &self.nodes[parent];
            // find the index of the child call in the parent node
            let call_idx = node
                .children
                .iter()
                .position(|child| *child == child_idx)
                .expect("child call exists in parent");
            graph.push(call_idx);
        }
        graph.reverse();
        graph
    }

    /// Returns all recorded calls as flat parity traces, in call order.
    pub fn transaction_traces(&self) -> Vec<TransactionTrace> {
        CallTraceNodeWalkerDF::new(&self.nodes)
            .map(|(node, trace_address)| parity_transaction_trace(node, trace_address))
            .collect()
    }

    /// Generate a parity-style replay trace e.g. for `trace_replayTransaction`
    ///
    /// `vmTrace` and `stateDiff` are not supported and always `null`.
    pub fn replay_trace(&self, tx: &TxEnv, result: &ExecutionResult) -> ReplayFrame {
        ReplayFrame {
            vm_trace: None,
            state_diff: None,
            transaction_hash: tx.hash,
            output: result.output.clone(),
            error: (!result.is_success()).then(|| result.status.description().into()),
            trace: self.transaction_traces(),
        }
    }
}

/// Converts a node into a parity trace at the given trace address.
fn parity_transaction_trace(node: &CallTraceNode, trace_address: Vec<usize>) -> TransactionTrace {
    let trace = &node.trace;
    let call_type = trace.kind.parity_name();
    TransactionTrace {
        action: CallAction {
            from: trace.caller,
            to: trace.address,
            gas: U64::from(trace.gas_limit),
            input: trace.data.clone(),
            value: trace.value,
            call_type: call_type.into(),
        },
        result: CallOutput { gas_used: U64::from(trace.gas_used()), output: trace.output.clone() },
        subtraces: node.children.len(),
        trace_address,
        typ: call_type.into(),
        error: trace.error.clone(),
    }
}
