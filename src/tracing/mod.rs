use crate::{
    access::AccessTracker,
    interp::{ExecutionResult, ExternalitiesView, InterpreterView, OpStep, StateView, TxEnv},
};
use alloc::{boxed::Box, vec::Vec};
use alloy_primitives::{hex, Address, Bytes};
use revm::bytecode::opcode;
use tracing::{debug, trace};

mod arena;
pub use arena::CallTraceArena;

mod builder;
pub use builder::{
    geth::{self, GethTraceBuilder},
    parity::{self, ParityTraceBuilder},
};

mod config;
pub use config::{DebugOptions, TraceOptionsError, TracerKind, INVALID_PARAMS_CODE};

mod fourbyte;
pub use fourbyte::FourByteTraceBuilder;

pub mod frame;
use frame::{NoopFrame, StructLog, TraceFrame};

mod mux;
pub use mux::MuxTraceBuilder;

pub mod types;
use types::{CallKind, CallTrace, LogEntry, OpRecord};

pub(crate) mod utils;
use utils::{memory_slice, memory_words, opcode_name, state_check, word};
pub use utils::{
    decode_revert_reason, MAX_MEMORY_WORDS_RETURNED, MAX_STORAGE_VALUES_RETURNED, MAX_TRACE_DEPTH,
};

/// Records the execution of a single transaction.
///
/// The interpreter calls [TraceSession::step] before every instruction it executes. Call
/// boundaries are never reported explicitly, the session derives them from the depth of two
/// consecutive instructions:
///   1. the depth grew by one: the previous instruction opened a new call frame
///   2. the depth shrank by one: the open call frame returned to its parent
///
/// Once the transaction finished, [TraceSession::finalize] seals the top-level call and returns
/// a [FinishedTrace] that renders the requested output.
#[derive(Clone, Debug)]
pub struct TraceSession {
    /// What to record and which format to render.
    options: DebugOptions,
    /// The traced transaction.
    tx: TxEnv,
    /// Touched accounts and slots.
    access: AccessTracker,
    /// Records all call traces
    traces: CallTraceArena,
    /// The open call frame
    current: Option<usize>,
    /// The previously executed instruction
    last_op: OpRecord,
    /// Struct logs, only recorded if the tracer renders them
    struct_logs: Vec<StructLog>,
}

// === impl TraceSession ===

impl TraceSession {
    /// Starts tracing the given transaction.
    pub fn new(tx: TxEnv, options: DebugOptions) -> Self {
        let mut access = AccessTracker::new();
        access.record_account_access(tx.from);
        if let Some(to) = tx.to {
            access.record_account_access(to);
        }
        let last_op = OpRecord::initial(tx.is_create(), tx.gas_limit);
        Self {
            options,
            tx,
            access,
            traces: Default::default(),
            current: None,
            last_op,
            struct_logs: Vec::new(),
        }
    }

    /// Returns the options of the session.
    pub const fn options(&self) -> &DebugOptions {
        &self.options
    }

    /// Returns the traced transaction.
    pub const fn tx(&self) -> &TxEnv {
        &self.tx
    }

    /// Returns the accounts and slots touched so far.
    pub const fn access(&self) -> &AccessTracker {
        &self.access
    }

    /// Gets a reference to the recorded call traces.
    pub const fn traces(&self) -> &CallTraceArena {
        &self.traces
    }

    /// Returns the struct logs recorded so far.
    pub fn struct_logs(&self) -> &[StructLog] {
        &self.struct_logs
    }

    /// Records the instruction that is about to execute.
    ///
    /// # Panics
    ///
    /// If the interpreter can't be traced or the reported depth changed by more than one.
    pub fn step(
        &mut self,
        step: OpStep,
        vm: &dyn InterpreterView,
        ext: &dyn ExternalitiesView,
    ) {
        state_check!(vm.is_traceable(), "interpreter does not expose its state");

        let depth = i64::try_from(ext.depth()).unwrap_or(i64::MAX);
        self.process_depth_transition(depth, step.gas_remaining, vm, ext);
        self.record_accesses(step.op, vm, ext);
        if self.options.records_struct_logs() {
            self.record_struct_log(&step, vm, ext);
        }

        self.last_op = OpRecord {
            depth,
            op: step.op,
            gas_remaining: step.gas_remaining,
            gas_cost: step.gas_cost,
        };
    }

    fn process_depth_transition(
        &mut self,
        depth: i64,
        gas_remaining: u64,
        vm: &dyn InterpreterView,
        ext: &dyn ExternalitiesView,
    ) {
        let last_depth = self.last_op.depth;
        if depth == last_depth + 1 {
            self.start_call(depth, gas_remaining, ext);
        } else if depth == last_depth - 1 {
            self.end_call(vm);
        } else {
            state_check!(depth == last_depth, "depth changed from {last_depth} to {depth}");
        }
    }

    /// Opens a frame for the call issued by the previous instruction.
    fn start_call(&mut self, depth: i64, gas_remaining: u64, ext: &dyn ExternalitiesView) {
        let kind = CallKind::from_opcode(self.last_op.op);
        state_check!(kind.is_some(), "call entered after {}", opcode_name(self.last_op.op));
        let kind = kind.unwrap_or_default();

        let input = if kind.is_any_create() { ext.code() } else { ext.data() };
        let trace = CallTrace {
            depth: usize::try_from(depth).unwrap_or_default(),
            kind,
            caller: ext.caller(),
            address: ext.my_address(),
            value: ext.value(),
            data: Bytes::copy_from_slice(input),
            gas_limit: gas_remaining,
            gas_remaining_before_call: self.last_op.gas_remaining,
            ..Default::default()
        };
        trace!(depth, %kind, caller = %trace.caller, address = %trace.address, "call entered");

        let idx = match self.current {
            Some(parent) => self.traces.push_child(parent, trace),
            None => self.traces.push_root(trace),
        };
        self.current = Some(idx);
    }

    /// Seals the open frame and moves back to its parent.
    fn end_call(&mut self, vm: &dyn InterpreterView) {
        state_check!(self.current.is_some(), "return without an open call");
        let idx = self.current.unwrap_or_default();

        let status = vm.take_last_call_status();
        let output = Bytes::copy_from_slice(vm.return_data());
        let trace = self.traces.trace_mut(idx);
        let gas_used = trace.gas_limit.saturating_sub(self.last_op.gas_remaining_after());
        trace.seal(status, gas_used, output);

        let node = self.traces.node(idx);
        trace!(depth = node.trace.depth, %status, gas_used, "call returned");
        state_check!(node.parent.is_some(), "call at depth {} has no parent", node.trace.depth);
        self.current = node.parent;
    }

    /// Records the accounts, slots and logs the instruction touches.
    ///
    /// Instructions with too few stack items are skipped, the interpreter fails them anyway.
    fn record_accesses(&mut self, op: u8, vm: &dyn InterpreterView, ext: &dyn ExternalitiesView) {
        let address = ext.my_address();
        self.access.record_account_access(address);

        match op {
            opcode::SLOAD => {
                if let Some(key) = vm.peek(0) {
                    self.access.record_storage_read(address, key, ext.store(key));
                }
            }
            opcode::SSTORE => {
                if let (Some(key), Some(value)) = (vm.peek(0), vm.peek(1)) {
                    self.access.record_storage_write(address, key, value);
                }
            }
            opcode::CALL | opcode::CALLCODE | opcode::DELEGATECALL | opcode::STATICCALL => {
                if let Some(target) = vm.peek(1) {
                    self.access.record_account_access(Address::from_word(word(target)));
                }
            }
            opcode::BALANCE
            | opcode::EXTCODESIZE
            | opcode::EXTCODECOPY
            | opcode::EXTCODEHASH
            | opcode::SELFDESTRUCT => {
                if let Some(target) = vm.peek(0) {
                    self.access.record_account_access(Address::from_word(word(target)));
                }
            }
            opcode::LOG0..=opcode::LOG4 => self.record_log((op - opcode::LOG0) as usize, vm),
            _ => {}
        }
    }

    fn record_log(&mut self, topic_count: usize, vm: &dyn InterpreterView) {
        let Some(idx) = self.current else { return };
        let (Some(offset), Some(len)) = (vm.peek(0), vm.peek(1)) else { return };
        let topics =
            (0..topic_count).map(|i| vm.peek(2 + i).map(word)).collect::<Option<Vec<_>>>();
        let Some(topics) = topics else { return };

        let data = memory_slice(vm.memory(), offset, len).unwrap_or_default();
        let log = LogEntry { data: Bytes::copy_from_slice(data), topics };
        self.traces.trace_mut(idx).logs.push(log);
    }

    fn record_struct_log(
        &mut self,
        step: &OpStep,
        vm: &dyn InterpreterView,
        ext: &dyn ExternalitiesView,
    ) {
        let opts = &self.options;
        let mut log = StructLog {
            pc: step.pc,
            op: opcode_name(step.op).into_owned(),
            gas: step.gas_remaining,
            gas_cost: step.gas_cost,
            depth: ext.depth() + 1,
            ..Default::default()
        };

        if !opts.disable_stack {
            log.stack = Some(vm.stack().to_vec());
        }
        if opts.enable_memory {
            log.memory = Some(memory_words(vm.memory()));
        }
        let refund = ext.refunds();
        if refund != 0 {
            log.refund = Some(refund);
        }

        if matches!(step.op, opcode::SLOAD | opcode::SSTORE) && !opts.disable_storage {
            let storage = self
                .access
                .storage_touched(&ext.my_address())
                .map(|(key, value)| (hex::encode(word(key)), hex::encode(word(value))))
                .collect();
            log.storage = Some(storage);
        }

        if step.op == opcode::REVERT {
            if let (Some(offset), Some(len)) = (vm.peek(0), vm.peek(1)) {
                let payload = memory_slice(vm.memory(), offset, len).unwrap_or_default();
                log.error = Some(decode_revert_reason(payload));
            }
        }

        self.struct_logs.push(log);
    }

    /// Seals the top-level call with the outcome of the transaction.
    ///
    /// If no instruction executed, the transaction was a plain transfer and there is no call tree.
    ///
    /// # Panics
    ///
    /// If a nested call is still open.
    pub fn finalize(mut self, result: &ExecutionResult) -> FinishedTrace {
        if let Some(root) = self.traces.root().map(|node| node.idx) {
            state_check!(self.current == Some(root), "open call {:?} at finalize", self.current);
            let trace = self.traces.trace_mut(root);
            trace.seal(result.status, result.gas_used, result.output.clone());
            trace.gas_used = Some(result.gas_used);
        }
        // the fee payment touches the block author after the last instruction
        if let Some(author) = self.tx.block_author {
            self.access.record_account_access(author);
        }

        debug!(
            tracer = %self.options.tracer_kind,
            calls = self.traces.len(),
            accounts = self.access.account_count(),
            struct_logs = self.struct_logs.len(),
            "finalized trace session"
        );

        FinishedTrace {
            options: self.options,
            tx: self.tx,
            result: result.clone(),
            access: self.access,
            traces: self.traces,
            struct_logs: self.struct_logs,
        }
    }
}

/// A sealed trace session, ready to be rendered.
#[derive(Clone, Debug)]
pub struct FinishedTrace {
    options: DebugOptions,
    tx: TxEnv,
    result: ExecutionResult,
    access: AccessTracker,
    traces: CallTraceArena,
    struct_logs: Vec<StructLog>,
}

impl FinishedTrace {
    /// Returns the options of the session.
    pub const fn options(&self) -> &DebugOptions {
        &self.options
    }

    /// Returns the traced transaction.
    pub const fn tx(&self) -> &TxEnv {
        &self.tx
    }

    /// Returns the outcome of the transaction.
    pub const fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// Returns the touched accounts and slots.
    pub const fn access(&self) -> &AccessTracker {
        &self.access
    }

    /// Returns the recorded call traces.
    pub const fn traces(&self) -> &CallTraceArena {
        &self.traces
    }

    /// Returns the recorded struct logs.
    pub fn struct_logs(&self) -> &[StructLog] {
        &self.struct_logs
    }

    /// Returns a geth trace builder over the recorded calls.
    pub fn geth_builder(&self) -> GethTraceBuilder<'_> {
        GethTraceBuilder::new_borrowed(self.traces.nodes())
    }

    /// Returns a parity trace builder over the recorded calls.
    pub fn parity_builder(&self) -> ParityTraceBuilder<'_> {
        ParityTraceBuilder::new_borrowed(self.traces.nodes())
    }

    /// Renders the format selected by [DebugOptions::tracer_kind].
    ///
    /// `pre` and `post` are the world state before and after the transaction.
    pub fn render<Pre, Post>(&self, pre: &Pre, post: &Post) -> TraceFrame
    where
        Pre: StateView + ?Sized,
        Post: StateView + ?Sized,
    {
        debug!(tracer = %self.options.tracer_kind, "rendering trace");
        match self.options.tracer_kind {
            TracerKind::Default => TraceFrame::Default(self.geth_builder().default_trace(
                &self.struct_logs,
                &self.result,
                &self.options,
            )),
            TracerKind::Call => TraceFrame::Call(self.geth_builder().call_trace(
                &self.tx,
                &self.result,
                &self.options,
                post,
            )),
            TracerKind::Prestate => TraceFrame::Prestate(self.geth_builder().prestate_trace(
                &self.tx,
                &self.access,
                self.options.prestate_diff_mode,
                pre,
                post,
            )),
            TracerKind::Replay => {
                TraceFrame::Replay(self.parity_builder().replay_trace(&self.tx, &self.result))
            }
            TracerKind::FourByte => TraceFrame::FourByte(
                FourByteTraceBuilder::new_borrowed(self.traces.nodes()).four_byte_trace(),
            ),
            TracerKind::Noop => TraceFrame::Noop(NoopFrame {}),
            TracerKind::All => {
                TraceFrame::All(Box::new(MuxTraceBuilder::new(self).build(pre, post)))
            }
        }
    }
}
