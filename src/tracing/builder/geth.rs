//! Geth trace builder
use crate::{
    access::AccessTracker,
    interp::{ExecutionResult, StateView, TxEnv},
    tracing::{
        config::DebugOptions,
        frame::{
            AccountState, CallFrame, CallLogFrame, DefaultFrame, DiffMode, PreStateFrame,
            PreStateMode, StructLog,
        },
        types::CallTraceNode,
        utils::{
            decode_revert_reason, state_check, MAX_STORAGE_VALUES_RETURNED, MAX_TRACE_DEPTH,
        },
    },
};
use alloc::{borrow::Cow, string::String, vec::Vec};
use alloy_primitives::{hex, Address, Bytes, U256, U64};
use tracing::warn;

/// A type for creating geth style traces
#[derive(Clone, Debug)]
pub struct GethTraceBuilder<'a> {
    /// Recorded trace nodes.
    nodes: Cow<'a, [CallTraceNode]>,
}

impl GethTraceBuilder<'static> {
    /// Returns a new instance of the builder from [`Cow::Owned`]
    pub fn new(nodes: Vec<CallTraceNode>) -> GethTraceBuilder<'static> {
        Self { nodes: Cow::Owned(nodes) }
    }
}

impl<'a> GethTraceBuilder<'a> {
    /// Returns a new instance of the builder from [`Cow::Borrowed`]
    pub fn new_borrowed(nodes: &'a [CallTraceNode]) -> GethTraceBuilder<'a> {
        Self { nodes: Cow::Borrowed(nodes) }
    }

    /// Consumes the builder and returns the recorded trace nodes.
    pub fn to_owned(self) -> Vec<CallTraceNode> {
        self.nodes.into_owned()
    }

    /// Generate a geth-style struct-log trace e.g. for `debug_traceTransaction`
    ///
    /// On success the output is only included if [DebugOptions::enable_return_data] is set. A
    /// reverted transaction reports its decoded revert message as both `returnValue` and `error`,
    /// any other failure reports both as empty strings.
    pub fn default_trace(
        &self,
        struct_logs: &[StructLog],
        result: &ExecutionResult,
        opts: &DebugOptions,
    ) -> DefaultFrame {
        let failed = !result.is_success();
        let (return_value, error) = if !failed {
            (opts.enable_return_data.then(|| hex::encode(&result.output)), None)
        } else if result.status.is_revert() {
            let reason = decode_revert_reason(&result.output);
            (Some(reason.clone()), Some(reason))
        } else {
            (Some(String::new()), Some(String::new()))
        };

        DefaultFrame {
            gas: result.gas_used,
            struct_logs: struct_logs.to_vec(),
            failed,
            return_value,
            error,
        }
    }

    /// Generate a geth-style traces for the call tracer.
    ///
    /// If no instruction executed, the transaction was a plain value transfer and is rendered as
    /// a single call without nested calls.
    ///
    /// `post` is the state after the transaction, it provides the code of created contracts.
    ///
    /// # Panics
    ///
    /// If the recorded tree is deeper than [MAX_TRACE_DEPTH].
    pub fn call_trace<S: StateView + ?Sized>(
        &self,
        tx: &TxEnv,
        result: &ExecutionResult,
        opts: &DebugOptions,
        post: &S,
    ) -> CallFrame {
        let Some(root) = self.nodes.first() else {
            return CallFrame {
                typ: "CALL".into(),
                from: tx.from,
                to: tx.to.or(result.created_address),
                gas: U256::from(tx.gas_limit),
                gas_used: U256::from(result.gas_used),
                error: (!result.is_success()).then(|| result.status.description().into()),
                value: tx.value,
                input: Some(tx.input.clone()),
                ..Default::default()
            };
        };

        let mut root_frame = self.fill_call_frame(root, 0, opts, post);
        // the top-level call reports the transaction's gas limit, not the gas left after the
        // intrinsic cost
        root_frame.gas = U256::from(tx.gas_limit);
        if tx.is_create() {
            root_frame.to = result.created_address.or(Some(root.trace.address));
            root_frame.input = (!tx.input.is_empty()).then(|| tx.input.clone());
        }
        root_frame
    }

    fn fill_call_frame<S: StateView + ?Sized>(
        &self,
        node: &CallTraceNode,
        depth: usize,
        opts: &DebugOptions,
        post: &S,
    ) -> CallFrame {
        // prevent unbounded recursion on a corrupted tree
        state_check!(depth < MAX_TRACE_DEPTH);
        state_check!(depth == node.trace.depth, "node {} at depth {depth}", node.idx);

        let mut frame = geth_empty_call_frame(node, opts.with_log, post);
        if !opts.only_top_call {
            frame.calls = node
                .children
                .iter()
                .map(|child| self.fill_call_frame(&self.nodes[*child], depth + 1, opts, post))
                .collect();
        }
        frame
    }

    /// Returns the accounts necessary for transaction execution.
    ///
    /// The prestate mode returns the accounts necessary to execute a given transaction.
    /// diff_mode returns the differences between the transaction's pre and post-state.
    ///
    /// The balance of the block author is always reported. A contract deployed by a creation
    /// transaction is reported as existing before it with a zero balance and nonce 1.
    ///
    /// * `tx` - The traced transaction.
    /// * `access` - The accounts and slots the transaction touched.
    /// * `diff_mode` - if prestate is in diff or prestate mode.
    /// * `pre` - The state before the transaction.
    /// * `post` - The state after the transaction.
    pub fn prestate_trace<Pre, Post>(
        &self,
        tx: &TxEnv,
        access: &AccessTracker,
        diff_mode: bool,
        pre: &Pre,
        post: &Post,
    ) -> PreStateFrame
    where
        Pre: StateView + ?Sized,
        Post: StateView + ?Sized,
    {
        if diff_mode {
            PreStateFrame::Diff(prestate_diff_traces(tx, access, pre, post))
        } else {
            PreStateFrame::Default(prestate_pre_traces(tx, access, pre, post))
        }
    }
}

/// Converts a node into a call frame without nested calls.
fn geth_empty_call_frame<S: StateView + ?Sized>(
    node: &CallTraceNode,
    include_logs: bool,
    post: &S,
) -> CallFrame {
    let trace = &node.trace;
    let is_create = trace.kind.is_any_create();

    // the output of a creation is the code of the deployed contract
    let output = if is_create { post.code(trace.address) } else { trace.output.clone() };

    let logs = if include_logs && !is_create {
        trace
            .logs
            .iter()
            .map(|log| CallLogFrame {
                address: trace.address,
                data: log.data.clone(),
                topics: log.topics.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    CallFrame {
        typ: trace.kind.mnemonic().into(),
        from: trace.caller,
        to: (!is_create).then_some(trace.address),
        gas: U256::from(trace.gas_limit),
        gas_used: U256::from(trace.gas_used()),
        error: trace.error.clone(),
        revert_reason: trace.revert_reason.clone().filter(|reason| !reason.is_empty()),
        value: trace.value,
        output: non_empty(output),
        input: non_empty(trace.data.clone()),
        logs,
        calls: Vec::new(),
    }
}

#[inline]
fn non_empty(bytes: Bytes) -> Option<Bytes> {
    (!bytes.is_empty()).then_some(bytes)
}

/// Counts the storage entries of one prestate output against [MAX_STORAGE_VALUES_RETURNED].
#[derive(Debug, Default)]
struct StorageBudget {
    returned: usize,
    truncated: bool,
}

impl StorageBudget {
    /// Takes one entry out of the budget, returns false once it is exhausted.
    fn take(&mut self) -> bool {
        if self.returned >= MAX_STORAGE_VALUES_RETURNED {
            self.truncated = true;
            return false;
        }
        self.returned += 1;
        true
    }

    fn warn_if_truncated(&self, side: &str) {
        if self.truncated {
            warn!(side, limit = MAX_STORAGE_VALUES_RETURNED, "prestate storage truncated");
        }
    }
}

/// Returns true if `addr` is a contract deployed by the creation transaction `tx`.
fn is_new_contract<Pre, Post>(tx: &TxEnv, addr: Address, pre: &Pre, post: &Post) -> bool
where
    Pre: StateView + ?Sized,
    Post: StateView + ?Sized,
{
    tx.is_create() && !pre.address_in_use(addr) && post.address_in_use(addr)
}

/// The state a new contract is reported with before its deployment.
fn new_contract_pre_state() -> AccountState {
    AccountState { balance: Some(U256::ZERO), nonce: Some(U64::from(1)), ..Default::default() }
}

/// Returns the complete pre-transaction state of every touched account.
fn prestate_pre_traces<Pre, Post>(
    tx: &TxEnv,
    access: &AccessTracker,
    pre: &Pre,
    post: &Post,
) -> PreStateMode
where
    Pre: StateView + ?Sized,
    Post: StateView + ?Sized,
{
    let mut prestate = PreStateMode::default();
    let mut budget = StorageBudget::default();

    for addr in access.accounts_touched() {
        if !pre.address_in_use(addr) {
            if is_new_contract(tx, addr, pre, post) {
                prestate.0.insert(addr, new_contract_pre_state());
            }
            continue;
        }
        let mut acc_state = AccountState {
            balance: Some(pre.balance(addr)),
            nonce: Some(U64::from(pre.nonce(addr))),
            code: non_empty(pre.code(addr)),
            ..Default::default()
        };

        // slots that were zero before the transaction are left out
        for (key, _) in access.storage_touched(&addr) {
            let original = pre.original_storage_value(addr, key);
            if original.is_zero() {
                continue;
            }
            if !budget.take() {
                break;
            }
            acc_state.storage.insert(key, original);
        }

        prestate.0.insert(addr, acc_state);
    }

    if let Some(author) = tx.block_author {
        prestate.0.entry(author).or_default().balance = Some(pre.balance(author));
    }

    budget.warn_if_truncated("pre");
    prestate
}

/// Returns the changed fields of every touched account before and after the transaction.
fn prestate_diff_traces<Pre, Post>(
    tx: &TxEnv,
    access: &AccessTracker,
    pre: &Pre,
    post: &Post,
) -> DiffMode
where
    Pre: StateView + ?Sized,
    Post: StateView + ?Sized,
{
    let mut diff = DiffMode::default();
    let mut pre_budget = StorageBudget::default();
    let mut post_budget = StorageBudget::default();

    for addr in access.accounts_touched() {
        let pre_in_use = pre.address_in_use(addr);
        let post_in_use = post.address_in_use(addr);

        if pre_in_use {
            let state = diff_account_state(
                access,
                addr,
                pre,
                post,
                post_in_use,
                |key| pre.original_storage_value(addr, key),
                &mut pre_budget,
            );
            if !state.is_empty() {
                diff.pre.insert(addr, state);
            }
        } else if is_new_contract(tx, addr, pre, post) {
            diff.pre.insert(addr, new_contract_pre_state());
        }

        if post_in_use {
            let state = diff_account_state(
                access,
                addr,
                post,
                pre,
                pre_in_use,
                |key| post.storage(addr, key),
                &mut post_budget,
            );
            if !state.is_empty() {
                diff.post.insert(addr, state);
            }
        }
    }

    if let Some(author) = tx.block_author {
        diff.pre.entry(author).or_default().balance = Some(pre.balance(author));
        diff.post.entry(author).or_default().balance = Some(post.balance(author));
    }

    pre_budget.warn_if_truncated("pre");
    post_budget.warn_if_truncated("post");
    diff
}

/// Returns the fields of `addr` in `this` state that differ from the `other` state.
///
/// If the account does not exist in `other`, every non-empty field is returned. Storage slots
/// are compared by their value in `this` state, obtained via `slot`, against their value in
/// `other`. Zero slots are never returned.
fn diff_account_state<This, Other>(
    access: &AccessTracker,
    addr: Address,
    this: &This,
    other: &Other,
    other_in_use: bool,
    slot: impl Fn(U256) -> U256,
    budget: &mut StorageBudget,
) -> AccountState
where
    This: StateView + ?Sized,
    Other: StateView + ?Sized,
{
    let mut state = AccountState::default();

    let balance = this.balance(addr);
    if !other_in_use || balance != other.balance(addr) {
        state.balance = Some(balance);
    }

    let nonce = this.nonce(addr);
    if !other_in_use || nonce != other.nonce(addr) {
        state.nonce = Some(U64::from(nonce));
    }

    let code = this.code(addr);
    if !code.is_empty() && (!other_in_use || code != other.code(addr)) {
        state.code = Some(code);
    }

    for (key, _) in access.storage_touched(&addr) {
        let value = slot(key);
        if value.is_zero() {
            continue;
        }
        if other_in_use && value == other.storage(addr, key) {
            continue;
        }
        if !budget.take() {
            break;
        }
        state.storage.insert(key, value);
    }

    state
}
