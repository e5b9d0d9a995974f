use alloy_primitives::{address, hex, Address, Bytes, B256, U256};
use evm_trace_session::{
    interp::{
        ExecutionResult, ExternalitiesView, InterpreterView, OpStep, StateView, StatusCode, TxEnv,
    },
    tracing::{frame::TraceFrame, DebugOptions, FinishedTrace, TraceSession},
};
use revm::bytecode::opcode;
use std::{cell::Cell, collections::BTreeMap};

/// Interpreter state of the frame that executes the next instruction.
#[derive(Debug, Default)]
pub struct MockVm {
    /// Bottom first.
    pub stack: Vec<U256>,
    pub memory: Vec<u8>,
    pub last_call_status: Cell<StatusCode>,
    pub return_data: Vec<u8>,
    pub traceable: bool,
}

impl MockVm {
    pub fn new() -> Self {
        Self { traceable: true, ..Default::default() }
    }

    /// Sets the stack, given with the top item first.
    pub fn stack_top_first(mut self, items: impl IntoIterator<Item = U256>) -> Self {
        self.stack = items.into_iter().collect();
        self.stack.reverse();
        self
    }

    pub fn memory(mut self, memory: impl Into<Vec<u8>>) -> Self {
        self.memory = memory.into();
        self
    }

    /// Sets the outcome of the nested call that just returned.
    pub fn returned(mut self, status: StatusCode, data: impl Into<Vec<u8>>) -> Self {
        self.last_call_status.set(status);
        self.return_data = data.into();
        self
    }
}

impl InterpreterView for MockVm {
    fn stack(&self) -> &[U256] {
        &self.stack
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn take_last_call_status(&self) -> StatusCode {
        self.last_call_status.replace(StatusCode::Success)
    }

    fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    fn is_traceable(&self) -> bool {
        self.traceable
    }
}

/// Execution context of a call frame.
#[derive(Clone, Debug, Default)]
pub struct MockExt {
    pub address: Address,
    pub caller: Address,
    pub depth: u64,
    pub value: U256,
    pub data: Bytes,
    pub code: Bytes,
    pub storage: BTreeMap<U256, U256>,
    pub refunds: u64,
}

impl MockExt {
    pub fn new(caller: Address, address: Address, depth: u64) -> Self {
        Self { caller, address, depth, ..Default::default() }
    }

    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn code(mut self, code: impl Into<Bytes>) -> Self {
        self.code = code.into();
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

impl ExternalitiesView for MockExt {
    fn my_address(&self) -> Address {
        self.address
    }

    fn caller(&self) -> Address {
        self.caller
    }

    fn depth(&self) -> u64 {
        self.depth
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn code(&self) -> &[u8] {
        &self.code
    }

    fn store(&self, key: U256) -> U256 {
        self.storage.get(&key).copied().unwrap_or_default()
    }

    fn refunds(&self) -> u64 {
        self.refunds
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemAccount {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: BTreeMap<U256, U256>,
    /// Slot values at the start of the transaction, where they differ from `storage`.
    pub original_storage: BTreeMap<U256, U256>,
}

/// In-memory world state snapshot.
#[derive(Clone, Debug, Default)]
pub struct MemState {
    pub accounts: BTreeMap<Address, MemAccount>,
}

impl MemState {
    pub fn with_account(mut self, address: Address, account: MemAccount) -> Self {
        self.accounts.insert(address, account);
        self
    }

    fn account(&self, address: Address) -> Option<&MemAccount> {
        self.accounts.get(&address)
    }
}

impl StateView for MemState {
    fn address_in_use(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    fn balance(&self, address: Address) -> U256 {
        self.account(address).map(|acc| acc.balance).unwrap_or_default()
    }

    fn nonce(&self, address: Address) -> u64 {
        self.account(address).map(|acc| acc.nonce).unwrap_or_default()
    }

    fn code(&self, address: Address) -> Bytes {
        self.account(address).map(|acc| acc.code.clone()).unwrap_or_default()
    }

    fn original_storage_value(&self, address: Address, key: U256) -> U256 {
        match self.account(address).and_then(|acc| acc.original_storage.get(&key)) {
            Some(value) => *value,
            None => self.storage(address, key),
        }
    }

    fn storage(&self, address: Address, key: U256) -> U256 {
        self.account(address).and_then(|acc| acc.storage.get(&key).copied()).unwrap_or_default()
    }
}

/// Feeds scripted instructions into a [TraceSession].
#[derive(Debug)]
pub struct Driver {
    pub session: TraceSession,
    step: u64,
}

impl Driver {
    pub fn new(tx: TxEnv, options: DebugOptions) -> Self {
        Self { session: TraceSession::new(tx, options), step: 0 }
    }

    /// Executes `op` with the given gas remaining before it and its cost.
    pub fn exec(&mut self, ext: &MockExt, vm: &MockVm, op: u8, gas_remaining: u64, gas_cost: u64) {
        let step = OpStep {
            step: self.step,
            pc: self.step,
            op,
            new_memory_size: vm.memory.len() as u64,
            gas_cost,
            gas_remaining,
        };
        self.step += 1;
        self.session.step(step, vm, ext);
    }

    pub fn finish(self, result: &ExecutionResult) -> FinishedTrace {
        self.session.finalize(result)
    }
}

pub fn render_json(trace: &FinishedTrace, pre: &MemState, post: &MemState) -> serde_json::Value {
    let frame: TraceFrame = trace.render(pre, post);
    frame.into_json().expect("trace frames serialize")
}

pub fn word(value: u64) -> B256 {
    B256::from(U256::from(value).to_be_bytes::<32>())
}

pub fn success(gas_used: u64) -> ExecutionResult {
    ExecutionResult { gas_used, status: StatusCode::Success, ..Default::default() }
}

pub const SENDER: Address = address!("00000000000000000000000000000000000000a0");
pub const CONTRACT_C: Address = address!("00000000000000000000000000000000000000c0");
pub const CONTRACT_D: Address = address!("00000000000000000000000000000000000000d0");

/// `transfer(address,uint256)` call data.
pub fn transfer_input() -> Bytes {
    let mut input = hex!("a9059cbb").to_vec();
    input.extend_from_slice(CONTRACT_D.into_word().as_slice());
    input.extend_from_slice(word(5).as_slice());
    input.into()
}

/// Stack of a `CALL` to `target`, top first: gas, address, value.
pub fn call_stack(gas: u64, target: Address) -> MockVm {
    MockVm::new().stack_top_first([
        U256::from(gas),
        U256::from_be_slice(target.as_slice()),
        U256::ZERO,
    ])
}

/// Sender calls C with [transfer_input], C calls D which returns right away.
///
/// C's frame starts with 79000 gas, D's with 50000 of which it uses 3. The transaction uses
/// 30000 gas in total.
pub fn nested_call_trace(options: DebugOptions) -> FinishedTrace {
    let tx = TxEnv {
        from: SENDER,
        to: Some(CONTRACT_C),
        gas_limit: 100_000,
        input: transfer_input(),
        ..Default::default()
    };
    let c = MockExt::new(SENDER, CONTRACT_C, 0).data(transfer_input());
    let d = MockExt::new(CONTRACT_C, CONTRACT_D, 1).data(hex!("d09de08a"));

    let mut driver = Driver::new(tx, options);
    driver.exec(&c, &MockVm::new(), opcode::PUSH1, 79_000, 3);
    driver.exec(&c, &call_stack(50_000, CONTRACT_D), opcode::CALL, 78_997, 700);
    driver.exec(&d, &MockVm::new(), opcode::PUSH1, 50_000, 3);
    driver.exec(&d, &MockVm::new(), opcode::STOP, 49_997, 0);
    let returned = MockVm::new().returned(StatusCode::Success, Vec::new());
    driver.exec(&c, &returned, opcode::POP, 28_000, 2);
    driver.exec(&c, &MockVm::new(), opcode::STOP, 27_998, 0);
    driver.finish(&success(30_000))
}
