use alloy_primitives::{Address, Bytes, B256, U256};
use core::fmt;

/// Status code of a finished call frame, as reported by an evmc compatible interpreter.
///
/// Codes that are not known to this crate are preserved in [StatusCode::Unknown].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Execution finished with success.
    #[default]
    Success,
    /// Generic execution failure.
    Failure,
    /// Execution terminated with the `REVERT` opcode.
    Revert,
    /// The execution has run out of gas.
    OutOfGas,
    /// The designated `INVALID` instruction has been hit.
    InvalidInstruction,
    /// An undefined instruction has been encountered.
    UndefinedInstruction,
    /// The execution has attempted to put more items on the stack than allowed.
    StackOverflow,
    /// Execution of an opcode has required more items on the stack.
    StackUnderflow,
    /// Execution has violated the jump destination restrictions.
    BadJumpDestination,
    /// Tried to read outside memory bounds.
    InvalidMemoryAccess,
    /// Call depth has exceeded the limit.
    CallDepthExceeded,
    /// Tried to modify state while in static mode.
    StaticModeViolation,
    /// A call to a precompiled contract has failed.
    PrecompileFailure,
    /// Contract validation has failed.
    ContractValidationFailure,
    /// An argument to a state accessing method has a value outside of the accepted range.
    ArgumentOutOfRange,
    /// The interpreter hit an internal error.
    InternalError,
    /// The execution of the given code or message has been rejected.
    Rejected,
    /// The interpreter failed to allocate memory.
    OutOfMemory,
    /// Any status code that has no dedicated variant.
    Unknown(i32),
}

impl StatusCode {
    /// Maps a raw `evmc_status_code` to a [StatusCode].
    pub const fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Failure,
            2 => Self::Revert,
            3 => Self::OutOfGas,
            4 => Self::InvalidInstruction,
            5 => Self::UndefinedInstruction,
            6 => Self::StackOverflow,
            7 => Self::StackUnderflow,
            8 => Self::BadJumpDestination,
            9 => Self::InvalidMemoryAccess,
            10 => Self::CallDepthExceeded,
            11 => Self::StaticModeViolation,
            12 => Self::PrecompileFailure,
            13 => Self::ContractValidationFailure,
            14 => Self::ArgumentOutOfRange,
            -1 => Self::InternalError,
            -2 => Self::Rejected,
            -3 => Self::OutOfMemory,
            other => Self::Unknown(other),
        }
    }

    /// Returns true if the frame finished successfully.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the frame was reverted with `REVERT`.
    #[inline]
    pub const fn is_revert(&self) -> bool {
        matches!(self, Self::Revert)
    }

    /// Human readable description of the status, matching the messages geth reports.
    ///
    /// Codes without a known message map to `"unknown error"`.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "evm failure",
            Self::Revert => "execution reverted",
            Self::OutOfGas => "out of gas",
            Self::InvalidInstruction => "invalid opcode",
            Self::UndefinedInstruction => "undefined instruction",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::BadJumpDestination => "invalid jump destination",
            Self::InvalidMemoryAccess => "invalid memory access",
            Self::CallDepthExceeded => "max call depth exceeded",
            Self::StaticModeViolation => "write protection",
            Self::PrecompileFailure => "precompile failure",
            Self::ContractValidationFailure => "contract validation failure",
            Self::ArgumentOutOfRange => "argument out of range",
            Self::InternalError => "internal error",
            Self::Rejected => "evm rejected",
            Self::OutOfMemory => "out of memory",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Read-only view of the interpreter that executes the current frame.
///
/// The tracer only reads from this view. The single exception is
/// [InterpreterView::take_last_call_status], which implementations are expected to back with
/// interior mutability, because the status must be consumed exactly once per returned call.
pub trait InterpreterView {
    /// Stack contents, bottom first: the top of the stack is the last element.
    fn stack(&self) -> &[U256];

    /// The frame's memory buffer.
    fn memory(&self) -> &[u8];

    /// Returns the status of the most recently returned nested call and resets it to
    /// [StatusCode::Success].
    fn take_last_call_status(&self) -> StatusCode;

    /// Return data of the most recently completed nested call.
    fn return_data(&self) -> &[u8];

    /// Whether this interpreter exposes enough state to be traced.
    ///
    /// A session handed an interpreter that returns `false` halts immediately.
    fn is_traceable(&self) -> bool {
        true
    }

    /// Returns the `n`-th stack item counted from the top, if the stack is deep enough.
    fn peek(&self, n: usize) -> Option<U256> {
        let stack = self.stack();
        stack.len().checked_sub(n + 1).map(|idx| stack[idx])
    }
}

/// Read-only view of the execution context of the current frame.
pub trait ExternalitiesView {
    /// Address whose code is executing.
    fn my_address(&self) -> Address;

    /// Caller of the current frame.
    fn caller(&self) -> Address;

    /// 0-based call depth, the top-level call executes at depth 0.
    fn depth(&self) -> u64;

    /// Value transferred to the current frame.
    fn value(&self) -> U256;

    /// Call data of the current frame.
    fn data(&self) -> &[u8];

    /// Code that is executing, for contract creation frames this is the init code.
    fn code(&self) -> &[u8];

    /// Current value of the given storage slot of [ExternalitiesView::my_address].
    fn store(&self, key: U256) -> U256;

    /// Gas refund counter of the transaction.
    fn refunds(&self) -> u64 {
        0
    }
}

/// Read-only view of the world state either before or after the traced transaction.
pub trait StateView {
    /// Whether the account exists.
    fn address_in_use(&self, address: Address) -> bool;

    /// Balance of the account.
    fn balance(&self, address: Address) -> U256;

    /// Nonce of the account.
    fn nonce(&self, address: Address) -> u64;

    /// Code of the account, empty for externally owned accounts.
    fn code(&self, address: Address) -> Bytes;

    /// Value of the slot before the current transaction's own writes.
    fn original_storage_value(&self, address: Address, key: U256) -> U256;

    /// Current value of the slot.
    fn storage(&self, address: Address, key: U256) -> U256;
}

impl<T: StateView + ?Sized> StateView for &T {
    fn address_in_use(&self, address: Address) -> bool {
        (**self).address_in_use(address)
    }

    fn balance(&self, address: Address) -> U256 {
        (**self).balance(address)
    }

    fn nonce(&self, address: Address) -> u64 {
        (**self).nonce(address)
    }

    fn code(&self, address: Address) -> Bytes {
        (**self).code(address)
    }

    fn original_storage_value(&self, address: Address, key: U256) -> U256 {
        (**self).original_storage_value(address, key)
    }

    fn storage(&self, address: Address, key: U256) -> U256 {
        (**self).storage(address, key)
    }
}

/// A single executed instruction as reported by the interpreter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpStep {
    /// Number of instructions executed so far.
    pub step: u64,
    /// Program counter.
    pub pc: u64,
    /// The opcode about to execute.
    pub op: u8,
    /// Memory size after the instruction's expansion.
    pub new_memory_size: u64,
    /// Gas cost of the instruction.
    pub gas_cost: u64,
    /// Gas remaining before the instruction executes.
    pub gas_remaining: u64,
}

/// The transaction that is traced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxEnv {
    /// Hash of the transaction.
    pub hash: B256,
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Gas limit of the transaction.
    pub gas_limit: u64,
    /// Call data or init code.
    pub input: Bytes,
    /// Beneficiary of the block the transaction is included in, paid the transaction fee.
    pub block_author: Option<Address>,
}

impl TxEnv {
    /// Returns true if this transaction creates a contract.
    #[inline]
    pub const fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Outcome of the traced transaction, known once execution completes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Total gas used by the transaction.
    pub gas_used: u64,
    /// Status of the top-level call.
    pub status: StatusCode,
    /// Raw output bytes, the revert payload if the transaction reverted.
    pub output: Bytes,
    /// Address of the created contract for successful creation transactions.
    pub created_address: Option<Address>,
}

impl ExecutionResult {
    /// Returns true if the transaction did not fail.
    #[inline]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
