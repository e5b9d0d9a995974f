//! Types for representing call trace items.

use crate::interp::StatusCode;
use alloc::{string::String, vec::Vec};
use alloy_primitives::{Address, Bytes, B256, U256};
use core::fmt;
use revm::bytecode::opcode;

/// The instruction that opened a call frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `CALL`
    #[default]
    Call,
    /// `CALLCODE`
    CallCode,
    /// `DELEGATECALL`
    DelegateCall,
    /// `STATICCALL`
    StaticCall,
    /// `CREATE`
    Create,
    /// `CREATE2`
    Create2,
}

impl CallKind {
    /// Maps a call or create opcode to its kind.
    ///
    /// Returns `None` for any other opcode.
    pub const fn from_opcode(op: u8) -> Option<Self> {
        Some(match op {
            opcode::CALL => Self::Call,
            opcode::CALLCODE => Self::CallCode,
            opcode::DELEGATECALL => Self::DelegateCall,
            opcode::STATICCALL => Self::StaticCall,
            opcode::CREATE => Self::Create,
            opcode::CREATE2 => Self::Create2,
            _ => return None,
        })
    }

    /// Returns true if the call is a create
    #[inline]
    pub const fn is_any_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }

    /// The opcode mnemonic, as used by geth traces.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::CallCode => "CALLCODE",
            Self::DelegateCall => "DELEGATECALL",
            Self::StaticCall => "STATICCALL",
            Self::Create => "CREATE",
            Self::Create2 => "CREATE2",
        }
    }

    /// The lowercase mnemonic, as used by parity traces.
    pub const fn parity_name(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::CallCode => "callcode",
            Self::DelegateCall => "delegatecall",
            Self::StaticCall => "staticcall",
            Self::Create => "create",
            Self::Create2 => "create2",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A log emitted by a call frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogEntry {
    /// The non-indexed data.
    pub data: Bytes,
    /// The topics, in emission order.
    pub topics: Vec<B256>,
}

/// A trace of a call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallTrace {
    /// The depth of the call, the top-level call is at depth 0
    pub depth: usize,
    /// The kind of call this is
    pub kind: CallKind,
    /// The caller of the trace
    pub caller: Address,
    /// The target address of this call.
    ///
    /// For creations this is the address of the new contract.
    pub address: Address,
    /// The value transferred in the call
    pub value: U256,
    /// The calldata for the call, or the init code for contract creations
    pub data: Bytes,
    /// The return data of the call, recorded for reverts too
    pub output: Bytes,
    /// The gas available to the frame when its first instruction executed
    pub gas_limit: u64,
    /// The gas the parent frame had left when it issued the call
    pub gas_remaining_before_call: u64,
    /// The total gas consumed by the frame, `None` until the frame returned
    pub gas_used: Option<u64>,
    /// The status the frame returned with, `None` until the frame returned
    pub status: Option<StatusCode>,
    /// Description of the failure, if the frame failed
    pub error: Option<String>,
    /// Decoded revert message, if the frame reverted
    pub revert_reason: Option<String>,
    /// Logs emitted by this frame, in emission order
    pub logs: Vec<LogEntry>,
}

impl CallTrace {
    /// Returns true if the frame has returned.
    #[inline]
    pub const fn is_sealed(&self) -> bool {
        self.status.is_some()
    }

    /// Returns true if the frame returned with anything but success.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.status.is_some_and(|status| !status.is_success())
    }

    /// Returns true if the frame reverted.
    #[inline]
    pub fn is_revert(&self) -> bool {
        self.status.is_some_and(|status| status.is_revert())
    }

    /// Gas used by the frame, `0` if it never returned.
    #[inline]
    pub fn gas_used(&self) -> u64 {
        self.gas_used.unwrap_or_default()
    }

    /// Seals the frame with its outcome.
    ///
    /// A failure other than a revert consumes the frame's entire gas limit.
    pub(crate) fn seal(&mut self, status: StatusCode, gas_used: u64, output: Bytes) {
        self.gas_used = Some(if status.is_success() || status.is_revert() {
            gas_used
        } else {
            self.gas_limit
        });
        if !status.is_success() {
            self.error = Some(status.description().into());
        }
        if status.is_revert() {
            self.revert_reason = Some(super::utils::decode_revert_reason(&output));
        }
        self.output = output;
        self.status = Some(status);
    }
}

/// A node in the arena
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallTraceNode {
    /// Parent node index in the arena
    pub parent: Option<usize>,
    /// Children node indexes in the arena, in call order
    pub children: Vec<usize>,
    /// This node's index in the arena
    pub idx: usize,
    /// The call trace
    pub trace: CallTrace,
}

impl CallTraceNode {
    /// Returns true if this is the top-level call.
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns the kind of call the trace belongs to
    #[inline]
    pub const fn kind(&self) -> CallKind {
        self.trace.kind
    }

    /// Returns the function selector, if the input is long enough to carry one.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.trace.data.get(..4).and_then(|sel| sel.try_into().ok())
    }
}

/// Snapshot of the previously executed instruction.
///
/// Call boundaries are only visible as a depth change between two consecutive instructions, so
/// every step is compared against this record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpRecord {
    /// Depth of the instruction, `-1` before the first instruction
    pub depth: i64,
    /// The opcode
    pub op: u8,
    /// Gas remaining before the instruction executed
    pub gas_remaining: u64,
    /// Gas cost of the instruction
    pub gas_cost: u64,
}

impl OpRecord {
    /// The record the session starts with: the transaction itself, issued from depth `-1`.
    pub const fn initial(is_create: bool, gas_limit: u64) -> Self {
        Self {
            depth: -1,
            op: if is_create { opcode::CREATE } else { opcode::CALL },
            gas_remaining: gas_limit,
            gas_cost: 0,
        }
    }

    /// Gas remaining after the instruction executed.
    #[inline]
    pub const fn gas_remaining_after(&self) -> u64 {
        self.gas_remaining.saturating_sub(self.gas_cost)
    }
}
