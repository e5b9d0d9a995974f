//! Serializable output documents of every tracer.
//!
//! All numbers are rendered as compact `0x` hex, except in struct logs which mirror geth's
//! numeric fields.

use alloc::{boxed::Box, string::String, vec::Vec};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The rendered output of a finished trace session.
///
/// Serializes to exactly the document of the contained format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TraceFrame {
    /// Struct-log trace.
    Default(DefaultFrame),
    /// `callTracer` trace.
    Call(CallFrame),
    /// `prestateTracer` trace.
    Prestate(PreStateFrame),
    /// Parity replay trace.
    Replay(ReplayFrame),
    /// `4byteTracer` trace.
    FourByte(FourByteFrame),
    /// `noopTracer` trace.
    Noop(NoopFrame),
    /// All traces at once.
    All(Box<MuxFrame>),
}

impl TraceFrame {
    /// Converts the frame into a JSON value.
    pub fn into_json(self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A single call of a `callTracer` trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// The opcode mnemonic of the call.
    #[serde(rename = "type")]
    pub typ: String,
    /// The caller.
    pub from: Address,
    /// The callee, absent for nested creations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Gas available to the call.
    pub gas: U256,
    /// Gas used by the call.
    pub gas_used: U256,
    /// Description of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoded revert message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    /// Transferred value.
    pub value: U256,
    /// Return data, or the deployed code for creations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Bytes>,
    /// Call data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    /// Logs emitted by the call itself.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<CallLogFrame>,
    /// Nested calls, in call order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallFrame>,
}

/// A log of a `callTracer` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CallLogFrame {
    /// The emitting contract.
    pub address: Address,
    /// Non-indexed data.
    pub data: Bytes,
    /// Topics, in emission order.
    pub topics: Vec<B256>,
}

/// A `prestateTracer` trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PreStateFrame {
    /// State of every touched account before the transaction.
    Default(PreStateMode),
    /// Changed fields before and after the transaction.
    Diff(DiffMode),
}

impl PreStateFrame {
    /// Returns the prestate if this is not a diff.
    pub const fn as_default(&self) -> Option<&PreStateMode> {
        match self {
            Self::Default(mode) => Some(mode),
            Self::Diff(_) => None,
        }
    }

    /// Returns the diff if this is one.
    pub const fn as_diff(&self) -> Option<&DiffMode> {
        match self {
            Self::Default(_) => None,
            Self::Diff(diff) => Some(diff),
        }
    }
}

/// Touched accounts in first-touch order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PreStateMode(pub IndexMap<Address, AccountState>);

/// Changed account fields before and after the transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffMode {
    /// Values before the transaction.
    pub pre: IndexMap<Address, AccountState>,
    /// Values after the transaction.
    pub post: IndexMap<Address, AccountState>,
}

/// Account fields of a prestate trace, absent fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccountState {
    /// Balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
    /// Nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
    /// Code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Bytes>,
    /// Storage slots.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub storage: IndexMap<U256, U256>,
}

impl AccountState {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.balance.is_none()
            && self.nonce.is_none()
            && self.code.is_none()
            && self.storage.is_empty()
    }
}

/// The struct-log trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultFrame {
    /// Total gas used by the transaction.
    pub gas: u64,
    /// One record per executed instruction.
    pub struct_logs: Vec<StructLog>,
    /// Whether the transaction failed.
    pub failed: bool,
    /// Hex encoded output, or the revert message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<String>,
    /// The revert message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single executed instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    /// Program counter.
    pub pc: u64,
    /// Opcode mnemonic.
    pub op: String,
    /// Gas remaining before the instruction.
    pub gas: u64,
    /// Cost of the instruction.
    pub gas_cost: u64,
    /// Call depth, starting at 1.
    pub depth: u64,
    /// Stack, bottom first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<U256>>,
    /// Memory as 32-byte hex words.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<String>>,
    /// Refund counter, if not zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<u64>,
    /// Every known slot of the executing contract, for `SLOAD` and `SSTORE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<IndexMap<String, String>>,
    /// Revert message, for `REVERT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A parity style replay trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFrame {
    /// Always `null`.
    pub vm_trace: Option<Value>,
    /// Always `null`.
    pub state_diff: Option<Value>,
    /// Hash of the traced transaction.
    pub transaction_hash: B256,
    /// Output of the transaction.
    pub output: Bytes,
    /// Description of the failure, if the transaction failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every call in pre-order.
    pub trace: Vec<TransactionTrace>,
}

/// A call of a replay trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTrace {
    /// Call parameters.
    pub action: CallAction,
    /// Call outcome.
    pub result: CallOutput,
    /// Number of direct nested calls.
    pub subtraces: usize,
    /// Child indices on the path from the top-level call.
    pub trace_address: Vec<usize>,
    /// Lowercase opcode mnemonic.
    #[serde(rename = "type")]
    pub typ: String,
    /// Description of the failure, if the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parameters of a replayed call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    /// The caller.
    pub from: Address,
    /// The callee.
    pub to: Address,
    /// Gas available to the call.
    pub gas: U64,
    /// Call data.
    pub input: Bytes,
    /// Transferred value.
    pub value: U256,
    /// Lowercase opcode mnemonic.
    pub call_type: String,
}

/// Outcome of a replayed call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutput {
    /// Gas used by the call.
    pub gas_used: U64,
    /// Return data.
    pub output: Bytes,
}

/// Histogram of `<selector>-<argument length>` keys to the number of calls, as decimal strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FourByteFrame(pub IndexMap<String, String>);

/// The empty document of the `noopTracer`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NoopFrame {}

/// Every trace format of one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxFrame {
    /// Struct-log trace.
    pub default_trace: DefaultFrame,
    /// Prestate trace.
    pub prestate_trace: PreStateFrame,
    /// Call trace.
    pub call_trace: CallFrame,
    /// Replay trace.
    pub replay_trace: ReplayFrame,
    /// 4byte trace.
    #[serde(rename = "4byteTrace")]
    pub four_byte_trace: FourByteFrame,
    /// Noop trace.
    pub noop_trace: NoopFrame,
}
