//! Util functions for revert reason decoding, memory access and invariant checks.

use alloc::{borrow::Cow, format, string::String, vec::Vec};
use alloy_primitives::{hex, B256, U256};
use alloy_sol_types::{Revert, SolError};
use core::fmt;
use revm::bytecode::opcode::OpCode;

/// Maximum number of storage entries a single prestate counter returns.
///
/// Bounds the response size of pathological transactions, see
/// <https://banteg.mirror.xyz/3dbuIlaHh30IPITWzfT1MFfSg6fxSssMqJ7TcjaWecM>
pub const MAX_STORAGE_VALUES_RETURNED: usize = 1024;

/// Maximum number of 32-byte memory words recorded per struct log.
pub const MAX_MEMORY_WORDS_RETURNED: usize = 256;

/// Maximum depth of a rendered call tree.
pub const MAX_TRACE_DEPTH: usize = 256;

/// Halts with a descriptive message if the tracer's own invariant does not hold.
///
/// A failed check means the trace is corrupt, so this never returns an error.
macro_rules! state_check {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::tracing::utils::state_check_failed(
                stringify!($cond),
                file!(),
                line!(),
                format_args!(""),
            )
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::tracing::utils::state_check_failed(
                stringify!($cond),
                file!(),
                line!(),
                format_args!($($arg)+),
            )
        }
    };
}
pub(crate) use state_check;

#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn state_check_failed(
    expr: &str,
    file: &str,
    line: u32,
    context: fmt::Arguments<'_>,
) -> ! {
    let msg = format!("State check failed::{expr} {file}:{line} {context}");
    tracing::error!(target: "evm_trace_session", "{msg}");
    panic!("{msg}")
}

/// Decodes the message of a standard `Error(string)` revert payload.
///
/// Anything that is not a canonical encoding (wrong selector, offset other than `0x20`,
/// truncated payload) decodes to an empty string.
pub fn decode_revert_reason(data: &[u8]) -> String {
    const HEAD_LEN: usize = 4 + 32 + 32;

    if data.len() < HEAD_LEN || data[..4] != Revert::SELECTOR {
        return String::new();
    }
    if U256::from_be_slice(&data[4..36]) != U256::from(0x20) {
        return String::new();
    }
    Revert::abi_decode(data).map(|revert| revert.reason).unwrap_or_default()
}

/// Returns the `len` bytes of memory starting at `offset`.
///
/// Returns `None` if the range is not fully inside the current memory.
pub(crate) fn memory_slice(memory: &[u8], offset: U256, len: U256) -> Option<&[u8]> {
    let len = usize::try_from(len).ok()?;
    if len == 0 {
        return Some(&[]);
    }
    let offset = usize::try_from(offset).ok()?;
    let end = offset.checked_add(len)?;
    memory.get(offset..end)
}

/// Splits memory into at most [MAX_MEMORY_WORDS_RETURNED] hex encoded 32-byte words.
pub(crate) fn memory_words(memory: &[u8]) -> Vec<String> {
    memory
        .chunks(32)
        .take(MAX_MEMORY_WORDS_RETURNED)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word[..chunk.len()].copy_from_slice(chunk);
            hex::encode(word)
        })
        .collect()
}

/// Converts a stack item into a 32-byte word.
#[inline]
pub(crate) fn word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Returns the mnemonic of the opcode.
pub(crate) fn opcode_name(op: u8) -> Cow<'static, str> {
    match OpCode::new(op) {
        Some(op) => Cow::Borrowed(op.as_str()),
        None => Cow::Owned(format!("opcode {op:#04x} not defined")),
    }
}
