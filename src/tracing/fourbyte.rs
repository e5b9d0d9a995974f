//! Fourbyte tracing support
//!
//! Counts the function selectors of all recorded calls, keyed by the selector and the length of
//! the remaining call data:
//!
//! ```json
//! {
//!   "0x27dc297e-128": "1",
//!   "0x38cc4831-0": "2",
//!   "0x524f3889-96": "1",
//!   "0xadf59f99-288": "1",
//!   "0xc281d19e-0": "1"
//! }
//! ```
//!
//! Nested contract creations are skipped, their input is init code rather than call data.

use crate::tracing::{frame::FourByteFrame, types::CallTraceNode};
use alloc::{borrow::Cow, format, string::ToString, vec::Vec};
use alloy_primitives::{hex, Selector};
use indexmap::IndexMap;

/// Builds the `4byteTracer` histogram from recorded calls.
#[derive(Clone, Debug)]
pub struct FourByteTraceBuilder<'a> {
    /// Recorded trace nodes
    nodes: Cow<'a, [CallTraceNode]>,
}

impl FourByteTraceBuilder<'static> {
    /// Returns a new instance of the builder from [`Cow::Owned`]
    pub fn new(nodes: Vec<CallTraceNode>) -> FourByteTraceBuilder<'static> {
        Self { nodes: Cow::Owned(nodes) }
    }
}

impl<'a> FourByteTraceBuilder<'a> {
    /// Returns a new instance of the builder from [`Cow::Borrowed`]
    pub fn new_borrowed(nodes: &'a [CallTraceNode]) -> FourByteTraceBuilder<'a> {
        Self { nodes: Cow::Borrowed(nodes) }
    }

    /// Returns the number of calls per `(selector, call data length)`, in first-seen order.
    pub fn selector_counts(&self) -> IndexMap<(Selector, usize), u64> {
        let mut counts = IndexMap::new();
        for node in self.nodes.iter() {
            if node.trace.depth > 0 && node.kind().is_any_create() {
                continue;
            }
            if let Some(selector) = node.selector() {
                let calldata_size = node.trace.data.len() - 4;
                *counts.entry((Selector::from(selector), calldata_size)).or_default() += 1;
            }
        }
        counts
    }

    /// Generate the `4byteTracer` trace.
    pub fn four_byte_trace(&self) -> FourByteFrame {
        FourByteFrame(
            self.selector_counts()
                .into_iter()
                .map(|((selector, calldata_size), count)| {
                    let key = format!("{}-{calldata_size}", hex::encode_prefixed(selector));
                    (key, count.to_string())
                })
                .collect(),
        )
    }
}
