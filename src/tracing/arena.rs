use super::{
    types::{CallTrace, CallTraceNode},
    utils::state_check,
};
use alloc::vec::Vec;

/// An arena of recorded call traces.
///
/// The first node is the top-level call. Parent and child links are indices into the arena, so
/// the tree owns its nodes only through this vector.
///
/// This type will be populated via the [TraceSession](super::TraceSession).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallTraceArena {
    /// The arena of recorded trace nodes
    pub(crate) arena: Vec<CallTraceNode>,
}

impl CallTraceArena {
    /// Returns the nodes in the arena.
    #[inline]
    pub fn nodes(&self) -> &[CallTraceNode] {
        &self.arena
    }

    /// Returns the top-level call, if any instruction executed.
    #[inline]
    pub fn root(&self) -> Option<&CallTraceNode> {
        self.arena.first()
    }

    /// Returns true if no call was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns the number of recorded calls.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Pushes the top-level call, returning its index.
    pub(crate) fn push_root(&mut self, trace: CallTrace) -> usize {
        state_check!(self.arena.is_empty(), "root call recorded twice");
        state_check!(trace.depth == 0);
        self.arena.push(CallTraceNode { parent: None, trace, idx: 0, ..Default::default() });
        0
    }

    /// Pushes a nested call of `parent` into the arena, returning its index.
    pub(crate) fn push_child(&mut self, parent: usize, trace: CallTrace) -> usize {
        state_check!(parent < self.arena.len(), "parent {parent} of {} nodes", self.arena.len());
        state_check!(trace.depth == self.arena[parent].trace.depth + 1);

        let idx = self.arena.len();
        self.arena.push(CallTraceNode { parent: Some(parent), trace, idx, ..Default::default() });
        self.arena[parent].children.push(idx);
        idx
    }

    #[inline]
    pub(crate) fn node(&self, idx: usize) -> &CallTraceNode {
        &self.arena[idx]
    }

    #[inline]
    pub(crate) fn trace_mut(&mut self, idx: usize) -> &mut CallTrace {
        &mut self.arena[idx].trace
    }
}
