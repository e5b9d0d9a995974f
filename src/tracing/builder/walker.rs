use crate::tracing::types::CallTraceNode;
use alloc::vec::Vec;

/// Traverses the internal tracing structure depth-first, in call order.
///
/// Every node is yielded together with its `traceAddress`: the child indices on the path from
/// the root. This is a lazy iterator.
pub(crate) struct CallTraceNodeWalkerDF<'trace> {
    /// The entire arena.
    nodes: &'trace [CallTraceNode],
    /// Nodes left to visit with their trace address, the next one last.
    stack: Vec<(usize, Vec<usize>)>,
}

impl<'trace> CallTraceNodeWalkerDF<'trace> {
    pub(crate) fn new(nodes: &'trace [CallTraceNode]) -> Self {
        let mut stack = Vec::with_capacity(nodes.len());
        if !nodes.is_empty() {
            stack.push((0, Vec::new()));
        }
        Self { nodes, stack }
    }
}

impl<'trace> Iterator for CallTraceNodeWalkerDF<'trace> {
    type Item = (&'trace CallTraceNode, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, trace_address) = self.stack.pop()?;
        let curr = &self.nodes[idx];
        // children are pushed in reverse, so the first call is visited next
        for (position, child) in curr.children.iter().enumerate().rev() {
            let mut child_address = trace_address.clone();
            child_address.push(position);
            self.stack.push((*child, child_address));
        }
        Some((curr, trace_address))
    }
}
