use crate::{
    interp::StateView,
    tracing::{
        frame::{MuxFrame, NoopFrame},
        FinishedTrace, FourByteTraceBuilder,
    },
};
use tracing::trace;

/// Renders every trace format of a finished session at once.
///
/// Every format is rendered exactly as if it was requested on its own, in particular each
/// prestate render counts its storage entries independently.
#[derive(Clone, Copy, Debug)]
pub struct MuxTraceBuilder<'a> {
    /// The sealed session.
    trace: &'a FinishedTrace,
}

impl<'a> MuxTraceBuilder<'a> {
    /// Returns a new builder over the sealed session.
    pub const fn new(trace: &'a FinishedTrace) -> Self {
        Self { trace }
    }

    /// Renders all formats.
    ///
    /// The prestate trace honors [DebugOptions::prestate_diff_mode](super::DebugOptions).
    pub fn build<Pre, Post>(&self, pre: &Pre, post: &Post) -> MuxFrame
    where
        Pre: StateView + ?Sized,
        Post: StateView + ?Sized,
    {
        let trace = self.trace;
        let opts = trace.options();
        let geth = trace.geth_builder();
        trace!(calls = trace.traces().len(), "rendering all traces");

        MuxFrame {
            default_trace: geth.default_trace(trace.struct_logs(), trace.result(), opts),
            prestate_trace: geth.prestate_trace(
                trace.tx(),
                trace.access(),
                opts.prestate_diff_mode,
                pre,
                post,
            ),
            call_trace: geth.call_trace(trace.tx(), trace.result(), opts, post),
            replay_trace: trace.parity_builder().replay_trace(trace.tx(), trace.result()),
            four_byte_trace: FourByteTraceBuilder::new_borrowed(trace.traces().nodes())
                .four_byte_trace(),
            noop_trace: NoopFrame {},
        }
    }
}
