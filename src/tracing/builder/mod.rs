/// Geth style trace builder for `debug_` namespace
pub mod geth;

/// Parity style trace builder for `trace_` namespace
pub mod parity;

/// Walker types used for traversing various callgraphs
mod walker;
