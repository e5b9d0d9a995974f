//! Per-transaction EVM execution tracing.
//!
//! A [`TraceSession`](tracing::TraceSession) is fed one callback per executed instruction and
//! reconstructs the call tree, the touched accounts and storage slots and, if requested, a
//! struct-log of every step. Once the transaction result is known the session is finalized and
//! rendered into one of the geth (`callTracer`, `prestateTracer`, struct logs, `4byteTracer`,
//! `noopTracer`) or parity (replay) output documents.
//!
//! The tracer never writes to the state it observes: the interpreter and world-state are only
//! accessed through the read-only views in [`interp`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

extern crate alloc;

/// Touched accounts and storage slots of a traced transaction.
pub mod access;

/// Boundary views of the interpreter, its externalities and the world state.
pub mod interp;

/// The trace session and all output formats.
pub mod tracing;
