//! # Veris Journal - append-only persistence
//!
//! The fabric's durable structures are all append-only logs: the seal
//! chain, per-seal trust history, topology history, and the enforcement
//! log. This crate provides the one primitive behind them: a typed
//! append-only ledger with monotonic sequence numbers, snapshot reads,
//! and line-oriented export/replay for crash recovery. No component
//! relies on non-replayable state for correctness.

#![forbid(unsafe_code)]

pub mod ledger;

pub use ledger::{Entry, Ledger};
