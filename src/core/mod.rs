// src/core/mod.rs

/// Shared data shapes: probe kinds, normalized inputs, outcomes and reports.
pub mod models;

/// Validation and probe error types.
pub mod error;

/// Per-kind rewriting of user-supplied targets.
pub mod normalizer;

/// The `Probe` contract and the invoker that contains probe failures.
pub mod invoker;

/// The ordered list of probes run against each target.
pub mod registry;

/// Concurrent execution of all probes for one target.
pub mod fanout;

/// Batch validation and per-target fan-out.
pub mod batch;

/// Concrete probe units (SSL/TLS, DNS, status, headers, fingerprint, WordPress).
pub mod probes;
