//! `edgeguard-core` -- pure decision logic for the edge posture controller.
//!
//! Nothing in this crate performs I/O. Probes, the Cloudflare client and
//! the run orchestration live in the sibling crates and feed values in.

pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod loadavg;
pub mod posture;
pub mod snapshot;
pub mod thresholds;
