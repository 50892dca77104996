//! `edgeguard-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod collector;
pub mod config;
pub mod controller;
pub mod process;
pub mod remote;
