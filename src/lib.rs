//! Hegemon game core library.
//!
//! Exposes the board representation, order resolution, turn coordination
//! and client protocol modules for use by the binaries, integration tests
//! and benchmarks.

pub mod board;
pub mod bot;
pub mod config;
pub mod protocol;
pub mod resolve;
pub mod simulate;
pub mod turn;
