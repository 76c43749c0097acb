//! Cross-subsystem integration tests.

pub mod e2e_consensus;
pub mod flows;
