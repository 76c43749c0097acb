//! # Ouroboros Test Suite
//!
//! Cross-crate scenarios that exercise the broker, proof verifier, trust
//! ledger and coordinator together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── e2e_consensus.rs  # Full rounds over real services
//!     └── flows.rs          # Broker flows between services
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ob-tests
//! cargo test -p ob-tests integration::e2e_consensus::
//! ```

pub mod integration;
