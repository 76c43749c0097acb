//! Domain layer for the consensus coordinator
//!
//! Pure types and functions: no I/O, no locks.

mod aggregation;
mod config;
mod error;
mod round;

pub use aggregation::*;
pub use config::*;
pub use error::*;
pub use round::*;
