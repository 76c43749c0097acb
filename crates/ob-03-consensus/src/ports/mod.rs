//! Ports layer (Hexagonal Architecture)

mod outbound;

pub use outbound::*;
pub use shared_bus::MessagePublisher;
