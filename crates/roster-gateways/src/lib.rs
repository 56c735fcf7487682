//! roster-gateways: implementaciones en memoria de los contratos de
//! backend, usadas por los tests de integración y el binario demo.
pub mod channel;
pub mod memory;

pub use channel::ChannelNotificationGateway;
pub use memory::{InMemoryPersistenceGateway, InMemoryPreferenceSink};
