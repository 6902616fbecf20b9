//! Domain layer: value objects, entities and the ports the application layer drives.

pub mod currency;
pub mod ports;
pub mod schedule;
pub mod transaction;
pub mod wallet;
