//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod outbox;
pub mod player;
pub mod powerup;
pub mod room;
pub mod round;
pub mod tuning;
pub mod vehicle;
pub mod world;

pub use driver::{GameHandle, GameServer};
pub use world::{GameWorld, WorldSettings};
