//! Sample components and helpers shared by the simulation scenarios.

pub mod counter;
pub mod gate;
pub mod transfer;
