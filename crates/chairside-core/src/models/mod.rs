//! Domain models for the chairside system.

mod chair;
mod patient;
mod treatment;

pub use chair::*;
pub use patient::*;
pub use treatment::*;
