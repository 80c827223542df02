pub mod challenge;
pub mod controller;
pub mod record;

pub use challenge::{generate_challenge, Challenge, Operation};
pub use controller::{GateError, ParentalGate, Unlocked, MAX_ATTEMPTS};
pub use record::PARENTAL_LOCK_KEY;
