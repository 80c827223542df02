//! services/storybook/src/lib.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod gate;
pub mod playback;
