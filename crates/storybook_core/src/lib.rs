pub mod domain;
pub mod ports;

pub use domain::{Page, SpeechOptions, Story, UnlockRecord};
pub use ports::{Clock, KeyValueStore, PortError, PortResult, SpeechService, StoryLibrary};
