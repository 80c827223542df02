pub mod controller;
pub mod events;
pub mod settings;
pub mod state;

pub use controller::{PlaybackError, PlaybackOptions, PlaybackReceiver, StoryPlaybackController};
pub use events::{PlaybackEvent, PlaybackNotice};
pub use settings::{AdvanceTiming, PlaybackSettings, ReaderProfile, SPEED_PRESETS};
pub use state::{PlaybackPhase, PlaybackSnapshot};
