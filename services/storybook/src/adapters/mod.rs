pub mod clock;
pub mod db;
pub mod kv_file;
pub mod library;
pub mod memory;
pub mod speech;

pub use clock::SystemClock;
pub use db::PgKeyValueStore;
pub use kv_file::FileKeyValueStore;
pub use library::JsonStoryLibrary;
pub use memory::{MemoryKeyValueStore, MemoryStoryLibrary};
pub use speech::{SimulatedSpeechAdapter, Utterance};
