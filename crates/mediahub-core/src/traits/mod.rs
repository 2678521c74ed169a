//! Core traits defined in `mediahub-core` and implemented by other crates.

pub mod events;

pub use events::EventSink;
