//! Session protocol engine.
//!
//! One connection, one request in flight. Every connection starts with an
//! OPTION handshake; EXEC exchanges may pause for FILE or REPLY
//! sub-exchanges; COMP exchanges feed the completion cache.

pub mod engine;
pub mod error;
pub mod interactive;
pub mod options;
pub mod resize;

pub use engine::{EngineState, Output, SessionEngine, SpecialKind};
pub use error::SessionError;
pub use interactive::{CompletionHooks, LoopSettings};
pub use options::SessionOptions;
pub use resize::ResizeWatcher;
