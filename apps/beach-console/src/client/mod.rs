pub mod completion;
pub mod editor;
pub mod renderer;

pub use completion::CompletionCache;
pub use editor::{Completer, LineEditor, ReadMode, ReadOutcome, StdinEditor};
pub use renderer::{RenderState, RenderStep, ResponseRenderer, SpecialRequest};
