//! Output surfaces driven by the stream pump.

mod channel;
mod terminal;
mod transcript;

pub use channel::ChannelSink;
pub use terminal::TerminalSink;
pub use transcript::{Entry, Transcript};

/// A display instruction for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    /// Overwrite the live surface with the full text.
    ReplaceLive(String),
    /// Freeze the live surface and open a new empty one after it.
    OpenSurface,
    /// Informational notice, outside any surface.
    Notice(String),
    Warning(String),
    Error(String),
}

pub trait RenderSink {
    fn apply(&mut self, command: RenderCommand);
}

