mod api;
mod event;

pub use api::{ApiEvent, ApiMessage, Content, ContentBlock, Delta, MessageDelta, MessageStartData};
pub use event::{text_envelope, tool_start_envelope, StreamEvent};
