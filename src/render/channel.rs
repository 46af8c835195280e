use super::{RenderCommand, RenderSink};
use tokio::sync::mpsc;

/// Forwards render commands to a presentation task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RenderCommand>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<RenderCommand>) -> Self {
        Self { tx }
    }
}

impl RenderSink for ChannelSink {
    fn apply(&mut self, command: RenderCommand) {
        let _ = self.tx.send(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        sink.apply(RenderCommand::OpenSurface);
        sink.apply(RenderCommand::ReplaceLive("a".to_string()));
        drop(sink);

        assert_eq!(rx.try_recv().ok(), Some(RenderCommand::OpenSurface));
        assert_eq!(
            rx.try_recv().ok(),
            Some(RenderCommand::ReplaceLive("a".to_string()))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.apply(RenderCommand::Notice("nobody listening".to_string()));
    }
}
