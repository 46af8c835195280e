use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::ApiMessage;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted model endpoint. Each request takes the next round of SSE frames
/// and logs the conversation it was sent with; an exhausted script fails the
/// request the way an unreachable endpoint would.
#[derive(Clone, Default)]
pub struct MockApiClient {
    rounds: Arc<Mutex<VecDeque<Vec<String>>>>,
    requests: Arc<Mutex<Vec<Vec<ApiMessage>>>>,
}

impl MockApiClient {
    pub fn new(rounds: Vec<Vec<String>>) -> Self {
        Self {
            rounds: Arc::new(Mutex::new(rounds.into())),
            requests: Arc::default(),
        }
    }

    /// Conversations sent so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<ApiMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

fn sse_frame(frame: String) -> Result<Bytes> {
    if frame.ends_with("\n\n") {
        Ok(Bytes::from(frame))
    } else {
        Ok(Bytes::from(frame + "\n\n"))
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, messages: &[ApiMessage]) -> Result<ByteStream> {
        let round_number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            requests.len()
        };
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock endpoint has no round scripted for request {round_number}"))?;

        Ok(Box::pin(stream::iter(round.into_iter().map(sse_frame))))
    }
}
