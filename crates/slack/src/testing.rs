//! In-memory fakes for exercising handlers without a Slack workspace.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::web_api::{MessagingClient, SendError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
    pub text: String,
}

/// Keeps every send in memory; optionally fails each call after recording it.
#[derive(Default)]
pub struct RecordingMessagingClient {
    sent: Mutex<Vec<SentMessage>>,
    failure: Option<SendError>,
}

impl RecordingMessagingClient {
    pub fn failing(error: SendError) -> Self {
        Self { sent: Mutex::default(), failure: Some(error) }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessagingClient for RecordingMessagingClient {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SendError> {
        self.sent
            .lock()
            .await
            .push(SentMessage { channel: channel.to_owned(), text: text.to_owned() });

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordingMessagingClient, SentMessage};
    use crate::web_api::{MessagingClient, SendError};

    #[tokio::test]
    async fn recording_client_keeps_sends_in_order() {
        let client = RecordingMessagingClient::default();

        client.send_message("C1", "first").await.expect("send");
        client.send_message("C2", "second").await.expect("send");

        assert_eq!(
            client.sent().await,
            vec![
                SentMessage { channel: "C1".to_owned(), text: "first".to_owned() },
                SentMessage { channel: "C2".to_owned(), text: "second".to_owned() },
            ]
        );
    }

    #[tokio::test]
    async fn failing_recording_client_records_then_errors() {
        let client = RecordingMessagingClient::failing(SendError::Transport("down".to_owned()));

        let result = client.send_message("C1", "hi").await;

        assert_eq!(result, Err(SendError::Transport("down".to_owned())));
        assert_eq!(client.sent().await.len(), 1);
    }
}
