//! HTTP client for the chat backend: SSE inbound stream plus initiation POST

use async_stream::stream;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};

use crate::{
    error::{Error, Result},
    stream::RawEventStream,
    types::InitiationRequest,
};

/// Path of the inbound event stream
pub const STREAM_PATH: &str = "/api/chat/stream";
/// Path of the initiation call
pub const INITIATE_PATH: &str = "/api/chat";

/// Chat backend client
#[derive(Clone)]
pub struct ChatApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatApiClient {
    /// Create a new client for a backend base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open the inbound event stream
    pub fn open_stream(&self, session_id: Option<&str>) -> Result<RawEventStream> {
        let url = format!("{}{}", self.base_url, STREAM_PATH);
        let mut request_builder = self.client.get(&url);
        if let Some(id) = session_id {
            request_builder = request_builder.query(&[("sessionId", id)]);
        }

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Connection(format!("Failed to create event source: {}", e)))?;

        tracing::debug!(%url, "Opened event stream");
        Ok(Box::pin(create_stream(event_source)))
    }

    /// Issue the initiation call. Any non-success status is an error.
    pub async fn initiate(&self, request: &InitiationRequest) -> Result<()> {
        let url = format!("{}{}", self.base_url, INITIATE_PATH);

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body = if body.is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(Error::status(status.as_u16(), body));
        }

        Ok(())
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<String>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    yield Ok(msg.data);
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    yield Err(Error::status(status.as_u16(), body));
                    break;
                }
                Err(e) => {
                    yield Err(Error::Sse(e.to_string()));
                    break;
                }
            }
        }
        // The event source reconnects on its own unless closed explicitly
        event_source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_base_url_without_scheme() {
        assert!(matches!(
            ChatApiClient::new("localhost:3000"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let client = ChatApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
