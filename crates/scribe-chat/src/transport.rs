//! Transport abstraction for the two-phase request/stream exchange

use async_trait::async_trait;
use scribe_ai::{ChatApiClient, InitiationRequest, RawEventStream, Result};

/// Opens the inbound stream and issues the initiation call.
///
/// Closing the connection is dropping the returned stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the inbound event stream for a session
    async fn connect(&self, session_id: &str) -> Result<RawEventStream>;

    /// Issue the outbound initiation call
    async fn initiate(&self, request: InitiationRequest) -> Result<()>;
}

/// Transport backed by the HTTP/SSE backend client
pub struct ApiTransport {
    client: ChatApiClient,
}

impl ApiTransport {
    /// Create a transport for a backend base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: ChatApiClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl Transport for ApiTransport {
    async fn connect(&self, session_id: &str) -> Result<RawEventStream> {
        self.client.open_stream(Some(session_id))
    }

    async fn initiate(&self, request: InitiationRequest) -> Result<()> {
        self.client.initiate(&request).await
    }
}
