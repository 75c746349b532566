//! scribe-ai: wire protocol for the scribe chat backend
//!
//! This crate provides the message and initiation types sent upstream, the
//! parser for inbound stream events, and an HTTP/SSE client.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::ChatApiClient;
pub use error::{Error, Result};
pub use stream::{RawEventStream, StreamEvent};
pub use types::*;
