//! Streaming LLM and webhook transport layer
//!
//! Everything that touches the network lives here: the SSE stream
//! decoder, the two transport clients, the error taxonomy they share, and
//! the `Transport` seam the channel controllers depend on.

mod error;
mod sse;
mod stream;
mod transport;
mod webhook;

pub use error::ChatError;
pub use sse::SseDecoder;
pub use stream::{StreamingClient, chat_endpoint};
pub use transport::{StreamingTransport, Transport, WebhookTransport};
pub use webhook::{WebhookClient, parse_body};
