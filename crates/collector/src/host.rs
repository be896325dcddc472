//! Container host boundary.
//!
//! The control plane that starts, stops and enumerates containers lives
//! outside this crate; all the pipeline needs from it is a live byte
//! stream per source. Implementations hand back the container's combined
//! output: multiplexed per [`crate::wire`]'s framing when the container
//! runs without a TTY, raw bytes otherwise — the demultiplexer tolerates
//! both.

use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;
use tokio_stream::Stream;

/// Live chunk stream for one source. Ends with `None` on normal
/// end-of-stream; transport failures surface as `Err` items.
///
/// Backpressure contract: the consumer suspends delivery by not polling
/// (the transport buffers or drops at its own boundary), and closes the
/// stream by dropping it.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Source not found: {0}")]
    SourceNotFound(String),
    #[error("Stream closed")]
    StreamClosed,
    #[error("Transport failure: {0}")]
    Failed(String),
}

pub trait ContainerHost: Send + Sync + 'static {
    /// Open the combined output stream of one source. With `follow` the
    /// stream stays live and tails new output; without it the stream
    /// ends after replaying what the engine has retained.
    fn open_log_stream(&self, source_id: &str, follow: bool) -> Result<ChunkStream, TransportError>;
}
