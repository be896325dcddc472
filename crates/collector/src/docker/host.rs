//! Bollard-backed [`ContainerHost`].
//!
//! bollard splits the engine's multiplexed connection into [`LogOutput`]
//! frames before we ever see bytes, so this host puts the 8-byte header
//! back on. Every tap then speaks the same wire contract regardless of
//! where it came from, and the demultiplexer runs unconditionally.

use bollard::container::LogOutput;
use bollard::query_parameters::LogsOptions;
use bollard::Docker;
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream::StreamExt;

use crate::host::{ChunkStream, ContainerHost, TransportError};
use crate::wire::HEADER_LEN;

#[derive(Debug, Clone)]
pub struct DockerHost {
    client: Docker,
}

impl DockerHost {
    /// Connect to the Docker daemon. An empty path means the system
    /// default socket.
    pub fn new(socket_path: &str) -> Result<Self, TransportError> {
        let connection = if socket_path.is_empty() {
            Docker::connect_with_defaults()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?
        } else {
            let clean_path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?
        };

        Ok(Self { client: connection })
    }
}

impl ContainerHost for DockerHost {
    fn open_log_stream(&self, source_id: &str, follow: bool) -> Result<ChunkStream, TransportError> {
        let options = LogsOptions {
            follow,
            stdout: true,
            stderr: true,
            since: 0,
            until: 0,
            // The engine prepends an RFC3339Nano timestamp per line;
            // the line parser extracts it.
            timestamps: true,
            tail: "all".to_string(),
        };

        let inner = self.client.logs(source_id, Some(options));
        let source = source_id.to_string();

        let chunks = async_stream::stream! {
            futures_util::pin_mut!(inner);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(output) => yield Ok(reframe(output)),
                    Err(e) => {
                        yield Err(map_bollard_error(&source, e));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(chunks))
    }
}

/// Re-apply the wire framing bollard stripped.
fn reframe(output: LogOutput) -> Bytes {
    let (code, payload) = match output {
        LogOutput::StdErr { message } => (2u8, message),
        LogOutput::StdOut { message } => (1u8, message),
        LogOutput::StdIn { message } => (1u8, message),
        LogOutput::Console { message } => (1u8, message),
    };

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(code);
    buf.put_bytes(0, 3);
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(&payload);
    buf.freeze()
}

fn map_bollard_error(source_id: &str, err: bollard::errors::Error) -> TransportError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => TransportError::SourceNotFound(source_id.to_string()),
        other => TransportError::Failed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{demux, StreamKind};

    #[test]
    fn test_reframe_stderr_demuxes_back() {
        let chunk = reframe(LogOutput::StdErr {
            message: Bytes::from_static(b"oops\n"),
        });
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, StreamKind::Stderr);
        assert_eq!(frames[0].payload.as_ref(), b"oops\n");
    }

    #[test]
    fn test_reframe_console_maps_to_stdout() {
        let chunk = reframe(LogOutput::Console {
            message: Bytes::from_static(b"tty output"),
        });
        let frames = demux(&chunk);
        assert_eq!(frames[0].kind, StreamKind::Stdout);
    }

    #[test]
    fn test_404_maps_to_source_not_found() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: abc".to_string(),
        };
        let mapped = map_bollard_error("abc", err);
        assert!(matches!(mapped, TransportError::SourceNotFound(id) if id == "abc"));
    }

    #[test]
    fn test_other_errors_map_to_failed() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "engine on fire".to_string(),
        };
        let mapped = map_bollard_error("abc", err);
        assert!(matches!(mapped, TransportError::Failed(msg) if msg.contains("engine on fire")));
    }
}
