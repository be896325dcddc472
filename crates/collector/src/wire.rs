//! Wire — demultiplexing of the container runtime's combined output stream.
//!
//! When a container runs without a TTY the engine interleaves stdout and
//! stderr on one connection, prefixing each frame with an 8-byte header:
//! byte 0 is the stream type (1 = stdout, 2 = stderr), bytes 1-3 are
//! reserved, bytes 4-7 carry the payload length as a big-endian u32.
//! TTY-attached containers send raw unframed bytes instead.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Size of the multiplexing header preceding each frame.
pub const HEADER_LEN: usize = 8;

const STREAM_STDOUT: u8 = 1;
const STREAM_STDERR: u8 = 2;

/// Which half of the combined stream a frame (or record) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// One demultiplexed unit of output. The payload is a zero-copy slice of
/// the incoming chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: StreamKind,
    pub payload: Bytes,
}

/// Split a raw chunk into its frames.
///
/// Best-effort by contract, never an error:
/// - chunks too short for a header, or whose first byte is not a known
///   stream type, are passed through whole as a single stdout frame
///   (the TTY / non-multiplexed case);
/// - a declared length that overruns the chunk yields the remaining bytes
///   as a truncated frame and stops;
/// - an unrecognized stream type mid-chunk yields everything past that
///   header as one stdout frame and stops.
pub fn demux(chunk: &Bytes) -> Vec<Frame> {
    if chunk.len() < HEADER_LEN || (chunk[0] != STREAM_STDOUT && chunk[0] != STREAM_STDERR) {
        return vec![Frame {
            kind: StreamKind::Stdout,
            payload: chunk.clone(),
        }];
    }

    let mut frames = Vec::new();
    let mut offset = 0;

    while chunk.len() - offset >= HEADER_LEN {
        let kind = match chunk[offset] {
            STREAM_STDOUT => StreamKind::Stdout,
            STREAM_STDERR => StreamKind::Stderr,
            other => {
                tracing::debug!(stream_type = other, offset, "unrecognized stream type, recovering");
                frames.push(Frame {
                    kind: StreamKind::Stdout,
                    payload: chunk.slice(offset + HEADER_LEN..),
                });
                return frames;
            }
        };

        let declared = u32::from_be_bytes([
            chunk[offset + 4],
            chunk[offset + 5],
            chunk[offset + 6],
            chunk[offset + 7],
        ]) as usize;

        let payload_start = offset + HEADER_LEN;
        let remaining = chunk.len() - payload_start;

        if declared > remaining {
            // Truncated frame: emit what we have and stop.
            frames.push(Frame {
                kind,
                payload: chunk.slice(payload_start..),
            });
            return frames;
        }

        frames.push(Frame {
            kind,
            payload: chunk.slice(payload_start..payload_start + declared),
        });
        offset = payload_start + declared;
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![kind, 0, 0, 0];
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_short_chunk_is_single_stdout_frame() {
        let chunk = Bytes::from_static(b"hello");
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, StreamKind::Stdout);
        assert_eq!(frames[0].payload, chunk);
    }

    #[test]
    fn test_tty_chunk_is_single_stdout_frame() {
        // First byte is printable text, not a stream-type code.
        let chunk = Bytes::from_static(b"plain tty output, no framing at all");
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, StreamKind::Stdout);
        assert_eq!(frames[0].payload, chunk);
    }

    #[test]
    fn test_single_stdout_frame() {
        let chunk = Bytes::from(frame_bytes(1, b"one line\n"));
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, StreamKind::Stdout);
        assert_eq!(frames[0].payload.as_ref(), b"one line\n");
    }

    #[test]
    fn test_multiple_frames_in_order() {
        let mut chunk = frame_bytes(1, b"out-1\n");
        chunk.extend(frame_bytes(2, b"err-1\n"));
        chunk.extend(frame_bytes(1, b"out-2\n"));
        let frames = demux(&Bytes::from(chunk));

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].kind, StreamKind::Stdout);
        assert_eq!(frames[0].payload.as_ref(), b"out-1\n");
        assert_eq!(frames[1].kind, StreamKind::Stderr);
        assert_eq!(frames[1].payload.as_ref(), b"err-1\n");
        assert_eq!(frames[2].kind, StreamKind::Stdout);
        assert_eq!(frames[2].payload.as_ref(), b"out-2\n");
    }

    #[test]
    fn test_truncated_payload_tolerance() {
        let mut chunk = frame_bytes(1, b"complete\n");
        // Declare 100 bytes but provide only 4.
        chunk.extend_from_slice(&[2, 0, 0, 0]);
        chunk.extend_from_slice(&100u32.to_be_bytes());
        chunk.extend_from_slice(b"cut!");
        let frames = demux(&Bytes::from(chunk));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].kind, StreamKind::Stderr);
        assert_eq!(frames[1].payload.as_ref(), b"cut!");
    }

    #[test]
    fn test_unrecognized_type_mid_stream_recovers_as_stdout() {
        let mut chunk = frame_bytes(2, b"fine\n");
        chunk.extend(frame_bytes(7, b"rest of the chunk"));
        let frames = demux(&Bytes::from(chunk));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind, StreamKind::Stderr);
        assert_eq!(frames[1].kind, StreamKind::Stdout);
        assert_eq!(frames[1].payload.as_ref(), b"rest of the chunk");
    }

    #[test]
    fn test_trailing_partial_header_is_dropped() {
        let mut chunk = frame_bytes(1, b"whole\n");
        chunk.extend_from_slice(&[1, 0, 0]); // 3 bytes, not a full header
        let frames = demux(&Bytes::from(chunk));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"whole\n");
    }

    #[test]
    fn test_zero_length_payload() {
        let chunk = Bytes::from(frame_bytes(1, b""));
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = Bytes::new();
        let frames = demux(&chunk);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }
}
