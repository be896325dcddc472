//! Per-source pump task: chunk stream → demux → parse → store sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::events::Event;
use crate::host::ChunkStream;
use crate::parser::line::LineParser;
use crate::parser::model::{LogRecord, RecordIds};
use crate::wire;

pub(super) struct Pump {
    pub source_id: String,
    pub source_name: String,
    pub stream: ChunkStream,
    pub pause: watch::Receiver<bool>,
    pub cancel: CancellationToken,
    pub active: Arc<AtomicBool>,
    pub ids: Arc<RecordIds>,
    pub sink: mpsc::UnboundedSender<Vec<LogRecord>>,
    pub events: broadcast::Sender<Event>,
}

/// Drive one source until cancellation, end-of-stream, or transport
/// failure. While paused the transport is simply not polled, which is
/// what pushes backpressure down to the host's boundary.
pub(super) async fn run(mut pump: Pump) {
    let parser = LineParser::new();

    loop {
        if *pump.pause.borrow() {
            tokio::select! {
                _ = pump.cancel.cancelled() => return,
                changed = pump.pause.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            }
        }

        tokio::select! {
            _ = pump.cancel.cancelled() => return,
            changed = pump.pause.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            item = pump.stream.next() => match item {
                Some(Ok(chunk)) => {
                    let mut records = Vec::new();
                    for frame in wire::demux(&chunk) {
                        records.extend(parser.parse_chunk(
                            &frame.payload,
                            &pump.source_id,
                            &pump.source_name,
                            frame.kind,
                            &pump.ids,
                        ));
                    }
                    if !records.is_empty() && pump.sink.send(records).is_err() {
                        // Store gone; nothing left to feed.
                        return;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(source = %pump.source_id, error = %e, "log stream failed");
                    pump.active.store(false, Ordering::Release);
                    let _ = pump.events.send(Event::SourceError {
                        id: pump.source_id.clone(),
                        error: e.to_string(),
                    });
                    return;
                }
                None => {
                    tracing::debug!(source = %pump.source_id, "log stream ended");
                    pump.active.store(false, Ordering::Release);
                    let _ = pump.events.send(Event::SourceDisconnected {
                        id: pump.source_id.clone(),
                    });
                    return;
                }
            }
        }
    }
}
