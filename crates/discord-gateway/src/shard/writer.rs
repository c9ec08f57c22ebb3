//! Outbound frame writer
//!
//! The single owner of the WebSocket sink. Heartbeats and close frames go through
//! a priority queue that bypasses the command rate limiter.

use std::sync::Arc;

use futures_util::SinkExt;
use governor::DefaultDirectRateLimiter;
use tokio::sync::mpsc;

use crate::protocol::GatewayFrame;
use crate::transport::{BoxedSink, CloseFrame, Outbound, TransportError};

/// Channel buffer size for outgoing frames
const MESSAGE_BUFFER_SIZE: usize = 100;

#[derive(Debug)]
pub(crate) enum Control {
    Frame(String),
    Close(CloseFrame),
}

/// Sending half of the writer queues
#[derive(Debug, Clone)]
pub(crate) struct Outbox {
    priority: mpsc::Sender<Control>,
    normal: mpsc::Sender<String>,
}

/// Receiving half, owned by the writer task
#[derive(Debug)]
pub(crate) struct WriterQueues {
    pub(crate) priority: mpsc::Receiver<Control>,
    pub(crate) normal: mpsc::Receiver<String>,
}

impl Outbox {
    pub fn channel() -> (Self, WriterQueues) {
        let (priority_tx, priority_rx) = mpsc::channel(MESSAGE_BUFFER_SIZE);
        let (normal_tx, normal_rx) = mpsc::channel(MESSAGE_BUFFER_SIZE);
        (
            Self {
                priority: priority_tx,
                normal: normal_tx,
            },
            WriterQueues {
                priority: priority_rx,
                normal: normal_rx,
            },
        )
    }

    /// Queue a rate-limited frame; false once the writer is gone
    pub async fn send(&self, frame: &GatewayFrame) -> bool {
        self.normal.send(frame.encode()).await.is_ok()
    }

    /// Queue a rate-limited frame without waiting; false if the queue is full or the writer is gone
    pub fn try_send(&self, frame: &GatewayFrame) -> bool {
        self.normal.try_send(frame.encode()).is_ok()
    }

    /// Queue a frame ahead of everything rate-limited
    pub async fn send_priority(&self, frame: &GatewayFrame) -> bool {
        self.priority
            .send(Control::Frame(frame.encode()))
            .await
            .is_ok()
    }

    /// Ask the writer to flush queued frames, send `frame` and stop
    pub async fn close(&self, frame: CloseFrame) -> bool {
        self.priority.send(Control::Close(frame)).await.is_ok()
    }
}

/// Drive the sink until a close is requested or every [`Outbox`] is dropped
pub(crate) async fn run_writer(
    mut sink: BoxedSink,
    mut queues: WriterQueues,
    limiter: Arc<DefaultDirectRateLimiter>,
    shard_id: u32,
) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            biased;

            control = queues.priority.recv() => match control {
                Some(Control::Frame(text)) => sink.send(Outbound::Text(text)).await?,
                Some(Control::Close(frame)) => {
                    while let Ok(text) = queues.normal.try_recv() {
                        limiter.until_ready().await;
                        sink.send(Outbound::Text(text)).await?;
                    }
                    tracing::debug!(shard_id, code = frame.code, "Sending close frame");
                    sink.send(Outbound::Close(frame)).await?;
                    let _ = sink.close().await;
                    return Ok(());
                }
                None => {
                    // Every Outbox is gone; flush what is left
                    while let Some(text) = queues.normal.recv().await {
                        limiter.until_ready().await;
                        sink.send(Outbound::Text(text)).await?;
                    }
                    break;
                }
            },
            text = queues.normal.recv() => match text {
                Some(text) => {
                    limiter.until_ready().await;
                    sink.send(Outbound::Text(text)).await?;
                }
                None => break,
            },
        }
    }

    let _ = sink.close().await;
    Ok(())
}
