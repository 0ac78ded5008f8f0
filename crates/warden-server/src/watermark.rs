//! Watermark job queue.
//!
//! Watermarking itself happens outside this crate. Documents that need a
//! watermarked copy are handed to a [`WatermarkQueue`]; the worker reports
//! back through `TrustCenterService::{start,complete,fail}_watermark`.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// A document whose uploaded file needs a watermarked copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkJob {
    pub document_id: String,
    pub trust_center_id: String,
    /// Uploaded file to watermark.
    pub source_file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatermarkQueueError {
    #[error("watermark queue is closed")]
    Closed,
}

/// Sink for watermark jobs.
#[async_trait]
pub trait WatermarkQueue: Send + Sync + 'static {
    async fn enqueue(&self, job: WatermarkJob) -> Result<(), WatermarkQueueError>;
}

/// Queue backed by a tokio channel. The receiver side is the worker.
pub struct ChannelWatermarkQueue {
    sender: mpsc::Sender<WatermarkJob>,
}

impl ChannelWatermarkQueue {
    /// Creates a queue holding at most `capacity` pending jobs.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WatermarkJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl WatermarkQueue for ChannelWatermarkQueue {
    async fn enqueue(&self, job: WatermarkJob) -> Result<(), WatermarkQueueError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| WatermarkQueueError::Closed)
    }
}
