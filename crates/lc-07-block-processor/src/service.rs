//! # Processor Service
//!
//! The queue front of the block processor: a fast lane for locally composed
//! units and a normal lane for everything from the transport. One task
//! drains both (fast lane first) and hands each job to the blocking
//! processor, preserving admission order.

use crate::errors::ProcessError;
use crate::item::ProcessItem;
use crate::processor::BlockProcessor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const FAST_QUEUE_DEPTH: usize = 1_024;
const NORMAL_QUEUE_DEPTH: usize = 8_192;

/// Submission side of the processor queue.
#[derive(Clone)]
pub struct ProcessorHandle {
    fast: mpsc::Sender<ProcessItem>,
    normal: mpsc::Sender<ProcessItem>,
}

impl ProcessorHandle {
    /// Enqueue a unit; locally composed units jump the line.
    pub async fn submit(&self, item: ProcessItem) -> Result<(), ProcessError> {
        let queue = if item.is_local() { &self.fast } else { &self.normal };
        queue
            .send(item)
            .await
            .map_err(|_| ProcessError::QueueClosed)
    }

    /// Non-async enqueue for callers outside the runtime.
    pub fn submit_blocking(&self, item: ProcessItem) -> Result<(), ProcessError> {
        let queue = if item.is_local() { &self.fast } else { &self.normal };
        queue
            .blocking_send(item)
            .map_err(|_| ProcessError::QueueClosed)
    }
}

/// Receiving side of the processor queue; drive it with [`ProcessorQueue::run`].
pub struct ProcessorQueue {
    fast: mpsc::Receiver<ProcessItem>,
    normal: mpsc::Receiver<ProcessItem>,
}

impl ProcessorQueue {
    /// Drain both lanes, fast lane first, until every handle is dropped.
    pub async fn run(mut self, processor: Arc<BlockProcessor>) {
        loop {
            let item = tokio::select! {
                biased;
                Some(item) = self.fast.recv() => item,
                Some(item) = self.normal.recv() => item,
                else => break,
            };
            let worker = processor.clone();
            match tokio::task::spawn_blocking(move || worker.process(item)).await {
                Ok(Ok(outcomes)) => {
                    tracing::trace!(target: "lc::processor", count = outcomes.len(), "queue batch processed");
                }
                Ok(Err(e)) => {
                    tracing::error!(target: "lc::processor", error = %e, "admission failed");
                }
                Err(e) => {
                    tracing::error!(target: "lc::processor", error = %e, "processor worker panicked");
                }
            }
        }
        tracing::info!(target: "lc::processor", "processor queue drained, shutting down");
    }
}

/// Build the queue pair without starting anything.
pub fn channel() -> (ProcessorHandle, ProcessorQueue) {
    let (fast_tx, fast_rx) = mpsc::channel(FAST_QUEUE_DEPTH);
    let (normal_tx, normal_rx) = mpsc::channel(NORMAL_QUEUE_DEPTH);
    (
        ProcessorHandle {
            fast: fast_tx,
            normal: normal_tx,
        },
        ProcessorQueue {
            fast: fast_rx,
            normal: normal_rx,
        },
    )
}

/// Build the queue and spawn its drain task on the current runtime.
pub fn spawn(processor: Arc<BlockProcessor>) -> (ProcessorHandle, JoinHandle<()>) {
    let (handle, queue) = channel();
    let task = tokio::spawn(queue.run(processor));
    (handle, task)
}
