// src/queue.rs

//! Bounded FIFO between the generation loop and the transport worker.
//!
//! Backed by a bounded `crossbeam_channel`. Every operation takes a timeout so
//! neither side can block past the point where it should re-check the stop
//! flag. Both ends live in one cloneable handle because the worker also pushes
//! (it re-queues a frame that failed mid-send).

use crate::pixel::Frame;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// What travels through the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Frame(Frame),
    /// No more frames; the consumer finishes after dequeuing this.
    Stop,
}

#[derive(Clone)]
pub struct FrameQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    capacity: usize,
}

impl FrameQueue {
    /// Capacity is fixed for the lifetime of the queue and must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Enqueues `frame`, waiting at most `timeout` for space.
    ///
    /// Returns `false` if the queue stayed full; the frame is dropped.
    pub fn try_push(&self, frame: Frame, timeout: Duration) -> bool {
        self.push_item(QueueItem::Frame(frame), timeout)
    }

    /// Enqueues the stop sentinel, waiting at most `timeout` for space.
    pub fn push_stop(&self, timeout: Duration) -> bool {
        self.push_item(QueueItem::Stop, timeout)
    }

    fn push_item(&self, item: QueueItem, timeout: Duration) -> bool {
        if timeout.is_zero() {
            self.tx.try_send(item).is_ok()
        } else {
            self.tx.send_timeout(item, timeout).is_ok()
        }
    }

    /// Dequeues the next item, waiting at most `timeout`.
    ///
    /// `None` means nothing arrived in time, not that the stream has ended.
    pub fn pop(&self, timeout: Duration) -> Option<QueueItem> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
