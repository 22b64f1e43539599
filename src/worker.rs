// src/worker.rs

//! Background thread that drains the frame queue into a transport.

use crate::queue::{FrameQueue, QueueItem};
use crate::stop::StopSignal;
use crate::transport::{Recovery, Transport, TransportError};
use anyhow::{anyhow, Context, Result};
use log::*;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Waits used by the worker loop.
#[derive(Debug, Clone, Copy)]
pub struct WorkerTiming {
    /// How long one `pop` waits before re-checking the stop flag.
    pub poll: Duration,
    /// Pause between failed connect attempts.
    pub reconnect_backoff: Duration,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(200),
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

/// How the worker loop ended.
#[derive(Debug)]
pub enum WorkerExit {
    /// Stop flag observed or stop sentinel dequeued.
    Stopped,
    /// An unrecoverable delivery failure ended the session.
    Aborted(TransportError),
}

impl WorkerExit {
    pub fn is_aborted(&self) -> bool {
        matches!(self, WorkerExit::Aborted(_))
    }
}

pub struct TransportWorker {
    join_handle: Option<JoinHandle<WorkerExit>>,
}

impl TransportWorker {
    /// Spawns the worker thread. The transport moves into the thread and is
    /// owned exclusively by it.
    pub fn spawn<T>(
        mut transport: T,
        queue: FrameQueue,
        stop: StopSignal,
        timing: WorkerTiming,
    ) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let handle = thread::Builder::new()
            .name("transport".to_string())
            .spawn(move || run_transport_loop(&mut transport, &queue, &stop, timing))
            .context("Failed to spawn transport worker thread")?;

        Ok(Self {
            join_handle: Some(handle),
        })
    }

    /// Waits for the worker to finish.
    pub fn join(mut self) -> Result<WorkerExit> {
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("transport worker thread panicked")),
            None => Ok(WorkerExit::Stopped),
        }
    }
}

impl Drop for TransportWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() && !thread::panicking() {
                error!("Transport worker panicked");
            }
        }
    }
}

/// Main worker loop.
///
/// Runs until the stop flag is set, the stop sentinel arrives, or a delivery
/// fails on a transport whose recovery is `Abort`. Calls `Transport::close`
/// exactly once on the way out.
pub fn run_transport_loop<T: Transport + ?Sized>(
    transport: &mut T,
    queue: &FrameQueue,
    stop: &StopSignal,
    timing: WorkerTiming,
) -> WorkerExit {
    debug!("Transport worker started for {}", transport.endpoint());

    let exit = loop {
        if stop.is_set() {
            debug!("Transport worker observed stop flag");
            break WorkerExit::Stopped;
        }

        if !transport.is_connected() {
            match transport.connect() {
                Ok(()) => info!("Connected to {}", transport.endpoint()),
                Err(e) => {
                    warn!("Failed to connect: {}. Retrying...", e);
                    sleep_unless_stopped(timing.reconnect_backoff, stop);
                    continue;
                }
            }
        }

        let frame = match queue.pop(timing.poll) {
            None => continue,
            Some(QueueItem::Stop) => {
                debug!("Transport worker received stop sentinel");
                break WorkerExit::Stopped;
            }
            Some(QueueItem::Frame(frame)) => frame,
        };

        if let Err(e) = transport.deliver(&frame) {
            match transport.recovery() {
                Recovery::Abort => {
                    error!("{}", e);
                    stop.set();
                    break WorkerExit::Aborted(e);
                }
                Recovery::Reconnect => {
                    warn!("Transport error ({:?}): {}. Reconnecting...", e.kind(), e);
                    if !queue.try_push(frame, Duration::ZERO) {
                        debug!("Queue full, dropping frame that failed to send");
                    }
                    transport.disconnect();
                }
            }
        }
    };

    transport.close();
    debug!("Transport worker exited: {:?}", exit);
    exit
}

/// Sleeps for `total`, waking early if the stop flag is set.
fn sleep_unless_stopped(total: Duration, stop: &StopSignal) {
    const SLICE: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + total;
    while !stop.is_set() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
}
