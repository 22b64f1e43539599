// src/pipeline.rs

//! Drives generation at a fixed cadence and coordinates shutdown.
//!
//! The controller owns the frame source and the queue, runs the transport
//! worker in the background, and is the only place that decides the outcome
//! of a run. Generation and delivery share nothing except the queue and the
//! stop flag.

use crate::fire::FrameSource;
use crate::queue::{FrameQueue, DEFAULT_QUEUE_CAPACITY};
use crate::stop::StopSignal;
use crate::transport::{Transport, TransportError};
use crate::worker::{TransportWorker, WorkerExit, WorkerTiming};
use anyhow::{Context, Result};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

pub const DEFAULT_HTTP_INTERVAL: Duration = Duration::from_millis(80);
pub const DEFAULT_WS_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Sleep between successfully queued frames.
    pub interval: Duration,
    /// How long a push may wait for queue space before the frame is dropped.
    pub push_timeout: Duration,
    /// How long shutdown waits to enqueue the stop sentinel.
    pub stop_timeout: Duration,
    pub queue_capacity: usize,
    pub worker: WorkerTiming,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HTTP_INTERVAL,
            push_timeout: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker: WorkerTiming::default(),
        }
    }
}

/// Frame counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub generated: u64,
    pub dropped: u64,
}

/// How a streaming run ended.
#[derive(Debug)]
pub enum StreamOutcome {
    /// Shut down on request (interrupt). Always a success.
    Interrupted(StreamStats),
    /// The transport hit an unrecoverable failure.
    Aborted(TransportError, StreamStats),
}

impl StreamOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            StreamOutcome::Interrupted(_) => 0,
            StreamOutcome::Aborted(..) => 1,
        }
    }

    pub fn stats(&self) -> StreamStats {
        match self {
            StreamOutcome::Interrupted(stats) | StreamOutcome::Aborted(_, stats) => *stats,
        }
    }
}

pub struct PipelineController<S: FrameSource> {
    source: S,
    settings: PipelineSettings,
    queue: FrameQueue,
    stop: StopSignal,
}

impl<S: FrameSource> PipelineController<S> {
    pub fn new(source: S, settings: PipelineSettings) -> Self {
        Self {
            source,
            queue: FrameQueue::new(settings.queue_capacity),
            stop: StopSignal::new(),
            settings,
        }
    }

    /// Handle to the run's stop flag.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Streams until `interrupt` is raised or the worker aborts the session.
    pub fn run<T>(mut self, transport: T, interrupt: &AtomicBool) -> Result<StreamOutcome>
    where
        T: Transport + 'static,
    {
        info!(
            "Streaming to {} every {:?}",
            transport.endpoint(),
            self.settings.interval
        );

        let worker = TransportWorker::spawn(
            transport,
            self.queue.clone(),
            self.stop.clone(),
            self.settings.worker,
        )?;

        let mut stats = StreamStats::default();
        while !self.stop.is_set() {
            if interrupt.load(Ordering::SeqCst) {
                info!("Interrupted, shutting down");
                break;
            }

            let frame = self.source.next_frame();
            stats.generated += 1;
            if !self.queue.try_push(frame, self.settings.push_timeout) {
                stats.dropped += 1;
                debug!("Queue full, dropped frame {}", stats.generated);
                continue;
            }
            thread::sleep(self.settings.interval);
        }

        self.stop.set();
        if !self.queue.push_stop(self.settings.stop_timeout) {
            debug!("Queue full, stop sentinel not enqueued");
        }
        let exit = worker.join().context("Transport worker failed")?;

        info!(
            "Stream finished: {} frames generated, {} dropped",
            stats.generated, stats.dropped
        );
        Ok(match exit {
            WorkerExit::Stopped => StreamOutcome::Interrupted(stats),
            WorkerExit::Aborted(e) => StreamOutcome::Aborted(e, stats),
        })
    }
}
