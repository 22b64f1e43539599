// src/lib.rs

//! Streams a procedural fire effect to a network-attached LED matrix.
//!
//! Generator -> bounded queue -> transport worker -> device. The worker
//! delivers over HTTP (one request per frame, abort on failure) or a
//! WebSocket session (reconnect on failure). A shared stop flag carries
//! fatal failures back to the controller.

pub mod config;
pub mod fire;
pub mod palette;
pub mod pipeline;
pub mod pixel;
pub mod probe;
pub mod queue;
pub mod rng;
pub mod signals;
pub mod stop;
pub mod transport;
pub mod worker;

pub use config::{Config, TransportKind};
pub use fire::{FireEffect, FrameSource};
pub use pipeline::{PipelineController, PipelineSettings, StreamOutcome};
pub use pixel::{Frame, Pixel};
pub use queue::{FrameQueue, QueueItem};
pub use stop::StopSignal;
pub use transport::{Transport, TransportError};
