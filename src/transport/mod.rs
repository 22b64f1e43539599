// src/transport/mod.rs

//! Delivery strategies for frames.
//!
//! The transport worker only talks to the `Transport` trait. Each strategy
//! declares how the worker should react to a failed delivery through
//! `Transport::recovery`: HTTP aborts the run, WebSocket reconnects.

pub mod http;
pub mod mock;
pub mod websocket;

pub use http::HttpTransport;
pub use websocket::WebSocketTransport;

use crate::pixel::Frame;
use thiserror::Error;

/// Device endpoint that accepts frames over HTTP.
pub const PARAMS_PATH: &str = "/params";
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Coarse classification used for logging and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection refused, timeout, broken socket, malformed response.
    Transport,
    /// The device answered, but with something other than success.
    Protocol,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("timed out")]
    Timeout,
    #[error("{0}")]
    Network(String),
    #[error("connection closed by peer")]
    Closed,
    #[error("server responded {status} {reason}: {body:?}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Status { .. } => ErrorKind::Protocol,
            TransportError::Connect { .. }
            | TransportError::Timeout
            | TransportError::Network(_)
            | TransportError::Closed => ErrorKind::Transport,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Network(err.to_string()),
        }
    }
}

/// What the worker does after `deliver` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Stop the whole streaming session with a failure status.
    Abort,
    /// Drop the connection, re-queue the frame and reconnect on the next iteration.
    Reconnect,
}

/// A way of getting frames onto the device.
pub trait Transport: Send {
    /// Human-readable endpoint used in log lines.
    fn endpoint(&self) -> &str;

    fn recovery(&self) -> Recovery;

    /// Stateless transports are always "connected".
    fn is_connected(&self) -> bool {
        true
    }

    /// Opens a session. Called by the worker whenever `is_connected` is false.
    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Sends one frame. The frame counts as delivered only on `Ok`.
    fn deliver(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Tears down a broken session so the next iteration reconnects.
    fn disconnect(&mut self) {}

    /// End-of-session hook: best-effort "clear" of the device, then release
    /// any connection. Runs at most once; errors are logged and swallowed.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn recovery(&self) -> Recovery {
        (**self).recovery()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn deliver(&mut self, frame: &Frame) -> Result<(), TransportError> {
        (**self).deliver(frame)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
