// src/transport/mock.rs

//! Scriptable in-memory transport for exercising the worker and pipeline.

use super::{Recovery, Transport, TransportError};
use crate::pixel::Frame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Everything the mock observed. Shared with the test through `MockTransport::record`.
#[derive(Debug, Default)]
pub struct MockRecord {
    pub delivered: Vec<Frame>,
    pub failed: Vec<Frame>,
    pub connect_attempts: usize,
    pub disconnects: usize,
    pub closes: usize,
    pub clear_frames: usize,
}

#[derive(Clone, Default)]
pub struct MockRecorder(Arc<Mutex<MockRecord>>);

impl MockRecorder {
    pub fn lock(&self) -> MutexGuard<'_, MockRecord> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct MockTransport {
    recovery: Recovery,
    connected: bool,
    closed: bool,
    connect_failures: usize,
    delivery_script: VecDeque<Option<TransportError>>,
    delivery_delay: Duration,
    record: MockRecorder,
}

impl MockTransport {
    /// Behaves like the HTTP strategy: always connected, failures abort.
    pub fn stateless() -> Self {
        Self::with_recovery(Recovery::Abort, true)
    }

    /// Behaves like the WebSocket strategy: starts disconnected, failures reconnect.
    pub fn session() -> Self {
        Self::with_recovery(Recovery::Reconnect, false)
    }

    fn with_recovery(recovery: Recovery, connected: bool) -> Self {
        Self {
            recovery,
            connected,
            closed: false,
            connect_failures: 0,
            delivery_script: VecDeque::new(),
            delivery_delay: Duration::ZERO,
            record: MockRecorder::default(),
        }
    }

    /// The next `n` connect attempts fail.
    pub fn fail_connects(mut self, n: usize) -> Self {
        self.connect_failures = n;
        self
    }

    /// Scripts the next deliveries in order: `None` succeeds, `Some(err)` fails.
    /// Unscripted deliveries succeed.
    pub fn script_deliveries(mut self, outcomes: impl IntoIterator<Item = Option<TransportError>>) -> Self {
        self.delivery_script.extend(outcomes);
        self
    }

    /// Makes every delivery take at least `delay`, to simulate a slow device.
    pub fn with_delivery_delay(mut self, delay: Duration) -> Self {
        self.delivery_delay = delay;
        self
    }

    pub fn record(&self) -> MockRecorder {
        self.record.clone()
    }
}

impl Transport for MockTransport {
    fn endpoint(&self) -> &str {
        "mock://device"
    }

    fn recovery(&self) -> Recovery {
        self.recovery
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.record.lock().connect_attempts += 1;
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(TransportError::Connect {
                endpoint: self.endpoint().to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn deliver(&mut self, frame: &Frame) -> Result<(), TransportError> {
        if !self.delivery_delay.is_zero() {
            std::thread::sleep(self.delivery_delay);
        }
        if !self.connected {
            return Err(TransportError::Closed);
        }
        match self.delivery_script.pop_front().flatten() {
            Some(err) => {
                self.record.lock().failed.push(frame.clone());
                Err(err)
            }
            None => {
                self.record.lock().delivered.push(frame.clone());
                Ok(())
            }
        }
    }

    fn disconnect(&mut self) {
        if self.connected && self.recovery == Recovery::Reconnect {
            self.connected = false;
        }
        self.record.lock().disconnects += 1;
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut record = self.record.lock();
        record.closes += 1;
        if self.connected {
            record.clear_frames += 1;
        }
        if self.recovery == Recovery::Reconnect {
            self.connected = false;
        }
    }
}
