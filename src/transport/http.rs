// src/transport/http.rs

//! Request/response delivery: one `POST /params` per frame.
//!
//! There is no session to preserve, so any failure (bad status or network
//! error) aborts the run.

use super::{Recovery, Transport, TransportError, PARAMS_PATH};
use crate::pixel::{encode_frame, Frame};
use log::*;
use std::time::Duration;
use ureq::Agent;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Status line and body of a device response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpReply {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Thin blocking client for the device's control server.
///
/// Non-2xx statuses are returned as replies, not errors, so callers can
/// decide what a bad status means for them. Every request asks for
/// `Connection: close`, so each one runs on a fresh TCP connection.
#[derive(Clone)]
pub struct DeviceClient {
    agent: Agent,
    base_url: String,
}

impl DeviceClient {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: format!("http://{host}:{port}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get(&self, path: &str) -> Result<HttpReply, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .get(url.as_str())
            .header("Connection", "close")
            .call()
            .map_err(|e| classify(e, &url))?;
        read_reply(response, &url)
    }

    pub fn post_json(&self, path: &str, body: &str) -> Result<HttpReply, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        trace!("POST {} ({} bytes)", url, body.len());
        let response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Connection", "close")
            .send(body)
            .map_err(|e| classify(e, &url))?;
        read_reply(response, &url)
    }

    /// Posts a frame to `/params`.
    pub fn post_frame(&self, frame: &Frame) -> Result<HttpReply, TransportError> {
        self.post_json(PARAMS_PATH, &encode_frame(frame))
    }
}

fn read_reply(
    mut response: ureq::http::Response<ureq::Body>,
    url: &str,
) -> Result<HttpReply, TransportError> {
    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| classify(e, url))?;
    Ok(HttpReply {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        body,
    })
}

fn classify(err: ureq::Error, url: &str) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(io) => io.into(),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportError::Connect {
            endpoint: url.to_string(),
            reason: err.to_string(),
        },
        other => TransportError::Network(other.to_string()),
    }
}

pub struct HttpTransport {
    client: DeviceClient,
    endpoint: String,
    closed: bool,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        let client = DeviceClient::new(host, port, timeout);
        let endpoint = format!("{}{}", client.base_url(), PARAMS_PATH);
        Self {
            client,
            endpoint,
            closed: false,
        }
    }
}

impl Transport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn recovery(&self) -> Recovery {
        Recovery::Abort
    }

    fn deliver(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let reply = self.client.post_frame(frame)?;
        if reply.is_ok() {
            trace!("Delivered {} pixels", frame.len());
            Ok(())
        } else {
            Err(TransportError::Status {
                status: reply.status,
                reason: reply.reason,
                body: reply.body,
            })
        }
    }

    /// Posts an empty frame directly, outside the queue. The result is ignored.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.client.post_frame(&Frame::clear()) {
            Ok(reply) => debug!("Clear frame -> {} {}", reply.status, reply.reason),
            Err(e) => debug!("Clear frame failed: {}", e),
        }
    }
}
