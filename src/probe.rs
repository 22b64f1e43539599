// src/probe.rs

//! Health check for the device's control server.
//!
//! Verifies the two endpoints the streaming transports depend on:
//! `GET /` answers `Nightstand online`, and `POST /params` answers
//! `{"status":"ok"}`.

use crate::transport::http::DeviceClient;
use crate::transport::{TransportError, PARAMS_PATH};
use log::*;
use std::time::Duration;
use thiserror::Error;

pub const ROOT_BANNER: &str = "Nightstand online";
pub const PARAMS_OK: &str = r#"{"status":"ok"}"#;
pub const DEFAULT_PROBE_PAYLOAD: &str = r#"{"brightness":0.5,"mode":"sunrise"}"#;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("GET / failed (status={status}, body={body:?}); check Wi-Fi server")]
    Root { status: u16, body: String },
    #[error("POST /params failed (status={status}, body={body:?}); check Wi-Fi server")]
    Params { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub payload: String,
    /// Total attempts of the full check; at least one is always made.
    pub retries: u32,
    pub wait: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            payload: DEFAULT_PROBE_PAYLOAD.to_string(),
            retries: 1,
            wait: Duration::from_secs(2),
        }
    }
}

/// Result of a passing probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub attempts: u32,
}

pub fn verify_root(client: &DeviceClient) -> Result<(), ProbeError> {
    let reply = client.get("/")?;
    if reply.status != 200 || reply.body.trim() != ROOT_BANNER {
        return Err(ProbeError::Root {
            status: reply.status,
            body: reply.body,
        });
    }
    info!("[ok] GET / -> {}", ROOT_BANNER);
    Ok(())
}

pub fn verify_params(client: &DeviceClient, payload: &str) -> Result<(), ProbeError> {
    let reply = client.post_json(PARAMS_PATH, payload)?;
    if reply.status != 200 || reply.body.trim() != PARAMS_OK {
        return Err(ProbeError::Params {
            status: reply.status,
            body: reply.body,
        });
    }
    info!("[ok] POST /params -> {}", PARAMS_OK);
    Ok(())
}

/// Runs both checks, retrying the pair up to `options.retries` times.
pub fn run_probe(client: &DeviceClient, options: &ProbeOptions) -> Result<ProbeReport, ProbeError> {
    let attempts = options.retries.max(1);
    let mut attempt = 1;
    loop {
        let result = verify_root(client).and_then(|()| verify_params(client, &options.payload));
        match result {
            Ok(()) => {
                info!("Control server at {} looks healthy", client.base_url());
                return Ok(ProbeReport { attempts: attempt });
            }
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!("{}; retrying in {:?}", e, options.wait);
                std::thread::sleep(options.wait);
                attempt += 1;
            }
        }
    }
}
