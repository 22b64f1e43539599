// src/transport/websocket.rs

//! Persistent-session delivery over a WebSocket.
//!
//! Connection lifecycle:
//!
//! ```text
//! Disconnected --connect()--> Connected --deliver() error--> Disconnected
//!       |                         |
//!       +------ close() ----------+--> Closed (clear frame sent if connected)
//! ```
//!
//! Transport errors are recoverable here: the worker drops the socket and
//! reconnects after a backoff.

use super::{Recovery, Transport, TransportError, DEFAULT_WS_PATH};
use crate::pixel::{encode_frame, Frame};
use log::*;
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tungstenite::{Message, WebSocket};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// `ws://host[:port]path`; the port is left out when it is 80 or 443.
pub fn build_uri(host: &str, port: u16, path: &str) -> String {
    let path = if path.is_empty() { DEFAULT_WS_PATH } else { path };
    if port == 80 || port == 443 {
        format!("ws://{host}{path}")
    } else {
        format!("ws://{host}:{port}{path}")
    }
}

enum Connection {
    Disconnected,
    Connected(WebSocket<TcpStream>),
    Closed,
}

pub struct WebSocketTransport {
    host: String,
    port: u16,
    uri: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    connection: Connection,
}

impl WebSocketTransport {
    pub fn new(host: &str, port: u16, path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            uri: build_uri(host, port, path),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connection: Connection::Disconnected,
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    fn open_stream(&self) -> Result<TcpStream, TransportError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.connect_error(e))?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.read_timeout))
                        .map_err(|e| self.connect_error(e))?;
                    stream
                        .set_write_timeout(Some(self.read_timeout))
                        .map_err(|e| self.connect_error(e))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => self.connect_error(e),
            None => self.connect_error("host resolved to no addresses"),
        })
    }

    fn connect_error(&self, reason: impl ToString) -> TransportError {
        TransportError::Connect {
            endpoint: self.uri.clone(),
            reason: reason.to_string(),
        }
    }

    fn socket(&mut self) -> Result<&mut WebSocket<TcpStream>, TransportError> {
        match &mut self.connection {
            Connection::Connected(socket) => Ok(socket),
            Connection::Disconnected | Connection::Closed => Err(TransportError::Closed),
        }
    }

    /// Sends a frame and waits (up to the read timeout) for one reply.
    fn send_pixels(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let payload = encode_frame(frame);
        let socket = self.socket()?;
        socket.send(Message::text(payload)).map_err(classify)?;
        match read_optional(socket)? {
            Some(reply) => inspect_reply(&reply),
            None => trace!("No reply to frame"),
        }
        Ok(())
    }
}

/// Reads one text message, treating a read timeout as "nothing to read".
fn read_optional(socket: &mut WebSocket<TcpStream>) -> Result<Option<String>, TransportError> {
    match socket.read() {
        Ok(Message::Close(_)) => Err(TransportError::Closed),
        Ok(msg) => Ok(msg.to_text().ok().map(str::to_string).filter(|s| !s.is_empty())),
        Err(tungstenite::Error::Io(e))
            if matches!(e.kind(), IoErrorKind::WouldBlock | IoErrorKind::TimedOut) =>
        {
            Ok(None)
        }
        Err(e) => Err(classify(e)),
    }
}

/// Device replies are advisory: errors are logged, never fatal.
fn inspect_reply(reply: &str) {
    match serde_json::from_str::<Value>(reply) {
        Ok(parsed) => {
            if parsed.get("error").is_some_and(is_truthy) {
                warn!("Device reported error: {}", parsed);
            } else {
                trace!("Device replied: {}", parsed);
            }
        }
        Err(_) => info!("Non-JSON response: {}", reply),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn classify(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Io(e) => e.into(),
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Network(other.to_string()),
    }
}

impl Transport for WebSocketTransport {
    fn endpoint(&self) -> &str {
        &self.uri
    }

    fn recovery(&self) -> Recovery {
        Recovery::Reconnect
    }

    fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected(_))
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if let Connection::Closed = self.connection {
            return Err(TransportError::Closed);
        }
        let stream = self.open_stream()?;
        let (mut socket, _response) =
            tungstenite::client(self.uri.as_str(), stream).map_err(|e| self.connect_error(e))?;
        // A socket that dies before the greeting counts as a failed connect.
        if let Some(greeting) = read_optional(&mut socket).map_err(|e| self.connect_error(e))? {
            info!("WebSocket server says: {}", greeting);
        }
        self.connection = Connection::Connected(socket);
        Ok(())
    }

    fn deliver(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.send_pixels(frame)
    }

    fn disconnect(&mut self) {
        if let Connection::Connected(mut socket) =
            std::mem::replace(&mut self.connection, Connection::Disconnected)
        {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }

    /// Sends one empty frame (all pixels off) and closes, if still connected.
    fn close(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.send_pixels(&Frame::clear()) {
                debug!("Clear frame failed: {}", e);
            }
        }
        if let Connection::Connected(mut socket) =
            std::mem::replace(&mut self.connection, Connection::Closed)
        {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uri_omits_default_ports() {
        assert_eq!(build_uri("lamp.local", 80, "/ws"), "ws://lamp.local/ws");
        assert_eq!(build_uri("lamp.local", 443, "/ws"), "ws://lamp.local/ws");
        assert_eq!(build_uri("10.0.0.5", 8080, "/ws"), "ws://10.0.0.5:8080/ws");
        assert_eq!(build_uri("10.0.0.5", 8080, ""), "ws://10.0.0.5:8080/ws");
    }

    #[test]
    fn truthiness_follows_json_semantics() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("bad payload")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
    }

    #[test]
    fn starts_disconnected() {
        let transport = WebSocketTransport::new("127.0.0.1", 9, "/ws");
        assert!(!transport.is_connected());
        assert_eq!(transport.recovery(), Recovery::Reconnect);
    }

    #[test]
    fn deliver_without_connection_is_a_transport_error() {
        let mut transport = WebSocketTransport::new("127.0.0.1", 9, "/ws");
        let err = transport.deliver(&Frame::clear()).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn connect_after_close_is_refused() {
        let mut transport = WebSocketTransport::new("127.0.0.1", 9, "/ws");
        transport.close();
        assert!(matches!(transport.connect(), Err(TransportError::Closed)));
    }
}
