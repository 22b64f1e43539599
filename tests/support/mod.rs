// tests/support/mod.rs

//! Loopback stand-ins for the device's control server.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// One request as seen by the fake HTTP device.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: String,
}

pub struct Reply {
    pub status: u16,
    pub reason: &'static str,
    pub body: String,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply {
            status: 200,
            reason: "OK",
            body: body.to_string(),
        }
    }

    pub fn error(status: u16, reason: &'static str, body: &str) -> Self {
        Reply {
            status,
            reason,
            body: body.to_string(),
        }
    }
}

type Handler = dyn Fn(usize, &Request) -> Reply + Send + Sync;

/// Minimal HTTP/1.1 server. By default it answers one request per connection.
pub struct FakeHttpDevice {
    pub port: u16,
    requests: Arc<Mutex<Vec<Request>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeHttpDevice {
    /// `handler` receives the zero-based request number and the request.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(usize, &Request) -> Reply + Send + Sync + 'static,
    {
        Self::spawn(Arc::new(handler), false)
    }

    /// Like `healthy`, but advertises keep-alive and serves further requests
    /// on the same connection for as long as the client keeps it open.
    pub fn keep_alive() -> Self {
        Self::spawn(Arc::new(healthy_reply), true)
    }

    fn spawn(handler: Arc<Handler>, keep_alive: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake device");
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let log = requests.clone();
        let accepted = connections.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                accepted.fetch_add(1, Ordering::SeqCst);
                while let Some(request) = read_request(&stream) {
                    let index = {
                        let mut log = log.lock().unwrap();
                        log.push(request.clone());
                        log.len() - 1
                    };
                    let reply = handler(index, &request);
                    write_reply(&stream, &reply, keep_alive);
                    if !keep_alive {
                        break;
                    }
                }
            }
        });

        Self {
            port,
            requests,
            connections,
        }
    }

    /// Answers every `/params` POST with 200 `{"status":"ok"}`.
    pub fn healthy() -> Self {
        Self::start(healthy_reply)
    }

    /// TCP connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Polls until at least `n` requests arrived or `timeout` passes.
    pub fn wait_for_requests(&self, n: usize, timeout: Duration) -> Vec<Request> {
        let deadline = Instant::now() + timeout;
        loop {
            let requests = self.requests();
            if requests.len() >= n || Instant::now() >= deadline {
                return requests;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn healthy_reply(_index: usize, request: &Request) -> Reply {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => Reply::ok("Nightstand online"),
        ("POST", "/params") => Reply::ok(r#"{"status":"ok"}"#),
        _ => Reply::error(404, "Not Found", "no route"),
    }
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .ok()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut content_type = None;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().ok()?,
                "content-type" => content_type = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Request {
        method,
        path,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_reply(mut stream: &TcpStream, reply: &Reply, keep_alive: bool) {
    let connection = if keep_alive { "keep-alive" } else { "close" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n{}",
        reply.status,
        reply.reason,
        reply.body.len(),
        connection,
        reply.body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// How the fake WebSocket device treats each connection.
#[derive(Clone, Copy)]
pub enum WsBehaviour {
    /// Greets, then acknowledges every frame.
    Acknowledge,
    /// Greets, acknowledges one frame, then drops the socket without a close handshake.
    DropAfterFirstFrame,
    /// Replies to every frame with a device-side error object.
    ReportErrors,
    /// Completes the handshake, then drops the socket before greeting.
    HangUpAfterHandshake,
    /// Never greets and never replies.
    Silent,
    /// Greets, then answers every frame with plain text.
    PlainText,
}

/// WebSocket device; records text messages per connection.
pub struct FakeWsDevice {
    pub port: u16,
    connections: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeWsDevice {
    /// `behaviour(n)` picks the behaviour for the zero-based connection `n`.
    pub fn start<F>(behaviour: F) -> Self
    where
        F: Fn(usize) -> WsBehaviour + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake ws device");
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(Mutex::new(Vec::new()));
        let log = connections.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let index = {
                    let mut log = log.lock().unwrap();
                    log.push(Vec::new());
                    log.len() - 1
                };
                serve_ws(stream, behaviour(index), index, &log);
            }
        });

        Self { port, connections }
    }

    pub fn connections(&self) -> Vec<Vec<String>> {
        self.connections.lock().unwrap().clone()
    }
}

fn serve_ws(
    stream: TcpStream,
    behaviour: WsBehaviour,
    index: usize,
    log: &Arc<Mutex<Vec<Vec<String>>>>,
) {
    let Ok(mut socket) = tungstenite::accept(stream) else {
        return;
    };
    match behaviour {
        WsBehaviour::HangUpAfterHandshake => return,
        WsBehaviour::Silent => {}
        _ => {
            let _ = socket.send(tungstenite::Message::text("Nightstand websocket ready"));
        }
    }
    loop {
        let message = match socket.read() {
            Ok(message) => message,
            Err(_) => return,
        };
        if message.is_close() {
            return;
        }
        let Ok(text) = message.to_text() else { continue };
        log.lock().unwrap()[index].push(text.to_string());
        let reply = match behaviour {
            WsBehaviour::Silent => continue,
            WsBehaviour::ReportErrors => r#"{"error":"bad payload"}"#,
            WsBehaviour::PlainText => "OK",
            _ => r#"{"status":"ok"}"#,
        };
        if socket.send(tungstenite::Message::text(reply)).is_err() {
            return;
        }
        if let WsBehaviour::DropAfterFirstFrame = behaviour {
            return;
        }
    }
}
