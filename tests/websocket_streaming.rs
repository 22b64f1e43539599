// tests/websocket_streaming.rs

//! WebSocket strategy against a loopback device.

mod support;

use nightstand_stream::pixel::{encode_frame, Frame, Pixel};
use nightstand_stream::queue::FrameQueue;
use nightstand_stream::stop::StopSignal;
use nightstand_stream::transport::{Transport, TransportError, WebSocketTransport};
use nightstand_stream::worker::{TransportWorker, WorkerExit, WorkerTiming};
use std::time::Duration;
use support::{FakeWsDevice, WsBehaviour};

fn transport_for(device: &FakeWsDevice) -> WebSocketTransport {
    WebSocketTransport::new("127.0.0.1", device.port, "/ws")
        .with_timeouts(Duration::from_secs(2), Duration::from_millis(500))
}

fn timing() -> WorkerTiming {
    WorkerTiming {
        poll: Duration::from_millis(20),
        reconnect_backoff: Duration::from_millis(50),
    }
}

fn numbered(n: u8) -> Frame {
    Frame::solid(Pixel::new(n, n, n), 12)
}

#[test_log::test]
fn connects_sends_frames_and_clears_on_close() {
    let device = FakeWsDevice::start(|_| WsBehaviour::Acknowledge);
    let mut transport = transport_for(&device);

    transport.connect().unwrap();
    assert!(transport.is_connected());
    transport.deliver(&numbered(1)).unwrap();
    transport.deliver(&numbered(2)).unwrap();
    transport.close();
    assert!(!transport.is_connected());

    // Give the device a moment to log the clear frame.
    std::thread::sleep(Duration::from_millis(100));
    let connections = device.connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(
        connections[0],
        vec![encode_frame(&numbered(1)), encode_frame(&numbered(2)), "[]".to_string()]
    );
}

#[test_log::test]
fn device_error_replies_do_not_fail_delivery() {
    let device = FakeWsDevice::start(|_| WsBehaviour::ReportErrors);
    let mut transport = transport_for(&device);

    transport.connect().unwrap();
    assert!(transport.deliver(&numbered(3)).is_ok());
    assert!(transport.is_connected());
    transport.close();
}

#[test_log::test]
fn connect_failure_is_recoverable() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut transport = WebSocketTransport::new("127.0.0.1", port, "/ws")
        .with_timeouts(Duration::from_millis(500), Duration::from_millis(200));

    assert!(transport.connect().is_err());
    assert!(!transport.is_connected());
}

#[test_log::test]
fn dropped_connection_reconnects_and_requeues_the_failed_frame() {
    let device = FakeWsDevice::start(|connection| {
        if connection == 0 {
            WsBehaviour::DropAfterFirstFrame
        } else {
            WsBehaviour::Acknowledge
        }
    });
    let queue = FrameQueue::new(16);
    let stop = StopSignal::new();
    for n in 1..=3 {
        assert!(queue.try_push(numbered(n), Duration::ZERO));
    }
    assert!(queue.push_stop(Duration::ZERO));

    let worker = TransportWorker::spawn(transport_for(&device), queue.clone(), stop.clone(), timing())
        .unwrap();
    let exit = worker.join().unwrap();

    assert!(matches!(exit, WorkerExit::Stopped));
    assert!(!stop.is_set());

    std::thread::sleep(Duration::from_millis(100));
    let connections = device.connections();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0], vec![encode_frame(&numbered(1))]);
    // Frame 2 failed mid-send and went back on the queue, behind the sentinel.
    assert_eq!(
        connections[1],
        vec![encode_frame(&numbered(3)), "[]".to_string()]
    );
    assert_eq!(
        queue.pop(Duration::ZERO),
        Some(nightstand_stream::queue::QueueItem::Frame(numbered(2)))
    );
}

#[test_log::test]
fn hang_up_before_greeting_fails_the_connect() {
    let device = FakeWsDevice::start(|_| WsBehaviour::HangUpAfterHandshake);
    let mut transport = transport_for(&device);

    let err = transport.connect().unwrap_err();

    assert!(matches!(err, TransportError::Connect { .. }));
    assert!(!transport.is_connected());
}

#[test_log::test]
fn hang_up_before_greeting_waits_out_the_backoff() {
    let device = FakeWsDevice::start(|_| WsBehaviour::HangUpAfterHandshake);
    let queue = FrameQueue::new(16);
    let stop = StopSignal::new();
    for n in 1..=4 {
        assert!(queue.try_push(numbered(n), Duration::ZERO));
    }
    let timing = WorkerTiming {
        poll: Duration::from_millis(20),
        reconnect_backoff: Duration::from_millis(300),
    };

    let worker =
        TransportWorker::spawn(transport_for(&device), queue.clone(), stop.clone(), timing).unwrap();
    std::thread::sleep(Duration::from_millis(700));
    stop.set();
    let exit = worker.join().unwrap();

    assert!(matches!(exit, WorkerExit::Stopped));
    // Attempts at roughly 0, 300 and 600 ms.
    let attempts = device.connections().len();
    assert!((2..=4).contains(&attempts), "{attempts} connection attempts");
    // Nothing was delivered, so every frame is still queued.
    assert_eq!(queue.len(), 4);
}

#[test_log::test]
fn silent_device_still_connects_and_accepts_frames() {
    let device = FakeWsDevice::start(|_| WsBehaviour::Silent);
    let mut transport = transport_for(&device);

    transport.connect().unwrap();
    assert!(transport.is_connected());
    transport.deliver(&numbered(4)).unwrap();
    assert!(transport.is_connected());
    transport.close();

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(device.connections()[0][0], encode_frame(&numbered(4)));
}

#[test_log::test]
fn plain_text_replies_are_tolerated() {
    let device = FakeWsDevice::start(|_| WsBehaviour::PlainText);
    let mut transport = transport_for(&device);

    transport.connect().unwrap();
    transport.deliver(&numbered(5)).unwrap();
    transport.deliver(&numbered(6)).unwrap();
    assert!(transport.is_connected());
    transport.close();
}
