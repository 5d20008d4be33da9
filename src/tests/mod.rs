//! Integration tests that run the real TCP client against a local stub server.
//!
//! Unit tests are colocated with their modules:
//! - `link::tests` - ControlLink state machine
//! - `transport::tests` - SOAP actions and fault handling
//! - `decoders::tests` - XML decoders


use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use crate::{
    ConnectionState, Configuration, ControlLink, LinkError, MemoryTelemetrySink, MotionIntent,
    STARTUP_CHANNELS, SoapTransport, Transport, TransportError, decode_channel_values,
};
use soap_stub::Server;

fn configuration(host: String) -> Configuration {
    Configuration {
        simulator_host: host,
        connect_timeout: Duration::from_millis(100),
        request_timeout: Duration::from_millis(1000),
        telemetry_log: None,
        ..Default::default()
    }
}

#[test]
fn transport_round_trip_over_tcp() {
    let server = Server::start(vec!["reset-aircraft-200"]);
    let transport = SoapTransport::new(&configuration(server.address())).unwrap();

    let body = transport.reset().unwrap();

    assert!(body.contains("ResetAircraftResponse"));
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("<soap:Body><ResetAircraft></ResetAircraft></soap:Body>"));
    assert_eq!(transport.statistics().request_count, 1);
}

#[test]
fn transport_surfaces_fault_over_tcp() {
    let server = Server::start(vec!["return-data-500"]);
    let transport = SoapTransport::new(&configuration(server.address())).unwrap();

    match transport.exchange(&STARTUP_CHANNELS) {
        Err(TransportError::SoapFault { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "RealFlight Link controller has not been instantiated");
        }
        other => panic!("expected SOAP fault, got {:?}", other),
    }
}

#[test]
fn transport_reports_unavailable_simulator() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = SoapTransport::new(&configuration(format!("127.0.0.1:{}", port))).unwrap();

    let result = transport.enable();

    assert!(matches!(result, Err(TransportError::Unavailable { .. })));
    assert!(transport.statistics().error_count > 0);
}

#[test]
fn transport_rejects_oversized_content_length() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999999\r\n\r\nabc")
            .unwrap();
    });
    let transport = SoapTransport::new(&configuration(address)).unwrap();

    let result = transport.reset();

    assert!(matches!(result, Err(TransportError::MalformedResponse(_))));
    assert!(transport.statistics().error_count >= 1);
    server.join().unwrap();
}

#[test]
fn link_lifecycle_over_tcp() {
    let server = Server::start(vec![
        "inject-uav-controller-interface-200",
        "reset-aircraft-200",
        "return-data-200",
        "return-data-flying-200",
        "restore-original-controller-device-200",
    ]);
    let sink = MemoryTelemetrySink::new();
    let transport = SoapTransport::new(&configuration(server.address())).unwrap();
    let mut link = ControlLink::with_transport(transport, &Configuration::default())
        .with_sink(sink.clone());

    link.connect().unwrap();
    let record = link.set_motion(&MotionIntent::forward(1.0)).unwrap();
    link.disconnect().unwrap();

    assert!(record.is_flying());
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert_eq!(sink.len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(decode_channel_values(&requests[2]).unwrap(), STARTUP_CHANNELS);
    assert!(decode_channel_values(&requests[3]).unwrap().pitch() > 0.5);
    assert_eq!(link.statistics().exchange_count, 2);
}

#[test]
fn link_writes_csv_log() {
    let server = Server::start(vec![
        "inject-uav-controller-interface-200",
        "reset-aircraft-200",
        "return-data-200",
        "return-data-flying-200",
        "return-data-flying-200",
        "restore-original-controller-device-200",
    ]);
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("telemetry.log");
    let config = Configuration {
        telemetry_log: Some(log.clone()),
        ..configuration(server.address())
    };

    let mut link = ControlLink::with_configuration(&config).unwrap();
    link.connect().unwrap();
    link.set_motion(&MotionIntent::hover()).unwrap();
    link.set_motion(&MotionIntent::vertical(1.0)).unwrap();
    link.disconnect().unwrap();

    let contents = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(",CAS-WAITINGTOLAUNCH"));
    assert!(lines[1].ends_with(",CAS-FLYING"));
    assert_eq!(lines[1].split(',').count(), 9);
}

#[test]
fn link_reports_unreadable_configuration() {
    let result = Configuration::from_file("does/not/exist.toml");
    assert!(matches!(result, Err(LinkError::Config(_))));
}
