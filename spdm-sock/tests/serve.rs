//! End-to-end sessions against a live responder on the loopback interface.

#![cfg(unix)]
#![allow(clippy::unwrap_used, missing_docs)]

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use spdm_sock::doe::{DOE_TYPE_DISCOVERY, DOE_TYPE_SECURED_SPDM, DOE_TYPE_SPDM};
use spdm_sock::{
    Client, Config, DoeDiscoveryResponder, IdleTimeout, NullEngine, Server, ServeDriver,
    SessionLimit,
};
use spdm_sock_proto::{Command, Frame, TEST_ACK, TransportType, receive_frame, send_frame};

/// Binds a responder on an ephemeral port and serves `driver` on a thread.
fn spawn(
    config: Config,
    driver: impl ServeDriver + Send + 'static,
) -> (Config, JoinHandle<spdm_sock::Result<()>>) {
    let config = config.with_bind_addr(Ipv4Addr::LOCALHOST).with_port(0);
    let engine = NullEngine::init(&config).unwrap();
    let mut server = Server::bind(config.clone(), engine, DoeDiscoveryResponder::default()).unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || server.serve(driver));
    (config.with_port(port), handle)
}

fn raw(config: &Config) -> TcpStream {
    TcpStream::connect(config.connect_addr()).unwrap()
}

/// The responder closed the connection. Unread bytes on its side turn the
/// close into a reset.
fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    match stream.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
    }
}

#[test]
fn test_command_wire_exchange() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(1));
    let mut s = raw(&config);

    s.write_all(&[0, 0, 0xDE, 0xAD, 0, 0, 0, 2, 0, 0, 0, 0]).unwrap();
    let mut reply = [0u8; 26];
    s.read_exact(&mut reply).unwrap();

    assert_eq!(&reply[..12], [0, 0, 0xDE, 0xAD, 0, 0, 0, 2, 0, 0, 0, 14]);
    assert_eq!(&reply[12..], b"Server Hello!\0");

    drop(s);
    server.join().unwrap().unwrap();
}

#[test]
fn shutdown_closes_session_and_listener_accepts_again() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(2));

    let mut s = raw(&config);
    send_frame(&mut s, TransportType::PciDoe, Command::Shutdown, &[]).unwrap();
    let reply = receive_frame(&mut s, TransportType::PciDoe, 64).unwrap();
    assert_eq!(reply, Frame::new(Command::Shutdown, Vec::<u8>::new()));
    assert_closed(&mut s);

    let mut client = Client::connect(&config).unwrap();
    assert_eq!(client.test().unwrap(), TEST_ACK);
    drop(client);

    server.join().unwrap().unwrap();
}

#[test]
fn unknown_command_gets_unknown_reply_then_close() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(1));

    let mut s = raw(&config);
    send_frame(&mut s, TransportType::PciDoe, Command::Other(0x1234), &[]).unwrap();
    let mut reply = [0u8; 12];
    s.read_exact(&mut reply).unwrap();
    assert_eq!(reply, [0, 0, 0xFF, 0xFF, 0, 0, 0, 2, 0, 0, 0, 0]);
    assert_closed(&mut s);

    server.join().unwrap().unwrap();
}

#[test]
fn continue_keeps_the_same_session() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(1));

    let mut client = Client::connect(&config).unwrap();
    client.keep_alive().unwrap();
    client.keep_alive().unwrap();
    assert_eq!(client.test().unwrap(), TEST_ACK);
    client.shutdown().unwrap();

    server.join().unwrap().unwrap();
}

#[test]
fn normal_payload_reaches_doe_discovery() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(1));

    let mut client = Client::connect(&config).unwrap();
    let types: Vec<u8> = client
        .discover()
        .unwrap()
        .iter()
        .map(|p| p.data_object_type)
        .collect();
    assert_eq!(types, [DOE_TYPE_DISCOVERY, DOE_TYPE_SPDM, DOE_TYPE_SECURED_SPDM]);
    drop(client);

    server.join().unwrap().unwrap();
}

#[test]
fn oversized_frame_drops_session_only() {
    let (config, server) = spawn(Config::default().with_max_payload(8), SessionLimit::new(2));

    let mut s = raw(&config);
    send_frame(&mut s, TransportType::PciDoe, Command::Normal, &[0u8; 9]).unwrap();
    assert_closed(&mut s);

    let mut client = Client::connect(&config).unwrap();
    assert_eq!(client.test().unwrap(), TEST_ACK);
    drop(client);

    server.join().unwrap().unwrap();
}

#[test]
fn transport_mismatch_drops_session() {
    let (config, server) = spawn(Config::default(), SessionLimit::new(1));

    let mut s = raw(&config);
    send_frame(&mut s, TransportType::Mctp, Command::Test, &[]).unwrap();
    assert_closed(&mut s);

    server.join().unwrap().unwrap();
}

#[test]
fn idle_timeout_releases_a_silent_peer() {
    let driver = IdleTimeout::new(SessionLimit::new(2), Duration::from_millis(200));
    let (config, server) = spawn(Config::default(), driver);

    let mut silent = raw(&config);
    assert_closed(&mut silent);

    let mut client = Client::connect(&config).unwrap();
    assert_eq!(client.test().unwrap(), TEST_ACK);
    drop(client);

    server.join().unwrap().unwrap();
}

#[test]
fn tcp_transport_tag_is_enforced_both_ways() {
    let (config, server) = spawn(
        Config::default().with_transport(TransportType::Tcp),
        SessionLimit::new(1),
    );

    let mut s = raw(&config);
    send_frame(&mut s, TransportType::Tcp, Command::Test, &[]).unwrap();
    let mut header = [0u8; 8];
    s.read_exact(&mut header).unwrap();
    assert_eq!(header, [0, 0, 0xDE, 0xAD, 0, 0, 0, 3]);
    drop(s);

    server.join().unwrap().unwrap();
}
