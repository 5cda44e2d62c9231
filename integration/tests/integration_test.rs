//! Integration tests for the modsim simulator

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use modsim::management::{RegisterConfig, Simulator};
use modsim::server::spawn_tcp_server_task;
use modsim::sim::SharedRegistry;
use modsim::{DecodeLevel, ServerHandle, SlaveId};

fn section(name: &str, register_type: u8, start_address: u16, count: usize) -> RegisterConfig {
    RegisterConfig {
        register_section_name: name.to_string(),
        register_count: count,
        start_address,
        register_type,
    }
}

async fn start() -> (Simulator, ServerHandle, TcpStream) {
    let simulator = Simulator::new(SharedRegistry::default());
    for id in [1, 2] {
        simulator
            .add_slave(
                SlaveId::new(id),
                &[
                    section("holding", 3, 40001, 10),
                    section("input", 4, 30001, 10),
                    section("coils", 1, 0, 16),
                ],
            )
            .unwrap();
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let server = spawn_tcp_server_task(
        4,
        addr,
        simulator.registry().clone(),
        DecodeLevel::default(),
    )
    .await
    .unwrap();

    let stream = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();

    (simulator, server, stream)
}

async fn read_reply(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 7];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut header))
        .await
        .unwrap()
        .unwrap();
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut body = vec![0u8; length - 1];
    stream.read_exact(&mut body).await.unwrap();
    [header.as_slice(), body.as_slice()].concat()
}

async fn exchange(stream: &mut TcpStream, request: &[u8]) -> Vec<u8> {
    stream.write_all(request).await.unwrap();
    read_reply(stream).await
}

#[tokio::test]
async fn writes_and_reads_holding_register() {
    let (simulator, _server, mut stream) = start().await;

    // write 1234 to 40001 on unit 1
    let write = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x9C, 0x41, 0x04, 0xD2];
    assert_eq!(exchange(&mut stream, &write).await, write.to_vec());

    let read = [0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x9C, 0x41, 0x00, 0x01];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x04, 0xD2]
    );

    assert_eq!(simulator.read_register(SlaveId::new(1), 40001), Ok(1234));
    assert_eq!(simulator.read_register(SlaveId::new(2), 40001), Ok(0));
}

#[tokio::test]
async fn reads_input_registers_written_through_management() {
    let (simulator, _server, mut stream) = start().await;
    simulator.write_register(SlaveId::new(2), 30002, 0xBEEF).unwrap();

    let read = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x02, 0x04, 0x75, 0x31, 0x00, 0x02];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x07, 0x02, 0x04, 0x04, 0x00, 0x00, 0xBE, 0xEF]
    );
}

#[tokio::test]
async fn writes_and_reads_multiple_coils() {
    let (_simulator, _server, mut stream) = start().await;

    let write = [
        0x00, 0x03, 0x00, 0x00, 0x00, 0x09, 0x01, 0x0F, 0x00, 0x00, 0x00, 0x0A, 0x02, 0xCD, 0x01,
    ];
    assert_eq!(
        exchange(&mut stream, &write).await,
        vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x06, 0x01, 0x0F, 0x00, 0x00, 0x00, 0x0A]
    );

    let read = [0x00, 0x04, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x00, 0x00, 0x0A];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x04, 0x00, 0x00, 0x00, 0x05, 0x01, 0x01, 0x02, 0xCD, 0x01]
    );
}

#[tokio::test]
async fn broadcast_and_unknown_unit_are_not_answered() {
    let (simulator, _server, mut stream) = start().await;

    // broadcast write of 7 to 40002
    let broadcast = [0x00, 0x10, 0x00, 0x00, 0x00, 0x06, 0x00, 0x06, 0x9C, 0x42, 0x00, 0x07];
    stream.write_all(&broadcast).await.unwrap();
    // read addressed to a unit without a slave
    let unknown = [0x00, 0x11, 0x00, 0x00, 0x00, 0x06, 0x09, 0x03, 0x9C, 0x41, 0x00, 0x01];
    stream.write_all(&unknown).await.unwrap();

    // the first reply on the stream belongs to the next request
    let read = [0x00, 0x12, 0x00, 0x00, 0x00, 0x06, 0x02, 0x03, 0x9C, 0x42, 0x00, 0x01];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x12, 0x00, 0x00, 0x00, 0x05, 0x02, 0x03, 0x02, 0x00, 0x07]
    );

    assert_eq!(simulator.read_register(SlaveId::new(1), 40002), Ok(7));
}

#[tokio::test]
async fn answers_exceptions_for_bad_addresses_and_functions() {
    let (_simulator, _server, mut stream) = start().await;

    // no holding block contains address 100
    let read = [0x00, 0x05, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x64, 0x00, 0x01];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x05, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02]
    );

    // runs past the end of the holding block
    let read = [0x00, 0x06, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x9C, 0x48, 0x00, 0x05];
    assert_eq!(
        exchange(&mut stream, &read).await,
        vec![0x00, 0x06, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x03]
    );

    // read exception status is not supported
    let unsupported = [0x00, 0x07, 0x00, 0x00, 0x00, 0x02, 0x01, 0x07];
    assert_eq!(
        exchange(&mut stream, &unsupported).await,
        vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x01, 0x87, 0x01]
    );
}

#[tokio::test]
async fn snapshot_reflects_values_written_over_the_wire() {
    let (simulator, _server, mut stream) = start().await;

    let write = [
        0x00, 0x08, 0x00, 0x00, 0x00, 0x0B, 0x02, 0x10, 0x9C, 0x41, 0x00, 0x02, 0x04, 0x00, 0x0A,
        0x00, 0x0B,
    ];
    assert_eq!(
        exchange(&mut stream, &write).await,
        vec![0x00, 0x08, 0x00, 0x00, 0x00, 0x06, 0x02, 0x10, 0x9C, 0x41, 0x00, 0x02]
    );

    let json = simulator.dump_json().unwrap();
    let restored = Simulator::new(SharedRegistry::default());
    restored.load_json(&json).unwrap();
    assert_eq!(restored.read_register(SlaveId::new(2), 40001), Ok(10));
    assert_eq!(restored.read_register(SlaveId::new(2), 40002), Ok(11));
    assert_eq!(restored.dump(), simulator.dump());
}

#[tokio::test]
async fn dropping_the_handle_closes_sessions() {
    let (_simulator, server, mut stream) = start().await;

    let read = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x9C, 0x41, 0x00, 0x01];
    exchange(&mut stream, &read).await;

    drop(server);

    let mut buffer = [0u8; 16];
    let count = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buffer))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(count, 0);
}
