use std::net::SocketAddr;

use tracing::Instrument;

use crate::decode::DecodeLevel;
use crate::shutdown::ServerHandle;
use crate::sim::SharedRegistry;
use crate::tcp::server::ServerTask;

pub(crate) mod dispatch;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod task;

pub use dispatch::{dispatch, Dispatch, Silence};
pub use request::{Request, RequestPayload};
pub use response::{Response, ResponseBody};

/// Spawns a Modbus TCP server task onto the runtime. This method can only
/// be called from within the runtime context.
///
/// Each incoming connection spawns a new session task. Binding port 0 picks a
/// free port, which [`ServerHandle::local_addr`] reports.
///
/// * `max_sessions` - Maximum number of concurrent sessions
/// * `addr` - A socket address to bind to
/// * `registry` - The slaves answering requests
/// * `decode` - Decode log level
pub async fn spawn_tcp_server_task(
    max_sessions: usize,
    addr: SocketAddr,
    registry: SharedRegistry,
    decode: DecodeLevel,
) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Modbus TCP server listening on {}", local_addr);

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tokio::spawn(async move {
        ServerTask::new(max_sessions, listener, registry, decode)
            .run(rx)
            .instrument(tracing::info_span!("Modbus-Server-TCP", "listen" = ?local_addr))
            .await
    });

    Ok(ServerHandle::new(tx, Some(local_addr)))
}

/// Spawns a Modbus RTU server task onto the runtime. This method can only
/// be called from within the runtime context.
///
/// The port is opened by the task, and reopened according to `retry` when it
/// cannot be opened or fails while in use. The inter-character and frame
/// timeouts are derived from the baud rate and `policy`.
///
/// * `path` - Path of the serial device
/// * `settings` - Serial port settings
/// * `policy` - Adjustment of the computed RTU timeouts
/// * `retry` - Delays between attempts to open the port
/// * `registry` - The slaves answering requests
/// * `decode` - Decode log level
#[cfg(feature = "serial")]
pub fn spawn_rtu_server_task(
    path: &str,
    settings: crate::serial::SerialSettings,
    policy: crate::serial::timing::TimeoutPolicy,
    retry: Box<dyn crate::retry::RetryStrategy>,
    registry: SharedRegistry,
    decode: DecodeLevel,
) -> Result<ServerHandle, crate::error::SimError> {
    let timing = crate::serial::timing::RtuTiming::calculate(settings.baud_rate, policy)?;

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let session = task::SessionTask::new(
        registry,
        crate::serial::frame::RtuCodec::new(decode.frame),
        rx,
        decode.pdu,
    );
    let mut task = crate::serial::server::RtuServerTask {
        port: path.to_string(),
        retry,
        settings,
        timing,
        physical: decode.physical,
        session,
    };

    let span = tracing::info_span!("Modbus-Server-RTU", "port" = ?path);
    tokio::spawn(async move {
        task.run().instrument(span).await;
    });

    Ok(ServerHandle::new(tx, None))
}
