use std::io::ErrorKind;

use crate::common::frame::Codec;
use crate::common::phys::Transport;
use crate::decode::PduDecodeLevel;
use crate::server::dispatch::{dispatch, Dispatch, Silence};
use crate::server::request::Request;
use crate::sim::SharedRegistry;

/// Reason a session stopped
#[derive(Debug)]
pub(crate) enum SessionError {
    /// the owning handle or server was dropped
    Shutdown,
    /// the transport failed or was closed by the peer
    Io(std::io::Error),
}

/// Serves requests arriving on one transport, one at a time
pub(crate) struct SessionTask<C>
where
    C: Codec,
{
    registry: SharedRegistry,
    codec: C,
    shutdown: tokio::sync::mpsc::Receiver<()>,
    level: PduDecodeLevel,
}

impl<C> SessionTask<C>
where
    C: Codec,
{
    pub(crate) fn new(
        registry: SharedRegistry,
        codec: C,
        shutdown: tokio::sync::mpsc::Receiver<()>,
        level: PduDecodeLevel,
    ) -> Self {
        Self {
            registry,
            codec,
            shutdown,
            level,
        }
    }

    #[cfg(feature = "serial")]
    pub(crate) async fn sleep_for(
        &mut self,
        duration: std::time::Duration,
    ) -> Result<(), crate::shutdown::Shutdown> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.shutdown.recv() => Err(crate::shutdown::Shutdown),
        }
    }

    pub(crate) async fn run<T: Transport>(&mut self, io: &mut T) -> SessionError {
        loop {
            if let Err(err) = self.run_one(io).await {
                return err;
            }
        }
    }

    async fn run_one<T: Transport>(&mut self, io: &mut T) -> Result<(), SessionError> {
        let frame = tokio::select! {
            frame = io.read_frame() => frame,
            _ = self.shutdown.recv() => return Err(SessionError::Shutdown),
        };

        let frame = match frame {
            Ok(frame) => frame,
            // idle line
            Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(()),
            Err(err) => return Err(SessionError::Io(err)),
        };

        let request = match self.codec.decode(&frame) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("dropping frame: {}", err);
                return Ok(());
            }
        };

        self.log_request(&request);

        let result = dispatch(&mut self.registry.lock(), &request);

        match result {
            Dispatch::Reply(response) => {
                if self.level.enabled() {
                    tracing::info!("PDU TX - {}", response);
                }
                match self.codec.encode(&request.header, &response) {
                    Ok(bytes) => io.write_frame(&bytes).await.map_err(SessionError::Io)?,
                    Err(err) => tracing::warn!("unable to encode response: {}", err),
                }
            }
            Dispatch::Silent(Silence::Broadcast { delivered, failed }) => {
                tracing::debug!(
                    "broadcast delivered to {} slave(s), {} failure(s)",
                    delivered,
                    failed
                );
            }
            Dispatch::Silent(Silence::UnknownSlave(_)) => {}
        }

        Ok(())
    }

    fn log_request(&self, request: &Request) {
        if self.level.data_headers() {
            tracing::info!("PDU RX - {} {}", request.header, request);
        } else if self.level.enabled() {
            tracing::info!("PDU RX - function: {:#04X}", request.function);
        } else {
            tracing::debug!("PDU RX - {} {}", request.header, request);
        }
    }
}
