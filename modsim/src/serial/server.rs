use crate::common::phys::RtuTransport;
use crate::decode::PhysDecodeLevel;
use crate::retry::RetryStrategy;
use crate::serial::frame::RtuCodec;
use crate::serial::timing::RtuTiming;
use crate::serial::SerialSettings;
use crate::server::task::{SessionError, SessionTask};
use crate::shutdown::Shutdown;

/// Opens the serial port, serves it until it fails, and reopens it
pub(crate) struct RtuServerTask {
    pub(crate) port: String,
    pub(crate) retry: Box<dyn RetryStrategy>,
    pub(crate) settings: SerialSettings,
    pub(crate) timing: RtuTiming,
    pub(crate) physical: PhysDecodeLevel,
    pub(crate) session: SessionTask<RtuCodec>,
}

impl RtuServerTask {
    pub(crate) async fn run(&mut self) -> Shutdown {
        loop {
            match crate::serial::open(&self.port, self.settings) {
                Ok(serial) => {
                    self.retry.reset();
                    tracing::info!("opened port - {}", self.timing);
                    let mut transport = RtuTransport::new(serial, self.timing, self.physical);
                    // run an open port until shutdown or failure
                    match self.session.run(&mut transport).await {
                        SessionError::Shutdown => return Shutdown,
                        SessionError::Io(err) => tracing::warn!("serial port failed: {}", err),
                    }
                    // wait here to prevent a rapid retry if the port opens and immediately fails
                    let delay = self.retry.after_port_closed();
                    tracing::warn!("waiting {:?} to reopen port", delay);
                    if let Err(Shutdown) = self.session.sleep_for(delay).await {
                        return Shutdown;
                    }
                }
                Err(err) => {
                    let delay = self.retry.after_failed_open();
                    tracing::warn!(
                        "unable to open serial port, retrying in {:?} - error: {}",
                        delay,
                        err
                    );
                    if let Err(Shutdown) = self.session.sleep_for(delay).await {
                        return Shutdown;
                    }
                }
            }
        }
    }
}
