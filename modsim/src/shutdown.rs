use std::net::SocketAddr;

/// Returned by a task that exited because its handle was dropped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shutdown;

/// A handle to a server task. The task is shutdown when the handle is dropped.
#[derive(Debug)]
pub struct ServerHandle {
    _tx: tokio::sync::mpsc::Sender<()>,
    local_addr: Option<SocketAddr>,
}

impl ServerHandle {
    pub(crate) fn new(tx: tokio::sync::mpsc::Sender<()>, local_addr: Option<SocketAddr>) -> Self {
        ServerHandle {
            _tx: tx,
            local_addr,
        }
    }

    /// Address the TCP listener is bound to, `None` for serial servers
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
