use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;

use crate::common::phys::StreamTransport;
use crate::decode::DecodeLevel;
use crate::server::task::{SessionError, SessionTask};
use crate::sim::SharedRegistry;
use crate::tcp::frame::MbapCodec;

struct SessionTracker {
    max: usize,
    id: u64,
    sessions: BTreeMap<u64, tokio::sync::mpsc::Sender<()>>,
}

type SessionTrackerWrapper = Arc<Mutex<SessionTracker>>;

impl SessionTracker {
    fn new(max: usize) -> SessionTracker {
        Self {
            max,
            id: 0,
            sessions: BTreeMap::new(),
        }
    }

    fn get_next_id(&mut self) -> u64 {
        let ret = self.id;
        self.id += 1;
        ret
    }

    fn wrapped(max: usize) -> SessionTrackerWrapper {
        Arc::new(Mutex::new(Self::new(max)))
    }

    fn add(&mut self, sender: tokio::sync::mpsc::Sender<()>) -> u64 {
        if self.sessions.len() >= self.max {
            if let Some((id, _)) = self.sessions.pop_first() {
                // dropping the sender stops the session
                tracing::warn!("exceeded max connections, closing oldest session: {}", id);
            }
        }

        let id = self.get_next_id();
        self.sessions.insert(id, sender);
        id
    }

    fn remove(&mut self, id: u64) {
        self.sessions.remove(&id);
    }

    fn lock(tracker: &SessionTrackerWrapper) -> std::sync::MutexGuard<'_, SessionTracker> {
        tracker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Accepts connections and runs one session task per connection
pub(crate) struct ServerTask {
    listener: TcpListener,
    registry: SharedRegistry,
    tracker: SessionTrackerWrapper,
    decode: DecodeLevel,
}

impl ServerTask {
    pub(crate) fn new(
        max_sessions: usize,
        listener: TcpListener,
        registry: SharedRegistry,
        decode: DecodeLevel,
    ) -> Self {
        Self {
            listener,
            registry,
            tracker: SessionTracker::wrapped(max_sessions.max(1)),
            decode,
        }
    }

    pub(crate) async fn run(&mut self, mut shutdown: tokio::sync::mpsc::Receiver<()>) {
        loop {
            tokio::select! {
               _ = shutdown.recv() => {
                    tracing::info!("server shutdown");
                    // dropping the senders stops every open session
                    SessionTracker::lock(&self.tracker).sessions.clear();
                    return;
               }
               result = self.listener.accept() => {
                   match result {
                        Err(err) => {
                            tracing::error!("error accepting connection: {}", err);
                            return;
                        }
                        Ok((socket, addr)) => self.handle(socket, addr),
                   }
               }
            }
        }
    }

    fn handle(&self, socket: tokio::net::TcpStream, addr: SocketAddr) {
        let decode = self.decode;
        let registry = self.registry.clone();
        let tracker = self.tracker.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(1);

        let id = SessionTracker::lock(&self.tracker).add(tx);

        tracing::info!("accepted connection {} from: {}", id, addr);

        tokio::spawn(async move {
            let mut transport = StreamTransport::new(socket, decode.physical);
            let mut session =
                SessionTask::new(registry, MbapCodec::new(decode.frame), rx, decode.pdu);
            match session.run(&mut transport).await {
                SessionError::Shutdown => tracing::info!("session {} shutdown", id),
                SessionError::Io(err) => tracing::info!("session {} closed: {}", id, err),
            }
            SessionTracker::lock(&tracker).remove(id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_evicts_oldest_session_when_full() {
        let mut tracker = SessionTracker::new(2);
        let (tx1, mut rx1) = tokio::sync::mpsc::channel(1);
        let (tx2, _rx2) = tokio::sync::mpsc::channel(1);
        let (tx3, _rx3) = tokio::sync::mpsc::channel(1);

        assert_eq!(tracker.add(tx1), 0);
        assert_eq!(tracker.add(tx2), 1);
        assert_eq!(tracker.add(tx3), 2);

        assert_eq!(tracker.sessions.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        // the evicted session sees its channel close
        assert_eq!(rx1.try_recv(), Err(tokio::sync::mpsc::error::TryRecvError::Disconnected));
    }
}
