use crate::error::SimError;
use crate::exception::ExceptionCode;
use crate::server::request::Request;
use crate::server::response::Response;
use crate::sim::SlaveRegistry;
use crate::types::SlaveId;

/// Outcome of routing a request through the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A response must be sent
    Reply(Response),
    /// Nothing is sent
    Silent(Silence),
}

/// Reason a request produced no response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Silence {
    /// The request was a broadcast
    Broadcast {
        /// slaves that executed the request
        delivered: usize,
        /// slaves that rejected the request
        failed: usize,
    },
    /// No slave with this id is simulated
    UnknownSlave(SlaveId),
}

/// Execute `request` against the registry
///
/// Requests to the broadcast id are executed by every slave in registry order
/// and never answered; failures are logged and counted. Requests to a slave
/// that does not exist are not answered. Any other request produces exactly
/// one response, which is an exception response if the slave rejects it.
pub fn dispatch(registry: &mut SlaveRegistry, request: &Request) -> Dispatch {
    let target = request.header.slave;

    if target.is_broadcast() {
        let mut delivered = 0;
        let mut failed = 0;
        for slave in registry.slaves_mut() {
            match slave.handle_request(request.function, request.address, &request.payload) {
                Ok(_) => delivered += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!("broadcast to slave {} failed: {}", slave.id(), err);
                }
            }
        }
        return Dispatch::Silent(Silence::Broadcast { delivered, failed });
    }

    let slave = match registry.get_slave_mut(target) {
        Ok(slave) => slave,
        Err(_) => {
            tracing::warn!("{}", SimError::UnknownSlave(target));
            return Dispatch::Silent(Silence::UnknownSlave(target));
        }
    };

    match slave.handle_request(request.function, request.address, &request.payload) {
        Ok(body) => Dispatch::Reply(Response::new(request.function, body)),
        Err(err) => {
            let ex = ExceptionCode::from(&err);
            tracing::warn!(
                "slave {} answering {:?} ({:#04X}): {}",
                target,
                ex,
                u8::from(ex),
                err
            );
            Dispatch::Reply(Response::exception(request.function, ex))
        }
    }
}
