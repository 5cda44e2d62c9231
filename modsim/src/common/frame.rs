use crate::error::{DecodeError, EncodeError};
use crate::server::request::Request;
use crate::server::response::Response;
use crate::types::SlaveId;

pub(crate) mod constants {
    /// function code + data
    pub(crate) const MAX_ADU_LENGTH: usize = 253;
}

/// MBAP transaction identifier
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct TxId {
    value: u16,
}

impl TxId {
    /// Create a transaction id from its raw value
    pub const fn new(value: u16) -> Self {
        TxId { value }
    }

    /// Raw value of the transaction id
    pub const fn to_u16(self) -> u16 {
        self.value
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Addressing information of a frame
///
/// Serial frames have no transaction id.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct FrameHeader {
    /// target slave, 0 for broadcast
    pub slave: SlaveId,
    /// transaction id of a TCP frame
    pub tx_id: Option<TxId>,
}

impl FrameHeader {
    /// Header of a TCP frame
    pub fn new_tcp_header(slave: SlaveId, tx_id: TxId) -> Self {
        Self {
            slave,
            tx_id: Some(tx_id),
        }
    }

    /// Header of a serial frame
    pub fn new_rtu_header(slave: SlaveId) -> Self {
        Self { slave, tx_id: None }
    }
}

impl std::fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tx_id {
            Some(tx_id) => write!(f, "tx_id: {} unit: {:#04X}", tx_id, self.slave.value),
            None => write!(f, "unit: {:#04X}", self.slave.value),
        }
    }
}

/// Converts complete frames to requests and responses to frames
///
/// A codec never sees partial frames, that is the job of the [`Transport`](crate::Transport).
pub trait Codec: Send {
    /// Decode one complete frame into a request
    fn decode(&self, frame: &[u8]) -> Result<Request, DecodeError>;

    /// Encode a response addressed with `header` into a complete frame
    fn encode(&self, header: &FrameHeader, response: &Response) -> Result<Vec<u8>, EncodeError>;
}
