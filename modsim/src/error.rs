use thiserror::Error;

use crate::types::{RegisterType, SlaveId};

/// Errors raised by the register model, the registry and the snapshot codec
///
/// These are always returned to the immediate caller. Only the request
/// dispatcher decides whether an error becomes a Modbus exception response,
/// is suppressed (broadcast) or results in silence (unknown slave).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A slave with this id is already registered
    #[error("slave {0} already exists")]
    DuplicateSlave(SlaveId),
    /// The slave already declares a section with this name
    #[error("register section '{0}' already exists")]
    DuplicateLabel(String),
    /// No slave with this id is registered
    #[error("slave {0} does not exist")]
    SlaveNotFound(SlaveId),
    /// The slave declares no section with this name
    #[error("register section '{0}' does not exist")]
    BlockNotFound(String),
    /// A request was addressed to a slave this simulator does not own
    #[error("no slave is registered for unit id {0}")]
    UnknownSlave(SlaveId),
    /// No block of the addressed type contains the address
    #[error("no {register_type} block contains address {address}")]
    UnknownBlock {
        /// register type implied by the function code
        register_type: RegisterType,
        /// requested address
        address: u16,
    },
    /// The addressed range is not contained in the block
    #[error("range [{address}, {address} + {length}) is outside of block [{start}, {start} + {count})")]
    OutOfRange {
        /// first address of the block
        start: u16,
        /// number of registers in the block
        count: usize,
        /// first requested address
        address: u32,
        /// number of requested registers
        length: usize,
    },
    /// A value does not fit in the addressed register
    #[error("value {0} does not fit in the register")]
    InvalidValue(i64),
    /// A new block would share addresses with an existing block of the same type
    #[error("section '{label}' overlaps the addresses of section '{other}'")]
    OverlappingBlock {
        /// section being added
        label: String,
        /// section already present
        other: String,
    },
    /// The function code is not a register read or write
    #[error("unsupported function code: {0:#04X}")]
    UnsupportedFunction(u8),
    /// Timing cannot be derived from this baud rate
    #[error("invalid baud rate: {0}")]
    InvalidBaudRate(u32),
    /// The numeric register type tag is not defined
    #[error("unknown register type: {0}")]
    UnknownRegisterType(u8),
    /// A snapshot document could not be applied
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// A generated slave id does not fit in a unit id
    #[error("slave id {0} does not fit in a unit id")]
    InvalidSlaveId(u16),
    /// A typed value cannot be packed with the requested format
    #[error("invalid value format: {0}")]
    InvalidFormat(String),
}

impl SimError {
    /// HTTP status a management layer should answer with for this error
    pub fn http_status(&self) -> u16 {
        match self {
            SimError::DuplicateSlave(_)
            | SimError::DuplicateLabel(_)
            | SimError::OverlappingBlock { .. } => 409,
            _ => 400,
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::MalformedSnapshot(err.to_string())
    }
}

/// Errors produced while decoding a request frame
///
/// A frame that fails to decode is dropped without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame is too short to be valid
    #[error("frame is too short to be valid")]
    InsufficientBytes,
    /// The frame contains bytes after the end of the request
    #[error("frame contains {0} extra trailing bytes")]
    TrailingBytes(usize),
    /// The MBAP header carries a protocol id other than Modbus
    #[error("received TCP frame with non-Modbus protocol id: {0}")]
    UnknownProtocolId(u16),
    /// The MBAP length field is zero or exceeds the maximum
    #[error("received TCP frame with invalid length field: {0}")]
    BadLength(usize),
    /// The frame exceeds the maximum ADU size
    #[error("frame length of {0} exceeds the maximum allowed length of {1}")]
    FrameTooBig(usize, usize),
    /// The RTU CRC does not match the frame contents
    #[error("CRC validation failure - received {received:#06X}, expected {expected:#06X}")]
    CrcMismatch {
        /// CRC found at the end of the frame
        received: u16,
        /// CRC computed over the frame
        expected: u16,
    },
    /// The byte count field does not match the quantity of values
    #[error("byte count ({0}) doesn't match the quantity of values ({1})")]
    ByteCountMismatch(u8, u16),
    /// The request's address range is invalid
    #[error("invalid range: {0}")]
    BadRange(#[from] InvalidRange),
}

impl From<scursor::ReadError> for DecodeError {
    fn from(_: scursor::ReadError) -> Self {
        DecodeError::InsufficientBytes
    }
}

/// Errors produced while encoding a response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The response does not fit in a single Modbus frame
    #[error("response does not fit in a Modbus frame")]
    InsufficientSpace,
    /// The response carries more values than a Modbus response can describe
    #[error("response contains {0} values which exceeds the maximum for a single response")]
    TooManyValues(usize),
}

impl From<scursor::WriteError> for EncodeError {
    fn from(_: scursor::WriteError) -> Self {
        EncodeError::InsufficientSpace
    }
}

/// Errors that result from an invalid start/count combination
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum InvalidRange {
    /// Count of zero not allowed
    #[error("range contains count == 0")]
    CountOfZero,
    /// Address in range overflows u16
    #[error("start == {0} and count = {1} would overflow the representation of u16")]
    AddressOverflow(u16, u16),
    /// Count is too large for the type
    #[error("the request count of {0} exceeds maximum allowed count of {1} for this type")]
    CountTooLargeForType(u16, u16),
}
