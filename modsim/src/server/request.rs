use crate::common::frame::FrameHeader;
use crate::common::function::FunctionCode;

/// A decoded request frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// addressing information from the frame
    pub header: FrameHeader,
    /// raw function code
    pub function: u8,
    /// first addressed register or bit
    pub address: u16,
    /// function-specific body
    pub payload: RequestPayload,
}

/// Body of a request
///
/// Coil values are carried as 0/1, except for write single coil which keeps
/// the raw `0xFF00`/`0x0000` value so the slave can validate and echo it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPayload {
    /// read `count` values
    Read {
        /// number of values to read
        count: u16,
    },
    /// write one value
    WriteSingle {
        /// raw value from the frame
        value: u16,
    },
    /// write consecutive values
    WriteMultiple {
        /// values to write
        values: Vec<u16>,
    },
    /// a function code this simulator does not implement
    Unsupported,
}

impl Request {
    /// The known function code of this request, if any
    pub fn function_code(&self) -> Option<FunctionCode> {
        FunctionCode::get(self.function)
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.function_code() {
            Some(code) => write!(f, "{code}")?,
            None => write!(f, "UNKNOWN FUNCTION ({:#04X})", self.function)?,
        }
        match &self.payload {
            RequestPayload::Read { count } => {
                write!(f, " start: {:#06X} qty: {}", self.address, count)
            }
            RequestPayload::WriteSingle { value } => {
                write!(f, " address: {:#06X} value: {:#06X}", self.address, value)
            }
            RequestPayload::WriteMultiple { values } => {
                write!(f, " start: {:#06X} qty: {}", self.address, values.len())
            }
            RequestPayload::Unsupported => Ok(()),
        }
    }
}
