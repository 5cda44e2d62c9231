use crate::exception::ExceptionCode;

/// Response to a unicast request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// function code of the request being answered
    pub function: u8,
    /// body of the response
    pub body: ResponseBody,
}

/// Body of a response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    /// values read from a coil or discrete input block
    Bits(Vec<bool>),
    /// values read from a holding or input register block
    Registers(Vec<u16>),
    /// echo of a single write
    WriteSingle {
        /// address written
        address: u16,
        /// raw value from the request
        value: u16,
    },
    /// echo of a multiple write
    WriteMultiple {
        /// first address written
        address: u16,
        /// number of values written
        count: u16,
    },
    /// exception response
    Exception(ExceptionCode),
}

impl Response {
    pub(crate) fn new(function: u8, body: ResponseBody) -> Self {
        Self { function, body }
    }

    pub(crate) fn exception(function: u8, ex: ExceptionCode) -> Self {
        Self::new(function, ResponseBody::Exception(ex))
    }

    /// Function code placed on the wire, with the high bit set for exceptions
    pub fn wire_function(&self) -> u8 {
        match self.body {
            ResponseBody::Exception(_) => self.function | 0x80,
            _ => self.function,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "function: {:#04X}", self.wire_function())?;
        match &self.body {
            ResponseBody::Bits(x) => write!(f, " bits: {}", x.len()),
            ResponseBody::Registers(x) => write!(f, " registers: {}", x.len()),
            ResponseBody::WriteSingle { address, value } => {
                write!(f, " address: {address:#06X} value: {value:#06X}")
            }
            ResponseBody::WriteMultiple { address, count } => {
                write!(f, " start: {address:#06X} qty: {count}")
            }
            ResponseBody::Exception(ex) => write!(f, " exception: {ex:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceptions_set_the_high_bit_of_any_function_code() {
        let response = Response::exception(0x07, ExceptionCode::IllegalFunction);
        assert_eq!(response.wire_function(), 0x87);
        assert_eq!(Response::new(0x03, ResponseBody::Registers(vec![1])).wire_function(), 0x03);
    }
}
