/// Controls the logging of received and transmitted data at the PDU, frame, and physical layer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeLevel {
    /// Controls the protocol data unit decoding
    pub pdu: PduDecodeLevel,
    /// Controls the frame decoding
    ///
    /// On TCP, this is the MBAP header. On serial, this is the unit id and CRC.
    pub frame: FrameDecodeLevel,
    /// Controls the logging of physical layer read/write
    pub physical: PhysDecodeLevel,
}

/// Controls how requests and responses are logged at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PduDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the general description of the data
    DataHeaders,
}

/// Controls how frames are logged at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FrameDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the header
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

/// Controls how data transmitted at the physical layer (TCP, serial) is logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(pdu: PduDecodeLevel, frame: FrameDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel {
            pdu,
            frame,
            physical,
        }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            ..Self::default()
        }
    }
}

impl PduDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PduDecodeLevel::Nothing)
    }

    pub(crate) fn data_headers(&self) -> bool {
        matches!(self, PduDecodeLevel::DataHeaders)
    }
}

impl FrameDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, FrameDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        matches!(self, FrameDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(&self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}

/// Error returned when a decode level name is not recognized
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown decode level")]
pub struct UnknownDecodeLevel;

impl std::str::FromStr for PduDecodeLevel {
    type Err = UnknownDecodeLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(Self::Nothing),
            "function" => Ok(Self::FunctionCode),
            "headers" => Ok(Self::DataHeaders),
            _ => Err(UnknownDecodeLevel),
        }
    }
}

impl std::str::FromStr for FrameDecodeLevel {
    type Err = UnknownDecodeLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(Self::Nothing),
            "header" => Ok(Self::Header),
            "payload" => Ok(Self::Payload),
            _ => Err(UnknownDecodeLevel),
        }
    }
}

impl std::str::FromStr for PhysDecodeLevel {
    type Err = UnknownDecodeLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(Self::Nothing),
            "length" => Ok(Self::Length),
            "data" => Ok(Self::Data),
            _ => Err(UnknownDecodeLevel),
        }
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    use std::fmt::Write;

    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X?}")?;
        }
    }
    Ok(())
}

/// Displays a byte slice with its length and, optionally, its contents as hex
pub(crate) struct BytesDisplay<'a> {
    data: &'a [u8],
    with_data: bool,
}

impl<'a> BytesDisplay<'a> {
    pub(crate) fn new(data: &'a [u8], with_data: bool) -> Self {
        Self { data, with_data }
    }
}

impl std::fmt::Display for BytesDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.with_data {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!("payload".parse(), Ok(FrameDecodeLevel::Payload));
        assert_eq!("headers".parse(), Ok(PduDecodeLevel::DataHeaders));
        assert_eq!("loud".parse::<PhysDecodeLevel>(), Err(UnknownDecodeLevel));
    }

    #[test]
    fn formats_bytes_as_hex() {
        let text = BytesDisplay::new(&[0x01, 0xAB], true).to_string();
        assert_eq!(text, "2 bytes\n01 AB");
        assert_eq!(BytesDisplay::new(&[0x01], false).to_string(), "1 bytes");
    }
}
