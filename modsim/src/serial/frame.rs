use scursor::{ReadCursor, WriteCursor};

use crate::common::frame::{Codec, FrameHeader};
use crate::common::pdu;
use crate::decode::{BytesDisplay, FrameDecodeLevel};
use crate::error::{DecodeError, EncodeError};
use crate::server::request::Request;
use crate::server::response::Response;
use crate::types::SlaveId;

pub(crate) mod constants {
    pub(crate) const HEADER_LENGTH: usize = 1;
    pub(crate) const FUNCTION_CODE_LENGTH: usize = 1;
    pub(crate) const CRC_LENGTH: usize = 2;
    pub(crate) const MIN_FRAME_LENGTH: usize = HEADER_LENGTH + FUNCTION_CODE_LENGTH + CRC_LENGTH;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        HEADER_LENGTH + crate::common::frame::constants::MAX_ADU_LENGTH + CRC_LENGTH;
}

/// precomputes the CRC table as a constant!
const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// Modbus RTU codec: unit id, PDU, CRC-16/MODBUS (little endian)
#[derive(Copy, Clone, Debug, Default)]
pub struct RtuCodec {
    level: FrameDecodeLevel,
}

impl RtuCodec {
    /// Create a codec logging frames at `level`
    pub fn new(level: FrameDecodeLevel) -> Self {
        Self { level }
    }
}

impl Codec for RtuCodec {
    fn decode(&self, frame: &[u8]) -> Result<Request, DecodeError> {
        if frame.len() < constants::MIN_FRAME_LENGTH {
            return Err(DecodeError::InsufficientBytes);
        }
        if frame.len() > constants::MAX_FRAME_LENGTH {
            return Err(DecodeError::FrameTooBig(
                frame.len(),
                constants::MAX_FRAME_LENGTH,
            ));
        }

        let (body, crc_bytes) = frame.split_at(frame.len() - constants::CRC_LENGTH);
        let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        let expected = CRC.checksum(body);
        if received != expected {
            return Err(DecodeError::CrcMismatch { received, expected });
        }

        let mut cursor = ReadCursor::new(body);
        let slave = SlaveId::new(cursor.read_u8()?);

        if self.level.enabled() {
            tracing::info!(
                "RTU RX - unit: {:#04X} crc: {:#06X} {}",
                slave.value,
                received,
                BytesDisplay::new(&body[constants::HEADER_LENGTH..], self.level.payload_enabled())
            );
        }

        let function = cursor.read_u8()?;
        let (address, payload) = pdu::parse_request(function, &mut cursor)?;

        Ok(Request {
            header: FrameHeader::new_rtu_header(slave),
            function,
            address,
            payload,
        })
    }

    fn encode(&self, header: &FrameHeader, response: &Response) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = [0u8; constants::MAX_FRAME_LENGTH];

        let end_pdu = {
            let mut cursor = WriteCursor::new(&mut buffer);
            cursor.write_u8(header.slave.value)?;
            pdu::write_response(&mut cursor, response)?;
            cursor.position()
        };

        if end_pdu + constants::CRC_LENGTH > buffer.len() {
            return Err(EncodeError::InsufficientSpace);
        }

        let crc = CRC.checksum(&buffer[..end_pdu]);
        buffer[end_pdu..end_pdu + constants::CRC_LENGTH].copy_from_slice(&crc.to_le_bytes());

        let frame = &buffer[..end_pdu + constants::CRC_LENGTH];
        if self.level.enabled() {
            tracing::info!(
                "RTU TX - unit: {:#04X} crc: {:#06X} {}",
                header.slave.value,
                crc,
                BytesDisplay::new(
                    &frame[constants::HEADER_LENGTH..end_pdu],
                    self.level.payload_enabled()
                )
            );
        }

        Ok(frame.to_vec())
    }
}
