use scursor::{ReadCursor, WriteCursor};

use crate::common::frame::{Codec, FrameHeader, TxId};
use crate::common::pdu;
use crate::decode::{BytesDisplay, FrameDecodeLevel};
use crate::error::{DecodeError, EncodeError};
use crate::server::request::Request;
use crate::server::response::Response;
use crate::types::SlaveId;

pub(crate) mod constants {
    pub(crate) const HEADER_LENGTH: usize = 7;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        HEADER_LENGTH + crate::common::frame::constants::MAX_ADU_LENGTH;
    // includes the 1 byte unit id
    pub(crate) const MAX_LENGTH_FIELD: usize = crate::common::frame::constants::MAX_ADU_LENGTH + 1;
}

#[derive(Clone, Copy)]
struct MbapHeader {
    tx_id: TxId,
    adu_length: usize,
    unit_id: SlaveId,
}

fn parse_header(cursor: &mut ReadCursor) -> Result<MbapHeader, DecodeError> {
    let tx_id = TxId::new(cursor.read_u16_be()?);
    let protocol_id = cursor.read_u16_be()?;
    let length = cursor.read_u16_be()? as usize;
    let unit_id = SlaveId::new(cursor.read_u8()?);

    if protocol_id != 0 {
        return Err(DecodeError::UnknownProtocolId(protocol_id));
    }

    // must be > 0 b/c the 1-byte unit identifier counts towards length
    if length == 0 || length > constants::MAX_LENGTH_FIELD {
        return Err(DecodeError::BadLength(length));
    }

    Ok(MbapHeader {
        tx_id,
        adu_length: length - 1,
        unit_id,
    })
}

/// Number of bytes that follow a complete MBAP header
pub(crate) fn body_length(header: &[u8]) -> Result<usize, DecodeError> {
    let mut cursor = ReadCursor::new(header);
    Ok(parse_header(&mut cursor)?.adu_length)
}

/// Modbus TCP codec: 7-byte MBAP header followed by the PDU
#[derive(Copy, Clone, Debug, Default)]
pub struct MbapCodec {
    level: FrameDecodeLevel,
}

impl MbapCodec {
    /// Create a codec logging frames at `level`
    pub fn new(level: FrameDecodeLevel) -> Self {
        Self { level }
    }
}

impl Codec for MbapCodec {
    fn decode(&self, frame: &[u8]) -> Result<Request, DecodeError> {
        if frame.len() > constants::MAX_FRAME_LENGTH {
            return Err(DecodeError::FrameTooBig(
                frame.len(),
                constants::MAX_FRAME_LENGTH,
            ));
        }

        let mut cursor = ReadCursor::new(frame);
        let header = parse_header(&mut cursor)?;

        if cursor.remaining() < header.adu_length {
            return Err(DecodeError::InsufficientBytes);
        }
        if cursor.remaining() > header.adu_length {
            return Err(DecodeError::TrailingBytes(
                cursor.remaining() - header.adu_length,
            ));
        }

        if self.level.enabled() {
            tracing::info!(
                "MBAP RX - tx_id: {} unit: {:#04X} {}",
                header.tx_id,
                header.unit_id.value,
                BytesDisplay::new(&frame[constants::HEADER_LENGTH..], self.level.payload_enabled())
            );
        }

        let function = cursor.read_u8()?;
        let (address, payload) = pdu::parse_request(function, &mut cursor)?;

        Ok(Request {
            header: FrameHeader::new_tcp_header(header.unit_id, header.tx_id),
            function,
            address,
            payload,
        })
    }

    fn encode(&self, header: &FrameHeader, response: &Response) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = [0u8; constants::MAX_FRAME_LENGTH];

        let total_length = {
            let mut cursor = WriteCursor::new(&mut buffer);
            cursor.write_u16_be(header.tx_id.unwrap_or_default().to_u16())?;
            cursor.write_u16_be(0)?;
            // length is patched once the PDU size is known
            cursor.write_u16_be(0)?;
            cursor.write_u8(header.slave.value)?;
            pdu::write_response(&mut cursor, response)?;
            cursor.position()
        };

        // unit id + PDU
        let length_field = (total_length - constants::HEADER_LENGTH + 1) as u16;
        buffer[4..6].copy_from_slice(&length_field.to_be_bytes());

        let frame = &buffer[..total_length];
        if self.level.enabled() {
            tracing::info!(
                "MBAP TX - {} {}",
                header,
                BytesDisplay::new(&frame[constants::HEADER_LENGTH..], self.level.payload_enabled())
            );
        }

        Ok(frame.to_vec())
    }
}
