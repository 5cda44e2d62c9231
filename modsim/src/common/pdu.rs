use scursor::{ReadCursor, WriteCursor};

use crate::common::function::FunctionCode;
use crate::constants::limits;
use crate::error::{DecodeError, EncodeError};
use crate::server::request::RequestPayload;
use crate::server::response::{Response, ResponseBody};
use crate::types::AddressRange;

pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

/// Parse the body of a request PDU (everything after the function code)
///
/// Unknown function codes are not an error; their body is skipped and the
/// request is answered with an illegal function exception.
pub(crate) fn parse_request(
    function: u8,
    cursor: &mut ReadCursor,
) -> Result<(u16, RequestPayload), DecodeError> {
    let code = match FunctionCode::get(function) {
        Some(code) => code,
        None => {
            let _ = cursor.read_bytes(cursor.remaining())?;
            return Ok((0, RequestPayload::Unsupported));
        }
    };

    let ret = match code {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let range = parse_range(cursor)?.limited(limits::MAX_READ_COILS_COUNT)?;
            (range.start, RequestPayload::Read { count: range.count })
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let range = parse_range(cursor)?.limited(limits::MAX_READ_REGISTERS_COUNT)?;
            (range.start, RequestPayload::Read { count: range.count })
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => {
            let address = cursor.read_u16_be()?;
            let value = cursor.read_u16_be()?;
            (address, RequestPayload::WriteSingle { value })
        }
        FunctionCode::WriteMultipleCoils => {
            let range = parse_range(cursor)?.limited(limits::MAX_WRITE_COILS_COUNT)?;
            let byte_count = cursor.read_u8()?;
            if byte_count as usize != num_bytes_for_bits(range.count) {
                return Err(DecodeError::ByteCountMismatch(byte_count, range.count));
            }
            let bytes = cursor.read_bytes(byte_count as usize)?;
            let values = (0..range.count as usize)
                .map(|i| ((bytes[i / 8] >> (i % 8)) & 0x01) as u16)
                .collect();
            (range.start, RequestPayload::WriteMultiple { values })
        }
        FunctionCode::WriteMultipleRegisters => {
            let range = parse_range(cursor)?.limited(limits::MAX_WRITE_REGISTERS_COUNT)?;
            let byte_count = cursor.read_u8()?;
            if byte_count as usize != 2 * range.count as usize {
                return Err(DecodeError::ByteCountMismatch(byte_count, range.count));
            }
            let mut values = Vec::with_capacity(range.count as usize);
            for _ in 0..range.count {
                values.push(cursor.read_u16_be()?);
            }
            (range.start, RequestPayload::WriteMultiple { values })
        }
    };

    if !cursor.is_empty() {
        return Err(DecodeError::TrailingBytes(cursor.remaining()));
    }

    Ok(ret)
}

fn parse_range(cursor: &mut ReadCursor) -> Result<AddressRange, DecodeError> {
    let start = cursor.read_u16_be()?;
    let count = cursor.read_u16_be()?;
    Ok(AddressRange::try_from(start, count)?)
}

/// Serialize a response PDU, including its function code
pub(crate) fn write_response(cursor: &mut WriteCursor, response: &Response) -> Result<(), EncodeError> {
    cursor.write_u8(response.wire_function())?;
    match &response.body {
        ResponseBody::Bits(bits) => {
            if bits.len() > limits::MAX_READ_COILS_COUNT as usize {
                return Err(EncodeError::TooManyValues(bits.len()));
            }
            cursor.write_u8(num_bytes_for_bits(bits.len() as u16) as u8)?;
            for chunk in bits.chunks(8) {
                let mut acc: u8 = 0;
                for (count, bit) in chunk.iter().enumerate() {
                    if *bit {
                        acc |= 1 << count as u8;
                    }
                }
                cursor.write_u8(acc)?;
            }
        }
        ResponseBody::Registers(registers) => {
            if registers.len() > limits::MAX_READ_REGISTERS_COUNT as usize {
                return Err(EncodeError::TooManyValues(registers.len()));
            }
            cursor.write_u8((2 * registers.len()) as u8)?;
            for value in registers {
                cursor.write_u16_be(*value)?;
            }
        }
        ResponseBody::WriteSingle { address, value } => {
            cursor.write_u16_be(*address)?;
            cursor.write_u16_be(*value)?;
        }
        ResponseBody::WriteMultiple { address, count } => {
            cursor.write_u16_be(*address)?;
            cursor.write_u16_be(*count)?;
        }
        ResponseBody::Exception(ex) => {
            cursor.write_u8((*ex).into())?;
        }
    }
    Ok(())
}
