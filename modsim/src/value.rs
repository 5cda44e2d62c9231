//! Conversion of typed values to consecutive 16-bit registers
//!
//! Formats use the `struct` module notation: an optional byte order
//! character (`>`/`!` big endian, `<` little endian, `@`/`=` native)
//! followed by a type character. Supported types are `h`/`H` (16 bit),
//! `i`/`I`/`l`/`L` (32 bit), `q`/`Q` (64 bit), `f`/`d` (floating point)
//! and `Ns` (a string of N bytes). The packed bytes must fill exactly
//! `size` registers, which are then read back big endian.

use serde::{Deserialize, Serialize};

use crate::constants::limits::ADDRESS_SPACE;
use crate::error::SimError;

/// A value to be written to one or more registers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    /// integer value
    Int(i64),
    /// floating point value
    Float(f64),
    /// text, either a number or string data
    Text(String),
}

/// Request to write a value, optionally packed using a format
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueWrite {
    /// value to write
    pub value: RegisterValue,
    /// packing format, the value is written as a plain integer when absent
    #[serde(default)]
    pub format: Option<String>,
    /// number of registers the packed value occupies
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_size() -> usize {
    1
}

impl ValueWrite {
    /// Plain integer write to a single register
    pub fn int(value: i64) -> Self {
        Self {
            value: RegisterValue::Int(value),
            format: None,
            size: 1,
        }
    }

    /// Value packed with `format` into `size` registers
    pub fn formatted(value: RegisterValue, format: &str, size: usize) -> Self {
        Self {
            value,
            format: Some(format.to_string()),
            size,
        }
    }

    /// Register values to write, not yet range checked for plain integers
    pub fn to_registers(&self) -> Result<Vec<i64>, SimError> {
        match &self.format {
            None => Ok(vec![plain_integer(&self.value)?]),
            Some(format) => Ok(pack(&self.value, format, self.size)?
                .into_iter()
                .map(i64::from)
                .collect()),
        }
    }
}

fn plain_integer(value: &RegisterValue) -> Result<i64, SimError> {
    match value {
        RegisterValue::Int(x) => Ok(*x),
        RegisterValue::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
        RegisterValue::Float(x) => Err(SimError::InvalidFormat(format!("{x} is not an integer"))),
        RegisterValue::Text(x) => x
            .trim()
            .parse()
            .map_err(|_| SimError::InvalidFormat(format!("could not convert '{x}' to an integer"))),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

macro_rules! pack_int {
    ($ty:ty, $value:expr, $order:expr) => {{
        let x = <$ty>::try_from($value).map_err(|_| SimError::InvalidValue($value))?;
        match $order {
            ByteOrder::Big => x.to_be_bytes().to_vec(),
            ByteOrder::Little => x.to_le_bytes().to_vec(),
        }
    }};
}

macro_rules! pack_float {
    ($ty:ty, $value:expr, $order:expr) => {{
        let x = $value as $ty;
        match $order {
            ByteOrder::Big => x.to_be_bytes().to_vec(),
            ByteOrder::Little => x.to_le_bytes().to_vec(),
        }
    }};
}

/// Pack `value` with `format` and split the bytes into `size` big endian registers
pub fn pack(value: &RegisterValue, format: &str, size: usize) -> Result<Vec<u16>, SimError> {
    let invalid = || SimError::InvalidFormat(format.to_string());

    // nothing wider than the address space can be written
    let width = match size.checked_mul(2) {
        Some(width) if size <= ADDRESS_SPACE as usize => width,
        _ => {
            return Err(SimError::InvalidFormat(format!(
                "{} registers do not fit in the address space",
                size
            )))
        }
    };

    let (order, rest) = match format.chars().next() {
        Some('>') | Some('!') => (ByteOrder::Big, &format[1..]),
        Some('<') => (ByteOrder::Little, &format[1..]),
        Some('@') | Some('=') => (ByteOrder::native(), &format[1..]),
        _ => (ByteOrder::native(), format),
    };

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let (count, kind) = rest.split_at(digits);
    let count: Option<usize> = if count.is_empty() {
        None
    } else {
        Some(count.parse().map_err(|_| invalid())?)
    };

    let bytes = match (kind, value) {
        ("s", RegisterValue::Text(text)) => {
            let length = count.unwrap_or(1);
            if length != width {
                return Err(SimError::InvalidFormat(format!(
                    "'{}' packs {} bytes which does not fill {} register(s)",
                    format, length, size
                )));
            }
            let mut bytes = text.as_bytes().to_vec();
            bytes.resize(length, 0);
            bytes
        }
        (_, RegisterValue::Text(_)) | ("s", _) => return Err(invalid()),
        (_, _) if count.is_some_and(|c| c != 1) => return Err(invalid()),
        ("f", RegisterValue::Float(x)) => pack_float!(f32, *x, order),
        ("f", RegisterValue::Int(x)) => pack_float!(f32, *x, order),
        ("d", RegisterValue::Float(x)) => pack_float!(f64, *x, order),
        ("d", RegisterValue::Int(x)) => pack_float!(f64, *x, order),
        (_, RegisterValue::Float(_)) => return Err(invalid()),
        ("h", RegisterValue::Int(x)) => pack_int!(i16, *x, order),
        ("H", RegisterValue::Int(x)) => pack_int!(u16, *x, order),
        ("i" | "l", RegisterValue::Int(x)) => pack_int!(i32, *x, order),
        ("I" | "L", RegisterValue::Int(x)) => pack_int!(u32, *x, order),
        ("q", RegisterValue::Int(x)) => pack_int!(i64, *x, order),
        ("Q", RegisterValue::Int(x)) => pack_int!(u64, *x, order),
        _ => return Err(invalid()),
    };

    if bytes.len() != width {
        return Err(SimError::InvalidFormat(format!(
            "'{}' packs {} bytes which does not fill {} register(s)",
            format,
            bytes.len(),
            size
        )));
    }

    Ok(bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}
