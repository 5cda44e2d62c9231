use serde::{Deserialize, Serialize};

use crate::error::{InvalidRange, SimError};

/// Modbus slave (unit) identifier, just a type-safe wrapper around `u8`
///
/// Id 0 is the broadcast address and never identifies a simulated slave.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlaveId {
    /// underlying raw value
    pub value: u8,
}

impl SlaveId {
    /// Create a new SlaveId
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Create the broadcast address
    pub const fn broadcast() -> Self {
        Self { value: 0 }
    }

    /// Returns true if this is the broadcast address
    pub const fn is_broadcast(self) -> bool {
        self.value == 0
    }
}

impl From<u8> for SlaveId {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for SlaveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Kind of data stored in a register block
///
/// Serialized as the numeric tag used by snapshot documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RegisterType {
    /// Read/write single bits (function codes 1, 5, 15)
    Coil,
    /// Read-only single bits (function code 2)
    DiscreteInput,
    /// Read/write 16-bit registers (function codes 3, 6, 16)
    HoldingRegister,
    /// Read-only 16-bit registers (function code 4)
    InputRegister,
}

impl RegisterType {
    /// Numeric tag of the type
    pub const fn to_u8(self) -> u8 {
        match self {
            RegisterType::Coil => 1,
            RegisterType::DiscreteInput => 2,
            RegisterType::HoldingRegister => 3,
            RegisterType::InputRegister => 4,
        }
    }

    /// Blocks of bit types only store 0 or 1
    pub const fn is_bit(self) -> bool {
        matches!(self, RegisterType::Coil | RegisterType::DiscreteInput)
    }
}

impl TryFrom<u8> for RegisterType {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RegisterType::Coil),
            2 => Ok(RegisterType::DiscreteInput),
            3 => Ok(RegisterType::HoldingRegister),
            4 => Ok(RegisterType::InputRegister),
            _ => Err(SimError::UnknownRegisterType(value)),
        }
    }
}

impl From<RegisterType> for u8 {
    fn from(value: RegisterType) -> Self {
        value.to_u8()
    }
}

impl std::fmt::Display for RegisterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterType::Coil => f.write_str("coil"),
            RegisterType::DiscreteInput => f.write_str("discrete input"),
            RegisterType::HoldingRegister => f.write_str("holding register"),
            RegisterType::InputRegister => f.write_str("input register"),
        }
    }
}

/// Start and count tuple used in requests
/// Cannot be constructed with invalid start/count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Create a new address range
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRange> {
        if count == 0 {
            return Err(InvalidRange::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);

        if start > max_start {
            return Err(InvalidRange::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    pub(crate) fn limited(self, max: u16) -> Result<Self, InvalidRange> {
        if self.count > max {
            return Err(InvalidRange::CountTooLargeForType(self.count, max));
        }
        Ok(self)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_start_max_count_of_one_is_allowed() {
        AddressRange::try_from(u16::MAX, 1).unwrap();
    }

    #[test]
    fn address_maximum_range_is_ok() {
        AddressRange::try_from(0, 0xFFFF).unwrap();
    }

    #[test]
    fn address_count_zero_fails_validation() {
        assert_eq!(AddressRange::try_from(0, 0), Err(InvalidRange::CountOfZero));
    }

    #[test]
    fn start_max_count_of_two_overflows() {
        assert_eq!(
            AddressRange::try_from(u16::MAX, 2),
            Err(InvalidRange::AddressOverflow(u16::MAX, 2))
        );
    }

    #[test]
    fn register_type_tags_match_snapshot_convention() {
        assert_eq!(RegisterType::try_from(3), Ok(RegisterType::HoldingRegister));
        assert_eq!(RegisterType::try_from(4), Ok(RegisterType::InputRegister));
        assert_eq!(u8::from(RegisterType::Coil), 1);
        assert_eq!(
            RegisterType::try_from(9),
            Err(SimError::UnknownRegisterType(9))
        );
    }
}
