use std::fmt::{Display, Formatter};

use crate::types::RegisterType;

mod constants {
    pub(crate) const READ_COILS: u8 = 1;
    pub(crate) const READ_DISCRETE_INPUTS: u8 = 2;
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 3;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 4;
    pub(crate) const WRITE_SINGLE_COIL: u8 = 5;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 6;
    pub(crate) const WRITE_MULTIPLE_COILS: u8 = 15;
    pub(crate) const WRITE_MULTIPLE_REGISTERS: u8 = 16;
}

/// Function codes a simulated slave understands
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// FC 1
    ReadCoils = constants::READ_COILS,
    /// FC 2
    ReadDiscreteInputs = constants::READ_DISCRETE_INPUTS,
    /// FC 3
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS,
    /// FC 4
    ReadInputRegisters = constants::READ_INPUT_REGISTERS,
    /// FC 5
    WriteSingleCoil = constants::WRITE_SINGLE_COIL,
    /// FC 6
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER,
    /// FC 15
    WriteMultipleCoils = constants::WRITE_MULTIPLE_COILS,
    /// FC 16
    WriteMultipleRegisters = constants::WRITE_MULTIPLE_REGISTERS,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            FunctionCode::ReadCoils => write!(f, "READ COILS ({:#04X})", self.get_value()),
            FunctionCode::ReadDiscreteInputs => {
                write!(f, "READ DISCRETE INPUTS ({:#04X})", self.get_value())
            }
            FunctionCode::ReadHoldingRegisters => {
                write!(f, "READ HOLDING REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::ReadInputRegisters => {
                write!(f, "READ INPUT REGISTERS ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleCoil => {
                write!(f, "WRITE SINGLE COIL ({:#04X})", self.get_value())
            }
            FunctionCode::WriteSingleRegister => {
                write!(f, "WRITE SINGLE REGISTER ({:#04X})", self.get_value())
            }
            FunctionCode::WriteMultipleCoils => {
                write!(f, "WRITE MULTIPLE COILS ({:#04X})", self.get_value())
            }
            FunctionCode::WriteMultipleRegisters => {
                write!(f, "WRITE MULTIPLE REGISTERS ({:#04X})", self.get_value())
            }
        }
    }
}

impl FunctionCode {
    /// Raw value of the function code
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    /// Look up a raw function code
    pub fn get(value: u8) -> Option<Self> {
        match value {
            constants::READ_COILS => Some(FunctionCode::ReadCoils),
            constants::READ_DISCRETE_INPUTS => Some(FunctionCode::ReadDiscreteInputs),
            constants::READ_HOLDING_REGISTERS => Some(FunctionCode::ReadHoldingRegisters),
            constants::READ_INPUT_REGISTERS => Some(FunctionCode::ReadInputRegisters),
            constants::WRITE_SINGLE_COIL => Some(FunctionCode::WriteSingleCoil),
            constants::WRITE_SINGLE_REGISTER => Some(FunctionCode::WriteSingleRegister),
            constants::WRITE_MULTIPLE_COILS => Some(FunctionCode::WriteMultipleCoils),
            constants::WRITE_MULTIPLE_REGISTERS => Some(FunctionCode::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Register type the function operates on
    pub const fn register_type(self) -> RegisterType {
        match self {
            FunctionCode::ReadCoils
            | FunctionCode::WriteSingleCoil
            | FunctionCode::WriteMultipleCoils => RegisterType::Coil,
            FunctionCode::ReadDiscreteInputs => RegisterType::DiscreteInput,
            FunctionCode::ReadHoldingRegisters
            | FunctionCode::WriteSingleRegister
            | FunctionCode::WriteMultipleRegisters => RegisterType::HoldingRegister,
            FunctionCode::ReadInputRegisters => RegisterType::InputRegister,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_function_families_to_register_types() {
        assert_eq!(
            FunctionCode::get(15).map(FunctionCode::register_type),
            Some(RegisterType::Coil)
        );
        assert_eq!(
            FunctionCode::get(6).map(FunctionCode::register_type),
            Some(RegisterType::HoldingRegister)
        );
        assert_eq!(FunctionCode::get(0x2B), None);
    }
}
