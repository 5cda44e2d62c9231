use serde::{Deserialize, Serialize};

use crate::common::function::FunctionCode;
use crate::constants::coil;
use crate::error::SimError;
use crate::server::request::RequestPayload;
use crate::server::response::ResponseBody;
use crate::sim::block::RegisterBlock;
use crate::types::{RegisterType, SlaveId};

/// Declaration of a register section of a slave
///
/// Sections with a count of zero are recorded on the slave but never
/// materialized as a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// name of the section, unique within the slave
    pub label: String,
    /// type of data in the section
    pub register_type: RegisterType,
    /// address of the first value
    pub start_address: u16,
    /// number of values
    pub count: usize,
}

impl Section {
    /// Create a section declaration
    pub fn new(label: &str, register_type: RegisterType, start_address: u16, count: usize) -> Self {
        Self {
            label: label.to_string(),
            register_type,
            start_address,
            count,
        }
    }
}

/// A simulated Modbus slave owning a set of register blocks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slave {
    id: SlaveId,
    sections: Vec<Section>,
    blocks: Vec<RegisterBlock>,
}

impl Slave {
    pub(crate) fn new(id: SlaveId) -> Self {
        Self {
            id,
            sections: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Id of the slave
    pub fn id(&self) -> SlaveId {
        self.id
    }

    /// Declared sections in declaration order, including empty ones
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Materialized block with this label
    pub fn block(&self, label: &str) -> Option<&RegisterBlock> {
        self.blocks.iter().find(|b| b.label() == label)
    }

    /// Mutable access to the materialized block with this label
    pub fn block_mut(&mut self, label: &str) -> Option<&mut RegisterBlock> {
        self.blocks.iter_mut().find(|b| b.label() == label)
    }

    /// Materialized blocks in declaration order
    pub fn blocks(&self) -> impl Iterator<Item = &RegisterBlock> {
        self.blocks.iter()
    }

    /// Declare a section and, if `count > 0`, create a zeroed block for it
    pub fn add_block(
        &mut self,
        label: &str,
        register_type: RegisterType,
        start_address: u16,
        count: usize,
    ) -> Result<(), SimError> {
        if self.sections.iter().any(|s| s.label == label) {
            return Err(SimError::DuplicateLabel(label.to_string()));
        }

        if count > 0 {
            let block = RegisterBlock::new(label, register_type, start_address, count)?;
            if let Some(other) = self
                .blocks
                .iter()
                .find(|b| b.register_type() == register_type && b.overlaps(start_address, count))
            {
                return Err(SimError::OverlappingBlock {
                    label: label.to_string(),
                    other: other.label().to_string(),
                });
            }
            self.blocks.push(block);
        }

        self.sections
            .push(Section::new(label, register_type, start_address, count));
        Ok(())
    }

    /// Remove a section and its block
    pub fn remove_block(&mut self, label: &str) -> Result<(), SimError> {
        let before = self.sections.len();
        self.sections.retain(|s| s.label != label);
        if self.sections.len() == before {
            return Err(SimError::BlockNotFound(label.to_string()));
        }
        self.blocks.retain(|b| b.label() != label);
        Ok(())
    }

    /// Block of `register_type` whose range contains `address`
    pub fn find_block(
        &self,
        register_type: RegisterType,
        address: u16,
    ) -> Result<&RegisterBlock, SimError> {
        self.blocks
            .iter()
            .find(|b| b.register_type() == register_type && b.contains(address))
            .ok_or(SimError::UnknownBlock {
                register_type,
                address,
            })
    }

    fn find_block_mut(
        &mut self,
        register_type: RegisterType,
        address: u16,
    ) -> Result<&mut RegisterBlock, SimError> {
        self.blocks
            .iter_mut()
            .find(|b| b.register_type() == register_type && b.contains(address))
            .ok_or(SimError::UnknownBlock {
                register_type,
                address,
            })
    }

    /// Execute a register read or write against the slave's blocks
    pub fn handle_request(
        &mut self,
        function: u8,
        address: u16,
        payload: &RequestPayload,
    ) -> Result<ResponseBody, SimError> {
        let code = FunctionCode::get(function).ok_or(SimError::UnsupportedFunction(function))?;
        let register_type = code.register_type();

        match (code, payload) {
            (
                FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters,
                RequestPayload::Read { count },
            ) => {
                let values = self
                    .find_block(register_type, address)?
                    .read(address, *count as usize)?;
                if register_type.is_bit() {
                    Ok(ResponseBody::Bits(values.iter().map(|v| *v != 0).collect()))
                } else {
                    Ok(ResponseBody::Registers(values.to_vec()))
                }
            }
            (FunctionCode::WriteSingleCoil, RequestPayload::WriteSingle { value }) => {
                let bit: u16 = match *value {
                    coil::ON => 1,
                    coil::OFF => 0,
                    other => return Err(SimError::InvalidValue(other as i64)),
                };
                self.find_block_mut(register_type, address)?
                    .write(address, &[bit])?;
                Ok(ResponseBody::WriteSingle {
                    address,
                    value: *value,
                })
            }
            (FunctionCode::WriteSingleRegister, RequestPayload::WriteSingle { value }) => {
                self.find_block_mut(register_type, address)?
                    .write(address, &[*value])?;
                Ok(ResponseBody::WriteSingle {
                    address,
                    value: *value,
                })
            }
            (
                FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters,
                RequestPayload::WriteMultiple { values },
            ) => {
                self.find_block_mut(register_type, address)?
                    .write(address, values)?;
                Ok(ResponseBody::WriteMultiple {
                    address,
                    count: values.len() as u16,
                })
            }
            _ => Err(SimError::UnsupportedFunction(function)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slave_with_holding() -> Slave {
        let mut slave = Slave::new(SlaveId::new(1));
        slave
            .add_block("holding", RegisterType::HoldingRegister, 40001, 10)
            .unwrap();
        slave
    }

    #[test]
    fn zero_count_section_is_declared_but_not_materialized() {
        let mut slave = Slave::new(SlaveId::new(1));
        slave
            .add_block("input", RegisterType::InputRegister, 30001, 0)
            .unwrap();
        assert_eq!(slave.sections().len(), 1);
        assert!(slave.block("input").is_none());
    }

    #[test]
    fn duplicate_labels_are_rejected_even_when_empty() {
        let mut slave = Slave::new(SlaveId::new(1));
        slave
            .add_block("x", RegisterType::InputRegister, 0, 0)
            .unwrap();
        assert_eq!(
            slave.add_block("x", RegisterType::HoldingRegister, 100, 5),
            Err(SimError::DuplicateLabel("x".to_string()))
        );
    }

    #[test]
    fn overlapping_blocks_of_the_same_type_are_rejected() {
        let mut slave = slave_with_holding();
        assert!(matches!(
            slave.add_block("more", RegisterType::HoldingRegister, 40005, 10),
            Err(SimError::OverlappingBlock { .. })
        ));
        // same addresses but a different type is fine
        slave
            .add_block("inputs", RegisterType::InputRegister, 40001, 10)
            .unwrap();
    }

    #[test]
    fn remove_block_drops_block_and_declaration() {
        let mut slave = slave_with_holding();
        slave.remove_block("holding").unwrap();
        assert!(slave.sections().is_empty());
        assert!(slave.block("holding").is_none());
        assert_eq!(
            slave.remove_block("holding"),
            Err(SimError::BlockNotFound("holding".to_string()))
        );
    }

    #[test]
    fn write_then_read_holding_register() {
        let mut slave = slave_with_holding();
        let echo = slave
            .handle_request(6, 40001, &RequestPayload::WriteSingle { value: 1234 })
            .unwrap();
        assert_eq!(
            echo,
            ResponseBody::WriteSingle {
                address: 40001,
                value: 1234
            }
        );
        let read = slave
            .handle_request(3, 40001, &RequestPayload::Read { count: 1 })
            .unwrap();
        assert_eq!(read, ResponseBody::Registers(vec![1234]));
    }

    #[test]
    fn address_outside_every_block_is_unknown() {
        let mut slave = slave_with_holding();
        assert!(matches!(
            slave.handle_request(3, 0, &RequestPayload::Read { count: 1 }),
            Err(SimError::UnknownBlock { address: 0, .. })
        ));
        // input registers are never searched for holding requests
        assert!(matches!(
            slave.handle_request(4, 40001, &RequestPayload::Read { count: 1 }),
            Err(SimError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn range_running_off_the_end_is_out_of_range() {
        let mut slave = slave_with_holding();
        assert!(matches!(
            slave.handle_request(3, 40008, &RequestPayload::Read { count: 5 }),
            Err(SimError::OutOfRange { .. })
        ));
    }

    #[test]
    fn single_coil_write_requires_on_or_off() {
        let mut slave = Slave::new(SlaveId::new(1));
        slave.add_block("coils", RegisterType::Coil, 0, 8).unwrap();
        slave
            .handle_request(5, 3, &RequestPayload::WriteSingle { value: coil::ON })
            .unwrap();
        assert_eq!(
            slave
                .handle_request(1, 0, &RequestPayload::Read { count: 4 })
                .unwrap(),
            ResponseBody::Bits(vec![false, false, false, true])
        );
        assert_eq!(
            slave.handle_request(5, 3, &RequestPayload::WriteSingle { value: 0x1234 }),
            Err(SimError::InvalidValue(0x1234))
        );
    }

    #[test]
    fn write_multiple_echoes_address_and_count() {
        let mut slave = slave_with_holding();
        let echo = slave
            .handle_request(
                16,
                40002,
                &RequestPayload::WriteMultiple {
                    values: vec![1, 2, 3],
                },
            )
            .unwrap();
        assert_eq!(
            echo,
            ResponseBody::WriteMultiple {
                address: 40002,
                count: 3
            }
        );
        assert_eq!(
            slave.block("holding").unwrap().read(40001, 4).unwrap(),
            &[0, 1, 2, 3]
        );
    }

    #[test]
    fn unknown_function_is_unsupported() {
        let mut slave = slave_with_holding();
        assert_eq!(
            slave.handle_request(0x2B, 0, &RequestPayload::Unsupported),
            Err(SimError::UnsupportedFunction(0x2B))
        );
    }
}
