//! Transport-free management operations
//!
//! [`Simulator`] bundles the operations an HTTP layer exposes. Every error is
//! a [`SimError`] whose [`SimError::http_status`] gives the status to answer
//! with.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::sim::{RegisterBlock, Section, SharedRegistry, Slave};
use crate::snapshot::{self, SlaveRecord, SnapshotCodec};
use crate::types::{RegisterType, SlaveId};
use crate::value::ValueWrite;

/// Register section requested when adding a slave
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// label of the section
    #[serde(alias = "register_name")]
    pub register_section_name: String,
    /// number of registers
    pub register_count: usize,
    /// address of the first register
    pub start_address: u16,
    /// numeric register type tag
    pub register_type: u8,
}

impl TryFrom<&RegisterConfig> for Section {
    type Error = SimError;

    fn try_from(value: &RegisterConfig) -> Result<Self, Self::Error> {
        Ok(Section::new(
            &value.register_section_name,
            RegisterType::try_from(value.register_type)?,
            value.start_address,
            value.register_count,
        ))
    }
}

/// Description of a declared section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// label of the section
    pub name: String,
    /// numeric register type tag
    pub register_type: u8,
    /// address of the first register
    pub start_address: u16,
    /// number of registers
    pub register_count: usize,
}

/// Description of a slave and its sections
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveInfo {
    /// id of the slave
    pub slave_id: SlaveId,
    /// declared sections in declaration order
    pub sections: Vec<SectionInfo>,
}

impl From<&Slave> for SlaveInfo {
    fn from(slave: &Slave) -> Self {
        Self {
            slave_id: slave.id(),
            sections: slave
                .sections()
                .iter()
                .map(|s| SectionInfo {
                    name: s.label.clone(),
                    register_type: s.register_type.into(),
                    start_address: s.start_address,
                    register_count: s.count,
                })
                .collect(),
        }
    }
}

// register types searched, in order, when a management call names only an address
const ADDRESSABLE: [RegisterType; 2] = [RegisterType::HoldingRegister, RegisterType::InputRegister];

/// Management facade over a shared registry
#[derive(Clone, Debug)]
pub struct Simulator {
    registry: SharedRegistry,
    codec: SnapshotCodec,
}

impl Simulator {
    /// Manage `registry`, dumping sections in the default order
    pub fn new(registry: SharedRegistry) -> Self {
        Self::with_codec(registry, SnapshotCodec::default())
    }

    /// Manage `registry` with a custom snapshot codec
    pub fn with_codec(registry: SharedRegistry, codec: SnapshotCodec) -> Self {
        Self { registry, codec }
    }

    /// The managed registry
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Add a slave with the given register sections
    pub fn add_slave(&self, id: SlaveId, registers: &[RegisterConfig]) -> Result<SlaveInfo, SimError> {
        let sections = registers
            .iter()
            .map(Section::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let mut registry = self.registry.lock();
        let slave = registry.add_slave(id, &sections)?;
        Ok(SlaveInfo::from(&*slave))
    }

    /// Remove a slave
    pub fn remove_slave(&self, id: SlaveId) -> Result<(), SimError> {
        self.registry.lock().remove_slave(id).map(|_| ())
    }

    /// Every slave in registry order
    pub fn slaves(&self) -> Vec<SlaveInfo> {
        self.registry.lock().slaves().map(SlaveInfo::from).collect()
    }

    /// Description of one slave
    pub fn slave_info(&self, id: SlaveId) -> Result<SlaveInfo, SimError> {
        self.registry.lock().get_slave(id).map(SlaveInfo::from)
    }

    /// Snapshot of every slave
    pub fn dump(&self) -> Vec<SlaveRecord> {
        self.codec.dump(&self.registry.lock())
    }

    /// Snapshot of every slave as JSON
    pub fn dump_json(&self) -> Result<String, SimError> {
        snapshot::to_json(&self.dump())
    }

    /// Snapshot of one slave
    pub fn dump_slave(&self, id: SlaveId) -> Result<SlaveRecord, SimError> {
        self.codec.dump_slave(&self.registry.lock(), id)
    }

    /// Replace every slave with the snapshot contents
    pub fn load(&self, records: &[SlaveRecord]) -> Result<(), SimError> {
        self.codec.load(&mut self.registry.lock(), records)
    }

    /// Replace every slave with the contents of a JSON snapshot
    ///
    /// A document that fails to parse leaves the registry empty, the same as
    /// a document whose records fail to apply.
    pub fn load_json(&self, json: &str) -> Result<(), SimError> {
        let mut registry = self.registry.lock();
        match snapshot::from_json(json) {
            Ok(records) => self.codec.load(&mut registry, &records),
            Err(err) => {
                registry.clear();
                Err(err)
            }
        }
    }

    /// Replace one slave with the record, which must describe that slave
    pub fn load_slave(&self, id: SlaveId, record: &SlaveRecord) -> Result<(), SimError> {
        if record.slave_id != id {
            return Err(SimError::MalformedSnapshot(format!(
                "record for slave {} cannot be loaded into slave {}",
                record.slave_id, id
            )));
        }
        self.codec.load_slave(&mut self.registry.lock(), record)
    }

    /// Read the register at `address` from whichever register block contains it
    pub fn read_register(&self, id: SlaveId, address: u16) -> Result<u16, SimError> {
        let registry = self.registry.lock();
        let block = find_register_block(registry.get_slave(id)?, address)?;
        let value = block.read(address, 1)?[0];
        Ok(value)
    }

    /// Write a plain value to the register at `address`
    pub fn write_register(&self, id: SlaveId, address: u16, value: i64) -> Result<(), SimError> {
        self.write_value(id, address, &ValueWrite::int(value))
    }

    /// Write a typed value to the registers starting at `address`
    pub fn write_value(&self, id: SlaveId, address: u16, value: &ValueWrite) -> Result<(), SimError> {
        let registers = value.to_registers()?;
        let mut registry = self.registry.lock();
        let slave = registry.get_slave_mut(id)?;
        let label = find_register_block(slave, address)?.label().to_string();
        match slave.block_mut(&label) {
            Some(block) => block.write(address, &registers),
            None => Err(SimError::BlockNotFound(label)),
        }
    }
}

fn find_register_block(slave: &Slave, address: u16) -> Result<&RegisterBlock, SimError> {
    ADDRESSABLE
        .iter()
        .find_map(|t| slave.find_block(*t, address).ok())
        .ok_or(SimError::UnknownBlock {
            register_type: RegisterType::HoldingRegister,
            address,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SlaveRegistry;
    use crate::value::RegisterValue;

    fn config(name: &str, register_type: u8, start_address: u16, count: usize) -> RegisterConfig {
        RegisterConfig {
            register_section_name: name.to_string(),
            register_count: count,
            start_address,
            register_type,
        }
    }

    fn simulator() -> Simulator {
        let sim = Simulator::new(SharedRegistry::new(SlaveRegistry::new()));
        sim.add_slave(
            SlaveId::new(1),
            &[config("holding", 3, 40001, 10), config("input", 4, 30001, 10)],
        )
        .unwrap();
        sim
    }

    #[test]
    fn add_slave_reports_its_sections() {
        let sim = simulator();
        let info = sim.slave_info(SlaveId::new(1)).unwrap();
        assert_eq!(info.sections.len(), 2);
        assert_eq!(info.sections[0].name, "holding");
        assert_eq!(sim.slaves(), vec![info]);
    }

    #[test]
    fn duplicate_slave_is_a_conflict() {
        let sim = simulator();
        let err = sim.add_slave(SlaveId::new(1), &[]).unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn unknown_slave_and_address_are_bad_requests() {
        let sim = simulator();
        assert_eq!(sim.read_register(SlaveId::new(5), 40001).unwrap_err().http_status(), 400);
        assert_eq!(sim.read_register(SlaveId::new(1), 100).unwrap_err().http_status(), 400);
        assert_eq!(
            sim.write_register(SlaveId::new(1), 40001, 70000).unwrap_err(),
            SimError::InvalidValue(70000)
        );
    }

    #[test]
    fn writes_and_reads_by_address_in_either_register_block() {
        let sim = simulator();
        sim.write_register(SlaveId::new(1), 40001, 1234).unwrap();
        sim.write_register(SlaveId::new(1), 30005, 9).unwrap();
        assert_eq!(sim.read_register(SlaveId::new(1), 40001), Ok(1234));
        assert_eq!(sim.read_register(SlaveId::new(1), 30005), Ok(9));
    }

    #[test]
    fn typed_write_spans_registers() {
        let sim = simulator();
        let write = ValueWrite::formatted(RegisterValue::Float(1.0), ">f", 2);
        sim.write_value(SlaveId::new(1), 40002, &write).unwrap();
        assert_eq!(sim.read_register(SlaveId::new(1), 40002), Ok(0x3F80));
        assert_eq!(sim.read_register(SlaveId::new(1), 40003), Ok(0x0000));

        // does not fit at the end of the block
        assert!(matches!(
            sim.write_value(SlaveId::new(1), 40010, &write),
            Err(SimError::OutOfRange { .. })
        ));
    }

    #[test]
    fn dump_and_load_through_json() {
        let sim = simulator();
        sim.write_register(SlaveId::new(1), 40001, 77).unwrap();
        let json = sim.dump_json().unwrap();

        let other = Simulator::new(SharedRegistry::default());
        other.load_json(&json).unwrap();
        assert_eq!(other.read_register(SlaveId::new(1), 40001), Ok(77));
        assert_eq!(other.dump(), sim.dump());
    }

    #[test]
    fn unparseable_snapshot_empties_the_registry() {
        let sim = simulator();
        let json = r#"[{"slave_id":1,"registers":[{"name":"holding","register_type":300,
            "start_address":40001,"register_count":1,"register_data":[0]}]}]"#;
        assert!(matches!(
            sim.load_json(json),
            Err(SimError::MalformedSnapshot(_))
        ));
        assert!(sim.slaves().is_empty());

        let sim = simulator();
        assert!(sim.load_json(r#"[{"slave_id":1}]"#).is_err());
        assert!(sim.slaves().is_empty());
    }

    #[test]
    fn load_slave_requires_matching_id() {
        let sim = simulator();
        let record = sim.dump_slave(SlaveId::new(1)).unwrap();
        assert!(matches!(
            sim.load_slave(SlaveId::new(2), &record),
            Err(SimError::MalformedSnapshot(_))
        ));
        sim.load_slave(SlaveId::new(1), &record).unwrap();
    }

    #[test]
    fn register_config_accepts_the_short_name_key() {
        let config: RegisterConfig = serde_json::from_str(
            r#"{"register_name":"holding","register_count":5,"start_address":40001,"register_type":3}"#,
        )
        .unwrap();
        assert_eq!(config.register_section_name, "holding");
    }
}
