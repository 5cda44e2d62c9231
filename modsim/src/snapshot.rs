//! Capture and restore of the complete register state
//!
//! A snapshot is a list of [`SlaveRecord`], one per slave, serialized as JSON:
//!
//! ```json
//! [ { "slave_id": 1,
//!     "registers": [
//!       { "name": "holding", "register_type": 3, "start_address": 40001,
//!         "register_count": 2, "register_data": [0, 1234] } ] } ]
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::sections;
use crate::error::SimError;
use crate::sim::{Section, Slave, SlaveRegistry};
use crate::types::{RegisterType, SlaveId};

/// Captured state of one slave
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveRecord {
    /// id of the slave
    pub slave_id: SlaveId,
    /// every declared section of the slave
    pub registers: Vec<SectionRecord>,
}

/// Captured state of one declared section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// label of the section
    pub name: String,
    /// numeric register type tag
    pub register_type: u8,
    /// address of the first value
    pub start_address: u16,
    /// number of values
    pub register_count: usize,
    /// the values, `register_count` of them
    pub register_data: Vec<i64>,
}

/// Converts between a [`SlaveRegistry`] and snapshot records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotCodec {
    well_known: Vec<String>,
}

impl Default for SnapshotCodec {
    fn default() -> Self {
        Self {
            well_known: vec![sections::HOLDING.to_string(), sections::INPUT.to_string()],
        }
    }
}

impl SnapshotCodec {
    /// Codec emitting the sections named in `labels` first, in that order
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            well_known: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Capture every slave in registry order
    pub fn dump(&self, registry: &SlaveRegistry) -> Vec<SlaveRecord> {
        registry.slaves().map(|s| self.record(s)).collect()
    }

    /// Capture a single slave
    pub fn dump_slave(&self, registry: &SlaveRegistry, id: SlaveId) -> Result<SlaveRecord, SimError> {
        Ok(self.record(registry.get_slave(id)?))
    }

    /// Replace the whole registry with the contents of `records`
    ///
    /// On failure the registry is left empty.
    pub fn load(&self, registry: &mut SlaveRegistry, records: &[SlaveRecord]) -> Result<(), SimError> {
        registry.clear();
        for record in records {
            if let Err(err) = apply_record(registry, record) {
                registry.clear();
                return Err(err);
            }
        }
        tracing::info!("loaded snapshot of {} slave(s)", records.len());
        Ok(())
    }

    /// Replace one slave with the contents of `record`, leaving the others alone
    ///
    /// On failure the slave is absent from the registry.
    pub fn load_slave(&self, registry: &mut SlaveRegistry, record: &SlaveRecord) -> Result<(), SimError> {
        let _ = registry.remove_slave(record.slave_id);
        if let Err(err) = apply_record(registry, record) {
            let _ = registry.remove_slave(record.slave_id);
            return Err(err);
        }
        Ok(())
    }

    fn record(&self, slave: &Slave) -> SlaveRecord {
        let declared = slave.sections();

        let well_known = self
            .well_known
            .iter()
            .filter_map(|label| declared.iter().find(|s| &s.label == label));
        let others = declared
            .iter()
            .filter(|s| !self.well_known.contains(&s.label));

        SlaveRecord {
            slave_id: slave.id(),
            registers: well_known
                .chain(others)
                .map(|section| section_record(slave, section))
                .collect(),
        }
    }
}

fn section_record(slave: &Slave, section: &Section) -> SectionRecord {
    let register_data = slave
        .block(&section.label)
        .map(|b| b.values().iter().map(|v| *v as i64).collect())
        .unwrap_or_default();

    SectionRecord {
        name: section.label.clone(),
        register_type: section.register_type.into(),
        start_address: section.start_address,
        register_count: section.count,
        register_data,
    }
}

fn apply_record(registry: &mut SlaveRegistry, record: &SlaveRecord) -> Result<(), SimError> {
    let slave = registry.add_slave(record.slave_id, &[])?;
    for section in &record.registers {
        apply_section(slave, section)?;
    }
    Ok(())
}

fn apply_section(slave: &mut Slave, section: &SectionRecord) -> Result<(), SimError> {
    let register_type = RegisterType::try_from(section.register_type)?;

    if section.register_data.len() != section.register_count {
        return Err(SimError::MalformedSnapshot(format!(
            "section '{}' declares {} registers but holds {} values",
            section.name,
            section.register_count,
            section.register_data.len()
        )));
    }

    if slave.sections().iter().any(|s| s.label == section.name) {
        slave.remove_block(&section.name)?;
    }

    slave.add_block(
        &section.name,
        register_type,
        section.start_address,
        section.register_count,
    )?;

    if let Some(block) = slave.block_mut(&section.name) {
        block.write(section.start_address, &section.register_data)?;
    }

    Ok(())
}

/// Serialize records to a JSON document
pub fn to_json(records: &[SlaveRecord]) -> Result<String, SimError> {
    Ok(serde_json::to_string(records)?)
}

/// Parse a JSON document into records
pub fn from_json(json: &str) -> Result<Vec<SlaveRecord>, SimError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> SlaveRegistry {
        let mut registry = SlaveRegistry::new();
        for id in [1, 2] {
            let slave = registry
                .add_slave(
                    SlaveId::new(id),
                    &[
                        Section::new("extra", RegisterType::Coil, 0, 4),
                        Section::new("input", RegisterType::InputRegister, 30001, 0),
                        Section::new("holding", RegisterType::HoldingRegister, 40001, 3),
                    ],
                )
                .unwrap();
            slave
                .block_mut("holding")
                .unwrap()
                .write(40001, &[id as u16, 1234, 0xFFFF])
                .unwrap();
            slave.block_mut("extra").unwrap().write(1, &[1u16]).unwrap();
        }
        registry
    }

    #[test]
    fn dump_orders_well_known_sections_first() {
        let records = SnapshotCodec::default().dump(&populated());
        let names: Vec<&str> = records[0].registers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["holding", "input", "extra"]);
    }

    #[test]
    fn zero_count_sections_are_dumped_with_empty_data() {
        let records = SnapshotCodec::default().dump(&populated());
        let input = &records[0].registers[1];
        assert_eq!(input.register_count, 0);
        assert!(input.register_data.is_empty());
        assert_eq!(input.register_type, 4);
    }

    #[test]
    fn empty_registry_dumps_to_empty_document() {
        let codec = SnapshotCodec::default();
        assert!(codec.dump(&SlaveRegistry::new()).is_empty());
        assert_eq!(to_json(&codec.dump(&SlaveRegistry::new())).unwrap(), "[]");
    }

    #[test]
    fn load_of_dump_reproduces_the_registry() {
        let codec = SnapshotCodec::default();
        let original = populated();
        let json = to_json(&codec.dump(&original)).unwrap();

        let mut restored = SlaveRegistry::new();
        restored.add_slave(SlaveId::new(99), &[]).unwrap();
        codec.load(&mut restored, &from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.list_slave_ids(), original.list_slave_ids());
        assert_eq!(codec.dump(&restored), codec.dump(&original));
    }

    #[test]
    fn holding_block_at_40001_survives_dump_and_load() {
        let codec = SnapshotCodec::default();
        let mut original = SlaveRegistry::new();
        original
            .add_slave(
                SlaveId::new(1),
                &[Section::new("holding", RegisterType::HoldingRegister, 40001, 3)],
            )
            .unwrap()
            .block_mut("holding")
            .unwrap()
            .write(40001, &[10u16, 20, 30])
            .unwrap();

        let records = codec.dump(&original);
        let holding = &records[0].registers[0];
        assert_eq!(holding.register_count, 3);
        assert_eq!(holding.start_address, 40001);
        assert_eq!(holding.register_data, vec![10, 20, 30]);

        let mut restored = SlaveRegistry::new();
        codec
            .load(&mut restored, &from_json(&to_json(&records).unwrap()).unwrap())
            .unwrap();
        let block = restored
            .get_slave(SlaveId::new(1))
            .unwrap()
            .block("holding")
            .unwrap();
        assert_eq!(block.read(40002, 1), Ok(&[20u16][..]));
    }

    #[test]
    fn failed_load_leaves_registry_empty() {
        let codec = SnapshotCodec::default();
        let mut records = codec.dump(&populated());
        records[1].registers[0].register_data.pop();

        let mut registry = populated();
        assert!(matches!(
            codec.load(&mut registry, &records),
            Err(SimError::MalformedSnapshot(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn load_rejects_unknown_types_duplicates_and_bad_values() {
        let codec = SnapshotCodec::default();
        let good = codec.dump(&populated());
        let mut registry = SlaveRegistry::new();

        let mut unknown_type = good.clone();
        unknown_type[0].registers[0].register_type = 7;
        assert_eq!(
            codec.load(&mut registry, &unknown_type),
            Err(SimError::UnknownRegisterType(7))
        );

        let duplicate = vec![good[0].clone(), good[0].clone()];
        assert_eq!(
            codec.load(&mut registry, &duplicate),
            Err(SimError::DuplicateSlave(SlaveId::new(1)))
        );

        let mut bad_value = good;
        bad_value[0].registers[0].register_data[0] = 70000;
        assert_eq!(
            codec.load(&mut registry, &bad_value),
            Err(SimError::InvalidValue(70000))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn load_slave_replaces_only_that_slave() {
        let codec = SnapshotCodec::default();
        let mut registry = populated();
        let mut record = codec.dump_slave(&registry, SlaveId::new(2)).unwrap();
        record.registers[0].register_data = vec![7, 8, 9];

        codec.load_slave(&mut registry, &record).unwrap();

        assert_eq!(registry.len(), 2);
        let holding = |id| {
            registry
                .get_slave(SlaveId::new(id))
                .unwrap()
                .block("holding")
                .unwrap()
                .values()
                .to_vec()
        };
        assert_eq!(holding(2), vec![7, 8, 9]);
        assert_eq!(holding(1), vec![1, 1234, 0xFFFF]);
    }

    #[test]
    fn parses_the_document_format() {
        let json = r#"[{"slave_id":1,"registers":[{"name":"holding","register_type":3,
            "start_address":40001,"register_count":2,"register_data":[0,1234]}]}]"#;
        let records = from_json(json).unwrap();
        assert_eq!(records[0].slave_id, SlaveId::new(1));
        assert_eq!(records[0].registers[0].register_data, vec![0, 1234]);
        assert!(matches!(
            from_json("{\"slave_id\": 1}"),
            Err(SimError::MalformedSnapshot(_))
        ));
    }
}
