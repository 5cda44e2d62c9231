use crate::constants::limits::ADDRESS_SPACE;
use crate::error::SimError;
use crate::types::RegisterType;

/// Fixed-size, typed array of 16-bit values addressed by absolute address
///
/// A block always holds exactly `count` values. Addresses passed to
/// [`RegisterBlock::read`] and [`RegisterBlock::write`] are absolute, i.e.
/// the first value lives at `start_address`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    label: String,
    register_type: RegisterType,
    start_address: u16,
    values: Vec<u16>,
}

impl RegisterBlock {
    pub(crate) fn new(
        label: &str,
        register_type: RegisterType,
        start_address: u16,
        count: usize,
    ) -> Result<Self, SimError> {
        if start_address as u64 + count as u64 > ADDRESS_SPACE as u64 {
            return Err(SimError::OutOfRange {
                start: start_address,
                count,
                address: start_address as u32,
                length: count,
            });
        }

        Ok(Self {
            label: label.to_string(),
            register_type,
            start_address,
            values: vec![0; count],
        })
    }

    /// Name of the block, unique within its slave
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Type of data stored in the block
    pub fn register_type(&self) -> RegisterType {
        self.register_type
    }

    /// Address of the first value
    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    /// Number of values in the block
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// All values of the block
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// One past the last address of the block
    pub(crate) fn end_address(&self) -> u32 {
        self.start_address as u32 + self.values.len() as u32
    }

    /// Returns true if `address` is one of the block's addresses
    pub fn contains(&self, address: u16) -> bool {
        self.start_address <= address && (address as u32) < self.end_address()
    }

    pub(crate) fn overlaps(&self, start: u16, count: usize) -> bool {
        let end = start as u64 + count as u64;
        (start as u64) < self.end_address() as u64 && (self.start_address as u64) < end
    }

    /// Read `length` values starting at `address`
    pub fn read(&self, address: u16, length: usize) -> Result<&[u16], SimError> {
        let range = self.offsets(address, length)?;
        Ok(&self.values[range])
    }

    /// Replace the values starting at `address`
    ///
    /// Every value is checked to fit in 16 bits (and to be 0 or 1 for bit
    /// blocks) before anything is written, so a failed write leaves the block
    /// untouched.
    pub fn write<V>(&mut self, address: u16, values: &[V]) -> Result<(), SimError>
    where
        V: Copy + Into<i64>,
    {
        let range = self.offsets(address, values.len())?;

        let converted = values
            .iter()
            .map(|v| self.check_value((*v).into()))
            .collect::<Result<Vec<u16>, SimError>>()?;

        self.values[range].copy_from_slice(&converted);
        Ok(())
    }

    fn check_value(&self, value: i64) -> Result<u16, SimError> {
        let max = if self.register_type.is_bit() {
            1
        } else {
            u16::MAX as i64
        };

        if !(0..=max).contains(&value) {
            return Err(SimError::InvalidValue(value));
        }

        Ok(value as u16)
    }

    fn offsets(&self, address: u16, length: usize) -> Result<std::ops::Range<usize>, SimError> {
        let end = address as u64 + length as u64;
        if address < self.start_address || end > self.end_address() as u64 {
            return Err(SimError::OutOfRange {
                start: self.start_address,
                count: self.values.len(),
                address: address as u32,
                length,
            });
        }

        let begin = (address - self.start_address) as usize;
        Ok(begin..begin + length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(start: u16, count: usize) -> RegisterBlock {
        RegisterBlock::new("holding", RegisterType::HoldingRegister, start, count).unwrap()
    }

    #[test]
    fn new_block_is_zeroed() {
        let block = holding(40001, 3);
        assert_eq!(block.values(), &[0, 0, 0]);
        assert_eq!(block.count(), 3);
    }

    #[test]
    fn reads_back_written_values_at_absolute_addresses() {
        let mut block = holding(40001, 3);
        block.write(40001, &[10u16, 20, 30]).unwrap();
        assert_eq!(block.read(40002, 1).unwrap(), &[20]);
        assert_eq!(block.read(40001, 3).unwrap(), &[10, 20, 30]);
    }

    #[test]
    fn rejects_reads_before_the_start_address() {
        let block = holding(100, 10);
        assert!(matches!(
            block.read(99, 1),
            Err(SimError::OutOfRange { address: 99, .. })
        ));
    }

    #[test]
    fn rejects_reads_past_the_end() {
        let block = holding(100, 10);
        assert!(block.read(109, 1).is_ok());
        assert!(matches!(
            block.read(109, 2),
            Err(SimError::OutOfRange { length: 2, .. })
        ));
    }

    #[test]
    fn rejects_writes_outside_the_block_for_every_type() {
        for register_type in [
            RegisterType::Coil,
            RegisterType::DiscreteInput,
            RegisterType::HoldingRegister,
            RegisterType::InputRegister,
        ] {
            let mut block = RegisterBlock::new("x", register_type, 10, 2).unwrap();
            assert!(block.write(9, &[0u16]).is_err());
            assert!(block.write(11, &[0u16, 0]).is_err());
        }
    }

    #[test]
    fn values_must_fit_in_sixteen_bits() {
        let mut block = holding(0, 2);
        assert_eq!(
            block.write(0, &[1i64, 70000]),
            Err(SimError::InvalidValue(70000))
        );
        assert_eq!(block.write(0, &[-1i64]), Err(SimError::InvalidValue(-1)));
        // nothing was written by the failed attempts
        assert_eq!(block.values(), &[0, 0]);
    }

    #[test]
    fn bit_blocks_only_store_zero_or_one() {
        let mut block = RegisterBlock::new("coils", RegisterType::Coil, 0, 4).unwrap();
        block.write(0, &[1u16, 0, 1, 1]).unwrap();
        assert_eq!(block.write(0, &[2u16]), Err(SimError::InvalidValue(2)));
    }

    #[test]
    fn block_cannot_extend_past_the_address_space() {
        assert!(RegisterBlock::new("x", RegisterType::HoldingRegister, 0xFFFF, 1).is_ok());
        assert!(RegisterBlock::new("x", RegisterType::HoldingRegister, 0xFFFF, 2).is_err());
    }

    #[test]
    fn detects_overlapping_ranges() {
        let block = holding(10, 5);
        assert!(block.overlaps(14, 1));
        assert!(block.overlaps(5, 6));
        assert!(!block.overlaps(15, 3));
        assert!(!block.overlaps(5, 5));
    }
}
