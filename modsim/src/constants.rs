/// Values of a coil in a write single coil request
pub mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub const OFF: u16 = 0x0000;
}

/// Quantity limits of the supported requests
pub mod limits {
    /// Maximum count allowed in a read coils/discrete inputs request
    pub const MAX_READ_COILS_COUNT: u16 = 0x07D0;
    /// Maximum count allowed in a read holding/input registers request
    pub const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
    /// Maximum count allowed in a `write multiple coils` request
    pub const MAX_WRITE_COILS_COUNT: u16 = 0x07B0;
    /// Maximum count allowed in a `write multiple registers` request
    pub const MAX_WRITE_REGISTERS_COUNT: u16 = 0x007B;
    /// Size of the Modbus address space, one past the last valid address
    pub const ADDRESS_SPACE: u32 = 0x1_0000;
}

/// Exception codes returned by the simulator
pub mod exceptions {
    /// The function code is not supported
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    /// No block contains the requested address
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    /// The request range or a value is invalid
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    /// Any other failure while executing the request
    pub const SERVER_DEVICE_FAILURE: u8 = 0x04;
}

/// Section names and start addresses used by the reference deployment
pub mod sections {
    /// Name of the holding register section
    pub const HOLDING: &str = "holding";
    /// Name of the input register section
    pub const INPUT: &str = "input";
    /// Conventional (1-based) start address of holding registers
    pub const HOLDING_START_ADDRESS: u16 = 40001;
    /// Conventional (1-based) start address of input registers
    pub const INPUT_START_ADDRESS: u16 = 30001;
    /// Default number of registers in each generated section
    pub const DEFAULT_REGISTER_COUNT: u16 = 9999;
}
