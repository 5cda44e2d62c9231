//! Startup configuration of a simulator instance

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::constants::sections;
use crate::decode::DecodeLevel;
use crate::error::SimError;
use crate::serial::timing::TimeoutPolicy;
use crate::serial::SerialSettings;
use crate::shutdown::ServerHandle;
use crate::sim::{Section, SharedRegistry, SlaveRegistry};
use crate::types::{RegisterType, SlaveId};

/// Placement of a generated register section
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// address of the first register
    pub start_address: u16,
    /// number of registers, zero declares the section without storage
    pub register_count: usize,
}

/// Link the simulated slaves are served on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Modbus TCP listener
    Tcp {
        /// address to bind
        addr: SocketAddr,
    },
    /// Modbus RTU over a serial port
    Rtu {
        /// path of the serial device
        path: String,
        /// line settings
        #[serde(flatten)]
        settings: SerialSettings,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Rtu {
            path: "/dev/ttyS0".to_string(),
            settings: SerialSettings::default(),
        }
    }
}

/// Errors that prevent a configured server from starting
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The TCP listener could not be bound
    #[error("unable to bind listener: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is invalid
    #[error(transparent)]
    Config(#[from] SimError),
    /// RTU was requested from a build without serial support
    #[error("serial support is not enabled in this build")]
    SerialDisabled,
}

/// Slaves to create at startup and the link to serve them on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// number of slaves to create
    pub slave_count: u16,
    /// id of the first slave, the others follow consecutively
    pub slave_start_id: u8,
    /// holding register section of each slave
    pub holding: SectionConfig,
    /// input register section of each slave
    pub input: SectionConfig,
    /// adjustment of the computed RTU timeouts
    pub timeout_policy: TimeoutPolicy,
    /// maximum number of concurrent TCP sessions
    pub max_sessions: usize,
    /// link to serve the slaves on
    pub transport: TransportConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            slave_count: 0,
            slave_start_id: 1,
            holding: SectionConfig {
                start_address: sections::HOLDING_START_ADDRESS,
                register_count: sections::DEFAULT_REGISTER_COUNT as usize,
            },
            input: SectionConfig {
                start_address: sections::INPUT_START_ADDRESS,
                register_count: sections::DEFAULT_REGISTER_COUNT as usize,
            },
            timeout_policy: TimeoutPolicy::default(),
            max_sessions: 16,
            transport: TransportConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Sections every generated slave declares
    pub fn sections(&self) -> [Section; 2] {
        [
            Section::new(
                sections::HOLDING,
                RegisterType::HoldingRegister,
                self.holding.start_address,
                self.holding.register_count,
            ),
            Section::new(
                sections::INPUT,
                RegisterType::InputRegister,
                self.input.start_address,
                self.input.register_count,
            ),
        ]
    }

    /// Create `slave_count` slaves with consecutive ids starting at `slave_start_id`
    pub fn build_registry(&self) -> Result<SlaveRegistry, SimError> {
        let sections = self.sections();
        let mut registry = SlaveRegistry::new();
        for offset in 0..self.slave_count {
            let id = u16::from(self.slave_start_id) + offset;
            let id = u8::try_from(id).map_err(|_| SimError::InvalidSlaveId(id))?;
            registry.add_slave(SlaveId::new(id), &sections)?;
        }
        Ok(registry)
    }

    /// Start serving `registry` on the configured link
    pub async fn spawn(
        &self,
        registry: SharedRegistry,
        decode: DecodeLevel,
    ) -> Result<ServerHandle, SpawnError> {
        match &self.transport {
            TransportConfig::Tcp { addr } => Ok(crate::server::spawn_tcp_server_task(
                self.max_sessions,
                *addr,
                registry,
                decode,
            )
            .await?),
            #[cfg(feature = "serial")]
            TransportConfig::Rtu { path, settings } => Ok(crate::server::spawn_rtu_server_task(
                path,
                *settings,
                self.timeout_policy,
                crate::retry::default_retry_strategy(),
                registry,
                decode,
            )?),
            #[cfg(not(feature = "serial"))]
            TransportConfig::Rtu { .. } => Err(SpawnError::SerialDisabled),
        }
    }
}
