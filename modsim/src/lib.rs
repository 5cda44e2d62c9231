//! Simulated [Modbus](http://modbus.org/) slave devices built on
//! [Tokio](https://docs.rs/tokio).
//!
//! A [`SlaveRegistry`](sim::SlaveRegistry) holds any number of slaves, each with
//! named blocks of coils, discrete inputs, holding registers or input registers.
//! The registry is served to a Modbus master over TCP or RTU and can be captured
//! to, and restored from, a JSON snapshot for test fixtures.
//!
//! # Supported modes
//!
//! * TCP server
//! * RTU server over a serial port (feature `serial`, enabled by default)
//!
//! # Supported functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//!
//! Requests addressed to unit id 0 are broadcast to every slave and never
//! answered. Requests for a unit id without a slave are not answered either.
//!
//! # Example
//!
//! ```no_run
//! use modsim::config::{SimulatorConfig, TransportConfig};
//! use modsim::sim::SharedRegistry;
//! use modsim::DecodeLevel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimulatorConfig {
//!         slave_count: 2,
//!         transport: TransportConfig::Tcp {
//!             addr: "127.0.0.1:5005".parse()?,
//!         },
//!         ..Default::default()
//!     };
//!
//!     let registry = SharedRegistry::new(config.build_registry()?);
//!     let _server = config.spawn(registry, DecodeLevel::default()).await?;
//!
//!     // the server runs until the handle is dropped
//!     std::future::pending::<()>().await;
//!     Ok(())
//! }
//! ```

/// Protocol constants and reference section layout
pub mod constants;
/// Startup configuration
pub mod config;
/// Management operations for use by an HTTP or CLI layer
pub mod management;
/// Modbus RTU serial settings, framing and timing
pub mod serial;
/// Request dispatch and server spawning
pub mod server;
/// In-memory slave model
pub mod sim;
/// JSON capture and restore of the registry
pub mod snapshot;
/// Typed values spanning several registers
pub mod value;

mod common;
mod decode;
mod error;
mod exception;
mod retry;
mod shutdown;
mod tcp;
mod types;

pub use crate::common::frame::{Codec, FrameHeader, TxId};
pub use crate::common::function::FunctionCode;
pub use crate::common::phys::{RtuTransport, StreamTransport, Transport};
pub use crate::decode::*;
pub use crate::error::*;
pub use crate::exception::*;
pub use crate::retry::*;
pub use crate::shutdown::*;
pub use crate::tcp::MbapCodec;
pub use crate::types::*;
