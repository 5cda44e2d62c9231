//! In-memory model of the simulated slaves and their register blocks

pub(crate) mod block;
pub(crate) mod registry;
pub(crate) mod slave;

pub use block::RegisterBlock;
pub use registry::{SharedRegistry, SlaveRegistry};
pub use slave::{Section, Slave};
