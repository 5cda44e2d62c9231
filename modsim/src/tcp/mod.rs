//! Modbus TCP framing and listener

pub(crate) mod frame;
pub(crate) mod server;

pub use frame::MbapCodec;
