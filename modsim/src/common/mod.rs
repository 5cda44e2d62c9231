pub(crate) mod frame;
pub(crate) mod function;
pub(crate) mod pdu;
pub(crate) mod phys;
