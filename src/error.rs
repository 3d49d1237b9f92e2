//! Error types.

use thiserror::Error;

use crate::device::Role;
use crate::variant::Variant;

/// Errors returned by the report encoder and the device transport.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{role} device not found (vendor 0x{vendor_id:04x}, product 0x{product_id:04x})")]
    DeviceNotFound { role: Role, vendor_id: u16, product_id: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] hidapi::HidError),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("invalid argument: {0}")]
    InvalidCommandArgument(String),

    #[error("{operation} is not supported by protocol {variant}")]
    Unsupported { variant: Variant, operation: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
