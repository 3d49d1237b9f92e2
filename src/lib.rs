//! 12VRGB lighting controller.
//!
//! The controller exposes two HID interfaces: a LampArray interface on usage
//! page 0x59 for lamp colors and a vendor interface on usage page 0xFF00 for
//! animations and resets. Each firmware revision lays its reports out
//! differently, see [`variant`] for the supported revisions.

pub mod animation;
pub mod color;
pub mod controller;
pub mod device;
pub mod encoder;
pub mod error;
pub mod report;
pub mod variant;

pub use crate::error::{Error, Result};
