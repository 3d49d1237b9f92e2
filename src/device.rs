//! HID device discovery and report transport.

use std::fmt::{self, Display, Formatter};

use hidapi::{DeviceInfo, HidApi, HidDevice};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// HID interface of the controller.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Role {
    /// LampArray interface for lamp updates and autonomous mode.
    Lighting,
    /// Vendor interface for animations and reset.
    VendorControl,
}

impl Role {
    /// HID usage page identifying the interface.
    pub fn usage_page(self) -> u16 {
        match self {
            Self::Lighting => 0x59,
            Self::VendorControl => 0xff00,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lighting => f.write_str("lighting"),
            Self::VendorControl => f.write_str("vendor control"),
        }
    }
}

/// Open device handle accepting raw reports.
///
/// The handle is closed when it is dropped.
pub trait ReportSink {
    fn write_output_report(&self, data: &[u8]) -> Result<()>;

    fn write_feature_report(&self, data: &[u8]) -> Result<()>;
}

/// Device discovery.
pub trait Locator {
    /// Open the first device interface matching the IDs and the role's usage page.
    fn open(&mut self, role: Role, vendor_id: u16, product_id: u16)
        -> Result<Box<dyn ReportSink>>;
}

/// Locator backed by the platform's HID enumeration.
pub struct HidLocator {
    api: HidApi,
}

impl HidLocator {
    pub fn new() -> Result<Self> {
        Ok(Self { api: HidApi::new()? })
    }
}

impl Locator for HidLocator {
    fn open(
        &mut self,
        role: Role,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Box<dyn ReportSink>> {
        self.api.refresh_devices()?;

        let info = select_device(self.api.device_list(), role, vendor_id, product_id)?;

        debug!("Opening {role} device {}", info.path_lossy());
        let device = info.open_device(&self.api)?;

        Ok(Box::new(HidSink(device)))
    }
}

/// Enumerated HID interface.
pub trait Candidate {
    fn vendor_id(&self) -> u16;

    fn product_id(&self) -> u16;

    fn usage_page(&self) -> u16;

    /// Printable platform path.
    fn path_lossy(&self) -> String;
}

impl Candidate for DeviceInfo {
    fn vendor_id(&self) -> u16 {
        DeviceInfo::vendor_id(self)
    }

    fn product_id(&self) -> u16 {
        DeviceInfo::product_id(self)
    }

    fn usage_page(&self) -> u16 {
        DeviceInfo::usage_page(self)
    }

    fn path_lossy(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }
}

/// Pick the first interface matching the IDs and the role's usage page.
pub fn select_device<'a, T, I>(
    candidates: I,
    role: Role,
    vendor_id: u16,
    product_id: u16,
) -> Result<&'a T>
where
    T: Candidate + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let usage_page = role.usage_page();
    let mut matches = candidates.into_iter().filter(|candidate| {
        candidate.vendor_id() == vendor_id
            && candidate.product_id() == product_id
            && candidate.usage_page() == usage_page
    });

    let selected = matches.next().ok_or(Error::DeviceNotFound { role, vendor_id, product_id })?;

    let skipped = matches.count();
    if skipped > 0 {
        warn!("Found {} {role} devices, using {}", skipped + 1, selected.path_lossy());
    }

    Ok(selected)
}

/// Opened hidapi device.
struct HidSink(HidDevice);

impl ReportSink for HidSink {
    fn write_output_report(&self, data: &[u8]) -> Result<()> {
        let written = self.0.write(data)?;
        if written < data.len() {
            return Err(Error::ShortWrite { written, expected: data.len() });
        }
        Ok(())
    }

    fn write_feature_report(&self, data: &[u8]) -> Result<()> {
        self.0.send_feature_report(data)?;
        Ok(())
    }
}
