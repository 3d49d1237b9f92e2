//! Lighting controller operations.
//!
//! Each operation encodes its report first, then opens the matching device
//! interface, writes a single report and closes the device again.

use tracing::{debug, info};

use crate::animation::{Animation, AnimationOptions};
use crate::color::Rgb;
use crate::device::{Locator, Role};
use crate::encoder::{self, ResetFlags};
use crate::error::Result;
use crate::report::Report;
use crate::variant::{ReportKind, Variant};

/// 12VRGB controller.
pub struct Controller<L> {
    locator: L,
    variant: Variant,
    vendor_id: u16,
    product_id: u16,
}

impl<L: Locator> Controller<L> {
    pub fn new(locator: L, variant: Variant, vendor_id: u16, product_id: u16) -> Self {
        Self { locator, variant, vendor_id, product_id }
    }

    /// Set the color of one or more lamps.
    pub fn update_lamps(&mut self, lamps: &[(u8, Rgb)]) -> Result<()> {
        let report = encoder::encode_lamp_multi_update(self.variant, lamps)?;

        for (lamp_id, color) in lamps {
            info!("Setting lamp {lamp_id} to {color}");
        }

        self.send(Role::Lighting, report)
    }

    /// Set the color of all lamps in `start..=end`, turning them off without a color.
    pub fn update_range(&mut self, start: u8, end: u8, color: Option<Rgb>) -> Result<()> {
        let report = encoder::encode_lamp_range_update(self.variant, start, end, color)?;

        match color {
            Some(color) => info!("Setting lamps {start}..={end} to {color}"),
            None => info!("Turning off lamps {start}..={end}"),
        }

        self.send(Role::Lighting, report)
    }

    /// Turn off every lamp.
    pub fn off(&mut self) -> Result<()> {
        let protocol = self.variant.protocol();
        let last = protocol.lamp_count - 1;

        if protocol.lamp_range_update.is_some() {
            return self.update_range(0, last, None);
        }

        // Without range updates, every lamp fits into a single multi update.
        let lamps: Vec<_> = (0..=last).map(|lamp_id| (lamp_id, Rgb::BLACK)).collect();
        self.update_lamps(&lamps)
    }

    pub fn set_autonomous_mode(&mut self, enabled: bool) -> Result<()> {
        let report = encoder::encode_autonomous_mode(self.variant, enabled);

        info!("{} autonomous mode", if enabled { "Enabling" } else { "Disabling" });

        self.send(Role::Lighting, report)
    }

    /// Play an animation on a lamp, or store it as the lamp's default.
    pub fn set_animation(
        &mut self,
        options: AnimationOptions,
        animation: &Animation,
    ) -> Result<()> {
        let report = encoder::encode_animation(self.variant, options, animation)?;

        let target = if options.persist { "default" } else { "current" };
        info!("Setting {target} animation of lamp {} to {}", options.lamp_id, animation.name());

        self.send(Role::VendorControl, report)
    }

    pub fn reset(&mut self, flags: ResetFlags) -> Result<()> {
        let report = encoder::encode_reset(self.variant, flags);

        info!(bootsel = flags.bootsel, clear_flash = flags.clear_flash, "Resetting controller");

        self.send(Role::VendorControl, report)
    }

    /// Reboot into the bootloader.
    pub fn bootsel(&mut self) -> Result<()> {
        let report = encoder::encode_bootsel(self.variant);

        info!("Rebooting into bootloader");

        self.send(Role::VendorControl, report)
    }

    /// Write a report to a freshly opened device interface.
    fn send(&mut self, role: Role, report: Report) -> Result<()> {
        let device = self.locator.open(role, self.vendor_id, self.product_id)?;

        debug!("Writing {} report: {:02x?}", report.kind(), report.as_bytes());

        match report.kind() {
            ReportKind::Output => device.write_output_report(report.as_bytes()),
            ReportKind::Feature => device.write_feature_report(report.as_bytes()),
        }
    }
}
