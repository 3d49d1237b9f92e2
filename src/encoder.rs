//! Report encoder.
//!
//! Maps a protocol variant and a command to the exact bytes the firmware
//! expects. Nothing in here talks to a device, every function is a pure
//! transformation from arguments to a [`Report`].

use crate::animation::{Animation, AnimationOptions, Breathe, Fade, Millis, MAX_FADE_COLORS};
use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::report::{Report, ReportWriter};
use crate::variant::{
    AnimationLayout, AnimationReports, FadeParam, Protocol, Route, Variant, CONTROL_REPORT_LEN,
    LAMP_RANGE_UPDATE_LEN,
};

/// Intensity channel of a lit lamp.
const LAMP_INTENSITY_ON: u8 = 0x01;

/// LampUpdateFlags bit asking the device to apply all pending lamp updates.
const LAMP_UPDATE_COMPLETE: u16 = 0x0001;

/// Vendor reset flags.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct ResetFlags {
    /// Reboot into the USB mass storage bootloader.
    pub bootsel: bool,

    /// Erase all animations saved in flash.
    pub clear_flash: bool,
}

impl ResetFlags {
    pub fn bits(self) -> u8 {
        let mut flags = 0;
        if self.bootsel {
            flags |= 1 << 0;
        }
        if self.clear_flash {
            flags |= 1 << 1;
        }
        flags
    }
}

/// Reset behavior.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ResetMode {
    Normal,
    Bootsel,
    ClearFlash,
}

impl From<ResetMode> for ResetFlags {
    fn from(mode: ResetMode) -> Self {
        match mode {
            ResetMode::Normal => ResetFlags::default(),
            ResetMode::Bootsel => ResetFlags { bootsel: true, clear_flash: false },
            ResetMode::ClearFlash => ResetFlags { bootsel: false, clear_flash: true },
        }
    }
}

/// Set a single lamp to `color`.
pub fn encode_lamp_update(variant: Variant, lamp_id: u8, color: Rgb) -> Result<Report> {
    encode_lamp_multi_update(variant, &[(lamp_id, color)])
}

/// Set up to one lamp per lamp slot in a single LampMultiUpdate report.
pub fn encode_lamp_multi_update(variant: Variant, lamps: &[(u8, Rgb)]) -> Result<Report> {
    let protocol = variant.protocol();

    if lamps.len() > protocol.lamp_slots {
        return Err(Error::InvalidCommandArgument(format!(
            "at most {} lamps can be updated at once, got {}",
            protocol.lamp_slots,
            lamps.len()
        )));
    }
    for &(lamp_id, _) in lamps {
        check_lamp_id(protocol, lamp_id)?;
    }

    let unused_slots = protocol.lamp_slots - lamps.len();
    let mut writer = ReportWriter::new(protocol.lamp_update, protocol.lamp_update_len());

    // Lamp count.
    writer.put_u8(lamps.len() as u8);

    // Lamp ID slots.
    for &(lamp_id, _) in lamps {
        writer.put_u8(lamp_id);
    }
    writer.zeros(unused_slots);

    // RGBI slots.
    for &(_, color) in lamps {
        writer.put_rgb(color).put_u8(LAMP_INTENSITY_ON);
    }
    writer.zeros(4 * unused_slots);

    // Update flags.
    writer.put_u16_le(LAMP_UPDATE_COMPLETE);

    Ok(writer.finish())
}

/// Set every lamp in `start..=end` to `color`, or turn them off without a color.
pub fn encode_lamp_range_update(
    variant: Variant,
    start: u8,
    end: u8,
    color: Option<Rgb>,
) -> Result<Report> {
    let protocol = variant.protocol();
    let route = protocol
        .lamp_range_update
        .ok_or(Error::Unsupported { variant, operation: "lamp range update" })?;

    check_lamp_id(protocol, start)?;
    check_lamp_id(protocol, end)?;
    if start > end {
        return Err(Error::InvalidCommandArgument(format!(
            "lamp range start {start} is after end {end}"
        )));
    }

    let mut writer = ReportWriter::new(route, LAMP_RANGE_UPDATE_LEN);
    writer.put_u8(start).put_u8(end);

    match color {
        Some(color) => writer.put_rgb(color).put_u8(LAMP_INTENSITY_ON),
        None => writer.zeros(4),
    };

    writer.put_u16_le(LAMP_UPDATE_COMPLETE);

    Ok(writer.finish())
}

/// Enable or disable autonomous mode.
///
/// While autonomous, the device plays its built-in animations and ignores
/// lamp updates from the host.
pub fn encode_autonomous_mode(variant: Variant, enabled: bool) -> Report {
    let mut writer = ReportWriter::new(variant.protocol().autonomous, CONTROL_REPORT_LEN);
    writer.put_u8(enabled as u8);
    writer.finish()
}

/// Reset the controller.
pub fn encode_reset(variant: Variant, flags: impl Into<ResetFlags>) -> Report {
    let mut writer = ReportWriter::new(variant.protocol().reset, CONTROL_REPORT_LEN);
    writer.put_u8(flags.into().bits());
    writer.finish()
}

/// Reboot into the bootloader.
pub fn encode_bootsel(variant: Variant) -> Report {
    encode_reset(variant, ResetMode::Bootsel)
}

/// Change the animation of a lamp, or save it as the lamp's default.
pub fn encode_animation(
    variant: Variant,
    options: AnimationOptions,
    animation: &Animation,
) -> Result<Report> {
    let protocol = variant.protocol();
    let reports =
        protocol.animation.ok_or(Error::Unsupported { variant, operation: "animations" })?;

    check_lamp_id(protocol, options.lamp_id)?;

    let route = if options.persist {
        Route::feature(reports.feature_id)
    } else {
        Route::output(reports.output_id)
    };

    let mut writer = ReportWriter::new(route, reports.report_len());
    writer.put_u8(options.lamp_id).put_u8(animation.tag());

    match reports.layout {
        AnimationLayout::Compact => write_compact(&mut writer, &reports, animation)?,
        AnimationLayout::Extended { max_params, fade_params } => {
            write_extended(&mut writer, &reports, max_params, fade_params, animation)?
        },
    }

    Ok(writer.finish())
}

/// Compact layout, 16-bit timings packed right after the colors.
fn write_compact(
    writer: &mut ReportWriter,
    reports: &AnimationReports,
    animation: &Animation,
) -> Result<()> {
    match animation {
        Animation::None => (),
        Animation::Breathe(breathe) => {
            let timings = breathe_timings(breathe, compact_time)?;

            writer.put_rgb(breathe.on_color).put_rgb(breathe.off_color);
            for time in timings {
                writer.put_u16_le(time);
            }
        },
        Animation::Fade(fade) => {
            check_fade_colors(reports, fade)?;
            let fade_time = compact_time(fade.fade_time)?;
            let hold_time = compact_time(fade.hold_time)?;

            writer.put_u8(fade.colors.len() as u8);
            for &color in &fade.colors {
                writer.put_rgb(color);
            }
            writer.zeros(3 * (reports.max_colors - fade.colors.len()));
            writer.put_u16_le(fade_time).put_u16_le(hold_time);
        },
    }

    Ok(())
}

/// Extended layout, a block of 32-bit parameter slots followed by color slots.
fn write_extended(
    writer: &mut ReportWriter,
    reports: &AnimationReports,
    max_params: usize,
    fade_params: &[FadeParam],
    animation: &Animation,
) -> Result<()> {
    let colors_start = writer.position() + 4 * max_params;

    match animation {
        Animation::None => (),
        Animation::Breathe(breathe) => {
            let timings = breathe_timings(breathe, extended_time)?;

            for time in timings {
                writer.put_i32_le(time);
            }
            writer.pad_to(colors_start);
            writer.put_rgb(breathe.on_color).put_rgb(breathe.off_color);
        },
        Animation::Fade(fade) => {
            check_fade_colors(reports, fade)?;

            let mut params = Vec::with_capacity(fade_params.len());
            for param in fade_params {
                params.push(match param {
                    FadeParam::ColorCount => fade.colors.len() as i32,
                    FadeParam::FadeTime => extended_time(fade.fade_time)?,
                    FadeParam::HoldTime => extended_time(fade.hold_time)?,
                });
            }

            for param in params {
                writer.put_i32_le(param);
            }
            writer.pad_to(colors_start);
            for &color in &fade.colors {
                writer.put_rgb(color);
            }
        },
    }

    Ok(())
}

/// Breathe timings in wire order.
fn breathe_timings<T>(breathe: &Breathe, convert: fn(Millis) -> Result<T>) -> Result<[T; 4]> {
    Ok([
        convert(breathe.on_fade)?,
        convert(breathe.on_time)?,
        convert(breathe.off_fade)?,
        convert(breathe.off_time)?,
    ])
}

fn compact_time(time: Millis) -> Result<u16> {
    u16::try_from(time.0).map_err(|_| {
        Error::InvalidCommandArgument(format!("{time} exceeds the {}ms limit", u16::MAX))
    })
}

fn extended_time(time: Millis) -> Result<i32> {
    i32::try_from(time.0).map_err(|_| {
        Error::InvalidCommandArgument(format!("{time} exceeds the {}ms limit", i32::MAX))
    })
}

fn check_fade_colors(reports: &AnimationReports, fade: &Fade) -> Result<()> {
    let max_colors = reports.max_colors.min(MAX_FADE_COLORS);
    if fade.colors.len() > max_colors {
        return Err(Error::InvalidCommandArgument(format!(
            "the animation can use at most {max_colors} colors, got {}",
            fade.colors.len()
        )));
    }
    Ok(())
}

fn check_lamp_id(protocol: &Protocol, lamp_id: u8) -> Result<()> {
    if lamp_id < protocol.lamp_count {
        Ok(())
    } else {
        Err(Error::InvalidCommandArgument(format!(
            "lamp {lamp_id} does not exist, the device has {} lamps",
            protocol.lamp_count
        )))
    }
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;

    use super::*;
    use crate::variant::ReportKind;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn animated_variants() -> impl Iterator<Item = Variant> {
        Variant::value_variants().iter().copied().filter(|v| v.protocol().animation.is_some())
    }

    fn rainbow(count: usize) -> Vec<Rgb> {
        (0..count).map(|i| Rgb::new(0x10 + i as u8, 0x20 + i as u8, 0x30 + i as u8)).collect()
    }

    #[test]
    fn lamp_update_two_slot_layout() {
        let report = encode_lamp_update(Variant::Rev1, 0, Rgb::new(0x11, 0x22, 0x33)).unwrap();

        assert_eq!(report.kind(), ReportKind::Output);
        assert_eq!(report.as_bytes(), &[
            0x04, // report id
            0x01, // lamp count
            0x00, // id
            0x00, // empty id slot
            0x11, 0x22, 0x33, 0x01, // rgbi
            0x00, 0x00, 0x00, 0x00, // empty rgbi slot
            0x01, 0x00, // update flags
        ]);
    }

    #[test]
    fn lamp_update_four_slot_layout() {
        let report = encode_lamp_update(Variant::Rev4, 3, Rgb::new(1, 2, 3)).unwrap();

        let mut expected = vec![0x04, 0x01, 0x03, 0x00, 0x00, 0x00, 1, 2, 3, 0x01];
        expected.extend_from_slice(&[0; 12]);
        expected.extend_from_slice(&[0x01, 0x00]);
        assert_eq!(report.as_bytes(), expected.as_slice());
    }

    #[test]
    fn lamp_update_fixed_length_for_all_colors() {
        let colors = [Rgb::BLACK, RED, Rgb::new(0x80, 0x7f, 0x01), Rgb::new(255, 255, 255)];

        for &variant in Variant::value_variants() {
            let protocol = variant.protocol();
            for color in colors {
                let report = encode_lamp_update(variant, 1, color).unwrap();
                let bytes = report.as_bytes();
                let rgbi = 2 + protocol.lamp_slots;

                assert_eq!(bytes.len(), protocol.lamp_update_len());
                assert_eq!(report.id(), protocol.lamp_update.id);
                assert_eq!(&bytes[rgbi..rgbi + 4], &[color.r, color.g, color.b, 0x01]);
            }
        }
    }

    #[test]
    fn lamp_multi_update_fills_slots_in_order() {
        let lamps = [(2, RED), (0, BLUE)];
        let report = encode_lamp_multi_update(Variant::Rev5, &lamps).unwrap();
        let bytes = report.as_bytes();

        assert_eq!(bytes[1], 2);
        assert_eq!(&bytes[2..6], &[2, 0, 0, 0]);
        assert_eq!(&bytes[6..14], &[255, 0, 0, 1, 0, 0, 255, 1]);
        assert_eq!(&bytes[14..22], &[0; 8]);
    }

    #[test]
    fn lamp_multi_update_rejects_overflow() {
        let lamps = [(0, RED), (1, RED), (0, BLUE)];
        let err = encode_lamp_multi_update(Variant::Rev2, &lamps).unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));
    }

    #[test]
    fn lamp_id_out_of_range() {
        let err = encode_lamp_update(Variant::Rev1, 2, RED).unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));

        assert!(encode_lamp_update(Variant::Rev3, 3, RED).is_ok());
        assert!(encode_lamp_update(Variant::Rev3, 4, RED).is_err());
    }

    #[test]
    fn lamp_range_update() {
        let report = encode_lamp_range_update(Variant::Rev5, 1, 3, Some(BLUE)).unwrap();
        assert_eq!(report.kind(), ReportKind::Output);
        assert_eq!(report.as_bytes(), &[0x05, 1, 3, 0, 0, 255, 0x01, 0x01, 0x00]);

        let off = encode_lamp_range_update(Variant::Rev5, 0, 3, None).unwrap();
        assert_eq!(off.as_bytes(), &[0x05, 0, 3, 0, 0, 0, 0, 0x01, 0x00]);
    }

    #[test]
    fn lamp_range_update_validation() {
        let err = encode_lamp_range_update(Variant::Rev1, 0, 1, None).unwrap_err();
        assert!(matches!(err, Error::Unsupported { variant: Variant::Rev1, .. }));

        let err = encode_lamp_range_update(Variant::Rev5, 2, 1, None).unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));

        let err = encode_lamp_range_update(Variant::Rev5, 0, 4, None).unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));
    }

    #[test]
    fn autonomous_mode_per_variant() {
        for &variant in Variant::value_variants() {
            let on = encode_autonomous_mode(variant, true);
            let off = encode_autonomous_mode(variant, false);

            assert_eq!(on.as_bytes(), &[0x06, 0x01]);
            assert_eq!(off.as_bytes(), &[0x06, 0x00]);
            assert_eq!(on.kind(), variant.protocol().autonomous.kind);
        }

        assert_eq!(encode_autonomous_mode(Variant::Rev1, true).kind(), ReportKind::Output);
        assert_eq!(encode_autonomous_mode(Variant::Rev3, true).kind(), ReportKind::Feature);
    }

    #[test]
    fn reset_mode_bits() {
        for &variant in Variant::value_variants() {
            let id = variant.protocol().reset.id;
            assert_eq!(encode_reset(variant, ResetMode::Normal).as_bytes(), &[id, 0b000]);
            assert_eq!(encode_reset(variant, ResetMode::Bootsel).as_bytes(), &[id, 0b001]);
            assert_eq!(encode_reset(variant, ResetMode::ClearFlash).as_bytes(), &[id, 0b010]);
        }

        let both = ResetFlags { bootsel: true, clear_flash: true };
        assert_eq!(encode_reset(Variant::Rev5, both).as_bytes(), &[0x30, 0b011]);
    }

    #[test]
    fn bootsel_aliases_reset() {
        let report = encode_bootsel(Variant::Rev1);
        assert_eq!(report.kind(), ReportKind::Output);
        assert_eq!(report.as_bytes(), &[0x07, 0x01]);

        let report = encode_bootsel(Variant::Rev4);
        assert_eq!(report.kind(), ReportKind::Feature);
        assert_eq!(report.as_bytes(), &[0x30, 0x01]);
    }

    #[test]
    fn animation_unsupported_on_rev1() {
        let err = encode_animation(Variant::Rev1, AnimationOptions::default(), &Animation::None)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn animation_none_is_all_zero() {
        for variant in animated_variants() {
            let options = AnimationOptions { lamp_id: 1, persist: false };
            let first = encode_animation(variant, options, &Animation::None).unwrap();
            let second = encode_animation(variant, options, &Animation::None).unwrap();

            assert_eq!(first, second);
            assert_eq!(&first.as_bytes()[..3], &[0x08, 1, 0x00]);
            assert!(first.as_bytes()[3..].iter().all(|&b| b == 0));
            assert_eq!(first.as_bytes().len(), variant.protocol().animation.unwrap().report_len());
        }
    }

    #[test]
    fn persist_selects_feature_report() {
        for variant in animated_variants() {
            let reports = variant.protocol().animation.unwrap();

            let current = AnimationOptions { lamp_id: 0, persist: false };
            let report = encode_animation(variant, current, &Animation::None).unwrap();
            assert_eq!(report.kind(), ReportKind::Output);
            assert_eq!(report.id(), reports.output_id);

            let default = AnimationOptions { lamp_id: 0, persist: true };
            let report = encode_animation(variant, default, &Animation::None).unwrap();
            assert_eq!(report.kind(), ReportKind::Feature);
            assert_eq!(report.id(), reports.feature_id);
        }

        let default = AnimationOptions { lamp_id: 0, persist: true };
        assert_eq!(encode_animation(Variant::Rev5, default, &Animation::None).unwrap().id(), 0x09);
    }

    #[test]
    fn breathe_extended_layout() {
        let breathe = Breathe {
            on_color: RED,
            off_color: BLUE,
            on_fade: Millis(2000),
            on_time: Millis(500),
            off_fade: Millis(2000),
            off_time: Millis(2000),
        };
        let animation = Animation::Breathe(breathe);
        let report = encode_animation(Variant::Rev3, Default::default(), &animation).unwrap();
        let bytes = report.as_bytes();

        assert_eq!(bytes.len(), 59);
        assert_eq!(&bytes[..3], &[0x08, 0x00, 0x01]);

        // Parameter slots.
        let params = &bytes[3..35];
        assert_eq!(&params[..16], &[
            0xd0, 0x07, 0x00, 0x00, // 2000
            0xf4, 0x01, 0x00, 0x00, // 500
            0xd0, 0x07, 0x00, 0x00, // 2000
            0xd0, 0x07, 0x00, 0x00, // 2000
        ]);
        assert!(params[16..].iter().all(|&b| b == 0));

        // Color slots.
        let colors = &bytes[35..];
        assert_eq!(&colors[..6], &[255, 0, 0, 0, 0, 255]);
        assert_eq!(colors[6..].len(), 18);
        assert!(colors[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn breathe_compact_layout() {
        let mut breathe = Breathe::new(Rgb::new(1, 2, 3));
        breathe.off_color = Rgb::new(4, 5, 6);
        breathe.off_time = Millis(65535);

        let options = AnimationOptions { lamp_id: 2, persist: true };
        let animation = Animation::Breathe(breathe);
        let report = encode_animation(Variant::Rev5, options, &animation).unwrap();
        let bytes = report.as_bytes();

        assert_eq!(bytes.len(), 63);
        assert_eq!(&bytes[..17], &[
            0x09, 0x02, 0x01, // id, lamp, type
            1, 2, 3, 4, 5, 6, // on, off
            0xe8, 0x03, // on fade 1000
            0xf4, 0x01, // on 500
            0xe8, 0x03, // off fade 1000
            0xff, 0xff, // off 65535
        ]);
        assert!(bytes[17..].iter().all(|&b| b == 0));
    }

    #[test]
    fn compact_timing_overflow() {
        let mut breathe = Breathe::new(RED);
        breathe.on_time = Millis(65536);

        let animation = Animation::Breathe(breathe);
        let err = encode_animation(Variant::Rev5, AnimationOptions::default(), &animation)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));

        // The same timing fits the 32-bit parameter slots.
        assert!(encode_animation(Variant::Rev4, AnimationOptions::default(), &animation).is_ok());
    }

    #[test]
    fn fade_compact_slot_count() {
        for count in 0..=MAX_FADE_COLORS {
            let colors = rainbow(count);
            let mut fade = Fade::new(colors.clone());
            fade.fade_time = Millis(0x0102);
            fade.hold_time = Millis(0x0304);

            let animation = Animation::Fade(fade);
            let report = encode_animation(Variant::Rev5, Default::default(), &animation).unwrap();
            let data = &report.as_bytes()[3..];

            assert_eq!(data[0] as usize, count);
            for (i, color) in colors.iter().enumerate() {
                assert_eq!(&data[1 + 3 * i..4 + 3 * i], &color.to_bytes());
            }
            assert!(data[1 + 3 * count..25].iter().all(|&b| b == 0));
            assert_eq!(&data[25..29], &[0x02, 0x01, 0x04, 0x03]);
            assert!(data[29..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn fade_extended_slot_count() {
        for count in 0..=MAX_FADE_COLORS {
            let colors = rainbow(count);
            let fade = Animation::Fade(Fade::new(colors.clone()));

            let options = AnimationOptions::default();
            let report = encode_animation(Variant::Rev4, options, &fade).unwrap();
            let bytes = report.as_bytes();
            let params = &bytes[3..35];
            let slots = &bytes[35..];

            assert_eq!(&params[..12], &[
                count as u8, 0, 0, 0, // color count
                0xd0, 0x07, 0, 0, // fade 2000
                0xe8, 0x03, 0, 0, // hold 1000
            ]);
            assert!(params[12..].iter().all(|&b| b == 0));

            for (i, color) in colors.iter().enumerate() {
                assert_eq!(&slots[3 * i..3 * i + 3], &color.to_bytes());
            }
            assert!(slots[3 * count..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn fade_param_order_per_variant() {
        let fade = Animation::Fade(Fade::new(vec![RED, BLUE]));
        let report = encode_animation(Variant::Rev3, AnimationOptions::default(), &fade).unwrap();
        let params = &report.as_bytes()[3..35];

        assert_eq!(&params[..8], &[0xd0, 0x07, 0, 0, 0xe8, 0x03, 0, 0]);
        assert!(params[8..].iter().all(|&b| b == 0));
        assert_eq!(&report.as_bytes()[35..41], &[255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn fade_rejects_too_many_colors() {
        for variant in animated_variants() {
            let fade = Animation::Fade(Fade::new(rainbow(MAX_FADE_COLORS + 1)));
            let err = encode_animation(variant, AnimationOptions::default(), &fade).unwrap_err();
            assert!(matches!(err, Error::InvalidCommandArgument(_)));
        }
    }

    #[test]
    fn animation_lamp_id_checked() {
        let options = AnimationOptions { lamp_id: 2, persist: false };
        let err = encode_animation(Variant::Rev2, options, &Animation::None).unwrap_err();
        assert!(matches!(err, Error::InvalidCommandArgument(_)));
    }
}
