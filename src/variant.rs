//! Protocol variants of the 12VRGB controller firmware.
//!
//! Every firmware revision speaks a slightly different dialect of the same
//! report protocol. Instead of one encoder per revision, each revision is a
//! row in a static table and the encoder reads layout decisions from it.

use std::fmt::{self, Display, Formatter};

use clap::ValueEnum;

/// Default vendor ID used by the early prototype firmware.
pub const PROTOTYPE_VENDOR_ID: u16 = 0xcafe;

/// Default product ID used by the early prototype firmware.
pub const PROTOTYPE_PRODUCT_ID: u16 = 0x4100;

/// pid.codes vendor ID used by released firmware.
pub const PIDCODES_VENDOR_ID: u16 = 0x1209;

/// Product ID assigned to the controller under the pid.codes vendor ID.
pub const PIDCODES_PRODUCT_ID: u16 = 0xb210;

/// Size of the compact animation data block.
pub const COMPACT_ANIMATION_DATA_SIZE: usize = 60;

/// Firmware protocol revision.
#[derive(ValueEnum, Default, PartialEq, Eq, Debug, Copy, Clone)]
pub enum Variant {
    /// Lamp updates and bootsel only.
    Rev1,
    /// Adds animations with 32-bit parameters.
    Rev2,
    /// Four lamps, feature report controls.
    Rev3,
    /// Vendor reset report moves to 0x30.
    Rev4,
    /// Compact animation reports with 16-bit timings.
    #[default]
    Rev5,
}

impl Variant {
    /// Report layout for this revision.
    pub fn protocol(self) -> &'static Protocol {
        match self {
            Self::Rev1 => &REV1,
            Self::Rev2 => &REV2,
            Self::Rev3 => &REV3,
            Self::Rev4 => &REV4,
            Self::Rev5 => &REV5,
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

/// HID transfer used for a report.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum ReportKind {
    /// Interrupt OUT endpoint write.
    Output,
    /// SET_REPORT control transfer.
    Feature,
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output => f.write_str("output"),
            Self::Feature => f.write_str("feature"),
        }
    }
}

/// Report ID together with the transfer it is sent with.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct Route {
    pub id: u8,
    pub kind: ReportKind,
}

impl Route {
    pub const fn output(id: u8) -> Self {
        Self { id, kind: ReportKind::Output }
    }

    pub const fn feature(id: u8) -> Self {
        Self { id, kind: ReportKind::Feature }
    }
}

/// Parameter slots of a fade animation in extended layout.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum FadeParam {
    ColorCount,
    FadeTime,
    HoldTime,
}

/// Wire layout of the animation data block.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum AnimationLayout {
    /// Packed fields with 16-bit little-endian timings in a fixed 60 byte block.
    Compact,

    /// A block of 32-bit little-endian parameter slots followed by the color slots.
    Extended { max_params: usize, fade_params: &'static [FadeParam] },
}

/// Vendor animation reports.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct AnimationReports {
    /// Report ID for changing the running animation.
    pub output_id: u8,
    /// Report ID for saving the animation to flash as the lamp default.
    pub feature_id: u8,
    pub layout: AnimationLayout,
    pub max_colors: usize,
}

impl AnimationReports {
    /// Size of the data block following the lamp ID and animation type.
    pub fn data_size(&self) -> usize {
        match self.layout {
            AnimationLayout::Compact => COMPACT_ANIMATION_DATA_SIZE,
            AnimationLayout::Extended { max_params, .. } => 4 * max_params + 3 * self.max_colors,
        }
    }

    /// Total report size, including the report ID.
    pub fn report_len(&self) -> usize {
        3 + self.data_size()
    }
}

/// Report layout of a firmware revision.
#[derive(PartialEq, Eq, Debug)]
pub struct Protocol {
    pub vendor_id: u16,
    pub product_id: u16,

    /// Number of addressable lamps.
    pub lamp_count: u8,

    /// Number of (lamp ID, RGBI) slots in a multi update report.
    pub lamp_slots: usize,

    pub lamp_update: Route,
    pub lamp_range_update: Option<Route>,
    pub autonomous: Route,
    pub reset: Route,
    pub animation: Option<AnimationReports>,
}

impl Protocol {
    /// Total size of a lamp multi update report.
    ///
    /// Report ID, lamp count, the lamp ID slots, the RGBI slots and two bytes
    /// of update flags.
    pub fn lamp_update_len(&self) -> usize {
        2 + self.lamp_slots + 4 * self.lamp_slots + 2
    }
}

/// Size of a lamp range update report.
pub const LAMP_RANGE_UPDATE_LEN: usize = 9;

/// Size of the single-flag control reports.
pub const CONTROL_REPORT_LEN: usize = 2;

static REV1: Protocol = Protocol {
    vendor_id: PROTOTYPE_VENDOR_ID,
    product_id: PROTOTYPE_PRODUCT_ID,
    lamp_count: 2,
    lamp_slots: 2,
    lamp_update: Route::output(0x04),
    lamp_range_update: None,
    autonomous: Route::output(0x06),
    reset: Route::output(0x07),
    animation: None,
};

static REV2: Protocol = Protocol {
    vendor_id: PROTOTYPE_VENDOR_ID,
    product_id: PROTOTYPE_PRODUCT_ID,
    lamp_count: 2,
    lamp_slots: 2,
    lamp_update: Route::output(0x04),
    lamp_range_update: None,
    autonomous: Route::output(0x06),
    reset: Route::output(0x07),
    animation: Some(AnimationReports {
        output_id: 0x08,
        feature_id: 0x08,
        layout: AnimationLayout::Extended {
            max_params: 8,
            fade_params: &[FadeParam::ColorCount, FadeParam::FadeTime, FadeParam::HoldTime],
        },
        max_colors: 8,
    }),
};

static REV3: Protocol = Protocol {
    vendor_id: PIDCODES_VENDOR_ID,
    product_id: PIDCODES_PRODUCT_ID,
    lamp_count: 4,
    lamp_slots: 4,
    lamp_update: Route::output(0x04),
    lamp_range_update: Some(Route::output(0x05)),
    autonomous: Route::feature(0x06),
    reset: Route::feature(0x07),
    animation: Some(AnimationReports {
        output_id: 0x08,
        feature_id: 0x09,
        layout: AnimationLayout::Extended {
            max_params: 8,
            fade_params: &[FadeParam::FadeTime, FadeParam::HoldTime],
        },
        max_colors: 8,
    }),
};

static REV4: Protocol = Protocol {
    vendor_id: PIDCODES_VENDOR_ID,
    product_id: PIDCODES_PRODUCT_ID,
    lamp_count: 4,
    lamp_slots: 4,
    lamp_update: Route::output(0x04),
    lamp_range_update: Some(Route::output(0x05)),
    autonomous: Route::feature(0x06),
    reset: Route::feature(0x30),
    animation: Some(AnimationReports {
        output_id: 0x08,
        feature_id: 0x09,
        layout: AnimationLayout::Extended {
            max_params: 8,
            fade_params: &[FadeParam::ColorCount, FadeParam::FadeTime, FadeParam::HoldTime],
        },
        max_colors: 8,
    }),
};

static REV5: Protocol = Protocol {
    vendor_id: PIDCODES_VENDOR_ID,
    product_id: PIDCODES_PRODUCT_ID,
    lamp_count: 4,
    lamp_slots: 4,
    lamp_update: Route::output(0x04),
    lamp_range_update: Some(Route::output(0x05)),
    autonomous: Route::output(0x06),
    reset: Route::feature(0x30),
    animation: Some(AnimationReports {
        output_id: 0x08,
        feature_id: 0x09,
        layout: AnimationLayout::Compact,
        max_colors: 8,
    }),
};
