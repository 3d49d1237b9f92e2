//! Built-in lamp animations.

use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::color::Rgb;

/// Maximum number of colors in a fade animation.
pub const MAX_FADE_COLORS: usize = 8;

/// Animation played by the controller while in autonomous mode.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Animation {
    /// Stop the animation and turn the lamp off.
    None,
    Breathe(Breathe),
    Fade(Fade),
}

impl Animation {
    /// Animation type byte.
    pub fn tag(&self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Breathe(_) => 0x01,
            Self::Fade(_) => 0x02,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Breathe(_) => "breathe",
            Self::Fade(_) => "fade",
        }
    }
}

/// Fade a color on and off.
///
/// The light intensity changes in four stages:
///
/// ```text
///        | A | B | C | D |
///        |   |___|   |   |
///  light |  /|   |\  |   |
///        | / |   | \ |   |
///        |/  |   |  \|___|
///              time
///
///   A: on_fade
///   B: on_time
///   C: off_fade
///   D: off_time
/// ```
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Breathe {
    pub on_color: Rgb,
    pub off_color: Rgb,
    pub on_fade: Millis,
    pub on_time: Millis,
    pub off_fade: Millis,
    pub off_time: Millis,
}

impl Breathe {
    pub const DEFAULT_FADE_TIME: Millis = Millis(1000);
    pub const DEFAULT_ON_TIME: Millis = Millis(500);
    pub const DEFAULT_OFF_TIME: Millis = Millis(1000);

    /// Breathe between `on_color` and itself with the default timings.
    pub fn new(on_color: Rgb) -> Self {
        Self {
            on_color,
            off_color: on_color,
            on_fade: Self::DEFAULT_FADE_TIME,
            on_time: Self::DEFAULT_ON_TIME,
            off_fade: Self::DEFAULT_FADE_TIME,
            off_time: Self::DEFAULT_OFF_TIME,
        }
    }
}

/// Crossfade between multiple colors.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Fade {
    pub colors: Vec<Rgb>,
    /// Time spent transitioning between two colors.
    pub fade_time: Millis,
    /// Time spent on each color.
    pub hold_time: Millis,
}

impl Fade {
    pub const DEFAULT_FADE_TIME: Millis = Millis(2000);
    pub const DEFAULT_HOLD_TIME: Millis = Millis(1000);

    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors, fade_time: Self::DEFAULT_FADE_TIME, hold_time: Self::DEFAULT_HOLD_TIME }
    }
}

/// Target and storage of an animation report.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct AnimationOptions {
    /// The lamp that will play the animation.
    pub lamp_id: u8,

    /// Save the animation in flash as the default for the lamp.
    pub persist: bool,
}

/// Duration in milliseconds.
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone)]
pub struct Millis(pub u32);

impl Millis {
    const MILLIS: f64 = 1000.0;

    /// Accepted range in fractional seconds.
    const SECONDS: RangeInclusive<f64> = 0.0..=(i32::MAX as f64) / Self::MILLIS;
}

impl FromStr for Millis {
    type Err = String;

    /// Parse fractional seconds, truncating to whole milliseconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seconds: f64 = s.parse().map_err(|_| format!("invalid time value '{s}'"))?;
        if Self::SECONDS.contains(&seconds) {
            Ok(Millis((Self::MILLIS * seconds).trunc() as u32))
        } else {
            Err(format!(
                "time must be between {:.3} and {:.3} seconds",
                Self::SECONDS.start(),
                Self::SECONDS.end(),
            ))
        }
    }
}

impl Display for Millis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
