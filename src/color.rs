//! RGB colors.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use csscolorparser::Color;

use crate::error::Error;

/// RGB color.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert from sRGB to linear RGB.
    ///
    /// Animation reports take linear channel values, lamp updates take sRGB.
    pub fn to_linear(self) -> Self {
        let (r, g, b, _) = Color::from_rgba8(self.r, self.g, self.b, u8::MAX).to_linear_rgba_u8();
        Self { r, g, b }
    }

    /// Wire order of the color channels.
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parse `0xRRGGBB` or any CSS color string, ignoring the alpha channel.
    fn from_str(s: &str) -> Result<Rgb, Error> {
        let invalid = || Error::InvalidCommandArgument(format!("invalid color '{s}'"));

        let hex = match s.strip_prefix("0x") {
            Some(hex) => hex,
            None => {
                let [r, g, b, _] = csscolorparser::parse(s).map_err(|_| invalid())?.to_rgba8();
                return Ok(Rgb { r, g, b });
            },
        };

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut color = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
        let b = (color & 0xff) as u8;
        color >>= 8;
        let g = (color & 0xff) as u8;
        color >>= 8;
        let r = color as u8;

        Ok(Rgb { r, g, b })
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
