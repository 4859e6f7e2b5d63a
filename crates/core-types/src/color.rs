use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::buffer::ChannelBuffer;
use crate::ranged::{ByteBounds, Ranged};
use crate::value::ChannelValue;

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    red: u8,
    green: u8,
    blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Rgb { red, green, blue }
    }

    pub const fn from_value(value: u32) -> Self {
        Rgb {
            red: ((value >> 16) & 0xff) as u8,
            green: ((value >> 8) & 0xff) as u8,
            blue: (value & 0xff) as u8,
        }
    }

    pub const fn value(self) -> u32 {
        ((self.red as u32) << 16) | ((self.green as u32) << 8) | (self.blue as u32)
    }

    pub const fn red(self) -> u8 {
        self.red
    }

    pub const fn green(self) -> u8 {
        self.green
    }

    pub const fn blue(self) -> u8 {
        self.blue
    }

    /// Multiplies every channel by `factor` in `[0, 1]`.
    pub fn scale(self, factor: f64) -> Rgb {
        let scale = |channel: u8| (f64::from(channel) * factor).round() as u8;
        Rgb {
            red: scale(self.red),
            green: scale(self.green),
            blue: scale(self.blue),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("\"{text}\" is not a six-digit hex color")]
pub struct ParseRgbError {
    pub text: String,
}

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.len() != 6 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseRgbError { text: text.into() });
        }
        let value = u32::from_str_radix(text, 16).map_err(|_| ParseRgbError { text: text.into() })?;
        Ok(Rgb::from_value(value))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.value())
    }
}

fn byte_to_channel(byte: u8) -> ChannelValue {
    Ranged::<ByteBounds>::new(f64::from(byte)).into()
}

fn channel_to_byte(value: ChannelValue) -> u8 {
    Ranged::<ByteBounds>::from(value).get().round() as u8
}

/// A view over a channel buffer whose size is a multiple of 3, presenting
/// consecutive channel triples as RGB pixels. Channels in `[0, 100]` map to
/// bytes in `[0, 255]` and back, byte-exact.
pub struct ColorBuffer<'a> {
    buffer: &'a mut ChannelBuffer,
}

impl<'a> ColorBuffer<'a> {
    pub fn new(buffer: &'a mut ChannelBuffer) -> Self {
        debug_assert!(buffer.len() % 3 == 0);
        ColorBuffer { buffer }
    }

    /// Pixel count, one third of the channel count.
    pub fn len(&self) -> usize {
        self.buffer.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn get(&self, index: usize) -> Rgb {
        let base = index * 3;
        Rgb {
            red: channel_to_byte(self.buffer.get(base)),
            green: channel_to_byte(self.buffer.get(base + 1)),
            blue: channel_to_byte(self.buffer.get(base + 2)),
        }
    }

    pub fn set(&mut self, index: usize, color: Rgb) {
        let base = index * 3;
        self.buffer.set(base, byte_to_channel(color.red));
        self.buffer.set(base + 1, byte_to_channel(color.green));
        self.buffer.set(base + 2, byte_to_channel(color.blue));
    }

    pub fn iter(&self) -> impl Iterator<Item = Rgb> + '_ {
        (0..self.len()).map(|index| self.get(index))
    }
}

const WHEEL_SIZE: f64 = 256.0;

/// Cyclic rainbow lookup; `position` in `[0, 1)` walks once around the
/// wheel.
pub fn colorwheel(position: f64) -> Rgb {
    let input = position.rem_euclid(1.0) * (WHEEL_SIZE - 1.0);
    let sector = (input * 3.0 / WHEEL_SIZE).floor();
    let phase = std::f64::consts::PI * (3.0 * input - sector * WHEEL_SIZE) / (2.0 * WHEEL_SIZE);
    let rising = (255.0 * phase.sin()) as u8;
    let falling = (255.0 * phase.cos()) as u8;
    match sector as u32 {
        0 => Rgb::new(rising, 0, falling),
        1 => Rgb::new(falling, rising, 0),
        _ => Rgb::new(0, falling, rising),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_value_round_trip() {
        let color = Rgb::from_value(0x7f00ff);
        assert_eq!(color.red(), 0x7f);
        assert_eq!(color.green(), 0x00);
        assert_eq!(color.blue(), 0xff);
        assert_eq!(color.value(), 0x7f00ff);
    }

    #[test]
    fn rgb_hex_round_trip() {
        let color: Rgb = "ff007f".parse().unwrap();
        assert_eq!(color, Rgb::new(0xff, 0x00, 0x7f));
        assert_eq!(color.to_string(), "ff007f");
    }

    #[test]
    fn rgb_rejects_malformed_hex() {
        assert!("ff00".parse::<Rgb>().is_err());
        assert!("gghhii".parse::<Rgb>().is_err());
        assert!("ff00000".parse::<Rgb>().is_err());
    }

    #[test]
    fn rgb_scale() {
        assert_eq!(Rgb::new(200, 100, 0).scale(0.5), Rgb::new(100, 50, 0));
        assert_eq!(Rgb::new(10, 20, 30).scale(0.0), Rgb::BLACK);
        assert_eq!(Rgb::new(10, 20, 30).scale(1.0), Rgb::new(10, 20, 30));
    }

    #[test]
    fn color_view_round_trips_every_byte() {
        let mut buffer = ChannelBuffer::zeroed(3);
        let mut colors = ColorBuffer::new(&mut buffer);
        for byte in 0..=255u8 {
            colors.set(0, Rgb::new(byte, byte, byte));
            assert_eq!(colors.get(0), Rgb::new(byte, byte, byte));
        }
    }

    #[test]
    fn color_view_writes_three_channels() {
        let mut buffer = ChannelBuffer::zeroed(6);
        let mut colors = ColorBuffer::new(&mut buffer);
        colors.set(1, Rgb::new(255, 0, 255));
        assert_eq!(buffer.get(3).get(), 100.0);
        assert_eq!(buffer.get(4).get(), 0.0);
        assert_eq!(buffer.get(5).get(), 100.0);
        assert_eq!(buffer.get(0).get(), 0.0);
    }

    #[test]
    fn colorwheel_is_cyclic_and_single_sector_pure() {
        assert_eq!(colorwheel(0.0), colorwheel(1.0));
        // First sector blends red and blue only.
        let color = colorwheel(0.1);
        assert_eq!(color.green(), 0);
    }
}
