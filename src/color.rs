use smart_leds::RGB8;

use crate::led::Channel;

pub type Rgb = RGB8;

/// Unpack a `0xRRGGBB` colour. Bits above the low 24 are ignored.
#[allow(clippy::cast_possible_truncation)]
pub const fn rgb_from_u32(packed: u32) -> Rgb {
    Rgb {
        r: ((packed & 0x00FF_0000) >> 16) as u8,
        g: ((packed & 0x0000_FF00) >> 8) as u8,
        b: (packed & 0x0000_00FF) as u8,
    }
}

/// Component of `color` that drives `channel`
pub const fn component(color: Rgb, channel: Channel) -> u8 {
    match channel {
        Channel::Red => color.r,
        Channel::Green => color.g,
        Channel::Blue => color.b,
    }
}
