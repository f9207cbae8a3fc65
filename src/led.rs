//! LED channel identity
//!
//! The AN30259A drives three independent light paths. Every register
//! triplet (current control, slope timing, duty/step control) is selected
//! by the channel index.

const CHANNEL_NAME_RED: &str = "red";
const CHANNEL_NAME_GREEN: &str = "green";
const CHANNEL_NAME_BLUE: &str = "blue";

/// Number of channels on the chip
pub const CHANNEL_COUNT: usize = 3;

/// One of the three controlled light paths
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl Channel {
    /// All channels in replay order
    pub const ALL: [Channel; CHANNEL_COUNT] = [Channel::Red, Channel::Green, Channel::Blue];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => CHANNEL_NAME_RED,
            Self::Green => CHANNEL_NAME_GREEN,
            Self::Blue => CHANNEL_NAME_BLUE,
        }
    }
}
