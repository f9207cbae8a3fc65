//! In-memory mirror of the AN30259A register file and the channel encoder
//!
//! The engine never writes register bytes directly. All mutations go through
//! [`set_channel_power`], [`program_slope`] and [`set_imax`] so that every
//! byte in the image originates from a known field layout.

use crate::led::Channel;

/// Register addresses
pub mod reg {
    pub const SRESET: u8 = 0x00;
    pub const LEDON: u8 = 0x01;
    pub const SEL: u8 = 0x02;
    pub const LED1CC: u8 = 0x03;
    pub const LED1SLP: u8 = 0x06;
    pub const LED1CNT1: u8 = 0x09;
    pub const LED1CNT2: u8 = 0x0A;
    pub const LED1CNT3: u8 = 0x0B;
    pub const LED1CNT4: u8 = 0x0C;
    pub const LAST: u8 = 0x14;
}

/// Number of registers mirrored by [`RegisterImage`]
pub const REGISTER_COUNT: usize = reg::LAST as usize + 1;

/// Value written to `SRESET` to trigger a software reset
pub const SRESET_VALUE: u8 = 0x01;

const MASK_IMAX: u8 = 0xC0;
const MASK_DELAY: u8 = 0xF0;
const IMAX_SHIFT: u8 = 6;
const LED_ON: u8 = 0x01;
const LED_SLOPE_MODE: u8 = 0x10;

/// Highest IMAX level the `SEL` register can hold
pub const IMAX_MAX_LEVEL: u8 = 0x03;

/// Byte array indexed by register address `0x00..=0x14`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterImage {
    bytes: [u8; REGISTER_COUNT],
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterImage {
    pub const fn new() -> Self {
        Self {
            bytes: [0; REGISTER_COUNT],
        }
    }

    /// Image built from a full register read-back
    pub const fn from_bytes(bytes: [u8; REGISTER_COUNT]) -> Self {
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.bytes
    }

    /// Read a single register. Addresses past `0x14` read as zero.
    pub fn get(&self, address: u8) -> u8 {
        self.bytes.get(address as usize).copied().unwrap_or(0)
    }

    /// Registers `SEL..=LAST`, written as one block before the enable byte
    pub fn config_block(&self) -> &[u8] {
        &self.bytes[reg::SEL as usize..]
    }

    /// Enable/mode register, written after the config block
    pub const fn enable_register(&self) -> u8 {
        self.bytes[reg::LEDON as usize]
    }

    pub const fn is_enabled(&self, channel: Channel) -> bool {
        self.enable_register() & (LED_ON << channel.index()) != 0
    }

    pub const fn is_slope_mode(&self, channel: Channel) -> bool {
        self.enable_register() & (LED_SLOPE_MODE << channel.index()) != 0
    }

    /// Returns true if at least one channel is lit
    pub const fn any_enabled(&self) -> bool {
        self.enable_register() & 0x07 != 0
    }

    pub const fn current(&self, channel: Channel) -> u8 {
        self.bytes[reg::LED1CC as usize + channel.index()]
    }

    pub const fn imax(&self) -> u8 {
        (self.bytes[reg::SEL as usize] & MASK_IMAX) >> IMAX_SHIFT
    }

    /// Sleep/slope timing register of the channel
    pub const fn slope_timing(&self, channel: Channel) -> u8 {
        self.bytes[slp_address(channel)]
    }

    /// Control register `n` (0..4) of the channel
    pub const fn control(&self, channel: Channel, n: usize) -> u8 {
        self.bytes[cnt_address(channel) + n]
    }

    const fn control_mut(&mut self, channel: Channel, n: usize) -> &mut u8 {
        &mut self.bytes[cnt_address(channel) + n]
    }
}

const fn cnt_address(channel: Channel) -> usize {
    reg::LED1CNT1 as usize + channel.index() * 4
}

const fn slp_address(channel: Channel) -> usize {
    reg::LED1SLP as usize + channel.index()
}

/// Slope programme of a single channel
///
/// Duty levels and total times occupy 4-bit fields. Step durations share a
/// byte per pair, split at the configured bit shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlopeProfile {
    /// Start delay in half-second units
    pub delay: u8,
    pub duty_max: u8,
    pub duty_mid: u8,
    pub duty_min: u8,
    /// Total time of slope operations 1 and 2, in half-second units
    pub total_1: u8,
    /// Total time of slope operations 3 and 4, in half-second units
    pub total_2: u8,
    /// Detention time of each step, in multiples of 4ms
    pub steps: [u8; 4],
}

impl SlopeProfile {
    /// Decode the slope programme currently held in the image
    ///
    /// `step_shift` must be the shift the profile was packed with and below 8.
    pub fn read(image: &RegisterImage, channel: Channel, step_shift: u8) -> Self {
        let cnt1 = image.control(channel, 0);
        let cnt2 = image.control(channel, 1);
        let cnt3 = image.control(channel, 2);
        let cnt4 = image.control(channel, 3);
        let slp = image.slope_timing(channel);

        let shift = step_shift.min(7);
        let low_mask = (1u8 << shift) - 1;

        Self {
            delay: cnt2 >> 4,
            duty_max: cnt1 >> 4,
            duty_mid: cnt1 & 0x0F,
            duty_min: cnt2 & 0x0F,
            total_1: slp & 0x0F,
            total_2: slp >> 4,
            steps: [
                cnt3 & low_mask,
                cnt3 >> shift,
                cnt4 & low_mask,
                cnt4 >> shift,
            ],
        }
    }
}

/// Switch a channel on or off
///
/// Switching off clears the enable and slope bits and the start delay but
/// keeps the current-control register. Switching on writes `current`.
pub fn set_channel_power(
    image: &mut RegisterImage,
    channel: Channel,
    on: bool,
    slope_mode: bool,
    current: u8,
) {
    let index = channel.index();
    let ledon = &mut image.bytes[reg::LEDON as usize];
    if on {
        *ledon |= LED_ON << index;
        if slope_mode {
            *ledon |= LED_SLOPE_MODE << index;
        } else {
            *ledon &= !(LED_SLOPE_MODE << index);
        }
        image.bytes[reg::LED1CC as usize + index] = current;
    } else {
        *ledon &= !((LED_ON | LED_SLOPE_MODE) << index);
        *image.control_mut(channel, 1) &= !MASK_DELAY;
    }
}

/// Switch every channel off
pub fn reset_channels(image: &mut RegisterImage) {
    for channel in Channel::ALL {
        set_channel_power(image, channel, false, false, 0);
    }
}

/// Pack a slope programme into the channel's control registers
///
/// No validation happens here. Values are placed at their field offsets and
/// truncated to the byte, matching what the chip latches.
#[allow(clippy::cast_possible_truncation)]
pub fn program_slope(
    image: &mut RegisterImage,
    channel: Channel,
    profile: &SlopeProfile,
    step_shift: u8,
) {
    let pack = |high: u8, low: u8, shift: u8| -> u8 {
        ((u16::from(high) << shift) | u16::from(low)) as u8
    };
    let [dt1, dt2, dt3, dt4] = profile.steps;

    *image.control_mut(channel, 0) = pack(profile.duty_max, profile.duty_mid & 0x0F, 4);
    *image.control_mut(channel, 1) = pack(profile.delay, profile.duty_min & 0x0F, 4);
    *image.control_mut(channel, 2) = pack(dt2, dt1, step_shift);
    *image.control_mut(channel, 3) = pack(dt4, dt3, step_shift);
    image.bytes[slp_address(channel)] = pack(profile.total_2, profile.total_1 & 0x0F, 4);
}

/// Program the global current scale. `level` must not exceed [`IMAX_MAX_LEVEL`].
pub fn set_imax(image: &mut RegisterImage, level: u8) {
    let sel = &mut image.bytes[reg::SEL as usize];
    *sel = (*sel & !MASK_IMAX) | ((level & IMAX_MAX_LEVEL) << IMAX_SHIFT);
}
