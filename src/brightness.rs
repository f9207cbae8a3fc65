//! Brightness to current-control conversion
//!
//! Two paths exist. Named patterns derive their current from the global
//! intensity divided by a mode-dependent scalar. Blink and manual brightness
//! requests treat the requested value as a fraction of a calibrated current.

use crate::config::Calibration;
use crate::led::Channel;

/// Intensity equal to the stock calibration current
///
/// Requests at this intensity scale by the channel's own calibration.
pub const STOCK_INTENSITY: u8 = 40;

/// Full-scale brightness
pub const MAX_BRIGHTNESS: u8 = 255;

/// Selects how a brightness request becomes a current value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentMode {
    /// Requested brightness is a fraction of the calibrated current
    Scaled,
    /// Pattern at stock current
    Stock,
    /// Pattern with low-power current
    LowPower,
    /// Pattern with fade enabled, slope visuals need a near-minimal base
    Fade,
}

impl CurrentMode {
    /// Pattern mode for the given flags. Low power wins over fade.
    pub const fn for_pattern(low_power: bool, fade: bool) -> Self {
        if low_power {
            Self::LowPower
        } else if fade {
            Self::Fade
        } else {
            Self::Stock
        }
    }

    /// Divisor applied to the intensity in pattern modes
    pub const fn dynamic_current(self, calibration: &Calibration) -> u8 {
        match self {
            Self::Scaled | Self::Stock => calibration.default_current(),
            Self::LowPower => calibration.low_power_current(),
            Self::Fade => 1,
        }
    }
}

/// Current-control value for `channel`
///
/// `requested` is only read in [`CurrentMode::Scaled`]; patterns have no
/// per-request brightness.
pub fn compute_channel_current(
    requested: u8,
    channel: Channel,
    calibration: &Calibration,
    intensity: u8,
    mode: CurrentMode,
) -> u8 {
    let channel_current = calibration.channel_current(channel);
    match mode {
        CurrentMode::Scaled => scale_brightness(requested, channel_current, intensity),
        _ => pattern_current(channel_current, intensity, mode.dynamic_current(calibration)),
    }
}

/// Pattern current: the channel calibration at intensity 0, otherwise the
/// intensity divided by the dynamic current
#[inline]
pub const fn pattern_current(channel_current: u8, intensity: u8, dynamic_current: u8) -> u8 {
    if intensity == 0 {
        return channel_current;
    }
    let divisor = if dynamic_current == 0 { 1 } else { dynamic_current };
    intensity / divisor
}

/// Scale `requested` (0-255) by the channel current, or by the intensity when
/// it is set to something other than the stock value
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub const fn scale_brightness(requested: u8, channel_current: u8, intensity: u8) -> u8 {
    let multiplier = if intensity == 0 || intensity == STOCK_INTENSITY {
        channel_current
    } else {
        intensity
    };
    let scaled = requested as u32 * multiplier as u32 / MAX_BRIGHTNESS as u32;
    if scaled > MAX_BRIGHTNESS as u32 {
        MAX_BRIGHTNESS
    } else {
        scaled as u8
    }
}
