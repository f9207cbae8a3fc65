//! Custom per-channel blinking
//!
//! Independent of the pattern catalog but built from the same encoder,
//! brightness and timing primitives.

use crate::brightness::{CurrentMode, compute_channel_current};
use crate::config::{Calibration, Settings};
use crate::led::Channel;
use crate::pattern::fade_profile;
use crate::register::{RegisterImage, SlopeProfile, program_slope, set_channel_power};
use crate::timing::{clamp_ms, to_units};

/// Blink request for a single channel
///
/// `brightness` is a fraction (0-255) of the channel's calibrated current.
/// An `off_ms` of zero means solid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkRequest {
    pub on_ms: u32,
    pub off_ms: u32,
    pub brightness: u8,
}

impl BlinkRequest {
    pub const fn new(on_ms: u32, off_ms: u32, brightness: u8) -> Self {
        Self {
            on_ms,
            off_ms,
            brightness,
        }
    }

    /// Returns true if the request switches the channel off
    pub const fn is_stop(&self) -> bool {
        self.brightness == 0
    }
}

/// Write the blink for `channel` into the image
pub fn compose(
    channel: Channel,
    request: BlinkRequest,
    image: &mut RegisterImage,
    calibration: &Calibration,
    settings: &Settings,
) {
    if request.is_stop() {
        set_channel_power(image, channel, false, false, 0);
        return;
    }

    let current = compute_channel_current(
        request.brightness,
        channel,
        calibration,
        settings.intensity(),
        CurrentMode::Scaled,
    );

    let (on_ms, off_ms) = settings
        .timing_override()
        .apply(request.on_ms, request.off_ms);
    let on_ms = clamp_ms(on_ms);
    let off_ms = clamp_ms(off_ms);

    if off_ms == 0 {
        // Scaling can round a small brightness down to nothing
        let on = current != 0;
        set_channel_power(image, channel, on, false, current);
        return;
    }

    set_channel_power(image, channel, true, true, current);
    let profile = if settings.fade() {
        fade_profile(settings, on_ms, off_ms)
    } else {
        SlopeProfile {
            delay: 0,
            duty_max: 15,
            duty_mid: 15,
            duty_min: 0,
            total_1: to_units(on_ms),
            total_2: to_units(off_ms),
            steps: [0; 4],
        }
    };
    program_slope(image, channel, &profile, settings.step_timing().shift());
}
