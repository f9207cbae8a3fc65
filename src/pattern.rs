//! Catalog of named lighting patterns
//!
//! Every pattern is a fixed recipe: one channel, solid or slope output, and
//! a duty/timing profile. Fade settings can swap the profile for a
//! configurable fade slope.

use crate::brightness::{CurrentMode, compute_channel_current};
use crate::config::{Calibration, Settings};
use crate::led::Channel;
use crate::register::{RegisterImage, SlopeProfile, program_slope, reset_channels, set_channel_power};
use crate::timing::to_units;

const PATTERN_NAME_OFF: &str = "off";
const PATTERN_NAME_CHARGING: &str = "charging";
const PATTERN_NAME_CHARGING_ERROR: &str = "charging_error";
const PATTERN_NAME_MISSED_NOTIFICATION: &str = "missed_notification";
const PATTERN_NAME_LOW_BATTERY: &str = "low_battery";
const PATTERN_NAME_FULLY_CHARGED: &str = "fully_charged";
const PATTERN_NAME_POWERING: &str = "powering";

const PATTERN_ID_OFF: u8 = 0;
const PATTERN_ID_CHARGING: u8 = 1;
const PATTERN_ID_CHARGING_ERROR: u8 = 2;
const PATTERN_ID_MISSED_NOTIFICATION: u8 = 3;
const PATTERN_ID_LOW_BATTERY: u8 = 4;
const PATTERN_ID_FULLY_CHARGED: u8 = 5;
const PATTERN_ID_POWERING: u8 = 6;

/// Default on time of fade slopes without override
pub const DEFAULT_FADE_ON_MS: u32 = 500;
/// Default off time of fade slopes without override
pub const DEFAULT_FADE_OFF_MS: u32 = 2000;

const CHARGING_ERROR_PROFILE: SlopeProfile = SlopeProfile {
    delay: 1,
    duty_max: 15,
    duty_mid: 15,
    duty_min: 0,
    total_1: 1,
    total_2: 1,
    steps: [0; 4],
};

const REMINDER_PROFILE: SlopeProfile = SlopeProfile {
    delay: 10,
    duty_max: 15,
    duty_mid: 15,
    duty_min: 0,
    total_1: 1,
    total_2: 10,
    steps: [0; 4],
};

const POWERING_PROFILE: SlopeProfile = SlopeProfile {
    delay: 0,
    duty_max: 15,
    duty_mid: 12,
    duty_min: 8,
    total_1: 2,
    total_2: 2,
    steps: [3; 4],
};

/// Known pattern ids that can be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Pattern {
    Off = PATTERN_ID_OFF,
    Charging = PATTERN_ID_CHARGING,
    ChargingError = PATTERN_ID_CHARGING_ERROR,
    MissedNotification = PATTERN_ID_MISSED_NOTIFICATION,
    LowBattery = PATTERN_ID_LOW_BATTERY,
    FullyCharged = PATTERN_ID_FULLY_CHARGED,
    Powering = PATTERN_ID_POWERING,
}

impl Pattern {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            PATTERN_ID_OFF => Self::Off,
            PATTERN_ID_CHARGING => Self::Charging,
            PATTERN_ID_CHARGING_ERROR => Self::ChargingError,
            PATTERN_ID_MISSED_NOTIFICATION => Self::MissedNotification,
            PATTERN_ID_LOW_BATTERY => Self::LowBattery,
            PATTERN_ID_FULLY_CHARGED => Self::FullyCharged,
            PATTERN_ID_POWERING => Self::Powering,
            _ => return None,
        })
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => PATTERN_NAME_OFF,
            Self::Charging => PATTERN_NAME_CHARGING,
            Self::ChargingError => PATTERN_NAME_CHARGING_ERROR,
            Self::MissedNotification => PATTERN_NAME_MISSED_NOTIFICATION,
            Self::LowBattery => PATTERN_NAME_LOW_BATTERY,
            Self::FullyCharged => PATTERN_NAME_FULLY_CHARGED,
            Self::Powering => PATTERN_NAME_POWERING,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            PATTERN_NAME_OFF => Some(Self::Off),
            PATTERN_NAME_CHARGING => Some(Self::Charging),
            PATTERN_NAME_CHARGING_ERROR => Some(Self::ChargingError),
            PATTERN_NAME_MISSED_NOTIFICATION => Some(Self::MissedNotification),
            PATTERN_NAME_LOW_BATTERY => Some(Self::LowBattery),
            PATTERN_NAME_FULLY_CHARGED => Some(Self::FullyCharged),
            PATTERN_NAME_POWERING => Some(Self::Powering),
            _ => None,
        }
    }

    const fn recipe(self) -> Option<Recipe> {
        let recipe = match self {
            Self::Off => return None,
            Self::Charging => Recipe {
                channel: Channel::Red,
                shape: Shape::Solid,
                fade: FadeSwitch::FadeCharging,
                calibrated: false,
            },
            Self::ChargingError => Recipe {
                channel: Channel::Red,
                shape: Shape::Slope(CHARGING_ERROR_PROFILE),
                fade: FadeSwitch::Never,
                calibrated: false,
            },
            Self::MissedNotification => Recipe {
                channel: Channel::Blue,
                shape: Shape::Slope(REMINDER_PROFILE),
                fade: FadeSwitch::Fade,
                calibrated: false,
            },
            Self::LowBattery => Recipe {
                channel: Channel::Red,
                shape: Shape::Slope(REMINDER_PROFILE),
                fade: FadeSwitch::Fade,
                calibrated: false,
            },
            Self::FullyCharged => Recipe {
                channel: Channel::Green,
                shape: Shape::Solid,
                fade: FadeSwitch::Never,
                calibrated: false,
            },
            Self::Powering => Recipe {
                channel: Channel::Blue,
                shape: Shape::Slope(POWERING_PROFILE),
                fade: FadeSwitch::Never,
                calibrated: true,
            },
        };
        Some(recipe)
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Solid,
    Slope(SlopeProfile),
}

/// Setting that replaces the recipe shape with the fade slope
#[derive(Debug, Clone, Copy)]
enum FadeSwitch {
    Never,
    Fade,
    FadeCharging,
}

#[derive(Debug, Clone, Copy)]
struct Recipe {
    channel: Channel,
    shape: Shape,
    fade: FadeSwitch,
    /// Drive with the raw calibration current instead of the pattern current
    calibrated: bool,
}

/// Slope used by every fade variant: duty 30/15/0, on/off times from the
/// override or the defaults, step durations from the settings
pub(crate) fn fade_profile(settings: &Settings, on_ms: u32, off_ms: u32) -> SlopeProfile {
    SlopeProfile {
        delay: 0,
        duty_max: 30,
        duty_mid: 15,
        duty_min: 0,
        total_1: to_units(on_ms),
        total_2: to_units(off_ms),
        steps: settings.step_timing().steps(),
    }
}

/// Write `pattern` into the image
///
/// All channels are switched off first so nothing of the previous pattern
/// survives. [`Pattern::Off`] stops there.
pub fn compose(
    pattern: Pattern,
    image: &mut RegisterImage,
    calibration: &Calibration,
    settings: &Settings,
) {
    reset_channels(image);
    let Some(recipe) = pattern.recipe() else {
        return;
    };

    let channel = recipe.channel;
    let current = if recipe.calibrated {
        calibration.channel_current(channel)
    } else {
        let mode = CurrentMode::for_pattern(settings.low_power(), settings.fade());
        compute_channel_current(0, channel, calibration, settings.intensity(), mode)
    };

    let fade = match recipe.fade {
        FadeSwitch::Never => false,
        FadeSwitch::Fade => settings.fade(),
        FadeSwitch::FadeCharging => settings.fade_charging(),
    };
    let shape = if fade {
        let (on_ms, off_ms) = settings
            .timing_override()
            .apply(DEFAULT_FADE_ON_MS, DEFAULT_FADE_OFF_MS);
        Shape::Slope(fade_profile(settings, on_ms, off_ms))
    } else {
        recipe.shape
    };

    match shape {
        Shape::Solid => set_channel_power(image, channel, true, false, current),
        Shape::Slope(profile) => {
            set_channel_power(image, channel, true, true, current);
            program_slope(image, channel, &profile, settings.step_timing().shift());
        }
    }
}
