//! Calibration constants and user-adjustable settings

use crate::error::SettingError;
use crate::led::{CHANNEL_COUNT, Channel};
use crate::restriction::RestrictionWindow;
use crate::timing::{StepTiming, TimingOverride};

/// Default per-channel current when the board provides none
pub const DEFAULT_CURRENT: u8 = 0x28;

/// Default low-power current when the board provides none
pub const DEFAULT_LOW_POWER_CURRENT: u8 = 0x05;

/// Current calibration, fixed after initialisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    default_current: u8,
    low_power_current: u8,
    channel_currents: [u8; CHANNEL_COUNT],
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENT, DEFAULT_LOW_POWER_CURRENT)
    }
}

impl Calibration {
    /// Every channel starts at `default_current`
    pub const fn new(default_current: u8, low_power_current: u8) -> Self {
        Self {
            default_current,
            low_power_current,
            channel_currents: [default_current; CHANNEL_COUNT],
        }
    }

    /// Build calibration from board properties
    ///
    /// Missing properties fall back to the stock currents. A value that does
    /// not fit the 8-bit current register is a configuration error.
    pub fn from_properties(
        default_current: Option<u32>,
        low_power_current: Option<u32>,
    ) -> Result<Self, SettingError> {
        let to_current = |value: Option<u32>, fallback: u8| match value {
            None => Ok(fallback),
            Some(value) => u8::try_from(value).map_err(|_| SettingError::Configuration),
        };
        Ok(Self::new(
            to_current(default_current, DEFAULT_CURRENT)?,
            to_current(low_power_current, DEFAULT_LOW_POWER_CURRENT)?,
        ))
    }

    /// Override the calibrated current of a single channel
    #[must_use]
    pub const fn with_channel_current(mut self, channel: Channel, current: u8) -> Self {
        self.channel_currents[channel.index()] = current;
        self
    }

    pub const fn default_current(&self) -> u8 {
        self.default_current
    }

    pub const fn low_power_current(&self) -> u8 {
        self.low_power_current
    }

    pub const fn channel_current(&self, channel: Channel) -> u8 {
        self.channel_currents[channel.index()]
    }
}

/// Runtime knobs read when composing a pattern or blink
///
/// Setters validate first and only then store, so a rejected value never
/// leaves a partial update behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    fade: bool,
    fade_charging: bool,
    low_power: bool,
    always_disabled: bool,
    debug: bool,
    intensity: u8,
    timing_override: TimingOverride,
    step_timing: StepTiming,
    window: RestrictionWindow,
}

impl Settings {
    pub const fn fade(&self) -> bool {
        self.fade
    }

    pub fn set_fade(&mut self, enabled: bool) {
        self.fade = enabled;
    }

    pub const fn fade_charging(&self) -> bool {
        self.fade_charging
    }

    pub fn set_fade_charging(&mut self, enabled: bool) {
        self.fade_charging = enabled;
    }

    pub const fn low_power(&self) -> bool {
        self.low_power
    }

    pub fn set_low_power(&mut self, enabled: bool) {
        self.low_power = enabled;
    }

    pub const fn always_disabled(&self) -> bool {
        self.always_disabled
    }

    pub fn set_always_disabled(&mut self, disabled: bool) {
        self.always_disabled = disabled;
    }

    pub const fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    /// Global intensity, `0` selects the calibrated per-channel currents
    pub const fn intensity(&self) -> u8 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: u8) {
        self.intensity = intensity;
    }

    pub const fn timing_override(&self) -> &TimingOverride {
        &self.timing_override
    }

    pub fn timing_override_mut(&mut self) -> &mut TimingOverride {
        &mut self.timing_override
    }

    pub const fn step_timing(&self) -> &StepTiming {
        &self.step_timing
    }

    pub fn step_timing_mut(&mut self) -> &mut StepTiming {
        &mut self.step_timing
    }

    pub const fn window(&self) -> &RestrictionWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut RestrictionWindow {
        &mut self.window
    }
}

/// Configuration for the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub calibration: Calibration,
    pub settings: Settings,
}
