//! Millisecond to chip time unit conversion
//!
//! Slope total times are programmed in half-second units in a 4-bit field,
//! so anything past 7.5s saturates. Step detention times are raw nibbles
//! taken from the global step configuration.

use core::ops::RangeInclusive;

use crate::error::SettingError;

/// Length of one slope time unit
pub const TIME_UNIT_MS: u32 = 500;

/// Longest representable slope time
pub const MAX_SLOPE_MS: u32 = 7500;

/// Largest value of a slope total-time field
pub const MAX_TIME_UNITS: u8 = 15;

/// Accepted range of explicit on/off time overrides (0 means unset)
pub const OVERRIDE_RANGE_MS: RangeInclusive<u32> = 100..=MAX_SLOPE_MS;

pub const DEFAULT_STEP_DURATION: u8 = 1;
pub const STEP_DURATION_RANGE: RangeInclusive<u8> = 1..=20;

pub const DEFAULT_STEP_SHIFT: u8 = 4;
pub const STEP_SHIFT_RANGE: RangeInclusive<u8> = 4..=15;

/// Widest shift whose high nibble still lands inside the control byte
pub const MAX_PACKABLE_SHIFT: u8 = 7;

/// Bound a raw duration to `[0, 7500]` ms
#[inline]
pub const fn clamp_ms(ms: u32) -> u32 {
    if ms > MAX_SLOPE_MS { MAX_SLOPE_MS } else { ms }
}

/// Convert milliseconds to half-second units, rounding up
///
/// A request is never under-timed. The result saturates at [`MAX_TIME_UNITS`].
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub const fn to_units(ms: u32) -> u8 {
    let units = ms.div_ceil(TIME_UNIT_MS);
    if units > MAX_TIME_UNITS as u32 {
        MAX_TIME_UNITS
    } else {
        units as u8
    }
}

/// Per-step detention times used by fade slopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    steps: [u8; 4],
    shift: u8,
}

impl Default for StepTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl StepTiming {
    pub const fn new() -> Self {
        Self {
            steps: [DEFAULT_STEP_DURATION; 4],
            shift: DEFAULT_STEP_SHIFT,
        }
    }

    pub const fn steps(&self) -> [u8; 4] {
        self.steps
    }

    pub const fn shift(&self) -> u8 {
        self.shift
    }

    /// Replace all four step durations. Every value must be within `1..=20`.
    pub fn set_steps(&mut self, steps: [u8; 4]) -> Result<(), SettingError> {
        if !steps.iter().all(|step| STEP_DURATION_RANGE.contains(step)) {
            return Err(SettingError::InvalidInput);
        }
        self.steps = steps;
        Ok(())
    }

    /// Replace one step duration, `index` in `0..4`
    pub fn set_step(&mut self, index: usize, duration: u8) -> Result<(), SettingError> {
        if !STEP_DURATION_RANGE.contains(&duration) {
            return Err(SettingError::InvalidInput);
        }
        let slot = self.steps.get_mut(index).ok_or(SettingError::InvalidInput)?;
        *slot = duration;
        Ok(())
    }

    /// Set the bit offset of the second step in each packed pair
    ///
    /// Values outside `4..=15` are rejected as input errors. Shifts of 8 and
    /// above are accepted by the interface but cannot be packed into a byte.
    pub fn set_shift(&mut self, shift: u8) -> Result<(), SettingError> {
        if !STEP_SHIFT_RANGE.contains(&shift) {
            return Err(SettingError::InvalidInput);
        }
        if shift > MAX_PACKABLE_SHIFT {
            return Err(SettingError::Configuration);
        }
        self.shift = shift;
        Ok(())
    }
}

/// Explicit on/off times that replace the defaults of fade slopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingOverride {
    on_ms: Option<u32>,
    off_ms: Option<u32>,
}

impl TimingOverride {
    pub const fn on_ms(&self) -> Option<u32> {
        self.on_ms
    }

    pub const fn off_ms(&self) -> Option<u32> {
        self.off_ms
    }

    /// Set both overrides. `0` unsets a value, anything else must be within
    /// `100..=7500` ms. Either both values are stored or neither.
    pub fn set(&mut self, on_ms: u32, off_ms: u32) -> Result<(), SettingError> {
        let on_ms = Self::validate(on_ms)?;
        let off_ms = Self::validate(off_ms)?;
        self.on_ms = on_ms;
        self.off_ms = off_ms;
        Ok(())
    }

    pub fn set_on(&mut self, on_ms: u32) -> Result<(), SettingError> {
        self.on_ms = Self::validate(on_ms)?;
        Ok(())
    }

    pub fn set_off(&mut self, off_ms: u32) -> Result<(), SettingError> {
        self.off_ms = Self::validate(off_ms)?;
        Ok(())
    }

    /// Replace whichever of `on_ms`/`off_ms` has an override
    pub fn apply(&self, on_ms: u32, off_ms: u32) -> (u32, u32) {
        (self.on_ms.unwrap_or(on_ms), self.off_ms.unwrap_or(off_ms))
    }

    fn validate(ms: u32) -> Result<Option<u32>, SettingError> {
        match ms {
            0 => Ok(None),
            ms if OVERRIDE_RANGE_MS.contains(&ms) => Ok(Some(ms)),
            _ => Err(SettingError::InvalidInput),
        }
    }
}
