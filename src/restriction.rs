//! Time-of-day restriction and suppressed request bookkeeping
//!
//! While a restriction is in force every visible output is off. Requests
//! that arrive in that time are remembered in [`SavedState`] and handed back
//! exactly once when the restriction lifts.

use core::mem;

use crate::blink::BlinkRequest;
use crate::color::Rgb;
use crate::error::SettingError;
use crate::led::{CHANNEL_COUNT, Channel};
use crate::pattern::Pattern;

/// Sentinel used by the text interface for an unset hour
pub const UNSET_HOUR: i8 = -1;

const HOURS_PER_DAY: u8 = 24;
const SECONDS_PER_HOUR: u64 = 3600;

/// Local-time interval during which outputs are suppressed
///
/// The window is inactive unless both bounds are set. `start > stop` means
/// the blocked interval crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestrictionWindow {
    start: Option<u8>,
    stop: Option<u8>,
}

impl RestrictionWindow {
    pub const fn unset() -> Self {
        Self {
            start: None,
            stop: None,
        }
    }

    /// Build a window from interface hours (`-1` or `0..=23`)
    pub fn new(start: i8, stop: i8) -> Result<Self, SettingError> {
        Ok(Self {
            start: parse_hour(start)?,
            stop: parse_hour(stop)?,
        })
    }

    pub fn set_start(&mut self, hour: i8) -> Result<(), SettingError> {
        self.start = parse_hour(hour)?;
        Ok(())
    }

    pub fn set_stop(&mut self, hour: i8) -> Result<(), SettingError> {
        self.stop = parse_hour(hour)?;
        Ok(())
    }

    pub const fn start(&self) -> Option<u8> {
        self.start
    }

    pub const fn stop(&self) -> Option<u8> {
        self.stop
    }

    pub const fn is_active(&self) -> bool {
        self.start.is_some() && self.stop.is_some()
    }

    /// Returns true if `hour` falls inside the blocked interval
    pub fn blocks(&self, hour: u8) -> bool {
        let (Some(start), Some(stop)) = (self.start, self.stop) else {
            return false;
        };
        if start <= stop {
            hour >= start && hour < stop
        } else {
            hour >= start || hour < stop
        }
    }
}

fn parse_hour(hour: i8) -> Result<Option<u8>, SettingError> {
    match hour {
        UNSET_HOUR => Ok(None),
        #[allow(clippy::cast_sign_loss)]
        0..=23 => Ok(Some(hour as u8)),
        _ => Err(SettingError::InvalidInput),
    }
}

/// Local hour derived from UTC seconds and a timezone offset in minutes west
/// of Greenwich
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hour_from_utc(utc_seconds: u64, minutes_west: i32) -> u8 {
    let utc_hour = (utc_seconds / SECONDS_PER_HOUR % u64::from(HOURS_PER_DAY)) as i32;
    (utc_hour - minutes_west / 60).rem_euclid(i32::from(HOURS_PER_DAY)) as u8
}

/// Requests suppressed by the restriction: one pattern slot, one raw solid
/// colour slot and one blink slot per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedState {
    pattern: Option<Pattern>,
    solid: Option<Rgb>,
    blinks: [Option<BlinkRequest>; CHANNEL_COUNT],
}

impl SavedState {
    pub const fn pattern(&self) -> Option<Pattern> {
        self.pattern
    }

    /// Raw solid colour, replayed after the pattern
    pub const fn solid(&self) -> Option<Rgb> {
        self.solid
    }

    pub const fn blink(&self, channel: Channel) -> Option<BlinkRequest> {
        self.blinks[channel.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.solid.is_none()
            && self.blinks.iter().all(Option::is_none)
    }

    /// A pattern resets every channel, so it supersedes a saved solid colour
    pub(crate) fn save_pattern(&mut self, pattern: Pattern) {
        self.pattern = Some(pattern);
        self.solid = None;
    }

    /// Solid colour replaces whatever pattern was running
    pub(crate) fn save_solid(&mut self, color: Rgb) {
        self.pattern = Some(Pattern::Off);
        self.solid = Some(color);
    }

    pub(crate) fn save_blink(&mut self, channel: Channel, request: BlinkRequest) {
        self.blinks[channel.index()] = Some(request);
    }

    pub(crate) fn clear_blink(&mut self, channel: Channel) {
        self.blinks[channel.index()] = None;
    }
}

/// Outcome of one restriction evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not blocked now, not blocked before
    Allowed,
    /// Restriction lifted; carries the requests to replay
    Released(SavedState),
    /// Restriction started with this evaluation
    Entered,
    /// Restriction still in force
    StillBlocked,
}

impl Transition {
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Entered | Self::StillBlocked)
    }
}

/// Shared gate consulted before any pattern or blink touches the registers
#[derive(Debug, Clone, Default)]
pub struct RestrictionGuard {
    blocked: bool,
    saved: SavedState,
}

impl RestrictionGuard {
    pub const fn new() -> Self {
        Self {
            blocked: false,
            saved: SavedState {
                pattern: None,
                solid: None,
                blinks: [None; CHANNEL_COUNT],
            },
        }
    }

    /// Verdict of the last evaluation
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub const fn saved(&self) -> &SavedState {
        &self.saved
    }

    pub(crate) fn saved_mut(&mut self) -> &mut SavedState {
        &mut self.saved
    }

    /// Evaluate the restriction for `hour` and record the verdict
    ///
    /// On the blocked to allowed edge the saved requests are moved out, so
    /// they are handed back exactly once.
    pub fn evaluate(&mut self, kill_switch: bool, window: &RestrictionWindow, hour: u8) -> Transition {
        let blocked = kill_switch || window.blocks(hour);
        let was_blocked = mem::replace(&mut self.blocked, blocked);

        match (was_blocked, blocked) {
            (false, false) => Transition::Allowed,
            (true, false) => Transition::Released(mem::take(&mut self.saved)),
            (false, true) => Transition::Entered,
            (true, true) => Transition::StillBlocked,
        }
    }
}
