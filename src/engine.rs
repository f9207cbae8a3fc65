use crate::LocalClock;
use crate::blink::{self, BlinkRequest};
use crate::brightness::{CurrentMode, compute_channel_current};
use crate::color::{Rgb, component, rgb_from_u32};
use crate::command::Command;
use crate::config::{Calibration, EngineConfig, Settings};
use crate::error::Error;
use crate::led::Channel;
use crate::pattern::{self, Pattern};
use crate::register::{
    IMAX_MAX_LEVEL, REGISTER_COUNT, RegisterImage, SRESET_VALUE, reg, set_channel_power, set_imax,
};
use crate::restriction::{RestrictionGuard, RestrictionWindow, SavedState, Transition};
use crate::transport::RegisterBus;

/// Result of a lighting request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Registers were composed and committed
    Applied,
    /// A restriction is in force; the request was saved for replay
    Suppressed,
    /// Request carried nothing to do, e.g. an unknown pattern id
    Ignored,
}

/// Top-level lighting state requested by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommandMode {
    Off,
    /// Raw current values, solid on. A zero component turns its channel off.
    SolidColor(Rgb),
    NamedPattern(Pattern),
    CustomBlink {
        channel: Channel,
        request: BlinkRequest,
    },
}

/// Verdict of the shared restriction gate
#[derive(Debug, Clone, Copy)]
struct Gate {
    blocked: bool,
    /// Gate changed the image and a commit is owed
    pending: bool,
}

/// AN30259A control engine
///
/// Owns the register image, calibration, settings and saved requests. Every
/// mutating call runs decide, mutate and commit in one `&mut self` borrow.
pub struct Engine<B: RegisterBus, C: LocalClock> {
    bus: B,
    clock: C,
    image: RegisterImage,
    calibration: Calibration,
    settings: Settings,
    guard: RestrictionGuard,
}

impl<B: RegisterBus, C: LocalClock> Engine<B, C> {
    /// Create an engine. Nothing is written to the bus until the first
    /// command or [`Engine::init`].
    pub fn new(bus: B, clock: C, config: &EngineConfig) -> Self {
        Self {
            bus,
            clock,
            image: RegisterImage::new(),
            calibration: config.calibration,
            settings: config.settings,
            guard: RestrictionGuard::new(),
        }
    }

    /// Reset the chip and program the lowest IMAX level
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        self.reset()?;
        self.set_current_imax(0)
    }

    /// Software reset followed by a full read-back into the image
    pub fn reset(&mut self) -> Result<(), Error<B::Error>> {
        self.bus
            .write_byte(reg::SRESET, SRESET_VALUE)
            .map_err(Error::Transport)?;
        let mut bytes = [0; REGISTER_COUNT];
        self.bus
            .read_block(reg::SRESET, &mut bytes)
            .map_err(Error::Transport)?;
        self.image = RegisterImage::from_bytes(bytes);
        Ok(())
    }

    /// Read the chip's registers without touching the image
    pub fn read_back(&mut self) -> Result<[u8; REGISTER_COUNT], Error<B::Error>> {
        let mut bytes = [0; REGISTER_COUNT];
        self.bus
            .read_block(reg::SRESET, &mut bytes)
            .map_err(Error::Transport)?;
        Ok(bytes)
    }

    pub fn registers(&self) -> &RegisterImage {
        &self.image
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Requests waiting for the restriction to lift
    pub fn saved(&self) -> &SavedState {
        self.guard.saved()
    }

    /// Verdict of the most recent restriction evaluation
    pub fn is_restricted(&self) -> bool {
        self.guard.is_blocked()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Give back the bus and the clock
    pub fn release(self) -> (B, C) {
        (self.bus, self.clock)
    }

    /// Execute a parsed command
    pub fn execute(&mut self, command: Command) -> Result<Outcome, Error<B::Error>> {
        match command {
            Command::SetChannelBrightness { channel, value } => {
                self.set_channel_brightness(channel, value)?;
            }
            Command::ApplyPattern(id) => return self.apply_named_pattern(id),
            Command::SetCustomBlink {
                color,
                on_ms,
                off_ms,
            } => return self.set_custom_blink(color, on_ms, off_ms),
            Command::SetFade(enabled) => self.set_fade_enabled(enabled),
            Command::SetFadeCharging(enabled) => self.set_fade_enabled_for_charging(enabled),
            Command::SetIntensity(intensity) => self.set_intensity(intensity),
            Command::SetLowPower(enabled) => self.set_low_power_mode(enabled),
            Command::SetTimeOverride { on_ms, off_ms } => self.set_time_override(on_ms, off_ms)?,
            Command::SetTimeOn(on_ms) => self.set_time_on(on_ms)?,
            Command::SetTimeOff(off_ms) => self.set_time_off(off_ms)?,
            Command::SetStepDurations(steps) => self.set_step_durations(steps)?,
            Command::SetStepDuration { index, duration } => {
                self.set_step_duration(index, duration)?;
            }
            Command::SetStepBitShift(shift) => self.set_step_bit_shift(shift)?,
            Command::SetRestrictionWindow { start, stop } => {
                self.set_restriction_window(start, stop)?;
            }
            Command::SetRestrictionStart(hour) => self.set_restriction_start(hour)?,
            Command::SetRestrictionStop(hour) => self.set_restriction_stop(hour)?,
            Command::SetAlwaysDisabled(disabled) => self.set_always_disabled(disabled)?,
            Command::SetDebug(enabled) => self.set_debug_enabled(enabled),
            Command::SetCurrentImax(level) => self.set_current_imax(level)?,
        }
        Ok(Outcome::Applied)
    }

    /// Switch to a top-level lighting mode
    pub fn apply_mode(&mut self, mode: LedCommandMode) -> Result<Outcome, Error<B::Error>> {
        match mode {
            LedCommandMode::Off => self.apply_pattern(Pattern::Off),
            LedCommandMode::NamedPattern(pattern) => self.apply_pattern(pattern),
            LedCommandMode::CustomBlink { channel, request } => self.set_blink(channel, request),
            LedCommandMode::SolidColor(color) => self.apply_solid(color),
        }
    }

    /// Drive raw current values solid on. A zero component turns its
    /// channel off.
    pub fn apply_solid(&mut self, color: Rgb) -> Result<Outcome, Error<B::Error>> {
        let gate = self.check_restrictions();
        if gate.blocked {
            debug_log!(
                self.settings.debug(),
                "[Engine.apply_solid] restricted, saving {:02x}{:02x}{:02x}",
                color.r,
                color.g,
                color.b
            );
            self.guard.saved_mut().save_solid(color);
            return self.suppressed(gate);
        }

        compose_solid(&mut self.image, color);
        self.commit()?;
        Ok(Outcome::Applied)
    }

    /// Set the manual brightness of one channel
    ///
    /// `value` is a fraction of the channel's calibrated current. This path
    /// does not consult the restriction.
    pub fn set_channel_brightness(
        &mut self,
        channel: Channel,
        value: u8,
    ) -> Result<(), Error<B::Error>> {
        let current = compute_channel_current(
            value,
            channel,
            &self.calibration,
            self.settings.intensity(),
            CurrentMode::Scaled,
        );
        // A value that scales down to nothing switches the channel off
        let on = value != 0 && current != 0;
        set_channel_power(&mut self.image, channel, on, false, current);
        self.commit()
    }

    /// Apply a pattern by catalog id
    ///
    /// Unknown ids are ignored without touching any state.
    pub fn apply_named_pattern(&mut self, id: i32) -> Result<Outcome, Error<B::Error>> {
        let Some(pattern) = u8::try_from(id).ok().and_then(Pattern::from_raw) else {
            debug_log!(
                self.settings.debug(),
                "[Engine.apply_named_pattern] ignoring unknown pattern id {}",
                id
            );
            return Ok(Outcome::Ignored);
        };
        self.apply_pattern(pattern)
    }

    pub fn apply_pattern(&mut self, pattern: Pattern) -> Result<Outcome, Error<B::Error>> {
        let gate = self.check_restrictions();
        if gate.blocked {
            debug_log!(
                self.settings.debug(),
                "[Engine.apply_pattern] restricted, saving {}",
                pattern.as_str()
            );
            self.guard.saved_mut().save_pattern(pattern);
            return self.suppressed(gate);
        }

        pattern::compose(pattern, &mut self.image, &self.calibration, &self.settings);
        self.commit()?;
        Ok(Outcome::Applied)
    }

    /// Blink one channel
    pub fn set_blink(
        &mut self,
        channel: Channel,
        request: BlinkRequest,
    ) -> Result<Outcome, Error<B::Error>> {
        let gate = self.check_restrictions();
        if gate.blocked {
            self.save_blink(channel, request);
            return self.suppressed(gate);
        }

        blink::compose(channel, request, &mut self.image, &self.calibration, &self.settings);
        self.commit()?;
        Ok(Outcome::Applied)
    }

    /// Blink all three channels with the components of a packed `0xRRGGBB`
    /// colour
    ///
    /// Any running pattern is switched off first. The whole colour is
    /// committed once.
    pub fn set_custom_blink(
        &mut self,
        color: u32,
        on_ms: u32,
        off_ms: u32,
    ) -> Result<Outcome, Error<B::Error>> {
        let color = rgb_from_u32(color);
        let gate = self.check_restrictions();
        if gate.blocked {
            self.guard.saved_mut().save_pattern(Pattern::Off);
            for channel in Channel::ALL {
                let request = BlinkRequest::new(on_ms, off_ms, component(color, channel));
                self.save_blink(channel, request);
            }
            return self.suppressed(gate);
        }

        pattern::compose(Pattern::Off, &mut self.image, &self.calibration, &self.settings);
        for channel in Channel::ALL {
            let request = BlinkRequest::new(on_ms, off_ms, component(color, channel));
            blink::compose(channel, request, &mut self.image, &self.calibration, &self.settings);
        }
        self.commit()?;
        Ok(Outcome::Applied)
    }

    pub fn set_fade_enabled(&mut self, enabled: bool) {
        self.settings.set_fade(enabled);
    }

    pub fn set_fade_enabled_for_charging(&mut self, enabled: bool) {
        self.settings.set_fade_charging(enabled);
    }

    pub fn set_intensity(&mut self, intensity: u8) {
        self.settings.set_intensity(intensity);
    }

    pub fn set_low_power_mode(&mut self, enabled: bool) {
        self.settings.set_low_power(enabled);
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.settings.set_debug(enabled);
    }

    /// Set both on/off overrides, `0` unsets a value
    pub fn set_time_override(&mut self, on_ms: u32, off_ms: u32) -> Result<(), Error<B::Error>> {
        self.settings.timing_override_mut().set(on_ms, off_ms)?;
        Ok(())
    }

    pub fn set_time_on(&mut self, on_ms: u32) -> Result<(), Error<B::Error>> {
        self.settings.timing_override_mut().set_on(on_ms)?;
        Ok(())
    }

    pub fn set_time_off(&mut self, off_ms: u32) -> Result<(), Error<B::Error>> {
        self.settings.timing_override_mut().set_off(off_ms)?;
        Ok(())
    }

    pub fn set_step_durations(&mut self, steps: [u8; 4]) -> Result<(), Error<B::Error>> {
        self.settings.step_timing_mut().set_steps(steps)?;
        Ok(())
    }

    pub fn set_step_duration(&mut self, index: usize, duration: u8) -> Result<(), Error<B::Error>> {
        self.settings.step_timing_mut().set_step(index, duration)?;
        Ok(())
    }

    pub fn set_step_bit_shift(&mut self, shift: u8) -> Result<(), Error<B::Error>> {
        self.settings.step_timing_mut().set_shift(shift)?;
        Ok(())
    }

    /// Set the restriction window (`-1` unsets a bound) and re-evaluate it
    pub fn set_restriction_window(&mut self, start: i8, stop: i8) -> Result<(), Error<B::Error>> {
        let window = RestrictionWindow::new(start, stop)?;
        *self.settings.window_mut() = window;
        self.refresh_restrictions().map(|_| ())
    }

    pub fn set_restriction_start(&mut self, hour: i8) -> Result<(), Error<B::Error>> {
        self.settings.window_mut().set_start(hour)?;
        self.refresh_restrictions().map(|_| ())
    }

    pub fn set_restriction_stop(&mut self, hour: i8) -> Result<(), Error<B::Error>> {
        self.settings.window_mut().set_stop(hour)?;
        self.refresh_restrictions().map(|_| ())
    }

    /// Kill switch. While set every output stays off.
    pub fn set_always_disabled(&mut self, disabled: bool) -> Result<(), Error<B::Error>> {
        self.settings.set_always_disabled(disabled);
        self.refresh_restrictions().map(|_| ())
    }

    /// Program the global current scale, `0..=3`
    pub fn set_current_imax(&mut self, level: u8) -> Result<(), Error<B::Error>> {
        if level > IMAX_MAX_LEVEL {
            return Err(Error::InvalidInput);
        }
        set_imax(&mut self.image, level);
        self.bus
            .write_byte(reg::SEL, self.image.get(reg::SEL))
            .map_err(Error::Transport)
    }

    /// Re-evaluate the restriction against the clock
    ///
    /// Forces outputs off or replays saved requests as the verdict changes.
    /// Returns the new verdict.
    pub fn refresh_restrictions(&mut self) -> Result<bool, Error<B::Error>> {
        let gate = self.check_restrictions();
        if gate.pending {
            self.commit()?;
        }
        Ok(gate.blocked)
    }

    /// Write the image to the chip: config block first, enable byte last
    fn commit(&mut self) -> Result<(), Error<B::Error>> {
        self.bus
            .write_block(reg::SEL, self.image.config_block())
            .map_err(Error::Transport)?;
        self.bus
            .write_byte(reg::LEDON, self.image.enable_register())
            .map_err(Error::Transport)
    }

    /// Commit whatever the gate changed and report the suppression
    fn suppressed(&mut self, gate: Gate) -> Result<Outcome, Error<B::Error>> {
        if gate.pending {
            self.commit()?;
        }
        Ok(Outcome::Suppressed)
    }

    fn save_blink(&mut self, channel: Channel, request: BlinkRequest) {
        debug_log!(
            self.settings.debug(),
            "[Engine.save_blink] restricted, saving {} blink {}",
            channel.as_str(),
            request.brightness
        );
        let saved = self.guard.saved_mut();
        if request.is_stop() {
            saved.clear_blink(channel);
        } else {
            saved.save_blink(channel, request);
        }
    }

    /// Shared restriction gate
    ///
    /// Mutates the image only, the caller owns the commit.
    fn check_restrictions(&mut self) -> Gate {
        let hour = self.clock.local_hour();
        let transition = self.guard.evaluate(
            self.settings.always_disabled(),
            self.settings.window(),
            hour,
        );

        match transition {
            Transition::Allowed => Gate {
                blocked: false,
                pending: false,
            },
            Transition::Released(saved) => {
                debug_log!(
                    self.settings.debug(),
                    "[Engine.check_restrictions] restriction lifted at hour {}",
                    hour
                );
                self.replay(&saved);
                Gate {
                    blocked: false,
                    pending: !saved.is_empty(),
                }
            }
            Transition::Entered => {
                debug_log!(
                    self.settings.debug(),
                    "[Engine.check_restrictions] restriction started at hour {}",
                    hour
                );
                pattern::compose(Pattern::Off, &mut self.image, &self.calibration, &self.settings);
                Gate {
                    blocked: true,
                    pending: true,
                }
            }
            Transition::StillBlocked => {
                let lit = self.image.any_enabled();
                if lit {
                    pattern::compose(Pattern::Off, &mut self.image, &self.calibration, &self.settings);
                }
                Gate {
                    blocked: true,
                    pending: lit,
                }
            }
        }
    }

    /// Compose saved requests without consulting the gate: pattern first,
    /// then the solid colour, then red, green and blue blinks
    fn replay(&mut self, saved: &SavedState) {
        if let Some(pattern) = saved.pattern() {
            debug_log!(
                self.settings.debug(),
                "[Engine.replay] pattern {}",
                pattern.as_str()
            );
            pattern::compose(pattern, &mut self.image, &self.calibration, &self.settings);
        }
        if let Some(color) = saved.solid() {
            compose_solid(&mut self.image, color);
        }
        for channel in Channel::ALL {
            if let Some(request) = saved.blink(channel) {
                debug_log!(
                    self.settings.debug(),
                    "[Engine.replay] {} blink",
                    channel.as_str()
                );
                blink::compose(channel, request, &mut self.image, &self.calibration, &self.settings);
            }
        }
    }
}

fn compose_solid(image: &mut RegisterImage, color: Rgb) {
    for channel in Channel::ALL {
        let current = component(color, channel);
        set_channel_power(image, channel, current != 0, false, current);
    }
}
