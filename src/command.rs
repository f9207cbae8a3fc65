use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::error::SettingError;
use crate::led::Channel as LedChannel;

const ATTR_LED_R: &str = "led_r";
const ATTR_LED_G: &str = "led_g";
const ATTR_LED_B: &str = "led_b";
const ATTR_PATTERN: &str = "led_pattern";
const ATTR_BLINK: &str = "led_blink";
const ATTR_FADE: &str = "led_fade";
const ATTR_FADE_CHARGING: &str = "led_fade_charging";
const ATTR_INTENSITY: &str = "led_intensity";
const ATTR_LOW_POWER: &str = "led_lowpower";
const ATTR_TIME_ON: &str = "led_time_on";
const ATTR_TIME_OFF: &str = "led_time_off";
const ATTR_STEP_SPEED: [&str; 4] = [
    "led_step_speed1",
    "led_step_speed2",
    "led_step_speed3",
    "led_step_speed4",
];
const ATTR_STEP_BIT_SHIFT: &str = "led_step_bit_shift";
const ATTR_BLOCK_START: &str = "led_block_leds_time_start";
const ATTR_BLOCK_STOP: &str = "led_block_leds_time_stop";
const ATTR_ALWAYS_DISABLE: &str = "led_always_disable";
const ATTR_DEBUG_ENABLE: &str = "led_debug_enable";
const ATTR_BR_LEV: &str = "led_br_lev";

/// Operations that can be performed on the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Manual brightness of one channel, 0 switches it off
    SetChannelBrightness { channel: LedChannel, value: u8 },
    /// Named pattern by catalog id. Unknown ids are ignored.
    ApplyPattern(i32),
    /// Blink all channels with a packed `0xRRGGBB` colour
    SetCustomBlink { color: u32, on_ms: u32, off_ms: u32 },
    SetFade(bool),
    SetFadeCharging(bool),
    SetIntensity(u8),
    SetLowPower(bool),
    /// Both timing overrides at once, 0 unsets
    SetTimeOverride { on_ms: u32, off_ms: u32 },
    SetTimeOn(u32),
    SetTimeOff(u32),
    SetStepDurations([u8; 4]),
    SetStepDuration { index: usize, duration: u8 },
    SetStepBitShift(u8),
    /// Restriction window hours, -1 unsets
    SetRestrictionWindow { start: i8, stop: i8 },
    SetRestrictionStart(i8),
    SetRestrictionStop(i8),
    SetAlwaysDisabled(bool),
    SetDebug(bool),
    SetCurrentImax(u8),
}

impl Command {
    /// Parse a textual attribute write such as `("led_blink", "0xFF0000 500 2000")`
    ///
    /// Only the syntax and the integer width are checked here. Range checks
    /// happen when the command is executed.
    pub fn parse(name: &str, value: &str) -> Result<Self, SettingError> {
        let value = value.trim();
        let mut tokens = value.split_whitespace();

        let command = match name {
            ATTR_LED_R => Self::brightness(LedChannel::Red, value)?,
            ATTR_LED_G => Self::brightness(LedChannel::Green, value)?,
            ATTR_LED_B => Self::brightness(LedChannel::Blue, value)?,
            // Trailing pattern type is accepted and ignored
            ATTR_PATTERN => Self::ApplyPattern(parse_decimal(next_token(&mut tokens)?)?),
            ATTR_BLINK => {
                let color = next_token(&mut tokens)?;
                let color = color
                    .strip_prefix("0x")
                    .or_else(|| color.strip_prefix("0X"))
                    .ok_or(SettingError::InvalidInput)?;
                let color = u32::from_str_radix(color, 16).map_err(|_| SettingError::InvalidInput)?;
                let on_ms: u32 = tokens.next().map_or(Ok(0), parse_decimal)?;
                let off_ms: u32 = tokens.next().map_or(Ok(0), parse_decimal)?;
                Self::SetCustomBlink {
                    color,
                    on_ms,
                    off_ms,
                }
            }
            ATTR_FADE => Self::SetFade(parse_flag(value)?),
            ATTR_FADE_CHARGING => Self::SetFadeCharging(parse_flag(value)?),
            ATTR_INTENSITY => Self::SetIntensity(parse_decimal(value)?),
            ATTR_LOW_POWER => Self::SetLowPower(parse_flag(value)?),
            ATTR_TIME_ON => Self::SetTimeOn(parse_decimal(value)?),
            ATTR_TIME_OFF => Self::SetTimeOff(parse_decimal(value)?),
            ATTR_STEP_BIT_SHIFT => Self::SetStepBitShift(parse_decimal(value)?),
            ATTR_BLOCK_START => Self::SetRestrictionStart(parse_decimal(value)?),
            ATTR_BLOCK_STOP => Self::SetRestrictionStop(parse_decimal(value)?),
            ATTR_ALWAYS_DISABLE => Self::SetAlwaysDisabled(parse_flag(value)?),
            ATTR_DEBUG_ENABLE => Self::SetDebug(parse_flag(value)?),
            ATTR_BR_LEV => {
                let level = value
                    .strip_prefix("0x")
                    .or_else(|| value.strip_prefix("0X"))
                    .unwrap_or(value);
                Self::SetCurrentImax(
                    u8::from_str_radix(level, 16).map_err(|_| SettingError::InvalidInput)?,
                )
            }
            name => {
                let index = ATTR_STEP_SPEED
                    .iter()
                    .position(|attr| *attr == name)
                    .ok_or(SettingError::InvalidInput)?;
                Self::SetStepDuration {
                    index,
                    duration: parse_decimal(value)?,
                }
            }
        };
        Ok(command)
    }

    /// Returns true if the command can change the restriction verdict
    pub const fn touches_restriction(&self) -> bool {
        matches!(
            self,
            Self::SetRestrictionWindow { .. }
                | Self::SetRestrictionStart(_)
                | Self::SetRestrictionStop(_)
                | Self::SetAlwaysDisabled(_)
        )
    }

    fn brightness(channel: LedChannel, value: &str) -> Result<Self, SettingError> {
        // Decimal or 0x-prefixed hex
        let value = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => value.parse(),
        }
        .map_err(|_| SettingError::InvalidInput)?;
        Ok(Self::SetChannelBrightness { channel, value })
    }
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<&'a str, SettingError> {
    tokens.next().ok_or(SettingError::InvalidInput)
}

fn parse_decimal<T: core::str::FromStr>(text: &str) -> Result<T, SettingError> {
    text.parse().map_err(|_| SettingError::InvalidInput)
}

fn parse_flag(text: &str) -> Result<bool, SettingError> {
    match text {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(SettingError::InvalidInput),
    }
}

const COMMAND_CHANNEL_SIZE: usize = 4;

/// Type alias for command sender
pub type CommandSender = Sender<'static, CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE>;

/// Type alias for command receiver
pub type CommandReceiver =
    Receiver<'static, CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE>;

/// Type alias for the command channel
pub type CommandChannel = Channel<CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE>;
