#![no_std]

/// Print a line when built with `esp32-log`
macro_rules! log {
    ($($arg:tt)*) => {
        #[cfg(feature = "esp32-log")]
        {
            esp_println::println!($($arg)*);
        }
    };
}

/// Print a line when built with `esp32-log` and `$enabled` holds
macro_rules! debug_log {
    ($enabled:expr, $($arg:tt)*) => {
        #[cfg(feature = "esp32-log")]
        {
            if $enabled {
                esp_println::println!($($arg)*);
            }
        }
        #[cfg(not(feature = "esp32-log"))]
        {
            let _ = $enabled;
        }
    };
}

pub mod blink;
pub mod brightness;
pub mod color;
pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod led;
pub mod pattern;
pub mod register;
pub mod restriction;
pub mod timing;
pub mod transport;

pub use blink::BlinkRequest;
pub use command::{Command, CommandChannel, CommandReceiver, CommandSender};
pub use config::{Calibration, EngineConfig, Settings};
pub use controller::{BrightnessRequests, Controller, RESTRICTION_CHECK_PERIOD};
pub use engine::{Engine, LedCommandMode, Outcome};
pub use error::{Error, SettingError};
pub use led::Channel;
pub use pattern::Pattern;
pub use register::{RegisterImage, SlopeProfile};
pub use restriction::{RestrictionWindow, SavedState};
pub use transport::{I2cBus, RegisterBus};

pub use color::Rgb;
pub use embassy_time::Duration;

/// Local wall-clock source
///
/// Implement this trait to feed the restriction window. The engine only
/// needs the current hour of the day in local time.
pub trait LocalClock {
    /// Current local hour, `0..=23`
    fn local_hour(&mut self) -> u8;
}
