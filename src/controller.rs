//! Async shell around the [`Engine`]
//!
//! The engine itself is synchronous. The controller puts it behind one async
//! mutex and runs the deferred work as loops: one coalescing brightness writer
//! per channel, the periodic restriction check and the command consumer. Each
//! loop ends when [`Controller::shutdown`] is called.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use crate::LocalClock;
use crate::command::{Command, CommandReceiver};
use crate::engine::{Engine, Outcome};
use crate::error::Error;
use crate::led::{CHANNEL_COUNT, Channel};
use crate::transport::RegisterBus;

/// Interval between restriction re-evaluations while a window is set
pub const RESTRICTION_CHECK_PERIOD: Duration = Duration::from_secs(30);

type Notify = Signal<CriticalSectionRawMutex, ()>;

/// Latest pending brightness per channel
///
/// A new request overwrites one that has not been written yet, so rapid
/// changes collapse to the last value.
pub struct BrightnessRequests {
    slots: [Signal<CriticalSectionRawMutex, u8>; CHANNEL_COUNT],
}

impl Default for BrightnessRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl BrightnessRequests {
    pub const fn new() -> Self {
        Self {
            slots: [Signal::new(), Signal::new(), Signal::new()],
        }
    }

    pub fn request(&self, channel: Channel, value: u8) {
        self.slots[channel.index()].signal(value);
    }

    /// Take the pending value of `channel`, if any
    pub fn try_take(&self, channel: Channel) -> Option<u8> {
        self.slots[channel.index()].try_take()
    }

    pub async fn wait(&self, channel: Channel) -> u8 {
        self.slots[channel.index()].wait().await
    }
}

/// Single-writer front end of the engine
pub struct Controller<B: RegisterBus, C: LocalClock> {
    engine: Mutex<CriticalSectionRawMutex, Engine<B, C>>,
    brightness: BrightnessRequests,
    restriction_armed: Notify,
    check_period: Duration,

    // A signal wakes a single waiter, so every loop has its own
    stop_brightness: [Notify; CHANNEL_COUNT],
    stop_restriction: Notify,
    stop_commands: Notify,
}

impl<B: RegisterBus, C: LocalClock> Controller<B, C> {
    pub fn new(engine: Engine<B, C>) -> Self {
        Self::with_check_period(engine, RESTRICTION_CHECK_PERIOD)
    }

    /// Like [`Controller::new`] with a custom restriction check interval
    pub fn with_check_period(engine: Engine<B, C>, check_period: Duration) -> Self {
        Self {
            engine: Mutex::new(engine),
            brightness: BrightnessRequests::new(),
            restriction_armed: Signal::new(),
            check_period,
            stop_brightness: [Signal::new(), Signal::new(), Signal::new()],
            stop_restriction: Signal::new(),
            stop_commands: Signal::new(),
        }
    }

    /// Exclusive access to the engine
    ///
    /// The register image seen through the guard is never half built.
    pub async fn lock(&self) -> MutexGuard<'_, CriticalSectionRawMutex, Engine<B, C>> {
        self.engine.lock().await
    }

    /// Run a command under the engine lock
    ///
    /// Restriction changes wake the periodic check.
    pub async fn execute(&self, command: Command) -> Result<Outcome, Error<B::Error>> {
        let result = self.engine.lock().await.execute(command);
        if result.is_ok() && command.touches_restriction() {
            self.arm_restriction_timer();
        }
        result
    }

    /// Set the restriction window and start the periodic check
    pub async fn set_restriction_window(
        &self,
        start: i8,
        stop: i8,
    ) -> Result<(), Error<B::Error>> {
        self.engine
            .lock()
            .await
            .set_restriction_window(start, stop)?;
        self.arm_restriction_timer();
        Ok(())
    }

    /// Queue a brightness write for `channel`
    pub fn request_brightness(&self, channel: Channel, value: u8) {
        self.brightness.request(channel, value);
    }

    /// Wake the restriction check. Arming an armed timer does nothing.
    pub fn arm_restriction_timer(&self) {
        self.restriction_armed.signal(());
    }

    /// Write every queued brightness now
    pub async fn apply_pending_brightness(&self) -> Result<(), Error<B::Error>> {
        for channel in Channel::ALL {
            if let Some(value) = self.brightness.try_take(channel) {
                self.engine
                    .lock()
                    .await
                    .set_channel_brightness(channel, value)?;
            }
        }
        Ok(())
    }

    /// Brightness writer for one channel
    pub async fn run_brightness(&self, channel: Channel) {
        let stop = &self.stop_brightness[channel.index()];
        loop {
            match select(self.brightness.wait(channel), stop.wait()).await {
                Either::First(value) => {
                    let result = self
                        .engine
                        .lock()
                        .await
                        .set_channel_brightness(channel, value);
                    if result.is_err() {
                        log!(
                            "[Controller.run_brightness] {} write failed",
                            channel.as_str()
                        );
                    }
                }
                Either::Second(()) => return,
            }
        }
    }

    /// Periodic restriction check
    ///
    /// Sleeps until armed while the window is unset, otherwise re-evaluates
    /// every check period ([`RESTRICTION_CHECK_PERIOD`] by default).
    pub async fn run_restriction_timer(&self) {
        loop {
            let active = self.engine.lock().await.settings().window().is_active();
            if !active {
                match select(self.restriction_armed.wait(), self.stop_restriction.wait()).await {
                    Either::First(()) => continue,
                    Either::Second(()) => return,
                }
            }

            match select(Timer::after(self.check_period), self.stop_restriction.wait()).await
            {
                Either::First(()) => {
                    if self.engine.lock().await.refresh_restrictions().is_err() {
                        log!("[Controller.run_restriction_timer] bus write failed");
                    }
                }
                Either::Second(()) => return,
            }
        }
    }

    /// Consume queued commands until shutdown
    pub async fn run_commands(&self, commands: CommandReceiver) {
        loop {
            match select(commands.receive(), self.stop_commands.wait()).await {
                Either::First(command) => {
                    if self.execute(command).await.is_err() {
                        log!("[Controller.run_commands] {:?} failed", command);
                    }
                }
                Either::Second(()) => return,
            }
        }
    }

    /// Stop every loop. Pending brightness values stay queued.
    pub fn shutdown(&self) {
        for stop in &self.stop_brightness {
            stop.signal(());
        }
        self.stop_restriction.signal(());
        self.stop_commands.signal(());
    }
}
