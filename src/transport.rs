//! Register bus access
//!
//! The engine only talks to [`RegisterBus`]. [`I2cBus`] implements it on top
//! of an `embedded-hal` I2C peripheral.

use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::register::REGISTER_COUNT;

/// AN30259A 7-bit I2C address
pub const DEFAULT_ADDRESS: u8 = 0x30;

/// Register address flag enabling auto-increment for block transfers
const AUTO_INCREMENT: u8 = 0x80;

const FRAME_CAPACITY: usize = REGISTER_COUNT + 1;

/// Byte-level access to the chip's register file
///
/// Implementations own retries and timeouts; the engine reports whatever
/// error comes back.
pub trait RegisterBus {
    type Error;

    /// Write consecutive registers starting at `start`
    fn write_block(&mut self, start: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Write a single register
    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;

    /// Read consecutive registers starting at `start` into `buffer`
    fn read_block(&mut self, start: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// AN30259A over I2C
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cBus<I2C> {
    /// Create a bus with the default address (0x30)
    pub fn new(i2c: I2C) -> Self {
        Self::new_with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn new_with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give back the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cBus<I2C> {
    type Error = I2C::Error;

    fn write_block(&mut self, start: u8, data: &[u8]) -> Result<(), Self::Error> {
        debug_assert!(data.len() <= REGISTER_COUNT);
        let mut frame: Vec<u8, FRAME_CAPACITY> = Vec::new();
        // Cannot overflow: capacity is the address byte plus the whole register file
        frame.push(start | AUTO_INCREMENT).ok();
        frame.extend_from_slice(data).ok();
        self.i2c.write(self.address, &frame)
    }

    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[address, value])
    }

    fn read_block(&mut self, start: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c
            .write_read(self.address, &[start | AUTO_INCREMENT], buffer)
    }
}
