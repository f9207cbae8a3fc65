#![allow(dead_code)]

use myrtio_an30259a::register::REGISTER_COUNT;
use myrtio_an30259a::{Engine, EngineConfig, LocalClock, RegisterBus};

/// One bus transaction as seen by the chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Block { start: u8, data: Vec<u8> },
    Byte { address: u8, value: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// Register bus backed by an in-memory chip
#[derive(Debug, Default)]
pub struct MockBus {
    pub writes: Vec<Write>,
    pub chip: [u8; REGISTER_COUNT],
    pub fail: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegisterBus for MockBus {
    type Error = BusFault;

    fn write_block(&mut self, start: u8, data: &[u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        let start = start as usize;
        self.chip[start..start + data.len()].copy_from_slice(data);
        self.writes.push(Write::Block {
            start: start as u8,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        if address == 0x00 && value == 0x01 {
            self.chip = [0; REGISTER_COUNT];
        } else {
            self.chip[address as usize] = value;
        }
        self.writes.push(Write::Byte { address, value });
        Ok(())
    }

    fn read_block(&mut self, start: u8, buffer: &mut [u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        let start = start as usize;
        buffer.copy_from_slice(&self.chip[start..start + buffer.len()]);
        Ok(())
    }
}

/// Clock whose hour is set by the test
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    pub hour: u8,
    /// Number of times the engine asked for the hour
    pub reads: u32,
}

impl MockClock {
    pub fn at(hour: u8) -> Self {
        Self { hour, reads: 0 }
    }
}

impl LocalClock for MockClock {
    fn local_hour(&mut self) -> u8 {
        self.reads += 1;
        self.hour
    }
}

pub type TestEngine = Engine<MockBus, MockClock>;

pub fn engine_at(hour: u8) -> TestEngine {
    Engine::new(MockBus::new(), MockClock::at(hour), &EngineConfig::default())
}

pub fn engine() -> TestEngine {
    engine_at(12)
}
