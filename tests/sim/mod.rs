#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;

pub const MEM_SIZE: u32 = 8 * 1024;

const WRSR: u8 = 0x01;
const WRITE: u8 = 0x02;
const READ: u8 = 0x03;
const WRDI: u8 = 0x04;
const RDSR: u8 = 0x05;
const WREN: u8 = 0x06;

// Status bits the chip actually latches: BP0, BP1, WPEN.
const STATUS_WRITABLE: u8 = 0b1000_1100;
const STATUS_WEL: u8 = 0b0000_0010;

/// One byte clocked over the bus, with the select line level and the WEL
/// latch value sampled at the moment the byte arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusEvent {
    pub selected: bool,
    pub mosi: u8,
    pub wel: bool,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Opcode,
    StatusOut,
    StatusIn,
    AddrHigh(u8),
    AddrLow(u8, u8),
    ReadStream(u32),
    WriteStream(u32),
    Drain,
}

struct ChipState {
    memory: Vec<u8>,
    status: u8,
    wel: bool,
    selected: bool,
    phase: Phase,
    events: Vec<BusEvent>,
    select_cycles: usize,
}

impl ChipState {
    fn clock(&mut self, mosi: u8) -> u8 {
        self.events.push(BusEvent {
            selected: self.selected,
            mosi,
            wel: self.wel,
        });
        if !self.selected {
            return 0xff;
        }
        match self.phase {
            Phase::Opcode => {
                match mosi {
                    WREN => {
                        self.wel = true;
                        self.phase = Phase::Drain;
                    }
                    WRDI => {
                        self.wel = false;
                        self.phase = Phase::Drain;
                    }
                    RDSR => self.phase = Phase::StatusOut,
                    WRSR => self.phase = Phase::StatusIn,
                    READ | WRITE => self.phase = Phase::AddrHigh(mosi),
                    _ => self.phase = Phase::Drain,
                }
                0
            }
            Phase::StatusOut => self.status | if self.wel { STATUS_WEL } else { 0 },
            Phase::StatusIn => {
                if self.wel {
                    self.status = mosi & STATUS_WRITABLE;
                }
                self.phase = Phase::Drain;
                0
            }
            Phase::AddrHigh(op) => {
                self.phase = Phase::AddrLow(op, mosi);
                0
            }
            Phase::AddrLow(op, hi) => {
                let addr = u16::from_be_bytes([hi, mosi]) as u32;
                self.phase = match op {
                    READ => Phase::ReadStream(addr),
                    _ => Phase::WriteStream(addr),
                };
                0
            }
            Phase::ReadStream(addr) => {
                self.phase = Phase::ReadStream(addr + 1);
                self.memory[(addr % MEM_SIZE) as usize]
            }
            Phase::WriteStream(addr) => {
                if self.wel {
                    self.memory[(addr % MEM_SIZE) as usize] = mosi;
                }
                self.phase = Phase::WriteStream(addr + 1);
                0
            }
            Phase::Drain => 0,
        }
    }
}

/// Simulated MB85RS chip. `split` hands out the bus and select-line ends
/// the driver consumes; the remaining handle observes chip-side state.
pub struct SimFram {
    state: Rc<RefCell<ChipState>>,
}

impl SimFram {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ChipState {
                memory: vec![0; MEM_SIZE as usize],
                status: 0,
                wel: false,
                selected: false,
                phase: Phase::Opcode,
                events: Vec::new(),
                select_cycles: 0,
            })),
        }
    }

    pub fn split(&self) -> (SimBus, SimPin) {
        (
            SimBus {
                state: Rc::clone(&self.state),
            },
            SimPin {
                state: Rc::clone(&self.state),
            },
        )
    }

    pub fn wel(&self) -> bool {
        self.state.borrow().wel
    }

    pub fn status(&self) -> u8 {
        self.state.borrow().status
    }

    pub fn selected(&self) -> bool {
        self.state.borrow().selected
    }

    pub fn mem(&self, addr: u32) -> u8 {
        self.state.borrow().memory[addr as usize]
    }

    pub fn set_mem(&self, addr: u32, val: u8) {
        self.state.borrow_mut().memory[addr as usize] = val;
    }

    pub fn fill(&self, val: u8) {
        self.state.borrow_mut().memory.iter_mut().for_each(|b| *b = val);
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.select_cycles = 0;
    }

    pub fn select_cycles(&self) -> usize {
        self.state.borrow().select_cycles
    }
}

pub struct SimBus {
    state: Rc<RefCell<ChipState>>,
}

impl Transfer<u8> for SimBus {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut state = self.state.borrow_mut();
        for word in words.iter_mut() {
            *word = state.clock(*word);
        }
        Ok(words)
    }
}

impl Write<u8> for SimBus {
    type Error = Infallible;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        for word in words {
            state.clock(*word);
        }
        Ok(())
    }
}

pub struct SimPin {
    state: Rc<RefCell<ChipState>>,
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.selected = true;
        state.select_cycles += 1;
        state.phase = Phase::Opcode;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.selected = false;
        state.phase = Phase::Drain;
        Ok(())
    }
}
