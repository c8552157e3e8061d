extern crate mb85rs;

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;
use mb85rs::{capacity, FramDevice, Status};

#[derive(Clone, Copy)]
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

struct TraceChip {
    memory: Vec<u8>,
    status: u8,
    wel: bool,
    phase: Phase,
    frame: Vec<u8>,
}

impl TraceChip {
    fn new(mem_size: u32) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            memory: vec![0; mem_size as usize],
            status: 0,
            wel: false,
            phase: Phase::Opcode,
            frame: Vec::new(),
        }))
    }

    fn clock(&mut self, mosi: u8) -> u8 {
        self.frame.push(mosi);
        let mem_size = self.memory.len() as u32;
        match self.phase {
            Phase::Opcode => {
                match mosi {
                    0x06 => {
                        self.wel = true;
                        self.phase = Phase::Drain;
                    }
                    0x04 => {
                        self.wel = false;
                        self.phase = Phase::Drain;
                    }
                    0x05 => self.phase = Phase::StatusOut,
                    0x01 => self.phase = Phase::StatusIn,
                    0x03 | 0x02 => self.phase = Phase::AddrHigh(mosi),
                    _ => self.phase = Phase::Drain,
                }
                0
            }
            Phase::StatusOut => self.status | if self.wel { 0x02 } else { 0 },
            Phase::StatusIn => {
                if self.wel {
                    self.status = mosi & 0b1000_1100;
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
                    0x03 => Phase::ReadStream(addr),
                    _ => Phase::WriteStream(addr),
                };
                0
            }
            Phase::ReadStream(addr) => {
                self.phase = Phase::ReadStream(addr + 1);
                self.memory[(addr % mem_size) as usize]
            }
            Phase::WriteStream(addr) => {
                if self.wel {
                    self.memory[(addr % mem_size) as usize] = mosi;
                }
                self.phase = Phase::WriteStream(addr + 1);
                0
            }
            Phase::Drain => 0,
        }
    }
}

struct TraceBus(Rc<RefCell<TraceChip>>);

impl Transfer<u8> for TraceBus {
    type Error = ();

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = chip.clock(*word);
        }
        Ok(words)
    }
}

impl Write<u8> for TraceBus {
    type Error = ();

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            chip.clock(*word);
        }
        Ok(())
    }
}

struct TracePin(Rc<RefCell<TraceChip>>);

impl OutputPin for TracePin {
    type Error = ();

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().phase = Phase::Opcode;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.0.borrow_mut();
        if !chip.frame.is_empty() {
            println!(
                "xfer: {:4} {:02x?}",
                chip.frame.len(),
                if chip.frame.len() > 16 {
                    &chip.frame[..16]
                } else {
                    chip.frame.as_slice()
                }
            );
        }
        chip.frame.clear();
        Ok(())
    }
}

fn main() {
    let chip = TraceChip::new(capacity::MB85RS16);
    let mut fram = FramDevice::new(
        TraceBus(Rc::clone(&chip)),
        TracePin(Rc::clone(&chip)),
        capacity::MB85RS16,
    );

    fram.init().unwrap();
    fram.write(0x0010, b"ferroelectric").unwrap();

    let mut buf = [0; 13];
    fram.read(0x0010, &mut buf).unwrap();
    println!("read back: {}", core::str::from_utf8(&buf).unwrap());

    fram.write_status(Status::new().with_block_protect(0b11)).unwrap();
    println!("status: {:?}", fram.read_status().unwrap());

    fram.erase_all().unwrap();
    fram.read(0x0010, &mut buf).unwrap();
    println!("after erase: {:02x?}", buf);
}
