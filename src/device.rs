use core::fmt::Debug;

use byteorder::{BigEndian, ByteOrder};
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;

#[cfg(feature = "defmt")]
use defmt::debug;

use crate::{Address, Status};

enum Command {
    WriteStatusRegister = 0x01,
    Write = 0x02,
    Read = 0x03,
    WriteDisable = 0x04,
    ReadStatusRegister = 0x05,
    WriteEnable = 0x06,
}

const ERASE_CHUNK: usize = 32;

pub enum Error<SPI: spi::Transfer<u8> + spi::Write<u8>, CS: OutputPin> {
    ChipSelectError(CS::Error),
    TransferError(<SPI as spi::Transfer<u8>>::Error),
    WriteError(<SPI as spi::Write<u8>>::Error),
    OutOfBounds,
}

impl<SPI: spi::Transfer<u8> + spi::Write<u8>, CS: OutputPin> Debug for Error<SPI, CS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChipSelectError(_) => write!(f, "ChipSelect Error"),
            Self::TransferError(_) => write!(f, "SPI Transfer Error"),
            Self::WriteError(_) => write!(f, "SPI Write Error"),
            Self::OutOfBounds => write!(f, "Address out of bounds"),
        }
    }
}

/// MB85RS protocol encoder over a full-duplex SPI transport and an
/// active-low chip-select line.
///
/// The WEL latch lives in chip hardware, not here: the only state this
/// struct holds between calls is the identity of its handles and the
/// array capacity. Exclusive ownership of the transport/select pair is
/// the caller's concurrency model; all operations take `&mut self`.
#[derive(Debug)]
pub struct FramDevice<SPI: spi::Transfer<u8> + spi::Write<u8>, CS: OutputPin> {
    spi: SPI,
    cs: CS,
    mem_size: u32,
}

impl<SPI: spi::Transfer<u8> + spi::Write<u8>, CS: OutputPin> FramDevice<SPI, CS> {
    /// Binds the handles. Performs no bus I/O; call [`Self::init`] before
    /// any other operation.
    pub fn new(spi: SPI, cs: CS, mem_size: u32) -> Self {
        Self { spi, cs, mem_size }
    }

    pub fn mem_size(&self) -> u32 {
        self.mem_size
    }

    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    pub fn cs_mut(&mut self) -> &mut CS {
        &mut self.cs
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Parks chip-select at its inactive level and clears the write-enable
    /// latch, leaving the chip unprotected and write-disabled. The select
    /// pin must already be configured as an output by the HAL.
    pub fn init(&mut self) -> Result<(), Error<SPI, CS>> {
        self.cs.set_high().map_err(Error::ChipSelectError)?;
        self.write_disable()
    }

    /// Single-opcode WREN frame. WEL is true on return.
    pub fn write_enable(&mut self) -> Result<(), Error<SPI, CS>> {
        self.transaction(|spi| {
            spi.write(&[Command::WriteEnable as u8])
                .map_err(Error::WriteError)
        })
    }

    /// Single-opcode WRDI frame. WEL is false on return.
    pub fn write_disable(&mut self) -> Result<(), Error<SPI, CS>> {
        self.transaction(|spi| {
            spi.write(&[Command::WriteDisable as u8])
                .map_err(Error::WriteError)
        })
    }

    /// Never touches WEL.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI, CS>> {
        self.transaction(|spi| {
            spi.transfer(&mut [Command::ReadStatusRegister as u8, 0])
                .map(|buf| Status::from_bytes([buf[1]]))
                .map_err(Error::TransferError)
        })
    }

    /// The chip silently ignores WRSR while WEL is false, so the
    /// WREN/WRDI bracket is part of this call: WEL is false both before
    /// and after it returns. The WEL bit of `status` is stripped before
    /// transmission; the latch is only ever toggled via WREN/WRDI.
    pub fn write_status(&mut self, status: Status) -> Result<(), Error<SPI, CS>> {
        let mut status = status;
        status.set_write_enable_latch(false);
        self.write_enable()?;
        let res = self.transaction(|spi| {
            spi.write(&[
                Command::WriteStatusRegister as u8,
                status.into_bytes()[0],
            ])
            .map_err(Error::WriteError)
        });
        self.write_disable().and(res)
    }

    /// Streams `buf.len()` bytes starting at `addr` in one READ frame;
    /// the chip auto-increments its internal pointer, no per-byte command
    /// re-issue. An empty `buf` is a valid no-op frame (opcode and
    /// address only). Never touches WEL.
    pub fn read(&mut self, addr: Address, buf: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        self.check_bounds(addr, buf.len())?;
        #[cfg(feature = "defmt")]
        debug!("fram: read {} bytes @ {:#x}", buf.len(), addr);
        self.transaction(|spi| {
            let mut cmd = Self::mem_cmd(Command::Read, addr);
            spi.transfer(&mut cmd)
                .and_then(|_| spi.transfer(buf))
                .map_err(Error::TransferError)?;
            Ok(())
        })
    }

    /// Streams `data` starting at `addr` in one WRITE frame. The chip
    /// silently ignores WRITE while WEL is false, so the WREN/WRDI
    /// bracket is part of this call: WEL is false both before and after
    /// it returns.
    pub fn write(&mut self, addr: Address, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.check_bounds(addr, data.len())?;
        #[cfg(feature = "defmt")]
        debug!("fram: write {} bytes @ {:#x}", data.len(), addr);
        self.write_enable()?;
        let res = self.transaction(|spi| {
            let cmd = Self::mem_cmd(Command::Write, addr);
            spi.write(&cmd)
                .and_then(|_| spi.write(data))
                .map_err(Error::WriteError)
        });
        self.write_disable().and(res)
    }

    /// Clears the status register (dropping all block protection), then
    /// zeroes the whole array in a single WRITE frame from address 0.
    /// WEL is false both before and after this call returns.
    pub fn erase_all(&mut self) -> Result<(), Error<SPI, CS>> {
        #[cfg(feature = "defmt")]
        debug!("fram: erase {} bytes", self.mem_size);
        self.write_status(Status::new())?;
        self.write_enable()?;
        let mut remaining = self.mem_size as usize;
        let res = self.transaction(|spi| {
            let cmd = Self::mem_cmd(Command::Write, 0);
            spi.write(&cmd).map_err(Error::WriteError)?;
            let zeroes = [0; ERASE_CHUNK];
            while remaining > 0 {
                let chunk = usize::min(remaining, ERASE_CHUNK);
                spi.write(&zeroes[..chunk]).map_err(Error::WriteError)?;
                remaining -= chunk;
            }
            Ok(())
        });
        self.write_disable().and(res)
    }

    /// Frames a single chip-select cycle around `tx`. The select line is
    /// released even when the transfer body fails.
    fn transaction<RES, TX: FnOnce(&mut SPI) -> Result<RES, Error<SPI, CS>>>(
        &mut self,
        tx: TX,
    ) -> Result<RES, Error<SPI, CS>> {
        self.cs.set_low().map_err(Error::ChipSelectError)?;
        let res = tx(&mut self.spi);
        self.cs.set_high().map_err(Error::ChipSelectError).and(res)
    }

    fn mem_cmd(cmd: Command, addr: Address) -> [u8; 3] {
        let mut buf = [cmd as u8, 0, 0];
        BigEndian::write_u16(&mut buf[1..], addr);
        buf
    }

    fn check_bounds(&self, addr: Address, len: usize) -> Result<(), Error<SPI, CS>> {
        if addr as u64 + len as u64 > self.mem_size as u64 {
            return Err(Error::OutOfBounds);
        }
        Ok(())
    }
}
