use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

/// Byte-oriented access to a shared two-wire bus.
///
/// Both operations report how many bytes were actually transferred. The driver
/// treats any count other than the requested one as a failed transfer.
pub trait Transport {
    type Error;

    /// Writes `bytes` to the device at `address`.
    ///
    /// With `nostop` set the bus is not released after the write, so that the
    /// following [`Transport::read`] continues the same transaction. This is
    /// how a register address is selected ahead of a read.
    fn write(&mut self, address: u8, bytes: &[u8], nostop: bool) -> Result<usize, Self::Error>;

    /// Reads `buffer.len()` bytes from the device at `address`.
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

// Register addresses are two bytes; leave room for a little more.
const MAX_HELD_WRITE: usize = 4;

/// [`Transport`] on top of an `embedded-hal` blocking I2C bus.
///
/// A write issued with `nostop` is held back and sent as the write half of a
/// combined write-read (repeated start) when the next read arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cTransport<I2C> {
    i2c: I2C,
    held: [u8; MAX_HELD_WRITE],
    held_len: Option<usize>,
}

impl<I2C, E> I2cTransport<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E> + Read<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            held: [0; MAX_HELD_WRITE],
            held_len: None,
        }
    }

    /// Releases the underlying bus.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> Transport for I2cTransport<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E> + Read<Error = E>,
{
    type Error = E;

    fn write(&mut self, address: u8, bytes: &[u8], nostop: bool) -> Result<usize, E> {
        if !nostop {
            self.held_len = None;
            self.i2c.write(address, bytes)?;
            return Ok(bytes.len());
        }

        if bytes.len() > MAX_HELD_WRITE {
            // Nothing accepted; the caller sees a short transfer.
            self.held_len = None;
            return Ok(0);
        }

        self.held[..bytes.len()].copy_from_slice(bytes);
        self.held_len = Some(bytes.len());
        Ok(bytes.len())
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<usize, E> {
        match self.held_len.take() {
            Some(len) => self.i2c.write_read(address, &self.held[..len], buffer)?,
            None => self.i2c.read(address, buffer)?,
        }

        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh0::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn plain_write_is_forwarded() {
        let expectations = [Transaction::write(0x29, vec![0x00, 0x87, 0x40])];
        let mut transport = I2cTransport::new(I2cMock::new(&expectations));

        assert_eq!(transport.write(0x29, &[0x00, 0x87, 0x40], false).unwrap(), 3);

        transport.free().done();
    }

    #[test]
    fn held_write_becomes_write_read() {
        let expectations = [Transaction::write_read(
            0x29,
            vec![0x00, 0x96],
            vec![0x01, 0x2c],
        )];
        let mut transport = I2cTransport::new(I2cMock::new(&expectations));

        assert_eq!(transport.write(0x29, &[0x00, 0x96], true).unwrap(), 2);

        let mut buffer = [0; 2];
        assert_eq!(transport.read(0x29, &mut buffer).unwrap(), 2);
        assert_eq!(buffer, [0x01, 0x2c]);

        transport.free().done();
    }

    #[test]
    fn read_without_held_write_is_plain_read() {
        let expectations = [Transaction::read(0x29, vec![0xaa])];
        let mut transport = I2cTransport::new(I2cMock::new(&expectations));

        let mut buffer = [0; 1];
        assert_eq!(transport.read(0x29, &mut buffer).unwrap(), 1);
        assert_eq!(buffer, [0xaa]);

        transport.free().done();
    }

    #[test]
    fn oversized_held_write_is_refused() {
        let expectations: [Transaction; 0] = [];
        let mut transport = I2cTransport::new(I2cMock::new(&expectations));

        assert_eq!(transport.write(0x29, &[0; 5], true).unwrap(), 0);

        transport.free().done();
    }
}
