use crate::registers::Register;
use crate::transport::Transport;
use crate::Error;

/// Register-level framing on top of a [`Transport`].
///
/// Registers are addressed with 16 bits. Addresses and values are big-endian
/// on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterBus<T> {
    transport: T,
}

impl<T: Transport> RegisterBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn free(self) -> T {
        self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn write_u8(
        &mut self,
        addr: u8,
        register: Register,
        data: u8,
    ) -> Result<(), Error<T::Error>> {
        let reg_bytes = register.to_be_bytes();
        self.write(addr, &[reg_bytes[0], reg_bytes[1], data])
    }

    pub fn write_u16(
        &mut self,
        addr: u8,
        register: Register,
        data: u16,
    ) -> Result<(), Error<T::Error>> {
        let reg_bytes = register.to_be_bytes();
        let data_bytes = data.to_be_bytes();
        self.write(
            addr,
            &[reg_bytes[0], reg_bytes[1], data_bytes[0], data_bytes[1]],
        )
    }

    pub fn write_u32(
        &mut self,
        addr: u8,
        register: Register,
        data: u32,
    ) -> Result<(), Error<T::Error>> {
        let reg_bytes = register.to_be_bytes();
        let data_bytes = data.to_be_bytes();
        self.write(
            addr,
            &[
                reg_bytes[0],
                reg_bytes[1],
                data_bytes[0],
                data_bytes[1],
                data_bytes[2],
                data_bytes[3],
            ],
        )
    }

    pub fn read_u8(&mut self, addr: u8, register: Register) -> Result<u8, Error<T::Error>> {
        let mut buffer = [0];
        self.read_block(addr, register, &mut buffer)?;

        Ok(buffer[0])
    }

    pub fn read_u16(&mut self, addr: u8, register: Register) -> Result<u16, Error<T::Error>> {
        let mut buffer = [0; 2];
        self.read_block(addr, register, &mut buffer)?;

        Ok(u16::from_be_bytes(buffer))
    }

    /// Selects `register` without releasing the bus, then fills `buffer`
    /// with consecutive registers starting there.
    pub fn read_block(
        &mut self,
        addr: u8,
        register: Register,
        buffer: &mut [u8],
    ) -> Result<(), Error<T::Error>> {
        let reg_bytes = register.to_be_bytes();
        let written = self.transport.write(addr, &reg_bytes, true)?;
        expect_transferred(reg_bytes.len(), written)?;

        let read = self.transport.read(addr, buffer)?;
        expect_transferred(buffer.len(), read)
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Error<T::Error>> {
        let written = self.transport.write(addr, bytes, false)?;
        expect_transferred(bytes.len(), written)
    }
}

fn expect_transferred<E>(expected: usize, actual: usize) -> Result<(), Error<E>> {
    if actual != expected {
        trace!("short transfer: {} of {} bytes", actual, expected);
        return Err(Error::Transfer { expected, actual });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimError, SimulatedSensor, Transfer};

    const ADDR: u8 = 0x29;

    #[test]
    fn writes_are_framed_big_endian() {
        let mut bus = RegisterBus::new(SimulatedSensor::new());

        bus.write_u8(ADDR, 0x0087, 0x40).unwrap();
        bus.write_u16(ADDR, 0x005e, 0x01ae).unwrap();
        bus.write_u32(ADDR, 0x006c, 0x0001_0203).unwrap();

        let sim = bus.free();
        assert_eq!(
            sim.transfers(),
            &[
                Transfer::Write(vec![0x00, 0x87, 0x40]),
                Transfer::Write(vec![0x00, 0x5e, 0x01, 0xae]),
                Transfer::Write(vec![0x00, 0x6c, 0x00, 0x01, 0x02, 0x03]),
            ]
        );
    }

    #[test]
    fn reads_select_register_then_read() {
        let mut sim = SimulatedSensor::new();
        sim.set_u16(0x0096, 0x04d2);
        sim.set_u8(0x0088, 0x01);
        let mut bus = RegisterBus::new(sim);

        assert_eq!(bus.read_u16(ADDR, 0x0096).unwrap(), 1234);
        assert_eq!(bus.read_u8(ADDR, 0x0088).unwrap(), 0x01);

        let sim = bus.free();
        assert_eq!(
            sim.transfers(),
            &[
                Transfer::Select(vec![0x00, 0x96]),
                Transfer::Read(2),
                Transfer::Select(vec![0x00, 0x88]),
                Transfer::Read(1),
            ]
        );
    }

    #[test]
    fn block_read_spans_consecutive_registers() {
        let mut sim = SimulatedSensor::new();
        for (offset, value) in (0x89u16..0x89 + 17).zip(10u8..) {
            sim.set_u8(offset, value);
        }
        let mut bus = RegisterBus::new(sim);

        let mut block = [0; 17];
        bus.read_block(ADDR, 0x0089, &mut block).unwrap();

        assert_eq!(block[0], 10);
        assert_eq!(block[16], 26);
    }

    #[test]
    fn short_write_is_a_transfer_error() {
        let mut sim = SimulatedSensor::new();
        sim.shorten_transfer(0);
        let mut bus = RegisterBus::new(sim);

        assert_eq!(
            bus.write_u16(ADDR, 0x005e, 0x0102),
            Err(Error::Transfer {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn short_read_is_a_transfer_error() {
        let mut sim = SimulatedSensor::new();
        // Transfer 0 selects the register, transfer 1 reads it.
        sim.shorten_transfer(1);
        let mut bus = RegisterBus::new(sim);

        assert_eq!(
            bus.read_u16(ADDR, 0x0096),
            Err(Error::Transfer {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn bus_errors_are_forwarded() {
        let mut sim = SimulatedSensor::new();
        sim.fail_transfer(0);
        let mut bus = RegisterBus::new(sim);

        assert_eq!(bus.write_u8(ADDR, 0x0086, 0x01), Err(Error::Bus(SimError)));
    }
}
