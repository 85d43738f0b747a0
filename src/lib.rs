//! Driver for the VL53L1X time-of-flight ranging sensor.
//!
//! The driver brings the sensor from power-on to continuous timed ranging:
//! soft reset, oscillator calibration readout, distance-mode and timing-budget
//! configuration under a grouped parameter hold, then polling for results.
//!
//! All calls block until the bus transfer completes. The driver owns its
//! transport; sensors sharing a physical bus need the caller to serialize
//! access to it.
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt; // must come first, the other modules use its macros

pub mod codec;
pub mod config;
pub mod measurement;
pub mod registers;
pub mod timing;
pub mod transport;

#[cfg(test)]
mod sim;

use core::fmt::{Display, Formatter};

use embedded_hal::blocking::delay::DelayMs;

use crate::codec::RegisterBus;
use crate::config::DistanceModeConfig;
use crate::measurement::RawRangeResult;
use crate::registers::*;
use crate::timing::EncodedTimeouts;

pub use crate::config::{Config, DistanceMode, PollPolicy, ADDR};
pub use crate::measurement::{Measurement, RangeStatus};
pub use crate::transport::{I2cTransport, Transport};

// Width of each half of the soft reset pulse.
const RESET_PULSE_MS: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Error<E> {
    /// The transport reported an error.
    Bus(E),
    /// The transport moved a different number of bytes than requested.
    Transfer { expected: usize, actual: usize },
    /// The oscillator readout was zero; the sensor is absent or not booted.
    Calibration {
        fast_osc_frequency: u16,
        osc_calibrate_val: u16,
    },
    /// The operation is not allowed in this state. Nothing was sent.
    InvalidState(State),
    /// No data became ready within the poll policy.
    Timeout,
}

impl<E> From<E> for Error<E> {
    fn from(bus_error: E) -> Self {
        Error::Bus(bus_error)
    }
}

impl<E: Display> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(error) => error.fmt(f),
            Error::Transfer { expected, actual } => f.write_fmt(format_args!(
                "short transfer: {} of {} bytes",
                actual, expected
            )),
            Error::Calibration {
                fast_osc_frequency,
                osc_calibrate_val,
            } => f.write_fmt(format_args!(
                "invalid oscillator calibration (frequency {}, value {})",
                fast_osc_frequency, osc_calibrate_val
            )),
            Error::InvalidState(state) => {
                f.write_fmt(format_args!("not allowed while {}", state))
            }
            Error::Timeout => f.pad("timed out waiting for data"),
        }
    }
}

/// Lifecycle of the sensor as tracked by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    Uninitialized,
    Resetting,
    CalibratingClocks,
    Configuring,
    Ready,
    Ranging,
    /// A failed `init` or `start_continuous`. Only `init` is accepted.
    Faulted,
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(match *self {
            State::Uninitialized => "uninitialized",
            State::Resetting => "resetting",
            State::CalibratingClocks => "calibrating clocks",
            State::Configuring => "configuring",
            State::Ready => "ready",
            State::Ranging => "ranging",
            State::Faulted => "faulted",
        })
    }
}

/// Oscillator values read during `init`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Oscillator {
    fast_osc_frequency: u16,
    osc_calibrate_val: u16,
}

pub struct VL53L1X<T> {
    bus: RegisterBus<T>,
    addr: u8,
    state: State,
    config: Config,
    oscillator: Oscillator,
}

impl<T> VL53L1X<T>
where
    T: Transport,
{
    pub fn new(transport: T, config: Config) -> Self {
        Self {
            bus: RegisterBus::new(transport),
            addr: config.address,
            state: State::Uninitialized,
            config,
            oscillator: Oscillator::default(),
        }
    }

    /// Gives the transport back.
    pub fn release(self) -> T {
        self.bus.free()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn address(&self) -> u8 {
        self.addr
    }

    pub fn distance_mode(&self) -> DistanceMode {
        self.config.distance_mode
    }

    /// Fast oscillator frequency read by the last successful `init`, 0 before.
    pub fn fast_osc_frequency(&self) -> u16 {
        self.oscillator.fast_osc_frequency
    }

    /// Oscillator calibration value read by the last successful `init`, 0
    /// before.
    pub fn osc_calibrate_val(&self) -> u16 {
        self.oscillator.osc_calibrate_val
    }

    /// Resets and configures the sensor, leaving it `Ready`.
    ///
    /// Allowed when `Uninitialized` or `Faulted`. Any failure leaves the
    /// driver `Faulted` with the previous oscillator values intact; call
    /// `init` again to retry from the start.
    pub fn init<D: DelayMs<u8>>(&mut self, delay: &mut D) -> Result<(), Error<T::Error>> {
        self.require(&[State::Uninitialized, State::Faulted])?;

        match self.init_sequence(delay) {
            Ok(oscillator) => {
                self.oscillator = oscillator;
                self.enter(State::Ready);
                Ok(())
            }
            Err(error) => Err(self.fault(error)),
        }
    }

    fn init_sequence<D: DelayMs<u8>>(
        &mut self,
        delay: &mut D,
    ) -> Result<Oscillator, Error<T::Error>> {
        self.enter(State::Resetting);
        self.write_u8(SOFT_RESET, SOFT_RESET_ASSERT)?;
        delay.delay_ms(RESET_PULSE_MS);
        self.write_u8(SOFT_RESET, SOFT_RESET_RELEASE)?;
        delay.delay_ms(RESET_PULSE_MS);
        self.clear_interrupt()?;

        self.enter(State::CalibratingClocks);
        let oscillator = self.read_oscillator()?;

        self.enter(State::Configuring);
        let mode = self.config.distance_mode.config();
        let budget_us = self.config.timing_budget.ticks();
        let timeouts = timing::encode_timing_budget(
            budget_us,
            mode.vcsel_period_a,
            mode.vcsel_period_b,
            oscillator.fast_osc_frequency,
        )
        .ok_or(Error::Calibration {
            fast_osc_frequency: oscillator.fast_osc_frequency,
            osc_calibrate_val: oscillator.osc_calibrate_val,
        })?;
        debug!(
            "{} us budget encodes to A {:#06x}, B {:#06x}",
            budget_us, timeouts.a, timeouts.b
        );

        self.write_u8(SYSTEM__GROUPED_PARAMETER_HOLD_0, PARAMETER_HOLD_ON)?;
        self.write_u8(SYSTEM__GROUPED_PARAMETER_HOLD_1, PARAMETER_HOLD_ON)?;
        self.write_u8(SYSTEM__SEED_CONFIG, SEED_CONFIG_DEFAULT)?;
        self.write_distance_mode(&mode)?;
        self.write_timeouts(timeouts)?;
        self.write_u8(SYSTEM__GROUPED_PARAMETER_HOLD_0, PARAMETER_HOLD_OFF)?;
        self.write_u8(SYSTEM__GROUPED_PARAMETER_HOLD_1, PARAMETER_HOLD_OFF)?;

        Ok(oscillator)
    }

    fn read_oscillator(&mut self) -> Result<Oscillator, Error<T::Error>> {
        let fast_osc_frequency = self
            .bus
            .read_u16(self.addr, OSC_MEASURED__FAST_OSC__FREQUENCY)?;
        let osc_calibrate_val = self.bus.read_u16(self.addr, RESULT__OSC_CALIBRATE_VAL)?;
        debug!(
            "oscillator frequency {}, calibration {}",
            fast_osc_frequency, osc_calibrate_val
        );

        if fast_osc_frequency == 0 || osc_calibrate_val == 0 {
            return Err(Error::Calibration {
                fast_osc_frequency,
                osc_calibrate_val,
            });
        }

        Ok(Oscillator {
            fast_osc_frequency,
            osc_calibrate_val,
        })
    }

    // Here be dragons
    fn write_distance_mode(&mut self, mode: &DistanceModeConfig) -> Result<(), Error<T::Error>> {
        self.write_u8(RANGE_CONFIG__VCSEL_PERIOD_A, mode.vcsel_period_a)?;
        self.write_u8(RANGE_CONFIG__VCSEL_PERIOD_B, mode.vcsel_period_b)?;
        self.write_u8(RANGE_CONFIG__VALID_PHASE_HIGH, mode.valid_phase_high)?;
        self.write_u8(SD_CONFIG__WOI_SD0, mode.woi_sd0)?;
        self.write_u8(SD_CONFIG__WOI_SD1, mode.woi_sd1)?;
        self.write_u8(SD_CONFIG__INITIAL_PHASE_SD0, mode.initial_phase_sd0)?;
        self.write_u8(SD_CONFIG__INITIAL_PHASE_SD1, mode.initial_phase_sd1)?;

        Ok(())
    }

    fn write_timeouts(&mut self, timeouts: EncodedTimeouts) -> Result<(), Error<T::Error>> {
        self.bus
            .write_u16(self.addr, RANGE_CONFIG__TIMEOUT_MACROP_A_HI, timeouts.a)?;
        self.bus
            .write_u16(self.addr, RANGE_CONFIG__TIMEOUT_MACROP_B_HI, timeouts.b)?;

        Ok(())
    }

    /// Starts timed ranging with `period` between measurements. The period
    /// should not be shorter than the timing budget; this is not checked.
    ///
    /// Allowed when `Ready`. A failure leaves the driver `Faulted`.
    pub fn start_continuous(
        &mut self,
        period: fugit::MillisDurationU32,
    ) -> Result<(), Error<T::Error>> {
        self.require(&[State::Ready])?;

        let ticks = inter_measurement_ticks(period.ticks(), self.oscillator.osc_calibrate_val);
        debug!("inter-measurement period {} ms, {} ticks", period.ticks(), ticks);

        let result = self
            .bus
            .write_u32(self.addr, SYSTEM__INTERMEASUREMENT_PERIOD, ticks)
            .and_then(|()| self.clear_interrupt())
            .and_then(|()| self.write_u8(SYSTEM__MODE_START, MODE_START_TIMED));

        match result {
            Ok(()) => {
                self.enter(State::Ranging);
                Ok(())
            }
            Err(error) => Err(self.fault(error)),
        }
    }

    /// Stops ranging and returns to `Ready`.
    pub fn stop_continuous(&mut self) -> Result<(), Error<T::Error>> {
        self.require(&[State::Ranging])?;

        self.write_u8(SYSTEM__MODE_START, MODE_START_STOP)?;
        self.enter(State::Ready);

        Ok(())
    }

    /// Checks whether a new measurement is available. Does not clear the
    /// interrupt.
    pub fn data_ready(&mut self) -> Result<bool, Error<T::Error>> {
        self.require(&[State::Ranging])?;

        let status = self.bus.read_u8(self.addr, RESULT__INTERRUPT_STATUS)?;

        Ok(status & 0x01 != 0)
    }

    /// Polls [`Self::data_ready`] up to `policy.attempts` times, pausing
    /// `policy.interval_ms` between tries.
    pub fn wait_for_data<D: DelayMs<u8>>(
        &mut self,
        delay: &mut D,
        policy: PollPolicy,
    ) -> Result<(), Error<T::Error>> {
        self.require(&[State::Ranging])?;

        for attempt in 1..=policy.attempts {
            if self.data_ready()? {
                return Ok(());
            }

            if attempt < policy.attempts {
                delay.delay_ms(policy.interval_ms);
            }
        }

        warn!("no data after {} polls", policy.attempts);
        Err(Error::Timeout)
    }

    /// Returns the final range register as is, then clears the interrupt to
    /// arm the next measurement.
    ///
    /// Unlike [`Self::read_range_block`] no gain correction is applied, so
    /// the two do not report identical distances for the same measurement.
    pub fn read_distance_mm(&mut self) -> Result<u16, Error<T::Error>> {
        self.require(&[State::Ranging])?;

        let distance = self
            .bus
            .read_u16(self.addr, RESULT__FINAL_CROSSTALK_CORRECTED_RANGE_MM_SD0)?;
        self.clear_interrupt()?;

        Ok(distance)
    }

    /// Reads the whole result block in one transfer and returns status, stream
    /// count and the gain-corrected distance, then clears the interrupt.
    pub fn read_range_block(&mut self) -> Result<Measurement, Error<T::Error>> {
        self.require(&[State::Ranging])?;

        let mut raw: RawRangeResult = [0; measurement::RESULT_BLOCK_LEN];
        self.bus.read_block(self.addr, RESULT__RANGE_STATUS, &mut raw)?;
        self.clear_interrupt()?;

        let measurement = Measurement::decode(&raw);
        trace!(
            "status {} stream {} distance {} mm",
            measurement.status,
            measurement.stream_count,
            measurement.distance_mm
        );

        Ok(measurement)
    }

    /// Reads back the programmed timing budget in microseconds.
    pub fn timing_budget(&mut self) -> Result<u32, Error<T::Error>> {
        self.require(&[State::Ready, State::Ranging])?;

        let timeouts = EncodedTimeouts {
            a: self.bus.read_u16(self.addr, RANGE_CONFIG__TIMEOUT_MACROP_A_HI)?,
            b: self.bus.read_u16(self.addr, RANGE_CONFIG__TIMEOUT_MACROP_B_HI)?,
        };
        let mode = self.config.distance_mode.config();

        timing::decode_timing_budget(
            timeouts,
            mode.vcsel_period_a,
            mode.vcsel_period_b,
            self.oscillator.fast_osc_frequency,
        )
        .ok_or(Error::Calibration {
            fast_osc_frequency: self.oscillator.fast_osc_frequency,
            osc_calibrate_val: self.oscillator.osc_calibrate_val,
        })
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<T::Error>> {
        self.write_u8(SYSTEM__INTERRUPT_CLEAR, INTERRUPT_CLEAR)
    }

    fn write_u8(&mut self, register: Register, data: u8) -> Result<(), Error<T::Error>> {
        self.bus.write_u8(self.addr, register, data)
    }

    fn require(&self, allowed: &[State]) -> Result<(), Error<T::Error>> {
        if allowed.contains(&self.state) {
            return Ok(());
        }

        error!("operation not allowed while {}", self.state);
        Err(Error::InvalidState(self.state))
    }

    fn enter(&mut self, state: State) {
        trace!("{} -> {}", self.state, state);
        self.state = state;
    }

    fn fault(&mut self, error: Error<T::Error>) -> Error<T::Error> {
        warn!("sensor at {:#04x} faulted in {}", self.addr, self.state);
        self.enter(State::Faulted);
        error
    }
}

/// Inter-measurement period register value for `period_ms`, scaled by the
/// oscillator calibration value.
///
/// With a calibration value of 0 the period goes out unscaled. That only
/// happens if `init` never succeeded and is a best-effort fallback.
pub fn inter_measurement_ticks(period_ms: u32, osc_calibrate_val: u16) -> u32 {
    if osc_calibrate_val == 0 {
        return period_ms;
    }

    period_ms.saturating_mul(u32::from(osc_calibrate_val))
}
