// Constants from STM driver.

pub type Register = u16;

pub const SOFT_RESET: Register = 0x00;
pub const OSC_MEASURED__FAST_OSC__FREQUENCY: Register = 0x06;
pub const RANGE_CONFIG__TIMEOUT_MACROP_A_HI: Register = 0x5e;
pub const RANGE_CONFIG__VCSEL_PERIOD_A: Register = 0x60;
pub const RANGE_CONFIG__TIMEOUT_MACROP_B_HI: Register = 0x61;
pub const RANGE_CONFIG__VCSEL_PERIOD_B: Register = 0x63;
pub const RANGE_CONFIG__VALID_PHASE_HIGH: Register = 0x69;
pub const SYSTEM__INTERMEASUREMENT_PERIOD: Register = 0x6c;
pub const SYSTEM__GROUPED_PARAMETER_HOLD_0: Register = 0x71;
pub const SYSTEM__SEED_CONFIG: Register = 0x77;
pub const SD_CONFIG__WOI_SD0: Register = 0x78;
pub const SD_CONFIG__WOI_SD1: Register = 0x79;
pub const SD_CONFIG__INITIAL_PHASE_SD0: Register = 0x7a;
pub const SD_CONFIG__INITIAL_PHASE_SD1: Register = 0x7b;
pub const SYSTEM__GROUPED_PARAMETER_HOLD_1: Register = 0x7c;
pub const SYSTEM__INTERRUPT_CLEAR: Register = 0x86;
pub const SYSTEM__MODE_START: Register = 0x87;
pub const RESULT__INTERRUPT_STATUS: Register = 0x88;
pub const RESULT__RANGE_STATUS: Register = 0x89;
pub const RESULT__FINAL_CROSSTALK_CORRECTED_RANGE_MM_SD0: Register = 0x96;
pub const RESULT__OSC_CALIBRATE_VAL: Register = 0xde;

// Register values.
pub const SOFT_RESET_ASSERT: u8 = 0x00;
pub const SOFT_RESET_RELEASE: u8 = 0x01;
pub const INTERRUPT_CLEAR: u8 = 0x01;
pub const PARAMETER_HOLD_ON: u8 = 0x01;
pub const PARAMETER_HOLD_OFF: u8 = 0x00;
pub const SEED_CONFIG_DEFAULT: u8 = 0x01;
pub const MODE_START_TIMED: u8 = 0x40;
pub const MODE_START_STOP: u8 = 0x00;
