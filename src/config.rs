// SPDX-License-Identifier: Apache-2.0

//! Compile-time configuration: tick timing, task rates, buffer sizes and calibration.

use crate::acquisition::WaitPolicy;

/// Interval between scheduler ticks, in microseconds (~800 Hz).
pub const TICK_PERIOD_US: u32 = 1249;

/// Button debounce sampling runs every 32 ticks (~40 ms)
pub const DEBOUNCE_PERIOD: u32 = 32;
/// Acoustic acquisition runs on every tick
pub const ACOUSTIC_PERIOD: u32 = 1;
/// Cuff pressure is sampled every 80 ticks (~100 ms)
pub const CUFF_PERIOD: u32 = 80;
/// The status display is redrawn every 400 ticks (~0.5 s)
pub const DISPLAY_PERIOD: u32 = 400;

/// Number of acoustic samples in the rolling deviation window.
pub const SAMPLE_WINDOW: usize = 32;
/// Declared size of each serial byte queue. One slot is always kept free.
pub const SERIAL_QUEUE_SIZE: usize = 1024;

/// Raw cuff ADC code at zero pressure.
pub const CUFF_ZERO_OFFSET: i32 = 445;
/// Numerator of the cuff code-to-pressure scale
pub const CUFF_SCALE_NUM: i32 = 10;
/// Denominator of the cuff code-to-pressure scale
pub const CUFF_SCALE_DEN: i32 = 135;

/// Polls allowed for the cuff ADC ready line when built with `bounded_waits`.
pub const BOUNDED_WAIT_SPINS: u32 = 100_000;

/// How long the cuff ADC ready-line wait may spin.
///
/// Production firmware waits forever, matching the hardware's contract that a missing ready flag
/// is fatal. The `bounded_waits` feature turns this into a recoverable
/// [`HardwareError::Timeout`](crate::acquisition::HardwareError::Timeout).
#[cfg(not(feature = "bounded_waits"))]
pub const HARDWARE_WAIT: WaitPolicy = WaitPolicy::Unbounded;
/// How long hardware ready-flag waits may spin.
#[cfg(feature = "bounded_waits")]
pub const HARDWARE_WAIT: WaitPolicy = WaitPolicy::Spins(BOUNDED_WAIT_SPINS);
