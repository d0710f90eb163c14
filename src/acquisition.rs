// SPDX-License-Identifier: Apache-2.0

//! Acoustic and cuff-pressure acquisition.
//!
//! The scheduler talks to the converters through [`MicrophonePair`] and [`CuffSensor`].
//! [`SensorBus`] implements both over a shared `embedded-hal` SPI bus. The cuff converter's
//! ready line is the only flag the driver itself waits on, and that wait goes through
//! [`wait_ready`] so it can be bounded. Microphone reads are plain blocking SPI transfers; any
//! spinning on the SPI FIFO happens inside the HAL and is not covered by [`WaitPolicy`].

use embedded_hal::{
    digital::{InputPin, OutputPin},
    spi::SpiBus,
};
use thiserror::Error;

use crate::{
    buffer::Sample,
    config::{CUFF_SCALE_DEN, CUFF_SCALE_NUM, CUFF_ZERO_OFFSET},
};

/// Converters with a ready line the firmware waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Peripheral {
    /// Cuff pressure ADC
    CuffAdc,
}

/// Failures while talking to acquisition hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum HardwareError {
    /// The converter never raised its ready flag within the [`WaitPolicy`]
    #[error("{0:?} did not signal ready in time")]
    Timeout(Peripheral),
    /// The SPI bus reported an error
    #[error("SPI transfer failed")]
    Bus,
    /// A chip-select or ready pin could not be driven or read
    #[error("GPIO access failed")]
    Pin,
}

/// How long a wait on a hardware ready flag may spin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum WaitPolicy {
    /// Spin until the flag rises, however long that takes
    Unbounded,
    /// Give up after this many polls
    Spins(u32),
}

/// Poll `ready` until it reports `true`, subject to `policy`.
///
/// Under [`WaitPolicy::Unbounded`] a converter that never becomes ready hangs the caller. That
/// is the production behaviour; tests and `bounded_waits` builds use [`WaitPolicy::Spins`] and
/// get [`HardwareError::Timeout`] instead.
pub fn wait_ready<F>(policy: WaitPolicy, peripheral: Peripheral, mut ready: F) -> Result<(), HardwareError>
where
    F: FnMut() -> Result<bool, HardwareError>,
{
    match policy {
        WaitPolicy::Unbounded => {
            while !ready()? {
                core::hint::spin_loop();
            }
            Ok(())
        }
        WaitPolicy::Spins(limit) => {
            for _ in 0..limit {
                if ready()? {
                    return Ok(());
                }
                core::hint::spin_loop();
            }
            Err(HardwareError::Timeout(peripheral))
        }
    }
}

/// Source of paired acoustic readings
pub trait MicrophonePair {
    /// One raw reading per acoustic channel, `(a, b)`
    fn read_microphones(&mut self) -> Result<(i16, i16), HardwareError>;
}

/// Source of raw cuff ADC codes
pub trait CuffSensor {
    /// Raw, uncalibrated ADC code
    fn read_cuff_raw(&mut self) -> Result<i32, HardwareError>;
}

/// Combine both channel readings into one [`Sample`].
///
/// Channels in phase give a positive product. Negative products are clamped to zero.
pub fn acoustic_sample(a: i16, b: i16) -> Sample {
    (a as i32 * b as i32).max(0)
}

/// Convert a raw cuff ADC code to pressure units, clamped at zero.
pub fn cuff_pressure(raw: i32) -> i32 {
    raw.saturating_sub(CUFF_ZERO_OFFSET).max(0) * CUFF_SCALE_NUM / CUFF_SCALE_DEN
}

/// Command bytes clocked out to start and finish a microphone conversion
const MIC_COMMAND: [u8; 2] = [0x81, 0xEB];

/// The three converters on one SPI bus, each behind its own chip select.
///
/// The cuff converter also drives a ready line (wired to its data output) that goes high when a
/// conversion completes.
pub struct SensorBus<SPI, MicA, MicB, CuffCs, CuffReady> {
    /// Shared SPI bus
    spi: SPI,
    /// Chip select for acoustic channel A, active low
    mic_a_cs: MicA,
    /// Chip select for acoustic channel B, active low
    mic_b_cs: MicB,
    /// Chip select for the cuff converter, active low
    cuff_cs: CuffCs,
    /// Cuff conversion complete
    cuff_ready: CuffReady,
    /// Applied to every wait on `cuff_ready`
    policy: WaitPolicy,
}

impl<SPI, MicA, MicB, CuffCs, CuffReady> SensorBus<SPI, MicA, MicB, CuffCs, CuffReady>
where
    SPI: SpiBus<u8>,
    MicA: OutputPin,
    MicB: OutputPin,
    CuffCs: OutputPin,
    CuffReady: InputPin,
{
    /// Take ownership of the bus and pins and deselect every converter.
    pub fn new(
        spi: SPI,
        mut mic_a_cs: MicA,
        mut mic_b_cs: MicB,
        mut cuff_cs: CuffCs,
        cuff_ready: CuffReady,
        policy: WaitPolicy,
    ) -> Result<Self, HardwareError> {
        mic_a_cs.set_high().map_err(|_| HardwareError::Pin)?;
        mic_b_cs.set_high().map_err(|_| HardwareError::Pin)?;
        cuff_cs.set_high().map_err(|_| HardwareError::Pin)?;
        Ok(Self {
            spi,
            mic_a_cs,
            mic_b_cs,
            cuff_cs,
            cuff_ready,
            policy,
        })
    }

    /// Clock `write` out while selecting `cs`, filling `read`.
    ///
    /// The chip is deselected even when the transfer fails.
    fn select_transfer<CS: OutputPin>(
        spi: &mut SPI,
        cs: &mut CS,
        read: &mut [u8],
        write: &[u8],
    ) -> Result<(), HardwareError> {
        cs.set_low().map_err(|_| HardwareError::Pin)?;
        let transfer = spi
            .transfer(read, write)
            .and_then(|()| spi.flush())
            .map_err(|_| HardwareError::Bus);
        cs.set_high().map_err(|_| HardwareError::Pin)?;
        transfer
    }

    /// Read one big-endian microphone sample
    fn read_channel<CS: OutputPin>(spi: &mut SPI, cs: &mut CS) -> Result<i16, HardwareError> {
        let mut frame = [0u8; 2];
        Self::select_transfer(spi, cs, &mut frame, &MIC_COMMAND)?;
        Ok(i16::from_be_bytes(frame))
    }
}

impl<SPI, MicA, MicB, CuffCs, CuffReady> MicrophonePair for SensorBus<SPI, MicA, MicB, CuffCs, CuffReady>
where
    SPI: SpiBus<u8>,
    MicA: OutputPin,
    MicB: OutputPin,
    CuffCs: OutputPin,
    CuffReady: InputPin,
{
    fn read_microphones(&mut self) -> Result<(i16, i16), HardwareError> {
        let a = Self::read_channel(&mut self.spi, &mut self.mic_a_cs)?;
        let b = Self::read_channel(&mut self.spi, &mut self.mic_b_cs)?;
        Ok((a, b))
    }
}

impl<SPI, MicA, MicB, CuffCs, CuffReady> CuffSensor for SensorBus<SPI, MicA, MicB, CuffCs, CuffReady>
where
    SPI: SpiBus<u8>,
    MicA: OutputPin,
    MicB: OutputPin,
    CuffCs: OutputPin,
    CuffReady: InputPin,
{
    /// Select the converter, wait for its conversion, then clock out the 12-bit result.
    ///
    /// The first byte carries a leading null bit and the top 7 data bits, the second byte the
    /// low 5 data bits followed by padding.
    fn read_cuff_raw(&mut self) -> Result<i32, HardwareError> {
        self.cuff_cs.set_low().map_err(|_| HardwareError::Pin)?;

        let cuff_ready = &mut self.cuff_ready;
        let waited = wait_ready(self.policy, Peripheral::CuffAdc, || {
            cuff_ready.is_high().map_err(|_| HardwareError::Pin)
        });
        let mut frame = [0u8; 2];
        let transfer = waited.and_then(|()| {
            self.spi
                .transfer(&mut frame, &[0x00, 0x00])
                .and_then(|()| self.spi.flush())
                .map_err(|_| HardwareError::Bus)
        });

        self.cuff_cs.set_high().map_err(|_| HardwareError::Pin)?;
        transfer?;

        Ok((((frame[0] & 0x7F) as i32) << 5) + (frame[1] >> 3) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::{
        cell::{Cell, RefCell},
        collections::VecDeque,
        rc::Rc,
    };

    /// Everything the mock bus and pins saw, in order
    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Select(&'static str),
        Deselect(&'static str),
        Transfer(Vec<u8>),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct MockSpi {
        log: Log,
        replies: VecDeque<Vec<u8>>,
    }

    impl embedded_hal::spi::ErrorType for MockSpi {
        type Error = Infallible;
    }

    impl SpiBus<u8> for MockSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, _words: &[u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
            self.log.borrow_mut().push(Event::Transfer(write.to_vec()));
            let reply = self.replies.pop_front().expect("unexpected SPI transfer");
            read.copy_from_slice(&reply);
            Ok(())
        }

        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    struct MockCs {
        name: &'static str,
        log: Log,
    }

    impl embedded_hal::digital::ErrorType for MockCs {
        type Error = Infallible;
    }

    impl OutputPin for MockCs {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push(Event::Select(self.name));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push(Event::Deselect(self.name));
            Ok(())
        }
    }

    /// Ready line that rises after `polls_until_ready` reads, or never
    struct MockReady {
        polls_until_ready: Option<u32>,
        polls: Rc<Cell<u32>>,
    }

    impl embedded_hal::digital::ErrorType for MockReady {
        type Error = Infallible;
    }

    impl InputPin for MockReady {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            self.polls.set(self.polls.get() + 1);
            Ok(self
                .polls_until_ready
                .is_some_and(|limit| self.polls.get() > limit))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    fn sensor_bus(
        replies: Vec<Vec<u8>>,
        polls_until_ready: Option<u32>,
        policy: WaitPolicy,
    ) -> (SensorBus<MockSpi, MockCs, MockCs, MockCs, MockReady>, Log, Rc<Cell<u32>>) {
        let log: Log = Rc::default();
        let polls = Rc::new(Cell::new(0));
        let cs = |name| MockCs {
            name,
            log: log.clone(),
        };
        let bus = SensorBus::new(
            MockSpi {
                log: log.clone(),
                replies: replies.into(),
            },
            cs("mic_a"),
            cs("mic_b"),
            cs("cuff"),
            MockReady {
                polls_until_ready,
                polls: polls.clone(),
            },
            policy,
        )
        .unwrap();
        log.borrow_mut().clear();
        (bus, log, polls)
    }

    #[test]
    fn sample_product_clamps_negative() {
        assert_eq!(acoustic_sample(3, 4), 12);
        assert_eq!(acoustic_sample(-3, -4), 12);
        assert_eq!(acoustic_sample(-3, 4), 0);
        assert_eq!(acoustic_sample(i16::MIN, i16::MIN), 1 << 30);
        assert_eq!(acoustic_sample(i16::MIN, i16::MAX), 0);
    }

    #[test]
    fn cuff_calibration() {
        assert_eq!(cuff_pressure(445), 0);
        assert_eq!(cuff_pressure(300), 0);
        assert_eq!(cuff_pressure(1795), 100);
        assert_eq!(cuff_pressure(4095), 270);
        assert_eq!(cuff_pressure(i32::MIN), 0);
    }

    #[test]
    fn bounded_wait_times_out() {
        let mut polls = 0;
        let result = wait_ready(WaitPolicy::Spins(5), Peripheral::CuffAdc, || {
            polls += 1;
            Ok(false)
        });
        assert_eq!(result, Err(HardwareError::Timeout(Peripheral::CuffAdc)));
        assert_eq!(polls, 5);
    }

    #[test]
    fn waits_return_once_ready() {
        for policy in [WaitPolicy::Unbounded, WaitPolicy::Spins(10)] {
            let mut polls = 0;
            let result = wait_ready(policy, Peripheral::CuffAdc, || {
                polls += 1;
                Ok(polls == 3)
            });
            assert_eq!(result, Ok(()));
            assert_eq!(polls, 3);
        }
    }

    #[test]
    fn wait_propagates_pin_errors() {
        let result = wait_ready(WaitPolicy::Unbounded, Peripheral::CuffAdc, || Err(HardwareError::Pin));
        assert_eq!(result, Err(HardwareError::Pin));
    }

    #[test]
    fn microphones_read_both_channels_in_order() {
        let (mut bus, log, _) = sensor_bus(
            vec![vec![0x01, 0x02], vec![0xFF, 0xFE]],
            None,
            WaitPolicy::Unbounded,
        );
        assert_eq!(bus.read_microphones(), Ok((0x0102, -2)));
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Select("mic_a"),
                Event::Transfer(vec![0x81, 0xEB]),
                Event::Deselect("mic_a"),
                Event::Select("mic_b"),
                Event::Transfer(vec![0x81, 0xEB]),
                Event::Deselect("mic_b"),
            ]
        );
    }

    #[test]
    fn cuff_read_assembles_twelve_bits() {
        // Leading bit of the first byte is masked off, padding bits of the second shifted out
        let (mut bus, log, _) = sensor_bus(vec![vec![0xB3, 0x38]], Some(2), WaitPolicy::Spins(10));
        assert_eq!(bus.read_cuff_raw(), Ok((0x33 << 5) + 0x07));
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Select("cuff"),
                Event::Transfer(vec![0x00, 0x00]),
                Event::Deselect("cuff"),
            ]
        );
    }

    #[test]
    fn unresponsive_cuff_times_out_and_deselects() {
        let (mut bus, log, polls) = sensor_bus(Vec::new(), None, WaitPolicy::Spins(100));
        assert_eq!(bus.read_cuff_raw(), Err(HardwareError::Timeout(Peripheral::CuffAdc)));
        assert_eq!(*log.borrow(), vec![Event::Select("cuff"), Event::Deselect("cuff")]);
        assert_eq!(polls.get(), 100);
    }
}
