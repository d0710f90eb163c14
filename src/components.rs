// SPDX-License-Identifier: Apache-2.0

//! RP2040 board wiring: concrete pin types and the [`Board`] the tick interrupt drives.
//!
//! | signal | pin |
//! |---|---|
//! | UART0 TX / RX | GPIO0 / GPIO1 |
//! | OLED SCLK / MOSI / SSEL | GPIO2 / GPIO3 / GPIO4 |
//! | push button (active low) | GPIO14 |
//! | SPI0 MISO / SCK / MOSI | GPIO16 / GPIO18 / GPIO19 |
//! | microphone A / B chip select | GPIO20 / GPIO21 |
//! | cuff ADC chip select | GPIO22 |
//! | cuff ADC conversion done | GPIO27 |
//! | panel LED | GPIO25 |
use cortex_m::singleton;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use rp2040_hal::{
    fugit::ExtU32,
    gpio::{
        bank0::{
            Gpio0, Gpio1, Gpio14, Gpio16, Gpio18, Gpio19, Gpio2, Gpio20, Gpio21, Gpio22, Gpio25,
            Gpio27, Gpio3, Gpio4,
        },
        FunctionNull, FunctionSio, FunctionSpi, FunctionUart, Pin, PullDown, PullUp, SioInput,
        SioOutput,
    },
    pac,
    spi::{Enabled, Spi},
    timer::{Alarm, Alarm0, ScheduleAlarmError},
    uart::UartPeripheral,
};

use crate::{
    acquisition::{CuffSensor, HardwareError, MicrophonePair, SensorBus},
    config::TICK_PERIOD_US,
    display::{CharacterOled, StatusDisplay},
    scheduler::{ButtonInput, TickTimer},
    serial::{UartPort, UartStatus},
};

/// Push-pull output in its default pad configuration
type OutputPinOf<Id> = Pin<Id, FunctionSio<SioOutput>, PullDown>;

/// SPI0 with MOSI, MISO and SCK on GPIO19, GPIO16 and GPIO18
pub type SensorSpi = Spi<
    Enabled,
    pac::SPI0,
    (
        Pin<Gpio19, FunctionSpi, PullDown>,
        Pin<Gpio16, FunctionSpi, PullDown>,
        Pin<Gpio18, FunctionSpi, PullDown>,
    ),
    8,
>;

/// Converters on SPI0
pub type Sensors = SensorBus<
    SensorSpi,
    OutputPinOf<Gpio20>,
    OutputPinOf<Gpio21>,
    OutputPinOf<Gpio22>,
    Pin<Gpio27, FunctionSio<SioInput>, PullDown>,
>;

/// Character OLED on GPIO2..=GPIO4
pub type Oled = CharacterOled<OutputPinOf<Gpio2>, OutputPinOf<Gpio3>, OutputPinOf<Gpio4>>;

/// Front-panel push button, pulled up and shorted to ground when pressed
pub type Button = Pin<Gpio14, FunctionSio<SioInput>, PullUp>;

/// Host serial link on UART0
pub type HostUart = UartPeripheral<
    rp2040_hal::uart::Enabled,
    pac::UART0,
    (
        Pin<Gpio0, FunctionUart, PullDown>,
        Pin<Gpio1, FunctionUart, PullDown>,
    ),
>;

/// Everything the tick interrupt touches
pub struct Board {
    /// Tick source, firing every [`TICK_PERIOD_US`]
    alarm: Alarm0,
    /// Debounce input
    button: Button,
    /// Microphones and cuff ADC
    sensors: Sensors,
    /// Status display
    display: Oled,
}

impl Board {
    /// Bundle the tick hardware. The alarm is started by [`Board::start`].
    pub fn new(alarm: Alarm0, button: Button, sensors: Sensors, display: Oled) -> Self {
        Self {
            alarm,
            button,
            sensors,
            display,
        }
    }

    /// Schedule the first tick and enable the alarm interrupt.
    ///
    /// The NVIC line still has to be unmasked by the caller.
    pub fn start(&mut self) -> Result<(), ScheduleAlarmError> {
        self.alarm.schedule(TICK_PERIOD_US.micros())?;
        self.alarm.enable_interrupt();
        Ok(())
    }
}

impl TickTimer for Board {
    fn is_pending(&mut self) -> bool {
        self.alarm.finished()
    }

    fn rearm(&mut self) {
        self.alarm.clear_interrupt();
        // Relative to now, so time spent in the handler before this point is lost
        if self.alarm.schedule(TICK_PERIOD_US.micros()).is_err() {
            error!("Tick alarm could not be rescheduled");
        }
    }
}

impl ButtonInput for Board {
    fn is_pressed(&mut self) -> bool {
        matches!(self.button.is_low(), Ok(true))
    }
}

impl MicrophonePair for Board {
    fn read_microphones(&mut self) -> Result<(i16, i16), HardwareError> {
        self.sensors.read_microphones()
    }
}

impl CuffSensor for Board {
    fn read_cuff_raw(&mut self) -> Result<i32, HardwareError> {
        self.sensors.read_cuff_raw()
    }
}

impl StatusDisplay for Board {
    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), HardwareError> {
        self.display.set_cursor(row, col)
    }

    fn write_text(&mut self, text: &str) -> Result<(), HardwareError> {
        self.display.write_text(text)
    }
}

impl UartPort for HostUart {
    fn status(&mut self) -> UartStatus {
        UartStatus {
            rx_ready: self.uart_is_readable(),
            tx_ready: self.uart_is_writable(),
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8];
        match self.read_raw(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(_) => {
                warn!("UART receive error");
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if self.write_raw(&[byte]).is_err() {
            warn!("UART transmit FIFO full, dropped {}", byte);
        }
    }
}

/// Panel LED mirroring the debounced button toggle
pub struct PanelLed {
    /// LED output, high when lit
    led: OutputPinOf<Gpio25>,
    /// Last state written
    lit: bool,
}

impl PanelLed {
    /// Take the LED pin, start dark. Returns `None` if called twice.
    pub fn init(led: Pin<Gpio25, FunctionNull, PullDown>) -> Option<&'static mut Self> {
        singleton!(: PanelLed = Self {
            led: led.into_push_pull_output_in_state(PinState::Low),
            lit: false,
        })
    }

    /// Drive the LED to `lit`, touching the pin only on a change
    pub fn show(&mut self, lit: bool) {
        if lit == self.lit {
            return;
        }
        self.led.set_state(PinState::from(lit)).ok();
        self.lit = lit;
        debug!("Panel LED {}", if lit { "on" } else { "off" });
    }
}
