// SPDX-License-Identifier: Apache-2.0

//! Status display: the text layout, the reading formatter and a driver for the 16x2 character
//! OLED.

use core::fmt::Write;

use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, PinState},
};
use heapless::String;

use crate::acquisition::HardwareError;

/// Top line of the status screen
pub const BANNER: &str = "bpSure Monitor";
/// Label in front of the reading on the second line. Trailing spaces blank the old value.
pub const READING_LABEL: &str = "Cuff Press =    ";
/// Column the reading is written at, on row 2
pub const READING_COLUMN: u8 = 13;

/// A text display addressed by 1-based row and column
pub trait StatusDisplay {
    /// Move the cursor to `row`, `col`
    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), HardwareError>;
    /// Write `text` at the cursor
    fn write_text(&mut self, text: &str) -> Result<(), HardwareError>;
}

/// Format `value` as a sign character (`' '` or `'-'`) followed by exactly three digits.
///
/// Only the last three digits of the magnitude are kept.
pub fn format_reading(value: i32) -> String<4> {
    let mut text = String::new();
    let sign = if value < 0 { '-' } else { ' ' };
    // Sign plus three ASCII digits always fits in four bytes
    write!(text, "{}{:03}", sign, value.unsigned_abs() % 1000).ok();
    text
}

/// Draw the banner and clear the reading line
pub fn render_banner<D: StatusDisplay>(display: &mut D) -> Result<(), HardwareError> {
    display.set_cursor(1, 2)?;
    display.write_text(BANNER)?;
    display.set_cursor(2, 1)?;
    display.write_text("                ")
}

/// Redraw the full status screen with `reading`.
///
/// The cursor is left parked on the reading.
pub fn render_status<D: StatusDisplay>(display: &mut D, reading: i32) -> Result<(), HardwareError> {
    display.set_cursor(1, 2)?;
    display.write_text(BANNER)?;
    display.set_cursor(2, 1)?;
    display.write_text(READING_LABEL)?;
    display.set_cursor(2, READING_COLUMN)?;
    display.write_text(&format_reading(reading))?;
    display.set_cursor(2, READING_COLUMN)
}

/// DDRAM address of the first character of each row
const ROW_ADDRESS: [u8; 2] = [0x00, 0x40];
/// Frame prefix marking a data (character) write
const DATA_FRAME: u16 = 0x0200;
/// Controller setup: 8-bit function set, display on with cursor off, clear, home, left-to-right
/// entry, DDRAM address 0
const INIT_SEQUENCE: [u8; 6] = [0x38, 0x0C, 0x01, 0x02, 0x06, 0x80];

/// 16x2 character OLED on a bit-banged 10-bit serial link.
///
/// Each frame is 2 register-select/read-write bits followed by 8 data bits, sent MSB first while
/// `ssel` is low. Data is latched on the rising edge of `sclk`.
pub struct CharacterOled<SCLK, MOSI, SSEL> {
    /// Serial clock
    sclk: SCLK,
    /// Serial data
    mosi: MOSI,
    /// Frame select, active low
    ssel: SSEL,
}

impl<SCLK, MOSI, SSEL> CharacterOled<SCLK, MOSI, SSEL>
where
    SCLK: OutputPin,
    MOSI: OutputPin,
    SSEL: OutputPin,
{
    /// Take the pins and park the link idle (clock and data low, deselected)
    pub fn new(mut sclk: SCLK, mut mosi: MOSI, mut ssel: SSEL) -> Result<Self, HardwareError> {
        mosi.set_low().map_err(|_| HardwareError::Pin)?;
        sclk.set_low().map_err(|_| HardwareError::Pin)?;
        ssel.set_high().map_err(|_| HardwareError::Pin)?;
        Ok(Self { sclk, mosi, ssel })
    }

    /// Run the controller setup sequence, then wait for the clear to finish
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), HardwareError> {
        for command in INIT_SEQUENCE {
            self.command(command)?;
        }
        delay.delay_ms(2);
        Ok(())
    }

    /// Send an instruction byte
    pub fn command(&mut self, command: u8) -> Result<(), HardwareError> {
        self.send_frame(command as u16)
    }

    /// Send a character byte
    pub fn put_char(&mut self, byte: u8) -> Result<(), HardwareError> {
        self.send_frame(DATA_FRAME | byte as u16)
    }

    /// Clock one 10-bit frame out
    fn send_frame(&mut self, frame: u16) -> Result<(), HardwareError> {
        self.ssel.set_low().map_err(|_| HardwareError::Pin)?;
        for bit in (0..10).rev() {
            self.sclk.set_low().map_err(|_| HardwareError::Pin)?;
            self.mosi
                .set_state(PinState::from(frame & (1 << bit) != 0))
                .map_err(|_| HardwareError::Pin)?;
            self.sclk.set_high().map_err(|_| HardwareError::Pin)?;
        }
        self.mosi.set_low().map_err(|_| HardwareError::Pin)?;
        self.ssel.set_high().map_err(|_| HardwareError::Pin)?;
        self.sclk.set_low().map_err(|_| HardwareError::Pin)
    }
}

impl<SCLK, MOSI, SSEL> StatusDisplay for CharacterOled<SCLK, MOSI, SSEL>
where
    SCLK: OutputPin,
    MOSI: OutputPin,
    SSEL: OutputPin,
{
    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), HardwareError> {
        let row_address = ROW_ADDRESS[usize::from(row.clamp(1, 2) - 1)];
        self.command(0x80 + row_address + col.saturating_sub(1))
    }

    fn write_text(&mut self, text: &str) -> Result<(), HardwareError> {
        text.bytes().try_for_each(|byte| self.put_char(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn reading_format() {
        assert_eq!(format_reading(7).as_str(), " 007");
        assert_eq!(format_reading(42).as_str(), " 042");
        assert_eq!(format_reading(-42).as_str(), "-042");
        assert_eq!(format_reading(0).as_str(), " 000");
        assert_eq!(format_reading(12_345).as_str(), " 345");
        assert_eq!(format_reading(i32::MIN).as_str(), "-648");
    }

    /// Records cursor moves and text as the display sees them
    #[derive(Default)]
    struct RecordingDisplay {
        ops: Vec<String<32>>,
    }

    impl StatusDisplay for RecordingDisplay {
        fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), HardwareError> {
            let mut op = String::new();
            write!(op, "@{},{}", row, col).unwrap();
            self.ops.push(op);
            Ok(())
        }

        fn write_text(&mut self, text: &str) -> Result<(), HardwareError> {
            self.ops.push(String::try_from(text).unwrap());
            Ok(())
        }
    }

    #[test]
    fn status_layout() {
        let mut display = RecordingDisplay::default();
        render_status(&mut display, -5).unwrap();
        let ops: Vec<&str> = display.ops.iter().map(|op| op.as_str()).collect();
        assert_eq!(
            ops,
            ["@1,2", "bpSure Monitor", "@2,1", "Cuff Press =    ", "@2,13", "-005", "@2,13"]
        );
    }

    /// Pin level changes on the serial link, in order
    type PinLog = Rc<RefCell<Vec<(char, bool)>>>;

    struct LoggedPin {
        name: char,
        log: PinLog,
    }

    impl embedded_hal::digital::ErrorType for LoggedPin {
        type Error = Infallible;
    }

    impl OutputPin for LoggedPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push((self.name, false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push((self.name, true));
            Ok(())
        }
    }

    /// Decode frames by sampling data on every rising clock edge while selected
    fn decode_frames(log: &[(char, bool)]) -> Vec<u16> {
        let (mut frames, mut current, mut bits) = (Vec::new(), 0u16, 0);
        let (mut selected, mut data) = (false, false);
        for &(pin, level) in log {
            match pin {
                's' => {
                    if level && selected {
                        assert_eq!(bits, 10, "frame ended after {} bits", bits);
                        frames.push(current);
                        current = 0;
                        bits = 0;
                    }
                    selected = !level;
                }
                'd' => data = level,
                'c' if level && selected => {
                    current = (current << 1) | data as u16;
                    bits += 1;
                }
                _ => {}
            }
        }
        frames
    }

    fn oled() -> (CharacterOled<LoggedPin, LoggedPin, LoggedPin>, PinLog) {
        let log = PinLog::default();
        let pin = |name| LoggedPin {
            name,
            log: log.clone(),
        };
        let oled = CharacterOled::new(pin('c'), pin('d'), pin('s')).unwrap();
        (oled, log)
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn init_sends_setup_sequence() {
        let (mut oled, log) = oled();
        oled.init(&mut NoDelay).unwrap();
        assert_eq!(decode_frames(&log.borrow()), [0x38, 0x0C, 0x01, 0x02, 0x06, 0x80]);
    }

    #[test]
    fn cursor_and_characters() {
        let (mut oled, log) = oled();
        oled.set_cursor(1, 2).unwrap();
        oled.set_cursor(2, 13).unwrap();
        oled.write_text("Hi").unwrap();
        assert_eq!(decode_frames(&log.borrow()), [0x81, 0xCC, 0x248, 0x269]);
    }
}
