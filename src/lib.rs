//! This [RP2040](https://docs.rs/rp2040-hal) project runs the acquisition side of the bpSure
//! acoustic blood-pressure monitor. A periodic timer interrupt drives a small tick scheduler that
//! samples two microphones, tracks the rolling standard deviation of their product as a
//! pulse-event signal, reads the cuff pressure transducer, debounces the front-panel button and
//! refreshes a 16x2 character OLED. The main loop only services the serial link.
//!
//! Everything above the hardware boundary is plain `no_std` Rust behind small traits
//! ([`scheduler::TickHardware`], [`serial::UartPort`]), so it is unit tested on the host. The
//! RP2040 glue in `components` and `interrupt` only builds for the target.
//!
//! ## Crate features
//!
//! - `trace_ticks`: Logs scheduler state on every tick and every sample window wrap. Very noisy!
//! - `bounded_waits`: Gives up on the cuff ADC when its conversion-done line never rises, after
//!   a fixed number of polls (see [`config::BOUNDED_WAIT_SPINS`]), instead of spinning forever.
//!   The tick that timed out is counted in [`scheduler::Scheduler::missed_reads`]. Microphone
//!   reads are blocking SPI transfers and are not bounded by this feature.
//!
//! ## Timing
//!
//! | task | period | interval |
//! |---|---|---|
//! | button debounce | 32 ticks | ~40 ms |
//! | acoustic sample | 1 tick | 1.249 ms |
//! | cuff pressure | 80 ticks | ~100 ms |
//! | display refresh | 400 ticks | ~500 ms |
//!
//! ## Host example
//!
//! ```
//! use bpsure_monitor::{
//!     acquisition::{CuffSensor, HardwareError, MicrophonePair},
//!     display::StatusDisplay,
//!     scheduler::{ButtonInput, Scheduler, TickTimer},
//! };
//!
//! struct Bench;
//!
//! impl TickTimer for Bench {
//!     fn is_pending(&mut self) -> bool { true }
//!     fn rearm(&mut self) {}
//! }
//! impl ButtonInput for Bench {
//!     fn is_pressed(&mut self) -> bool { false }
//! }
//! impl MicrophonePair for Bench {
//!     fn read_microphones(&mut self) -> Result<(i16, i16), HardwareError> { Ok((20, 30)) }
//! }
//! impl CuffSensor for Bench {
//!     fn read_cuff_raw(&mut self) -> Result<i32, HardwareError> { Ok(1795) }
//! }
//! impl StatusDisplay for Bench {
//!     fn set_cursor(&mut self, _row: u8, _col: u8) -> Result<(), HardwareError> { Ok(()) }
//!     fn write_text(&mut self, _text: &str) -> Result<(), HardwareError> { Ok(()) }
//! }
//!
//! let mut scheduler = Scheduler::new();
//! let report = scheduler.on_interrupt(&mut Bench).unwrap();
//! assert!(report.acoustic && report.cuff);
//! assert_eq!(scheduler.cuff_pressure(), 100);
//! ```

// Copyright 2024 Cameron Rodriguez
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg), feature(doc_cfg_hide))]

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod detector;
pub mod display;
pub mod math;
pub mod queue;
pub mod scheduler;
pub mod serial;

#[cfg(target_os = "none")]
pub mod components;
#[cfg(target_os = "none")]
pub mod interrupt;
