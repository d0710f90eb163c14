// SPDX-License-Identifier: Apache-2.0

//! Interrupt handlers, plus static [`Mutex`].

use core::cell::RefCell;
use critical_section::Mutex;
use rp2040_hal::pac::interrupt;

use crate::{components::Board, scheduler::Scheduler};

/// Scheduler state, shared between the tick interrupt and the main loop
pub static SCHEDULER: Mutex<RefCell<Scheduler>> = Mutex::new(RefCell::new(Scheduler::new()));
/// Tick hardware, installed once by `main` before the alarm interrupt is unmasked
pub static BOARD: Mutex<RefCell<Option<Board>>> = Mutex::new(RefCell::new(None));

/// Debounced button toggle, for the main loop
pub fn toggle_state() -> bool {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).toggle())
}

/// Tick handler. Does nothing until [`BOARD`] is installed.
#[interrupt]
fn TIMER_IRQ_0() {
    critical_section::with(|cs| {
        let mut board = BOARD.borrow_ref_mut(cs);
        let Some(board) = board.as_mut() else {
            warn!("Tick before board was installed");
            return;
        };
        if SCHEDULER.borrow_ref_mut(cs).on_interrupt(board).is_none() {
            trace!("Spurious TIMER_IRQ_0");
        }
    });
}
