// SPDX-License-Identifier: Apache-2.0

//! Tick scheduler run from the periodic timer interrupt.
//!
//! Every tick re-arms the timer, then walks [`SCHEDULE`] in order. Each slot keeps its own
//! wrapping counter and its task runs when `counter % period == 0`, checked before the counter
//! advances, so every task runs on the very first tick.
//!
//! | order | task | period (ticks) |
//! |---|---|---|
//! | 1 | button debounce | 32 |
//! | 2 | acoustic sample + deviation update | 1 |
//! | 3 | cuff pressure | 80 |
//! | 4 | display refresh | 400 |
//!
//! Counters wrap silently at `u32::MAX`. The debounce and acoustic periods divide 2^32, so they
//! keep their phase across the wrap. The cuff and display slots restart their phase at zero
//! instead, firing early once every ~62 days of uptime.
//!
//! Task run time is not measured. If the due tasks take longer than a tick, the next tick is
//! simply late: the timer is re-armed relative to the moment the handler started, so sample
//! timing drifts rather than ticks being made up.

use crate::{
    acquisition::{acoustic_sample, cuff_pressure, CuffSensor, MicrophonePair},
    config::{ACOUSTIC_PERIOD, CUFF_PERIOD, DEBOUNCE_PERIOD, DISPLAY_PERIOD, SAMPLE_WINDOW},
    detector::DeviationDetector,
    display::{render_status, StatusDisplay},
};

/// Work the scheduler can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Task {
    /// Shift the button level into the debounce register
    Debounce,
    /// Read both microphones and update the deviation
    Acoustic,
    /// Read and calibrate the cuff pressure
    Cuff,
    /// Redraw the status display
    Display,
}

impl Task {
    /// Short name for log messages
    pub const fn name(self) -> &'static str {
        match self {
            Task::Debounce => "debounce",
            Task::Acoustic => "acoustic",
            Task::Cuff => "cuff",
            Task::Display => "display",
        }
    }
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSlot {
    /// Run every `period` ticks
    pub period: u32,
    /// What to run
    pub task: Task,
}

/// Dispatch table, in execution order
pub const SCHEDULE: [TaskSlot; 4] = [
    TaskSlot {
        period: DEBOUNCE_PERIOD,
        task: Task::Debounce,
    },
    TaskSlot {
        period: ACOUSTIC_PERIOD,
        task: Task::Acoustic,
    },
    TaskSlot {
        period: CUFF_PERIOD,
        task: Task::Cuff,
    },
    TaskSlot {
        period: DISPLAY_PERIOD,
        task: Task::Display,
    },
];

/// The periodic hardware timer
pub trait TickTimer {
    /// The tick interrupt is pending
    fn is_pending(&mut self) -> bool;
    /// Clear the pending interrupt and schedule the next tick one period from now
    fn rearm(&mut self);
}

/// The front-panel push button
pub trait ButtonInput {
    /// Current raw level, `true` while held down
    fn is_pressed(&mut self) -> bool;
}

/// Everything a tick touches
pub trait TickHardware: TickTimer + ButtonInput + MicrophonePair + CuffSensor + StatusDisplay {}

impl<T> TickHardware for T where T: TickTimer + ButtonInput + MicrophonePair + CuffSensor + StatusDisplay {}

/// 8-sample shift-register debouncer.
///
/// A press registers once the last eight samples were all pressed. Holding the button longer
/// does not register again until it has been released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    /// Most recent sample in bit 0
    history: u8,
}

impl Debouncer {
    /// All samples pressed
    const STABLE_PRESS: u8 = 0xFF;

    /// Debouncer with no presses in its history
    pub const fn new() -> Self {
        Self { history: 0 }
    }

    /// Shift in one sample. Returns `true` on the sample that completes a stable press.
    pub fn sample(&mut self, pressed: bool) -> bool {
        let previous = self.history;
        self.history = (previous << 1) | pressed as u8;
        self.history == Self::STABLE_PRESS && previous != Self::STABLE_PRESS
    }

    /// Raw shift register contents
    pub fn history(&self) -> u8 {
        self.history
    }
}

/// Which tasks ran during one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TickReport {
    /// Button debounce sampled
    pub debounce: bool,
    /// Acoustic sample taken
    pub acoustic: bool,
    /// Cuff pressure read
    pub cuff: bool,
    /// Display redrawn
    pub display: bool,
}

impl TickReport {
    /// Whether `task` ran
    pub fn ran(&self, task: Task) -> bool {
        match task {
            Task::Debounce => self.debounce,
            Task::Acoustic => self.acoustic,
            Task::Cuff => self.cuff,
            Task::Display => self.display,
        }
    }

    /// Record that `task` ran
    fn mark(&mut self, task: Task) {
        match task {
            Task::Debounce => self.debounce = true,
            Task::Acoustic => self.acoustic = true,
            Task::Cuff => self.cuff = true,
            Task::Display => self.display = true,
        }
    }
}

/// All state carried between ticks.
///
/// The interrupt handler owns this exclusively while a tick runs; the main loop only reads
/// [`toggle`](Self::toggle).
pub struct Scheduler {
    /// Ticks handled since startup, wrapping
    ticks: u32,
    /// One counter per [`SCHEDULE`] slot
    counters: [u32; SCHEDULE.len()],
    /// Front-panel button history
    debouncer: Debouncer,
    /// Flipped on every debounced press
    toggle: bool,
    /// Acoustic sample window
    detector: DeviationDetector<SAMPLE_WINDOW>,
    /// Deviation after the latest acoustic sample
    deviation: f32,
    /// Latest calibrated cuff pressure
    cuff_pressure: i32,
    /// Acquisition or display operations that failed
    missed_reads: u32,
}

impl Scheduler {
    /// Fresh state: counters at zero, empty sample window, toggle off
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            counters: [0; SCHEDULE.len()],
            debouncer: Debouncer::new(),
            toggle: false,
            detector: DeviationDetector::new(),
            deviation: 0.0,
            cuff_pressure: 0,
            missed_reads: 0,
        }
    }

    /// Timer interrupt entry point.
    ///
    /// Returns `None` without touching anything if the timer interrupt is not actually
    /// pending. Otherwise re-arms the timer and runs the due tasks.
    pub fn on_interrupt<H: TickHardware>(&mut self, hw: &mut H) -> Option<TickReport> {
        if !hw.is_pending() {
            return None;
        }
        hw.rearm();
        Some(self.run_due_tasks(hw))
    }

    /// Advance every slot counter once and run each slot whose counter was on a period boundary.
    pub fn run_due_tasks<H: TickHardware>(&mut self, hw: &mut H) -> TickReport {
        let mut report = TickReport::default();
        self.ticks = self.ticks.wrapping_add(1);
        for (index, slot) in SCHEDULE.iter().enumerate() {
            let count = self.counters[index];
            self.counters[index] = count.wrapping_add(1);
            if count % slot.period == 0 {
                self.run(slot.task, hw);
                report.mark(slot.task);
            }
        }

        #[cfg(feature = "trace_ticks")]
        trace!(
            "tick {}: deviation {} cuff {} toggle {}",
            self.ticks,
            self.deviation,
            self.cuff_pressure,
            self.toggle
        );
        report
    }

    /// Run one task body
    fn run<H: TickHardware>(&mut self, task: Task, hw: &mut H) {
        match task {
            Task::Debounce => self.sample_button(hw),
            Task::Acoustic => self.acquire_acoustic(hw),
            Task::Cuff => self.acquire_cuff(hw),
            Task::Display => self.refresh_display(hw),
        }
    }

    /// Debounce task
    fn sample_button<H: ButtonInput>(&mut self, hw: &mut H) {
        if self.debouncer.sample(hw.is_pressed()) {
            self.toggle = !self.toggle;
            debug!("Button latched, toggle now {}", self.toggle);
        }
    }

    /// Acoustic task: sample both channels and refresh the deviation
    fn acquire_acoustic<H: MicrophonePair>(&mut self, hw: &mut H) {
        match hw.read_microphones() {
            Ok((a, b)) => self.deviation = self.detector.update(acoustic_sample(a, b)),
            Err(err) => self.record_miss(Task::Acoustic, err),
        }
    }

    /// Cuff task
    fn acquire_cuff<H: CuffSensor>(&mut self, hw: &mut H) {
        match hw.read_cuff_raw() {
            Ok(raw) => self.cuff_pressure = cuff_pressure(raw),
            Err(err) => self.record_miss(Task::Cuff, err),
        }
    }

    /// Display task
    fn refresh_display<H: StatusDisplay>(&mut self, hw: &mut H) {
        if let Err(err) = render_status(hw, self.pulse_signal()) {
            self.record_miss(Task::Display, err);
        }
    }

    /// Count and log a failed hardware operation; the task's state is left as it was
    fn record_miss(&mut self, task: Task, err: crate::acquisition::HardwareError) {
        self.missed_reads = self.missed_reads.wrapping_add(1);
        warn!("{} task skipped: {}", task.name(), err);
    }

    /// Ticks handled since startup, wrapping at `u32::MAX`
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Debounced button toggle state
    pub fn toggle(&self) -> bool {
        self.toggle
    }

    /// Deviation of the sample window after the latest acoustic sample
    pub fn deviation(&self) -> f32 {
        self.deviation
    }

    /// The pulse-event signal shown on the display: the deviation truncated to an integer
    pub fn pulse_signal(&self) -> i32 {
        self.deviation as i32
    }

    /// Latest calibrated cuff pressure
    pub fn cuff_pressure(&self) -> i32 {
        self.cuff_pressure
    }

    /// Hardware operations that failed since startup
    pub fn missed_reads(&self) -> u32 {
        self.missed_reads
    }

    /// The acoustic detector and its sample window
    pub fn detector(&self) -> &DeviationDetector<SAMPLE_WINDOW> {
        &self.detector
    }

    /// Button debouncer state
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
