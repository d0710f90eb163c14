// SPDX-License-Identifier: Apache-2.0

//! Rolling mean and standard deviation over the acoustic sample window.
//!
//! The sample standard deviation of the window is the pulse-event signal. Both statistics are
//! recomputed from scratch over all `N` slots on every call, in single precision.

use crate::{
    buffer::{Sample, SampleBuffer},
    math,
};

/// Mean and sample standard deviation of one window
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct DeviationSnapshot {
    /// Arithmetic mean of all slots
    pub mean: f32,
    /// Sample standard deviation (denominator `N - 1`)
    pub deviation: f32,
}

/// Arithmetic mean of every slot in `buffer`.
pub fn mean<const N: usize>(buffer: &SampleBuffer<N>) -> f32 {
    // Products of two i16 readings overflow an i32 sum after two samples
    let sum: i64 = buffer.as_slice().iter().map(|&sample| sample as i64).sum();
    sum as f32 / N as f32
}

/// Sample standard deviation of `buffer`, or `0.0` for windows too small to have one.
pub fn deviation<const N: usize>(buffer: &SampleBuffer<N>) -> f32 {
    deviation_about(buffer, mean(buffer))
}

/// Both statistics with a single mean pass
pub fn snapshot<const N: usize>(buffer: &SampleBuffer<N>) -> DeviationSnapshot {
    let mean = mean(buffer);
    DeviationSnapshot {
        mean,
        deviation: deviation_about(buffer, mean),
    }
}

/// Sample standard deviation around a precomputed mean
fn deviation_about<const N: usize>(buffer: &SampleBuffer<N>, mean: f32) -> f32 {
    if N < 2 {
        return 0.0;
    }
    let squared_sum: f32 = buffer
        .as_slice()
        .iter()
        .map(|&sample| {
            let diff = sample as f32 - mean;
            diff * diff
        })
        .sum();
    math::sqrt(squared_sum / (N - 1) as f32)
}

/// Owns the sample window and turns each new sample into an updated deviation.
#[derive(Debug, Clone)]
pub struct DeviationDetector<const N: usize> {
    /// Most recent `N` samples
    window: SampleBuffer<N>,
}

impl<const N: usize> DeviationDetector<N> {
    /// A deviation needs at least two samples
    const WINDOW_LARGE_ENOUGH: () = assert!(N >= 2, "deviation window needs at least 2 samples");

    /// Create a detector over a zero-filled window
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WINDOW_LARGE_ENOUGH;
        Self {
            window: SampleBuffer::new(),
        }
    }

    /// Push `sample` and return the deviation of the updated window.
    pub fn update(&mut self, sample: Sample) -> f32 {
        self.window.push(sample);
        self.deviation()
    }

    /// Mean of the current window
    pub fn mean(&self) -> f32 {
        mean(&self.window)
    }

    /// Sample standard deviation of the current window
    pub fn deviation(&self) -> f32 {
        deviation(&self.window)
    }

    /// Mean and deviation of the current window
    pub fn snapshot(&self) -> DeviationSnapshot {
        snapshot(&self.window)
    }

    /// Read-only view of the window
    pub fn window(&self) -> &SampleBuffer<N> {
        &self.window
    }
}

impl<const N: usize> Default for DeviationDetector<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_input_has_zero_deviation() {
        let mut detector = DeviationDetector::<32>::new();
        for _ in 0..32 {
            detector.update(1234);
        }
        assert_eq!(detector.deviation(), 0.0);
        assert_eq!(detector.mean(), 1234.0);
    }

    #[test]
    fn ascending_sequence_matches_closed_form() {
        let mut detector = DeviationDetector::<32>::new();
        for value in 1..=32 {
            detector.update(value);
        }

        // Uniform integers 1..=n: variance n(n+1)/12 with an n-1 denominator
        let n = 32.0f64;
        let expected = (n * (n + 1.0) / 12.0).sqrt();
        let snapshot = detector.snapshot();
        assert_eq!(snapshot.mean, 16.5);
        assert_relative_eq!(snapshot.deviation as f64, expected, max_relative = 1e-5);
        assert_eq!(snapshot.deviation, detector.deviation());
    }

    #[test]
    fn update_returns_new_deviation() {
        let mut detector = DeviationDetector::<4>::new();
        assert_eq!(detector.update(0), 0.0);
        // Window [4, 0, 0, 0]: mean 1, squared deviations 9 + 1 + 1 + 1 = 12, over 3
        assert_relative_eq!(detector.update(4), 2.0, max_relative = 1e-6);
        assert_eq!(detector.window().latest(), 4);
    }

    #[test]
    fn large_products_do_not_overflow_mean() {
        let mut buffer = SampleBuffer::<32>::new();
        let peak = i16::MIN as i32 * i16::MIN as i32;
        for _ in 0..32 {
            buffer.push(peak);
        }
        assert_relative_eq!(mean(&buffer), peak as f32);
        assert_eq!(deviation(&buffer), 0.0);
    }

    #[test]
    fn single_slot_window_is_guarded() {
        let mut buffer = SampleBuffer::<1>::new();
        buffer.push(42);
        assert_eq!(mean(&buffer), 42.0);
        assert_eq!(deviation(&buffer), 0.0);
    }
}
