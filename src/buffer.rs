// SPDX-License-Identifier: Apache-2.0

//! Rolling window of acoustic samples.

/// One acoustic sample: the clamped product of both microphone channels.
pub type Sample = i32;

/// Fixed-capacity ring of the `N` most recent samples.
///
/// The buffer is always logically full: it starts zero-filled and every [`push`](Self::push)
/// overwrites the oldest entry. There is no read cursor, reads are offsets from the next write
/// position:
///
/// - `read(0)` is the slot that will be overwritten next (the oldest retained sample)
/// - `read(-1)` is the most recently written sample
///
/// Offsets of any magnitude wrap modulo `N`, so `read(N as isize)` is the same slot as `read(0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer<const N: usize> {
    /// Sample storage, indexed by write order modulo `N`
    samples: [Sample; N],
    /// Slot the next sample is written to
    write_index: usize,
}

impl<const N: usize> SampleBuffer<N> {
    /// Rejects zero-capacity buffers at compile time
    const NOT_EMPTY: () = assert!(N > 0, "SampleBuffer capacity must be at least 1");

    /// Create a zero-filled buffer
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NOT_EMPTY;
        Self {
            samples: [0; N],
            write_index: 0,
        }
    }

    /// Overwrite the oldest sample and advance the write cursor. Never fails.
    pub fn push(&mut self, sample: Sample) {
        self.samples[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % N;

        #[cfg(feature = "trace_ticks")]
        if self.write_index == 0 {
            trace!("Sample window wrapped: {:?}", self.samples.as_slice());
        }
    }

    /// Sample at `offset` slots from the next write position.
    pub fn read(&self, offset: isize) -> Sample {
        let shift = offset.rem_euclid(N as isize) as usize;
        self.samples[(self.write_index + shift) % N]
    }

    /// Most recently written sample, shorthand for `read(-1)`
    pub fn latest(&self) -> Sample {
        self.read(-1)
    }

    /// Raw storage, in slot order rather than age order.
    ///
    /// Order does not matter for the window statistics, so the detector reads this directly.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of slots, always `N`
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
