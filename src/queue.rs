// SPDX-License-Identifier: Apache-2.0

//! Fixed-size circular byte queues for the serial link.
//!
//! Each queue has independent read and write cursors. Full and empty are told apart by cursor
//! distance alone, so one slot is always left unused: a queue declared with `CAP` bytes holds at
//! most `CAP - 1`.

use thiserror::Error;

/// Diagnostic code reported when a byte could not be queued
pub const QUEUE_FULL_CODE: i32 = 0x1F00;
/// Diagnostic code reported when there was nothing to dequeue
pub const QUEUE_EMPTY_CODE: i32 = 0x1E00;

/// Reasons a queue operation did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum QueueError {
    /// `CAP - 1` bytes are already waiting. The byte was not stored.
    #[error("byte queue is full")]
    Full,
    /// No bytes are waiting
    #[error("byte queue is empty")]
    Empty,
}

impl QueueError {
    /// Numeric code for this failure, outside the range of any byte value.
    pub const fn code(self) -> i32 {
        match self {
            QueueError::Full => QUEUE_FULL_CODE,
            QueueError::Empty => QUEUE_EMPTY_CODE,
        }
    }
}

/// Single-producer/single-consumer circular byte buffer.
///
/// Both ends take `&mut self`, so producer and consumer must run in the same execution context
/// (or share the queue through a critical section).
pub struct ByteQueue<const CAP: usize> {
    /// Byte storage
    storage: [u8; CAP],
    /// Next slot to write
    write: usize,
    /// Next slot to read
    read: usize,
}

impl<const CAP: usize> ByteQueue<CAP> {
    /// One slot is always sacrificed, so fewer than two leaves no usable space
    const USABLE: () = assert!(CAP >= 2, "ByteQueue needs a capacity of at least 2");

    /// Create an empty queue
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::USABLE;
        Self {
            storage: [0; CAP],
            write: 0,
            read: 0,
        }
    }

    /// Bytes currently waiting, from the distance between the cursors
    pub fn len(&self) -> usize {
        (self.write + CAP - self.read) % CAP
    }

    /// No bytes waiting
    pub fn is_empty(&self) -> bool {
        self.write == self.read
    }

    /// No room for another byte
    pub fn is_full(&self) -> bool {
        self.len() == CAP - 1
    }

    /// Declared size, one more than the number of bytes the queue can hold
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Append `byte`, or return [`QueueError::Full`] without storing it.
    pub fn enqueue(&mut self, byte: u8) -> Result<(), QueueError> {
        if self.len() >= CAP - 1 {
            return Err(QueueError::Full);
        }
        self.storage[self.write] = byte;
        self.write = (self.write + 1) % CAP;
        Ok(())
    }

    /// Remove the oldest byte, or return [`QueueError::Empty`].
    pub fn dequeue(&mut self) -> Result<u8, QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        let byte = self.storage[self.read];
        self.read = (self.read + 1) % CAP;
        Ok(byte)
    }
}

impl<const CAP: usize> Default for ByteQueue<CAP> {
    fn default() -> Self {
        Self::new()
    }
}
