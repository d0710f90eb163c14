// SPDX-License-Identifier: Apache-2.0

//! Serial link service for the main loop.
//!
//! The UART is polled, not interrupt driven: every pass of the main loop reads the port status
//! and moves at most one byte in each direction between the hardware and the RX/TX
//! [`ByteQueue`]s. The timer interrupt never touches the queues, so they need no locking.

use crate::{
    config::SERIAL_QUEUE_SIZE,
    queue::{ByteQueue, QueueError},
};

/// Queue type used for each direction of the link
pub type SerialQueue = ByteQueue<SERIAL_QUEUE_SIZE>;

/// Snapshot of the UART status flags
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct UartStatus {
    /// The receive FIFO holds at least one byte
    pub rx_ready: bool,
    /// The transmit FIFO can accept at least one byte
    pub tx_ready: bool,
}

/// Polled byte-level access to a UART
pub trait UartPort {
    /// Current status flags
    fn status(&mut self) -> UartStatus;
    /// Pop one received byte. Only called after [`UartStatus::rx_ready`] was seen.
    fn read_byte(&mut self) -> Option<u8>;
    /// Push one byte for transmission. Only called after [`UartStatus::tx_ready`] was seen.
    fn write_byte(&mut self, byte: u8);
}

/// Outcome of one [`SerialLink::service`] pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceReport {
    /// A byte was moved from the UART into the RX queue
    pub received: bool,
    /// A byte was moved from the TX queue to the UART
    pub transmitted: bool,
}

/// Both directions of the serial link, owned by the main loop
pub struct SerialLink {
    /// Bytes received from the UART, waiting for [`getc`](Self::getc)
    rx: SerialQueue,
    /// Bytes queued by [`putc`](Self::putc), waiting for the UART
    tx: SerialQueue,
    /// Received bytes discarded because the RX queue was full
    rx_overruns: u32,
}

impl SerialLink {
    /// Empty link
    pub const fn new() -> Self {
        Self {
            rx: SerialQueue::new(),
            tx: SerialQueue::new(),
            rx_overruns: 0,
        }
    }

    /// One main-loop pass: move a received byte into the RX queue and a queued byte out to the
    /// UART, whichever the status flags allow.
    pub fn service<P: UartPort>(&mut self, port: &mut P) -> ServiceReport {
        let status = port.status();
        let mut report = ServiceReport::default();

        if status.rx_ready {
            if let Some(byte) = port.read_byte() {
                match self.rx.enqueue(byte) {
                    Ok(()) => report.received = true,
                    Err(err) => {
                        self.rx_overruns = self.rx_overruns.wrapping_add(1);
                        warn!("RX queue rejected byte {} (code {})", byte, err.code());
                    }
                }
            }
        }

        if status.tx_ready {
            if let Ok(byte) = self.tx.dequeue() {
                port.write_byte(byte);
                report.transmitted = true;
            }
        }

        report
    }

    /// Next received byte
    pub fn getc(&mut self) -> Result<u8, QueueError> {
        self.rx.dequeue()
    }

    /// Queue one byte for transmission
    pub fn putc(&mut self, byte: u8) -> Result<(), QueueError> {
        self.tx.enqueue(byte)
    }

    /// Queue as much of `text` as fits, returning the number of bytes queued.
    pub fn puts(&mut self, text: &str) -> usize {
        text.bytes().take_while(|&byte| self.tx.enqueue(byte).is_ok()).count()
    }

    /// Loop received bytes back out, returning how many moved.
    ///
    /// Stops while the transmit queue is full; bytes that do not fit stay queued for receive.
    pub fn echo(&mut self) -> usize {
        let mut moved = 0;
        while !self.tx.is_full() {
            let Ok(byte) = self.rx.dequeue() else {
                break;
            };
            // Room was checked above
            self.tx.enqueue(byte).ok();
            moved += 1;
        }
        moved
    }

    /// Received bytes dropped so far because nothing drained the RX queue
    pub fn rx_overruns(&self) -> u32 {
        self.rx_overruns
    }

    /// Bytes waiting to be transmitted
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Bytes waiting to be read
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Loopback-style UART: bytes in `incoming` are received, written bytes land in `sent`
    #[derive(Default)]
    struct FakeUart {
        incoming: VecDeque<u8>,
        sent: Vec<u8>,
        tx_busy: bool,
    }

    impl UartPort for FakeUart {
        fn status(&mut self) -> UartStatus {
            UartStatus {
                rx_ready: !self.incoming.is_empty(),
                tx_ready: !self.tx_busy,
            }
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.incoming.pop_front()
        }

        fn write_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }
    }

    #[test]
    fn moves_one_byte_each_way_per_pass() {
        let mut link = SerialLink::new();
        let mut uart = FakeUart {
            incoming: b"ok".iter().copied().collect(),
            ..Default::default()
        };
        assert_eq!(link.puts("hey"), 3);

        let report = link.service(&mut uart);
        assert!(report.received && report.transmitted);
        assert_eq!(uart.sent, b"h");
        assert_eq!(link.rx_pending(), 1);
        assert_eq!(link.tx_pending(), 2);

        link.service(&mut uart);
        link.service(&mut uart);
        let idle = link.service(&mut uart);
        assert_eq!(idle, ServiceReport::default());
        assert_eq!(uart.sent, b"hey");
        assert_eq!(link.getc(), Ok(b'o'));
        assert_eq!(link.getc(), Ok(b'k'));
        assert_eq!(link.getc(), Err(QueueError::Empty));
    }

    #[test]
    fn busy_transmitter_keeps_queue() {
        let mut link = SerialLink::new();
        let mut uart = FakeUart {
            tx_busy: true,
            ..Default::default()
        };
        link.putc(b'x').unwrap();
        assert_eq!(link.service(&mut uart), ServiceReport::default());
        assert_eq!(link.tx_pending(), 1);
    }

    #[test]
    fn puts_stops_when_full() {
        let mut link = SerialLink::new();
        let text = "a".repeat(SERIAL_QUEUE_SIZE + 10);
        assert_eq!(link.puts(&text), SERIAL_QUEUE_SIZE - 1);
        assert_eq!(link.putc(b'z'), Err(QueueError::Full));
    }

    #[test]
    fn echo_loops_received_bytes_back() {
        let mut link = SerialLink::new();
        let mut uart = FakeUart {
            incoming: b"hi".iter().copied().collect(),
            tx_busy: true,
            ..Default::default()
        };
        link.service(&mut uart);
        link.service(&mut uart);
        assert_eq!(link.echo(), 2);
        assert_eq!(link.rx_pending(), 0);

        uart.tx_busy = false;
        for _ in 0..3 {
            link.service(&mut uart);
        }
        assert_eq!(uart.sent, b"hi");
    }

    #[test]
    fn echo_keeps_received_byte_while_transmit_queue_full() {
        let mut link = SerialLink::new();
        let mut uart = FakeUart {
            incoming: [b'Q'].into(),
            tx_busy: true,
            ..Default::default()
        };
        link.service(&mut uart);
        while link.putc(b'.').is_ok() {}

        assert_eq!(link.echo(), 0);
        assert_eq!(link.rx_pending(), 1);

        // One byte drains, which makes room for exactly the pending echo
        uart.tx_busy = false;
        link.service(&mut uart);
        assert_eq!(link.echo(), 1);
        assert_eq!(link.rx_pending(), 0);
        assert_eq!(link.getc(), Err(QueueError::Empty));
        assert_eq!(link.tx_pending(), SERIAL_QUEUE_SIZE - 1);
    }

    #[test]
    fn full_rx_queue_counts_overruns() {
        let mut link = SerialLink::new();
        let mut uart = FakeUart {
            incoming: core::iter::repeat(0x55).take(SERIAL_QUEUE_SIZE + 1).collect(),
            tx_busy: true,
            ..Default::default()
        };
        while !uart.incoming.is_empty() {
            link.service(&mut uart);
        }
        assert_eq!(link.rx_pending(), SERIAL_QUEUE_SIZE - 1);
        assert_eq!(link.rx_overruns(), 2);
    }
}
