//! Critical stop signal
//!
//! A bounded channel with one slot per top-level walker. Raising never
//! blocks: a walker that fails while both slots are taken simply drops its
//! notification, the driver only needs to see one.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// One slot per top-level walker
pub const CRITICAL_CAPACITY: usize = 2;

/// Sending half, held by the walkers
#[derive(Debug, Clone)]
pub struct CriticalSignal {
    tx: mpsc::Sender<()>,
}

impl CriticalSignal {
    /// Raise the signal. Returns false when the notification was dropped
    /// (channel full or nobody watching).
    pub fn raise(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Receiving half, held by the driver
#[derive(Debug)]
pub struct CriticalWatch {
    rx: mpsc::Receiver<()>,
}

impl CriticalWatch {
    /// Consume one pending notification, if any
    pub fn fired(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Consume every pending notification and return how many there were
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.fired() {
            count += 1;
        }
        count
    }
}

/// Create a signal/watch pair
pub fn critical_channel() -> (CriticalSignal, CriticalWatch) {
    let (tx, rx) = mpsc::channel(CRITICAL_CAPACITY);
    (CriticalSignal { tx }, CriticalWatch { rx })
}
