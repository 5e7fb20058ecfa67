use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded permit pool coupling the sorter pool back to the reader stage.
///
/// The reader takes one permit per chunk it fills and a sorter returns it
/// only after the chunk is spilled and recycled, which bounds the number of
/// filled plus in-flight chunks. Implemented as a prefilled bounded channel
/// of tokens.
pub(crate) struct Throttle {
    permits: Receiver<()>,
    returns: Sender<()>,
}

impl Throttle {
    pub(crate) fn new(permits: usize) -> Throttle {
        let (returns, available) = bounded(permits);
        for _ in 0..permits {
            returns.send(()).expect("fresh permit channel");
        }
        Throttle {
            permits: available,
            returns,
        }
    }

    /// Block until a permit is available. Returns false when `cancelled`
    /// reports true before one arrives, so an aborted run cannot wedge the
    /// reader.
    pub(crate) fn acquire(&self, cancelled: impl Fn() -> bool) -> bool {
        loop {
            if cancelled() {
                return false;
            }
            match self.permits.recv_timeout(ACQUIRE_POLL_INTERVAL) {
                Ok(()) => {
                    return true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
    }

    /// Return one permit. Never blocks; the pool cannot hold more permits
    /// than it was created with.
    pub(crate) fn release(&self) {
        let _ = self.returns.try_send(());
    }
}
