//! Answer countdown ticker
//!
//! Emits [`SessionEvent::CountdownTick`] for one capture activation at a
//! fixed interval until cancelled. Dropping the countdown cancels it.

use crate::session::{EventSink, SessionEvent, Ticket};
use crossbeam_channel::{bounded, select, tick, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub struct Countdown {
    activation: Ticket,
    /// Dropping this sender stops the ticker thread
    _cancel_tx: Sender<()>,
}

impl Countdown {
    /// Start ticking for `activation` every `interval`
    pub fn start(activation: Ticket, interval: Duration, sink: EventSink) -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);

        thread::spawn(move || {
            debug!("Countdown started for activation {}", activation);
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => sink.emit(SessionEvent::CountdownTick { activation }),
                    recv(cancel_rx) -> _ => break,
                }
            }
            debug!("Countdown stopped for activation {}", activation);
        });

        Self {
            activation,
            _cancel_tx: cancel_tx,
        }
    }

    pub fn activation(&self) -> Ticket {
        self.activation
    }

    /// Stop ticking
    pub fn cancel(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_countdown_ticks_for_its_activation() {
        let (tx, rx) = unbounded();
        let countdown = Countdown::start(7, Duration::from_millis(5), EventSink::new(tx));

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(event, SessionEvent::CountdownTick { activation: 7 });
        assert_eq!(countdown.activation(), 7);
        countdown.cancel();
    }

    #[test]
    fn test_cancel_stops_ticks() {
        let (tx, rx) = unbounded();
        let countdown = Countdown::start(1, Duration::from_millis(5), EventSink::new(tx));
        let _ = rx.recv_timeout(Duration::from_secs(1));
        countdown.cancel();

        // Let the ticker thread observe the cancellation, then drain
        thread::sleep(Duration::from_millis(50));
        while rx.try_recv().is_ok() {}

        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }
}
