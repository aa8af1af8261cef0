//! Input forwarder
//!
//! Blocks on the backend's event source and republishes every event on the
//! outbound queue. The stop request is only checked between events, so the
//! blocking read in progress when `stop` arrives may still yield one more
//! event; it is delivered before the queue closes.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::backend::{EventSource, RawEvent};

/// Start the forwarder on its own thread.
///
/// The outbound queue closes when the thread exits: after a stop request,
/// when every consumer is gone, or when the event source fails.
pub fn spawn<E: EventSource>(
    source: E,
    stop: Receiver<()>,
    out: Sender<RawEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("termdraw-input".to_string())
        .spawn(move || forward(source, stop, out))
}

fn forward<E: EventSource>(mut source: E, stop: Receiver<()>, out: Sender<RawEvent>) {
    debug!("Input forwarder started");
    loop {
        match stop.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let event = match source.next_event() {
            Ok(event) => event,
            Err(e) => {
                warn!("Input source failed: {}", e);
                break;
            }
        };

        if out.send(event).is_err() {
            debug!("No input consumers left");
            break;
        }
    }
    debug!("Input forwarder stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{HeadlessBackend, TerminalBackend};
    use crossbeam_channel::{bounded, RecvTimeoutError};
    use crossterm::event::{Event, KeyCode, KeyEvent};

    const WAIT: Duration = Duration::from_secs(2);

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::from(KeyCode::Char(c)))
    }

    #[test]
    fn test_forwards_in_order() {
        let (backend, ctl) = HeadlessBackend::new(1, 1);
        let (_stop_tx, stop_rx) = bounded(1);
        let (out_tx, out_rx) = bounded(0);
        spawn(backend.events(), stop_rx, out_tx).unwrap();

        ctl.send_event(key('a'));
        ctl.send_event(key('b'));
        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), key('a'));
        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), key('b'));
    }

    #[test]
    fn test_stop_closes_queue() {
        let (backend, ctl) = HeadlessBackend::new(1, 1);
        let (stop_tx, stop_rx) = bounded(1);
        let (out_tx, out_rx) = bounded(0);
        let handle = spawn(backend.events(), stop_rx, out_tx).unwrap();

        ctl.send_event(key('a'));
        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), key('a'));

        stop_tx.send(()).unwrap();
        // Unblocks the read that may already be in progress
        ctl.send_event(key('z'));

        loop {
            match out_rx.recv_timeout(WAIT) {
                Ok(event) => assert_eq!(event, key('z')),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => panic!("queue did not close"),
            }
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_source_failure_closes_queue() {
        let (backend, ctl) = HeadlessBackend::new(1, 1);
        let (_stop_tx, stop_rx) = bounded(1);
        let (out_tx, out_rx) = bounded::<RawEvent>(0);
        let events = backend.events();
        drop(backend);
        drop(ctl);

        spawn(events, stop_rx, out_tx).unwrap().join().unwrap();
        assert!(out_rx.recv().is_err());
    }
}
