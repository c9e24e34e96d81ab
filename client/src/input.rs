//! Keyboard input forwarded into the client event queue
//!
//! Reading standard input blocks, so it runs on its own thread. Each line is
//! pushed onto the same queue as socket frames; the thread stops at end of
//! file or once the queue is gone.

use crate::game::ClientEvent;
use log::{debug, warn};
use std::io::BufRead;
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;

/// Starts forwarding lines from `reader` on a dedicated thread
///
/// The binary passes `BufReader::new(std::io::stdin())`; a `StdinLock` is not
/// `Send` and cannot cross into the thread.
pub fn spawn_line_listener<R>(
    reader: R,
    events: UnboundedSender<ClientEvent>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("input-listener".to_string())
        .spawn(move || forward_lines(reader, &events))
}

/// Sends one [`ClientEvent::Input`] per line, then [`ClientEvent::InputClosed`]
pub fn forward_lines<R: BufRead>(reader: R, events: &UnboundedSender<ClientEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };

        let line = line.trim_end_matches('\r').to_string();
        if events.send(ClientEvent::Input(line)).is_err() {
            debug!("Event queue closed, stopping input listener");
            return;
        }
    }

    let _ = events.send(ClientEvent::InputClosed);
}
