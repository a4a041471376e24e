use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::session::SessionEvent;

/// Browser events
#[derive(Debug, PartialEq)]
pub enum Event {
  /// One line of user input
  Line(String),
  /// Input closed
  Eof,
  /// Periodic tick for query polling
  Tick,
  /// The session ended
  Session(SessionEvent),
}

/// Event handler that merges stdin lines, session events and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration, mut session_events: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn stdin reader
    let input_tx = tx.clone();
    tokio::spawn(async move {
      let mut lines = BufReader::new(tokio::io::stdin()).lines();
      loop {
        let event = match lines.next_line().await {
          Ok(Some(line)) => Event::Line(line),
          Ok(None) | Err(_) => Event::Eof,
        };
        let eof = event == Event::Eof;
        if input_tx.send(event).is_err() || eof {
          break;
        }
      }
    });

    let session_tx = tx.clone();
    tokio::spawn(async move {
      while let Some(event) = session_events.recv().await {
        if session_tx.send(Event::Session(event)).is_err() {
          break;
        }
      }
    });

    tokio::spawn(async move {
      let mut interval = tokio::time::interval(tick_rate);
      loop {
        interval.tick().await;
        if tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
