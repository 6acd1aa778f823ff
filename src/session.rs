//! Terminal session
//!
//! Binds one [`Terminal`] to the channel that carries bytes to and from the
//! shell. Shell output is fed into the engine; key and pointer events are
//! encoded and sent back, along with any protocol replies the engine queued.
//!
//! A failed send ends the session: pending coalesced scroll work is
//! cancelled and the cursor backing released. It never takes the host
//! process down.

use std::time::Instant;

use thiserror::Error;

use crate::input::{encode_text, KeyEvent, PointerEvent};
use crate::pty::{Pty, PtyError};
use crate::terminal::{Terminal, TerminalEvent};

/// Clears the display when a connection opens
const OPEN_SEQUENCE: &[u8] = b"\x1b[2J";

/// Session failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport send failed: {0}")]
    Send(String),

    #[error("session is closed")]
    Closed,

    #[error("PTY error: {0}")]
    Pty(#[from] PtyError),
}

/// Outbound half of the channel to the shell
pub trait Transport {
    /// Deliver bytes to the shell
    fn send(&mut self, data: &[u8]) -> Result<(), SessionError>;
}

impl Transport for Pty {
    fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        Ok(self.write_all(data)?)
    }
}

/// A terminal engine bound to a transport
pub struct Session<T: Transport> {
    terminal: Terminal,
    transport: T,
    open: bool,
}

impl<T: Transport> Session<T> {
    /// Create a session; nothing is drawn until [`Session::open`]
    pub fn new(terminal: Terminal, transport: T) -> Self {
        Self {
            terminal,
            transport,
            open: false,
        }
    }

    /// The connection is up: clear the display
    pub fn open(&mut self) {
        self.open = true;
        self.terminal.write(OPEN_SEQUENCE);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Feed a chunk of shell output into the engine
    pub fn receive(&mut self, data: &[u8]) -> Result<(), SessionError> {
        self.receive_at(data, Instant::now())
    }

    /// Feed shell output at an explicit time
    pub fn receive_at(&mut self, data: &[u8], now: Instant) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.terminal.write_at(data, now);

        let replies = self.terminal.take_replies();
        if !replies.is_empty() {
            self.send(&replies)?;
        }
        Ok(())
    }

    /// Encode and send a key press; `Ok(false)` means the key has no encoding
    pub fn key(&mut self, event: &KeyEvent) -> Result<bool, SessionError> {
        self.ensure_open()?;
        match self.terminal.encode_key(event) {
            Some(bytes) => self.send(&bytes).map(|()| true),
            None => Ok(false),
        }
    }

    /// Send typed text verbatim
    pub fn text(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let bytes: Vec<u8> = text.chars().flat_map(encode_text).collect();
        self.send(&bytes)
    }

    /// Encode and send a pointer event; `Ok(false)` when mouse reporting is off
    pub fn pointer(&mut self, event: &PointerEvent) -> Result<bool, SessionError> {
        self.ensure_open()?;
        match self.terminal.encode_pointer(event) {
            Some(bytes) => self.send(&bytes).map(|()| true),
            None => Ok(false),
        }
    }

    /// Run coalesced scroll work that is due
    pub fn tick(&mut self, now: Instant) -> bool {
        self.open && self.terminal.tick(now)
    }

    /// Drain notifications for the host
    pub fn take_events(&mut self) -> Vec<TerminalEvent> {
        self.terminal.take_events()
    }

    /// Tear the session down
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            self.terminal.shutdown();
            tracing::debug!("session closed");
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        if let Err(e) = self.transport.send(data) {
            tracing::warn!(error = %e, "transport failure, closing session");
            self.close();
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, MouseButton, PointerAction};

    /// Records everything sent; fails every send once `broken` is set
    #[derive(Default)]
    struct Recorder {
        sent: Vec<u8>,
        broken: bool,
    }

    impl Transport for Recorder {
        fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
            if self.broken {
                return Err(SessionError::Send("connection reset".to_string()));
            }
            self.sent.extend_from_slice(data);
            Ok(())
        }
    }

    fn session() -> Session<Recorder> {
        let mut session = Session::new(Terminal::new(80, 24), Recorder::default());
        session.open();
        session
    }

    #[test]
    fn test_session_open_clears_display() {
        let mut terminal = Terminal::new(10, 2);
        terminal.write(b"\x1b[44m\x1b[2J\x1b[m");
        let mut session = Session::new(terminal, Recorder::default());
        assert!(!session.is_open());

        session.open();

        assert!(session.is_open());
        let black = session.terminal().palette().color(0);
        assert!(session.terminal().cell_image(1, 5).is_uniform(black));
    }

    #[test]
    fn test_session_receive() {
        let mut session = session();
        session.receive(b"hi\x1b]0;shell\x07").unwrap();

        assert_eq!(session.terminal().cursor().col, 2);
        assert_eq!(
            session.take_events(),
            vec![TerminalEvent::TitleChanged("shell".to_string())]
        );
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn test_session_forwards_replies() {
        let mut session = session();
        session.receive(b"\x1b[>c").unwrap();
        assert_eq!(session.transport().sent, b"\x1b[>0;136;0c");
    }

    #[test]
    fn test_session_input() {
        let mut session = session();
        assert!(session.key(&KeyEvent::plain(KeyCode::Left)).unwrap());
        assert!(!session.key(&KeyEvent::plain(KeyCode::Letter(b'A'))).unwrap());
        session.text("ls\r").unwrap();
        assert_eq!(session.transport().sent, b"\x1b[Dls\r");

        let press = PointerEvent::new(PointerAction::Press(MouseButton::Left), 0, 0);
        assert!(!session.pointer(&press).unwrap());
        session.receive(b"\x1b[?1000h").unwrap();
        assert!(session.pointer(&press).unwrap());
    }

    #[test]
    fn test_session_send_failure_closes() {
        let mut session = session();
        session.receive(&b"\n".repeat(40)).unwrap();
        assert!(session.terminal().next_deadline().is_some());

        session.transport.broken = true;
        let result = session.key(&KeyEvent::plain(KeyCode::Up));

        assert!(matches!(result, Err(SessionError::Send(_))));
        assert!(!session.is_open());
        assert!(session.terminal().next_deadline().is_none());
        assert!(matches!(session.receive(b"x"), Err(SessionError::Closed)));
    }

    #[test]
    fn test_session_tick() {
        let mut session = session();
        let start = Instant::now();
        session.receive_at(&b"\n".repeat(30), start).unwrap();
        let deadline = session.terminal().next_deadline().unwrap();

        assert!(!session.tick(start));
        assert!(session.tick(deadline));
        assert_eq!(session.terminal().surface().pending_rotation(), 0);

        session.close();
        session.close();
        assert!(!session.tick(deadline));
    }
}
