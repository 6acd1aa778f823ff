//! Terminal Engine
//!
//! Ties the decoder, cursor and mode state, display attributes and the
//! render surface together. Each inbound chunk is decoded one unit at a
//! time and every unit is executed immediately.
//!
//! A malformed unit aborts only itself: whatever it changed before the error
//! stays, and decoding resumes with the next unit.

mod csi;
mod sgr;

use std::time::Instant;

use crate::config::Config;
use crate::core::{Cursor, DisplayAttributes, Modes, Palette, Rgb, ScrollRegion, Snapshot};
use crate::input::{encode_pointer, KeyEvent, KeyMap, PointerEvent};
use crate::parser::{ControlCode, Decoder, EscCommand, OscCommand, SequenceError, Unit};
use crate::render::{load_rasterizer, GlyphPaint, Image, Surface};

/// Default cell width in pixels
pub const DEFAULT_CHAR_WIDTH: usize = 12;
/// Default cell height in pixels
pub const DEFAULT_CHAR_HEIGHT: usize = 22;

/// Notifications for the hosting environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// OSC 0 or 2 set the title
    TitleChanged(String),
    /// BEL was received
    Bell,
}

/// Surface and cursor saved by the alternate screen mode
#[derive(Debug, Clone)]
struct AlternateScreen {
    image: Image,
    cursor: Cursor,
}

/// A terminal session's engine state
#[derive(Debug)]
pub struct Terminal {
    decoder: Decoder,
    surface: Surface,
    palette: Palette,
    cursor: Cursor,
    /// ESC 7 / ESC 8 slot
    saved_cursor: Cursor,
    attributes: DisplayAttributes,
    modes: Modes,
    keypad_application: bool,
    keymap: KeyMap,
    alternate: Option<AlternateScreen>,
    title: String,
    events: Vec<TerminalEvent>,
    replies: Vec<u8>,
    /// Time of the write being processed
    now: Instant,
}

impl Terminal {
    /// Create a terminal with the default cell size and system font
    pub fn new(cols: usize, rows: usize) -> Self {
        let palette = Palette::new();
        let surface = Surface::new(
            cols.max(1),
            rows.max(1),
            DEFAULT_CHAR_WIDTH,
            DEFAULT_CHAR_HEIGHT,
            DisplayAttributes::default().fill_color(&palette),
        )
        .with_rasterizer(load_rasterizer(None));
        Self::with_surface(surface, palette)
    }

    /// Create a terminal from configuration
    pub fn with_config(config: &Config) -> Self {
        let palette = Palette::new();
        let geometry = &config.geometry;
        let surface = Surface::new(
            geometry.cols.max(1),
            geometry.rows.max(1),
            geometry.char_width.max(1),
            geometry.char_height.max(1),
            DisplayAttributes::default().fill_color(&palette),
        )
        .with_flush_delay(config.scroll_flush_delay())
        .with_highlight(config.cursor_highlight.color, config.cursor_highlight.alpha)
        .with_rasterizer(load_rasterizer(config.font_path.as_deref()));
        Self::with_surface(surface, palette)
    }

    /// Create a terminal drawing onto a prepared surface
    pub fn with_surface(surface: Surface, palette: Palette) -> Self {
        Self {
            decoder: Decoder::new(),
            surface,
            palette,
            cursor: Cursor::default(),
            saved_cursor: Cursor::default(),
            attributes: DisplayAttributes::default(),
            modes: Modes::new(),
            keypad_application: false,
            keymap: KeyMap::new(),
            alternate: None,
            title: String::new(),
            events: Vec::new(),
            replies: Vec::new(),
            now: Instant::now(),
        }
    }

    pub fn cols(&self) -> usize {
        self.surface.cols()
    }

    pub fn rows(&self) -> usize {
        self.surface.rows()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn scroll_region(&self) -> ScrollRegion {
        self.surface.region()
    }

    pub fn attributes(&self) -> &DisplayAttributes {
        &self.attributes
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn keypad_application(&self) -> bool {
        self.keypad_application
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Process an inbound chunk
    pub fn write(&mut self, data: &[u8]) {
        self.write_at(data, Instant::now());
    }

    /// Process an inbound chunk at an explicit time
    pub fn write_at(&mut self, data: &[u8], now: Instant) {
        self.now = now;
        self.surface.hide_cursor();

        self.decoder.push(data);
        while let Some(unit) = self.decoder.next_unit() {
            if let Err(e) = self.dispatch(unit) {
                tracing::warn!(error = %e, "malformed sequence");
            }
        }

        if self.modes.cursor_visible() {
            self.surface.show_cursor(self.cursor.row, self.cursor.col);
        }
    }

    /// Run coalesced scroll work that is due
    pub fn tick(&mut self, now: Instant) -> bool {
        self.surface.tick(now)
    }

    /// When [`Terminal::tick`] next has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.surface.next_deadline()
    }

    /// Drain host notifications
    pub fn take_events(&mut self) -> Vec<TerminalEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drain protocol replies destined for the shell
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    /// Encode a key press for the shell
    pub fn encode_key(&self, event: &KeyEvent) -> Option<Vec<u8>> {
        self.keymap.encode(event)
    }

    /// Encode a pointer event, if a mouse reporting mode is active
    pub fn encode_pointer(&self, event: &PointerEvent) -> Option<Vec<u8>> {
        if !self.modes.mouse_reporting() {
            return None;
        }
        let (cell_width, cell_height) = self.surface.cell_size();
        Some(encode_pointer(event, cell_width, cell_height))
    }

    /// Re-establish geometry; no reflow
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.surface.resize(cols.max(1), rows.max(1));
        self.cursor.home();
        if self.modes.cursor_visible() {
            self.surface.show_cursor(0, 0);
        }
    }

    /// Tear down: cancel deferred work and release the cursor backing
    pub fn shutdown(&mut self) {
        self.surface.shutdown();
        self.decoder.reset();
    }

    /// Serializable view of the protocol-visible state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cols: self.cols(),
            rows: self.rows(),
            cursor: self.cursor,
            scroll_region: self.scroll_region(),
            private_modes: self.modes.private.iter().collect(),
            ansi_modes: self.modes.ansi.iter().collect(),
            attributes: self.attributes,
            keypad_application: self.keypad_application,
            title: self.title.clone(),
            alternate_screen: self.alternate.is_some(),
            pending_rotation: self.surface.pending_rotation(),
        }
    }

    /// Pixels of a cell as last drawn, without the cursor highlight
    pub fn cell_image(&self, row: usize, col: usize) -> Image {
        self.surface.cell_image(row, col)
    }

    fn dispatch(&mut self, unit: Unit) -> Result<(), SequenceError> {
        match unit {
            Unit::Print(byte) => self.print(byte),
            Unit::Control(code) => self.execute_control(code),
            Unit::Esc(command) => self.execute_esc(command),
            Unit::Csi(command) => return self.execute_csi(&command),
            Unit::Osc(command) => self.execute_osc(&command),
        }
        Ok(())
    }

    /// Color for cleared and vacated cells
    fn fill_color(&self) -> Rgb {
        self.attributes.fill_color(&self.palette)
    }

    fn print(&mut self, byte: u8) {
        if self.cursor.col >= self.cols() {
            self.cursor.col = 0;
            self.line_feed();
        }

        let (foreground, background) = self.attributes.resolve(&self.palette);
        let paint = GlyphPaint {
            foreground,
            background,
            underline: self.attributes.underline,
            hidden: self.attributes.hidden,
        };
        self.surface
            .draw_glyph(self.cursor.row, self.cursor.col, byte, paint);
        self.cursor.col += 1;
    }

    /// Advance a row, scrolling when leaving the bottom of the region
    fn line_feed(&mut self) {
        if self.cursor.row + 1 == self.surface.region().bottom {
            let fill = self.fill_color();
            self.surface.scroll_up(1, fill, self.now);
        } else if self.cursor.row + 1 < self.rows() {
            self.cursor.row += 1;
        }
    }

    fn execute_control(&mut self, code: ControlCode) {
        match code {
            ControlCode::Bell => self.events.push(TerminalEvent::Bell),
            ControlCode::Backspace => self.cursor.move_backward(1),
            ControlCode::Tab => {
                let next = self.cursor.col + 8 - self.cursor.col % 8;
                self.cursor.col = next.min(self.cols() - 1);
            }
            ControlCode::LineFeed => self.line_feed(),
            ControlCode::CarriageReturn => self.cursor.col = 0,
        }
    }

    fn execute_esc(&mut self, command: EscCommand) {
        match command {
            EscCommand::KeypadApplication => self.keypad_application = true,
            EscCommand::KeypadNormal => self.keypad_application = false,
            EscCommand::ReverseIndex => tracing::debug!("reverse index not implemented"),
            EscCommand::DesignateCharset(charset) => {
                tracing::trace!(charset, "ignoring character set designation")
            }
            EscCommand::SaveCursor => self.saved_cursor = self.cursor,
            EscCommand::RestoreCursor => {
                self.cursor = self.saved_cursor;
                self.cursor.clamp_to(self.cols(), self.rows());
            }
        }
    }

    fn execute_osc(&mut self, command: &OscCommand) {
        match command.id() {
            "0" | "2" => {
                if let Some(title) = command.payload() {
                    self.title = title.to_string();
                    self.events
                        .push(TerminalEvent::TitleChanged(self.title.clone()));
                }
            }
            "1" => tracing::debug!("ignoring icon name"),
            other => tracing::debug!(id = other, "unhandled OSC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, MouseButton, PointerAction};

    fn terminal() -> Terminal {
        Terminal::new(80, 24)
    }

    fn blank(term: &Terminal, row: usize, col: usize) -> bool {
        term.cell_image(row, col).is_uniform(Rgb::BLACK)
    }

    #[test]
    fn test_terminal_print() {
        let mut term = terminal();
        term.write(b"Hello");

        assert_eq!(term.cursor(), Cursor::new(0, 5));
        assert!(!blank(&term, 0, 0));
        assert!(!blank(&term, 0, 4));
        assert!(blank(&term, 0, 5));
    }

    #[test]
    fn test_terminal_wrap() {
        let mut term = Terminal::new(4, 3);
        term.write(b"abcd");
        assert_eq!(term.cursor(), Cursor::new(0, 4));

        term.write(b"e");
        assert_eq!(term.cursor(), Cursor::new(1, 1));
        assert!(!blank(&term, 1, 0));
    }

    #[test]
    fn test_terminal_control_characters() {
        let mut term = terminal();
        term.write(b"abc\x08");
        assert_eq!(term.cursor().col, 2);

        term.write(b"\r");
        assert_eq!(term.cursor().col, 0);
        term.write(b"\x08");
        assert_eq!(term.cursor().col, 0);

        term.write(b"\t");
        assert_eq!(term.cursor().col, 8);
        term.write(b"ab\t");
        assert_eq!(term.cursor().col, 16);

        term.write(b"\x1b[78G\t");
        assert_eq!(term.cursor().col, 79);
    }

    #[test]
    fn test_terminal_line_feed_scrolls_at_bottom() {
        let mut term = Terminal::new(10, 3);
        term.write(b"top\n\n");
        assert_eq!(term.cursor().row, 2);

        term.write(b"\n");
        assert_eq!(term.cursor().row, 2);
        assert_eq!(term.surface().pending_rotation(), 1);
        // "top" scrolled off
        assert!(blank(&term, 0, 0));
    }

    #[test]
    fn test_terminal_bell_event() {
        let mut term = terminal();
        term.write(b"\x07");
        assert_eq!(term.take_events(), vec![TerminalEvent::Bell]);
        assert!(term.take_events().is_empty());
    }

    #[test]
    fn test_terminal_title() {
        let mut term = terminal();
        term.write(b"\x1b]0;My Title\x07");
        assert_eq!(term.title(), "My Title");

        term.write(b"\x1b]2;Other;ignored\x1b\\");
        assert_eq!(term.title(), "Other");

        term.write(b"\x1b]1;icon\x07\x1b]7;file://host\x07\x1b]2\x07");
        assert_eq!(term.title(), "Other");
        assert_eq!(
            term.take_events(),
            vec![
                TerminalEvent::TitleChanged("My Title".to_string()),
                TerminalEvent::TitleChanged("Other".to_string()),
            ]
        );
    }

    #[test]
    fn test_terminal_save_restore_cursor() {
        let mut term = terminal();
        term.write(b"\x1b[5;10H\x1b7\x1b[H\x1b8");
        assert_eq!(term.cursor(), Cursor::new(4, 9));
    }

    #[test]
    fn test_terminal_keypad_mode() {
        let mut term = terminal();
        term.write(b"\x1b=");
        assert!(term.keypad_application());
        term.write(b"\x1b>");
        assert!(!term.keypad_application());
    }

    #[test]
    fn test_terminal_ignored_escapes() {
        let mut term = terminal();
        term.write(b"\x1b(B\x1bMx");
        assert_eq!(term.cursor(), Cursor::new(0, 1));
    }

    #[test]
    fn test_terminal_cursor_overlay() {
        let mut term = terminal();
        term.write(b"a");
        assert_eq!(term.surface().cursor_cell(), Some((0, 1)));

        term.write(b"\x1b[?25l");
        assert_eq!(term.surface().cursor_cell(), None);
        assert!(blank(&term, 0, 1));
    }

    #[test]
    fn test_terminal_split_sequence() {
        let mut term = terminal();
        term.write(b"\x1b[1");
        term.write(b"0;2");
        term.write(b"0H");
        assert_eq!(term.cursor(), Cursor::new(9, 19));
    }

    #[test]
    fn test_terminal_keys_follow_decckm() {
        let mut term = terminal();
        let up = KeyEvent::plain(KeyCode::Up);
        assert_eq!(term.encode_key(&up).unwrap(), b"\x1b[A");

        term.write(b"\x1b[?1h");
        assert_eq!(term.encode_key(&up).unwrap(), b"\x1bOA");

        term.write(b"\x1b[?1l");
        assert_eq!(term.encode_key(&up).unwrap(), b"\x1b[A");
    }

    #[test]
    fn test_terminal_pointer_gated_by_mode() {
        let mut term = terminal();
        let press = PointerEvent::new(PointerAction::Press(MouseButton::Left), 0, 0);
        assert_eq!(term.encode_pointer(&press), None);

        term.write(b"\x1b[?1000h");
        assert_eq!(
            term.encode_pointer(&press).unwrap(),
            vec![0x1b, b'[', b'M', 32, 33, 33]
        );

        term.write(b"\x1b[?1000l\x1b[?1003h");
        assert!(term.encode_pointer(&press).is_some());
    }

    #[test]
    fn test_terminal_resize() {
        let mut term = terminal();
        term.write(b"\x1b[5;20r\x1b[10;10H");

        term.resize(100, 30);

        assert_eq!(term.cols(), 100);
        assert_eq!(term.rows(), 30);
        assert_eq!(term.cursor(), Cursor::new(0, 0));
        assert_eq!(term.scroll_region(), ScrollRegion::full(30));
    }

    #[test]
    fn test_terminal_unreadable_font_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.font_path = Some(dir.path().join("missing.ttf"));

        let mut configured = Terminal::with_config(&config);
        let mut plain = terminal();
        configured.write(b"A ");
        plain.write(b"A ");

        assert!(!blank(&configured, 0, 0));
        assert_eq!(configured.cell_image(0, 0), plain.cell_image(0, 0));
    }

    #[test]
    fn test_terminal_shutdown() {
        let mut term = terminal();
        term.write(&b"\n".repeat(30));
        assert!(term.next_deadline().is_some());

        term.shutdown();

        assert!(term.next_deadline().is_none());
        assert_eq!(term.surface().cursor_cell(), None);
    }

    #[test]
    fn test_terminal_snapshot() {
        let mut term = terminal();
        term.write(b"\x1b[3;4H\x1b[1;31m\x1b]0;snap\x07\x1b[?1049h");

        let snapshot = term.snapshot();
        assert_eq!(snapshot.cursor, Cursor::new(2, 3));
        assert_eq!(snapshot.private_modes, vec![25, 1049]);
        assert!(snapshot.attributes.bright);
        assert_eq!(snapshot.attributes.foreground, 9);
        assert_eq!(snapshot.title, "snap");
        assert!(snapshot.alternate_screen);
    }
}
