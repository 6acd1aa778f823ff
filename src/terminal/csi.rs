//! CSI command execution
//!
//! Block operations (insert/delete characters and lines, erase) go straight
//! to pixels on the surface. Vacated cells take the current background.

use super::{sgr, AlternateScreen, Terminal};
use crate::core::modes::{
    ALTERNATE_SCREEN, APPLICATION_CURSOR_KEYS, BLINKING_CURSOR, EIGHT_BIT_INPUT, MOUSE_ANY_EVENT,
    MOUSE_BUTTON_EVENT, MOUSE_NORMAL, SHOW_CURSOR,
};
use crate::core::ScrollRegion;
use crate::parser::{parse_field, CsiCommand, SequenceError};

/// Reply to `CSI > c`: VT100-class terminal, firmware 136
const SECONDARY_DEVICE_ATTRIBUTES: &[u8] = b"\x1b[>0;136;0c";

impl Terminal {
    pub(super) fn execute_csi(&mut self, csi: &CsiCommand) -> Result<(), SequenceError> {
        match csi.final_byte {
            b'm' if !csi.is_secondary() => return sgr::apply(&mut self.attributes, &csi.args),
            b'h' => return self.set_modes(csi, true),
            b'l' => return self.set_modes(csi, false),
            b'c' => {
                self.device_attributes(csi);
                return Ok(());
            }
            b'K' if csi.is_private() => {
                tracing::debug!("selective erase not implemented");
                return Ok(());
            }
            _ => {}
        }

        if csi.is_private() || csi.is_secondary() {
            tracing::debug!(args = %csi.args, final_byte = %(csi.final_byte as char), "unhandled CSI");
            return Ok(());
        }

        let params = csi.params()?;
        let n = params.get_usize(0, 1);
        let (rows, cols) = (self.rows(), self.cols());

        match csi.final_byte {
            b'@' => self.insert_chars(n),
            b'P' => self.delete_chars(n),
            b'K' => self.erase_in_line(params.get(0, 0)),
            b'J' => self.erase_in_display(params.get(0, 0)),
            b'A' => self.cursor.move_up(n),
            b'B' => self.cursor.move_down(n, rows),
            b'C' => self.cursor.move_forward(n, cols),
            b'D' => self.cursor.move_backward(n),
            b'E' => {
                self.cursor.move_down(n, rows);
                self.cursor.col = 0;
            }
            b'F' => {
                self.cursor.move_up(n);
                self.cursor.col = 0;
            }
            b'G' => self.cursor.set_col_1based(n, cols),
            b'H' | b'f' => {
                self.cursor.set_row_1based(params.get_usize(0, 1), rows);
                self.cursor.set_col_1based(params.get_usize(1, 1), cols);
            }
            b'd' => self.cursor.set_row_1based(n, rows),
            b'L' => self.insert_lines(n),
            b'M' => self.delete_lines(n),
            b'S' => {
                let fill = self.fill_color();
                self.surface.scroll_up(n, fill, self.now);
            }
            b'T' => {
                let fill = self.fill_color();
                self.surface.scroll_down(n, fill, self.now);
            }
            b'r' => {
                let top = params.get_usize(0, 1);
                let bottom = params.get_usize(1, rows);
                return self.set_scroll_region(top, bottom);
            }
            other => {
                tracing::debug!(args = %csi.args, final_byte = %(other as char), "unhandled CSI")
            }
        }
        Ok(())
    }

    /// `CSI Pm h` / `CSI Pm l` and their `?` forms
    ///
    /// Fields are applied in order; a malformed field stops the list there.
    fn set_modes(&mut self, csi: &CsiCommand, enable: bool) -> Result<(), SequenceError> {
        let private = csi.is_private();
        let args = csi.args.strip_prefix('?').unwrap_or(&csi.args);

        for field in args.split(';') {
            let value = parse_field(field)?
                .ok_or_else(|| SequenceError::InvalidInteger(field.to_string()))?;
            let mode =
                u16::try_from(value).map_err(|_| SequenceError::InvalidInteger(field.to_string()))?;

            if private {
                self.set_private_mode(mode, enable);
            } else if enable {
                self.modes.ansi.set(mode);
            } else {
                self.modes.ansi.reset(mode);
            }
        }
        Ok(())
    }

    fn set_private_mode(&mut self, mode: u16, enable: bool) {
        if enable {
            self.modes.private.set(mode);
        } else {
            self.modes.private.reset(mode);
        }

        match mode {
            APPLICATION_CURSOR_KEYS => self.keymap.set_application_cursor_keys(enable),
            ALTERNATE_SCREEN if enable => {
                self.alternate = Some(AlternateScreen {
                    image: self.surface.snapshot(),
                    cursor: self.cursor,
                });
            }
            ALTERNATE_SCREEN => match self.alternate.take() {
                Some(saved) => {
                    self.surface.restore(&saved.image);
                    self.cursor = saved.cursor;
                    self.cursor.clamp_to(self.cols(), self.rows());
                }
                None => tracing::debug!("alternate screen reset without a saved screen"),
            },
            BLINKING_CURSOR | EIGHT_BIT_INPUT => {
                tracing::debug!(mode, enable, "mode recorded only")
            }
            SHOW_CURSOR | MOUSE_NORMAL | MOUSE_BUTTON_EVENT | MOUSE_ANY_EVENT => {}
            other => tracing::debug!(mode = other, enable, "unknown private mode"),
        }
    }

    /// `CSI c` / `CSI > c`; only the secondary form is answered
    fn device_attributes(&mut self, csi: &CsiCommand) {
        if csi.is_secondary() {
            self.replies.extend_from_slice(SECONDARY_DEVICE_ATTRIBUTES);
        } else {
            tracing::debug!(args = %csi.args, "primary device attributes not answered");
        }
    }

    /// DECSTBM: 1-based inclusive bounds, always homes the cursor
    fn set_scroll_region(&mut self, top: usize, bottom: usize) -> Result<(), SequenceError> {
        let rows = self.rows();
        self.cursor.home();

        let top = top.clamp(1, rows) - 1;
        let bottom = bottom.clamp(1, rows);
        if top >= bottom {
            return Err(SequenceError::BadScrollRegion {
                top: top + 1,
                bottom,
            });
        }
        self.surface.set_region(ScrollRegion { top, bottom });
        Ok(())
    }

    /// ICH: shift the rest of the line right
    fn insert_chars(&mut self, n: usize) {
        let (row, col, cols) = (self.cursor.row, self.cursor.col, self.cols());
        if !self.surface.region().contains(row) {
            return;
        }
        let amount = n.min(cols.saturating_sub(col));
        if amount == 0 {
            return;
        }
        let fill = self.fill_color();
        self.surface
            .move_block((row, col), (row + 1, cols - amount), (row, col + amount));
        self.surface.clear(row, col, row + 1, col + amount, fill);
    }

    /// DCH: shift the rest of the line left, on any row
    fn delete_chars(&mut self, n: usize) {
        let (row, col, cols) = (self.cursor.row, self.cursor.col, self.cols());
        let amount = n.min(cols.saturating_sub(col));
        if amount == 0 {
            return;
        }
        let fill = self.fill_color();
        self.surface
            .move_block((row, col + amount), (row + 1, cols), (row, col));
        self.surface.clear(row, cols - amount, row + 1, cols, fill);
    }

    /// EL
    fn erase_in_line(&mut self, mode: u32) {
        let (row, col, cols) = (self.cursor.row, self.cursor.col, self.cols());
        let fill = self.fill_color();
        match mode {
            0 => self.surface.clear(row, col, row + 1, cols, fill),
            1 => self.surface.clear(row, 0, row + 1, col + 1, fill),
            2 => self.surface.clear(row, 0, row + 1, cols, fill),
            other => tracing::debug!(mode = other, "unknown EL mode"),
        }
    }

    /// ED
    fn erase_in_display(&mut self, mode: u32) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        let (rows, cols) = (self.rows(), self.cols());
        let fill = self.fill_color();
        match mode {
            0 => {
                self.surface.clear(row, col, row + 1, cols, fill);
                self.surface.clear(row + 1, 0, rows, cols, fill);
            }
            1 => {
                self.surface.clear(0, 0, row, cols, fill);
                self.surface.clear(row, 0, row + 1, col + 1, fill);
            }
            2 => self.surface.clear(0, 0, rows, cols, fill),
            other => tracing::debug!(mode = other, "unknown ED mode"),
        }
    }

    /// IL: push lines from the cursor down within the region
    fn insert_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let ScrollRegion { bottom, .. } = self.surface.region();
        if !self.surface.region().contains(row) {
            return;
        }
        let amount = n.min(bottom - row);
        let (cols, fill) = (self.cols(), self.fill_color());
        self.surface
            .move_block((row, 0), (bottom - amount, cols), (row + amount, 0));
        self.surface.clear(row, 0, row + amount, cols, fill);
    }

    /// DL: pull lines below the cursor up within the region
    fn delete_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let ScrollRegion { bottom, .. } = self.surface.region();
        if !self.surface.region().contains(row) {
            return;
        }
        let amount = n.min(bottom - row);
        let (cols, fill) = (self.cols(), self.fill_color());
        self.surface
            .move_block((row + amount, 0), (bottom, cols), (row, 0));
        self.surface.clear(bottom - amount, 0, bottom, cols, fill);
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Cursor, Rgb, ScrollRegion};
    use crate::parser::SequenceError;
    use crate::render::Image;
    use crate::terminal::Terminal;

    fn terminal() -> Terminal {
        Terminal::new(80, 24)
    }

    fn blank(term: &Terminal, row: usize, col: usize) -> bool {
        term.cell_image(row, col).is_uniform(Rgb::BLACK)
    }

    /// Reference rendering of a byte at the top-left of a fresh terminal
    fn glyph(byte: u8) -> Image {
        let mut term = terminal();
        term.write(&[byte]);
        term.cell_image(0, 0)
    }

    #[test]
    fn test_cursor_position() {
        let mut term = terminal();
        term.write(b"\x1b[10;20H");
        assert_eq!(term.cursor(), Cursor::new(9, 19));

        term.write(b"\x1b[H");
        assert_eq!(term.cursor(), Cursor::new(0, 0));

        term.write(b"\x1b[;5H");
        assert_eq!(term.cursor(), Cursor::new(0, 4));

        term.write(b"\x1b[0;0H");
        assert_eq!(term.cursor(), Cursor::new(0, 0));

        term.write(b"\x1b[999;999H");
        assert_eq!(term.cursor(), Cursor::new(23, 79));
    }

    #[test]
    fn test_cursor_movement() {
        let mut term = terminal();
        term.write(b"\x1b[10;10H");

        term.write(b"\x1b[3A");
        assert_eq!(term.cursor(), Cursor::new(6, 9));
        term.write(b"\x1b[B");
        assert_eq!(term.cursor(), Cursor::new(7, 9));
        term.write(b"\x1b[5C");
        assert_eq!(term.cursor(), Cursor::new(7, 14));
        term.write(b"\x1b[2D");
        assert_eq!(term.cursor(), Cursor::new(7, 12));

        term.write(b"\x1b[100A\x1b[200D");
        assert_eq!(term.cursor(), Cursor::new(0, 0));
        term.write(b"\x1b[100B\x1b[200C");
        assert_eq!(term.cursor(), Cursor::new(23, 79));
    }

    #[test]
    fn test_next_previous_line_and_absolute() {
        let mut term = terminal();
        term.write(b"\x1b[5;5H\x1b[2E");
        assert_eq!(term.cursor(), Cursor::new(6, 0));
        term.write(b"\x1b[5G\x1b[3F");
        assert_eq!(term.cursor(), Cursor::new(3, 0));
        term.write(b"\x1b[12G");
        assert_eq!(term.cursor().col, 11);
        term.write(b"\x1b[7d");
        assert_eq!(term.cursor(), Cursor::new(6, 11));
    }

    #[test]
    fn test_erase_in_line() {
        let mut term = terminal();
        term.write(b"abcdef\x1b[1;3H\x1b[K");
        assert!(!blank(&term, 0, 1));
        assert!(blank(&term, 0, 2));
        assert!(blank(&term, 0, 5));

        let mut term = terminal();
        term.write(b"abcdef\x1b[1;3H\x1b[1K");
        assert!(blank(&term, 0, 0));
        assert!(blank(&term, 0, 2));
        assert!(!blank(&term, 0, 3));

        let mut term = terminal();
        term.write(b"abcdef\x1b[1;3H\x1b[2K");
        assert!((0..6).all(|col| blank(&term, 0, col)));
    }

    #[test]
    fn test_erase_in_display() {
        let mut term = terminal();
        term.write(b"aaa\r\nbbb\r\nccc\x1b[2;2H\x1b[J");
        assert!(!blank(&term, 0, 2));
        assert!(!blank(&term, 1, 0));
        assert!(blank(&term, 1, 1));
        assert!(blank(&term, 2, 0));

        let mut term = terminal();
        term.write(b"aaa\r\nbbb\r\nccc\x1b[2;2H\x1b[1J");
        assert!(blank(&term, 0, 2));
        assert!(blank(&term, 1, 1));
        assert!(!blank(&term, 1, 2));
        assert!(!blank(&term, 2, 0));

        let mut term = terminal();
        term.write(b"aaa\r\nbbb\x1b[2J");
        assert!(blank(&term, 0, 0));
        assert!(blank(&term, 1, 2));
        // ED does not move the cursor
        assert_eq!(term.cursor(), Cursor::new(1, 3));
    }

    #[test]
    fn test_erase_uses_current_background() {
        let mut term = terminal();
        term.write(b"\x1b[44m\x1b[2J\x1b[m");
        let blue = term.palette().color(4);
        assert!(term.cell_image(5, 5).is_uniform(blue));
    }

    #[test]
    fn test_insert_and_delete_chars() {
        let mut term = terminal();
        term.write(b"abc\x1b[1;1H\x1b[2@");
        assert!(blank(&term, 0, 0));
        assert!(blank(&term, 0, 1));
        assert_eq!(term.cell_image(0, 2), glyph(b'a'));
        assert_eq!(term.cell_image(0, 4), glyph(b'c'));

        term.write(b"\x1b[2P");
        assert_eq!(term.cell_image(0, 0), glyph(b'a'));
        assert_eq!(term.cell_image(0, 2), glyph(b'c'));
        assert!(blank(&term, 0, 3));
        assert!(blank(&term, 0, 79));
    }

    #[test]
    fn test_delete_chars_below_scroll_region() {
        let mut term = terminal();
        term.write(b"\x1b[1;23r\x1b[24;1Habc\x1b[24;1H\x1b[P");
        assert_eq!(term.cell_image(23, 0), glyph(b'b'));
        assert_eq!(term.cell_image(23, 1), glyph(b'c'));
        assert!(blank(&term, 23, 2));

        // Insert stays confined to the region
        term.write(b"\x1b[24;1H\x1b[@");
        assert_eq!(term.cell_image(23, 0), glyph(b'b'));
    }

    #[test]
    fn test_insert_chars_past_end_clears_rest() {
        let mut term = Terminal::new(5, 2);
        term.write(b"abcde\x1b[1;4H\x1b[9@");
        assert_eq!(term.cell_image(0, 2), glyph(b'c'));
        assert!(blank(&term, 0, 3));
        assert!(blank(&term, 0, 4));
    }

    #[test]
    fn test_insert_and_delete_lines() {
        let mut term = terminal();
        term.write(b"one\r\ntwo\r\nthree\x1b[2;1H\x1b[L");
        assert_eq!(term.cell_image(0, 0), glyph(b'o'));
        assert!(blank(&term, 1, 0));
        assert_eq!(term.cell_image(2, 0), glyph(b't'));
        assert_eq!(term.cell_image(3, 1), glyph(b'h'));

        term.write(b"\x1b[M");
        assert_eq!(term.cell_image(1, 1), glyph(b'w'));
        assert_eq!(term.cell_image(2, 1), glyph(b'h'));
        assert!(blank(&term, 3, 0));
    }

    #[test]
    fn test_lines_outside_region_are_untouched() {
        let mut term = terminal();
        term.write(b"x\x1b[5;10r\x1b[1;1H\x1b[3L\x1b[3M");
        assert_eq!(term.cell_image(0, 0), glyph(b'x'));
    }

    #[test]
    fn test_insert_lines_stays_in_region() {
        let mut term = terminal();
        term.write(b"\x1b[4;1Hlast\x1b[1;3r\x1b[1;1Htop\x1b[L");
        assert!(blank(&term, 0, 0));
        assert_eq!(term.cell_image(1, 0), glyph(b't'));
        // Below the region
        assert_eq!(term.cell_image(3, 0), glyph(b'l'));
    }

    #[test]
    fn test_scroll_up_and_down() {
        let mut term = terminal();
        term.write(b"a\r\nb\x1b[S");
        assert_eq!(term.cell_image(0, 0), glyph(b'b'));
        assert!(blank(&term, 1, 0));
        assert_eq!(term.cursor(), Cursor::new(1, 1));

        term.write(b"\x1b[2T");
        assert!(blank(&term, 0, 0));
        assert!(blank(&term, 1, 0));
        assert_eq!(term.cell_image(2, 0), glyph(b'b'));
    }

    #[test]
    fn test_scroll_region() {
        let mut term = terminal();
        term.write(b"\x1b[5;10H\x1b[5;20r");
        assert_eq!(term.scroll_region(), ScrollRegion { top: 4, bottom: 20 });
        assert_eq!(term.cursor(), Cursor::new(0, 0));

        term.write(b"\x1b[r");
        assert_eq!(term.scroll_region(), ScrollRegion::full(24));

        term.write(b"\x1b[1;99r");
        assert_eq!(term.scroll_region(), ScrollRegion::full(24));
    }

    #[test]
    fn test_bad_scroll_region_keeps_previous() {
        let mut term = terminal();
        term.write(b"\x1b[3;10r\x1b[8;8H\x1b[10;5r");
        assert_eq!(term.scroll_region(), ScrollRegion { top: 2, bottom: 10 });
        assert_eq!(term.cursor(), Cursor::new(0, 0));

        let mut probe = terminal();
        assert_eq!(
            probe.set_scroll_region(10, 5),
            Err(SequenceError::BadScrollRegion { top: 10, bottom: 5 })
        );
    }

    #[test]
    fn test_line_feed_in_region() {
        let mut term = terminal();
        term.write(b"\x1b[10;1Hkeep\x1b[2;5r\x1b[5;1H\n");
        assert_eq!(term.cursor().row, 4);
        assert_eq!(term.surface().pending_rotation(), 1);
        assert_eq!(term.cell_image(9, 0), glyph(b'k'));

        // Below the region the cursor clamps at the last row
        term.write(b"\x1b[24;1H\n\n");
        assert_eq!(term.cursor().row, 23);
    }

    #[test]
    fn test_private_modes() {
        let mut term = terminal();
        term.write(b"\x1b[?1;1000h");
        assert!(term.modes().application_cursor_keys());
        assert!(term.modes().mouse_reporting());

        term.write(b"\x1b[?1000l\x1b[?25l\x1b[?12h\x1b[?1034h\x1b[?2004h");
        assert!(!term.modes().mouse_reporting());
        assert!(!term.modes().cursor_visible());
        assert_eq!(
            term.modes().private.iter().collect::<Vec<_>>(),
            vec![1, 12, 1034, 2004]
        );
    }

    #[test]
    fn test_ansi_modes_are_separate() {
        let mut term = terminal();
        term.write(b"\x1b[4h\x1b[25l");
        assert!(term.modes().ansi.is_set(4));
        assert!(term.modes().cursor_visible());

        term.write(b"\x1b[4l");
        assert_eq!(term.modes().ansi.iter().count(), 0);
    }

    #[test]
    fn test_malformed_mode_list_stops_at_bad_field() {
        let mut term = terminal();
        term.write(b"\x1b[?1;x;1000h");
        assert!(term.modes().application_cursor_keys());
        assert!(!term.modes().mouse_reporting());

        term.write(b"\x1b[?h");
        assert_eq!(
            term.modes().private.iter().collect::<Vec<_>>(),
            vec![1, 25]
        );
    }

    #[test]
    fn test_alternate_screen_round_trip() {
        let mut term = terminal();
        term.write(b"hello\x1b[3;7H");
        let before = term.cell_image(0, 0);

        term.write(b"\x1b[?1049h\x1b[2J\x1b[Hvim");
        assert!(term.snapshot().alternate_screen);
        assert_ne!(term.cell_image(0, 0), before);

        term.write(b"\x1b[?1049l");
        assert_eq!(term.cell_image(0, 0), before);
        assert_eq!(term.cell_image(0, 4), glyph(b'o'));
        assert!(blank(&term, 0, 5));
        assert_eq!(term.cursor(), Cursor::new(2, 6));
        assert!(!term.snapshot().alternate_screen);
    }

    #[test]
    fn test_alternate_screen_reset_without_save() {
        let mut term = terminal();
        term.write(b"\x1b[5;5H\x1b[?1049l");
        assert_eq!(term.cursor(), Cursor::new(4, 4));
    }

    #[test]
    fn test_device_attributes() {
        let mut term = terminal();
        term.write(b"\x1b[c");
        assert!(term.take_replies().is_empty());

        term.write(b"\x1b[>c");
        assert_eq!(term.take_replies(), b"\x1b[>0;136;0c");
        assert!(term.take_replies().is_empty());
    }

    #[test]
    fn test_unhandled_sequences_are_harmless() {
        let mut term = terminal();
        term.write(b"\x1b[5;5H\x1b[?5K\x1b[>4;1m\x1b[3q\x1b[?7x\x1b[9J\x1b[7K");
        assert_eq!(term.cursor(), Cursor::new(4, 4));
    }

    #[test]
    fn test_malformed_arguments_abort_only_their_sequence() {
        let mut term = terminal();
        term.write(b"\x1b[5;5H\x1b[1:1H\x1b[-2A\x1b[2A");
        assert_eq!(term.cursor(), Cursor::new(2, 4));
    }
}
