//! Select Graphic Rendition (`CSI Pm m`)

use crate::core::{DisplayAttributes, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::parser::{parse_field, SequenceError};

/// Apply an SGR argument list in order
///
/// A non-numeric field drops the whole sequence before anything is applied.
/// A bad extended color stops processing at that point; codes before it
/// stay applied.
pub(super) fn apply(attrs: &mut DisplayAttributes, args: &str) -> Result<(), SequenceError> {
    let codes: Vec<u32> = if args.is_empty() {
        vec![0]
    } else {
        args.split(';')
            .map(|field| parse_field(field).map(|code| code.unwrap_or(0)))
            .collect::<Result<_, _>>()?
    };

    let mut codes = codes.into_iter();
    while let Some(code) = codes.next() {
        match code {
            0 => attrs.reset(),
            1 => attrs.bright = true,
            22 => attrs.bright = false,
            4 => attrs.underline = true,
            24 => attrs.underline = false,
            5 => attrs.blink = true,
            25 => attrs.blink = false,
            7 => attrs.reverse = true,
            27 => attrs.reverse = false,
            8 => attrs.hidden = true,
            28 => attrs.hidden = false,
            30..=37 => attrs.foreground = ansi_color(code - 30, attrs.bright),
            38 => attrs.foreground = extended_color(&mut codes)?,
            39 => attrs.foreground = DEFAULT_FOREGROUND,
            40..=47 => attrs.background = ansi_color(code - 40, attrs.bright),
            48 => attrs.background = extended_color(&mut codes)?,
            49 => attrs.background = DEFAULT_BACKGROUND,
            90..=97 => attrs.foreground = ansi_color(code - 90, true),
            100..=107 => attrs.background = ansi_color(code - 100, true),
            other => tracing::debug!(code = other, "unhandled display attribute"),
        }
    }
    Ok(())
}

/// One of the 16 ANSI colors; `base` is in `0..8`
fn ansi_color(base: u32, bright: bool) -> u8 {
    base as u8 + if bright { 8 } else { 0 }
}

/// `5;N` following a 38 or 48
fn extended_color(codes: &mut impl Iterator<Item = u32>) -> Result<u8, SequenceError> {
    match codes.next() {
        Some(5) => {}
        selector => return Err(SequenceError::BadColorSelector(selector)),
    }
    let index = codes.next().ok_or(SequenceError::MissingColorIndex)?;
    u8::try_from(index).map_err(|_| SequenceError::BadColorIndex(index))
}
