//! Mochi Web Terminal Library
//!
//! A VT100/xterm terminal engine that renders straight to pixels. The shell
//! runs elsewhere; this crate turns its output into a picture and turns key
//! and pointer events back into the bytes the shell expects.
//!
//! - `core`: palette, display attributes, cursor, modes, snapshots
//! - `parser`: streaming escape sequence decoder
//! - `render`: pixel canvas, glyphs, and the scroll-coalescing surface
//! - `terminal`: the engine executing decoded units
//! - `input`: key and mouse encoders
//! - `pty`: Unix PTY management for the shell side
//! - `session`: a terminal bound to its transport
//! - `config`: JSON configuration

pub mod config;
pub mod core;
pub mod input;
pub mod parser;
pub mod pty;
pub mod render;
pub mod session;
pub mod terminal;

pub use config::Config;
pub use session::{Session, SessionError, Transport};
pub use terminal::{Terminal, TerminalEvent};
