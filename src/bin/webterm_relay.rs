//! PTY relay
//!
//! Runs the configured login shell on a PTY and relays stdin/stdout to it
//! verbatim until the shell exits or stdin closes. On teardown the shell's
//! process group receives SIGINT.
//!
//! With `--ppm`, the shell output is also mirrored through the terminal
//! engine and the final surface is written as an image on exit.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use mochi_webterm::pty::{Pty, WindowSize};
use mochi_webterm::{Config, Terminal};
use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "webterm-relay")]
#[command(version)]
#[command(about = "Relay a login shell on a PTY to stdin/stdout", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shell to run instead of the configured one
    #[arg(short, long, value_name = "SHELL")]
    shell: Option<String>,

    /// Mirror output through the engine and save the final surface here
    #[arg(long, value_name = "PATH")]
    ppm: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };
    if let Some(shell) = args.shell {
        config.shell.program = shell;
    }

    let size = terminal_size().unwrap_or_else(|| {
        WindowSize::new(config.geometry.cols as u16, config.geometry.rows as u16)
    });
    config.geometry.cols = usize::from(size.cols);
    config.geometry.rows = usize::from(size.rows);

    let mut pty = Pty::spawn_login_shell(&config.shell, size)?;
    tracing::debug!(pid = pty.child_pid().as_raw(), cols = size.cols, rows = size.rows, "relay started");

    let mut mirror = args.ppm.as_ref().map(|_| Terminal::with_config(&config));

    let result = {
        let _raw_guard = RawModeGuard::new()?;
        relay(&mut pty, mirror.as_mut())
    };

    if let Err(e) = pty.interrupt() {
        tracing::debug!(error = %e, "shell already gone");
    }

    if let (Some(terminal), Some(path)) = (mirror.as_mut(), &args.ppm) {
        terminal.surface_mut().write_ppm(BufWriter::new(File::create(path)?))?;
        terminal.shutdown();
    }

    result
}

/// Move bytes between stdin, the PTY, and stdout until either side ends
fn relay(pty: &mut Pty, mut mirror: Option<&mut Terminal>) -> Result<(), Box<dyn Error>> {
    let mut stdin_buf = [0u8; 4096];
    let mut pty_buf = [0u8; 65536];

    while pty.is_alive() {
        let (stdin_ready, pty_ready) = {
            let stdin = io::stdin();
            let stdin_fd = stdin.as_fd();
            // SAFETY: the master fd is valid for the lifetime of `pty`
            let pty_fd = unsafe { BorrowedFd::borrow_raw(pty.master_fd()) };
            let mut fds = [
                PollFd::new(&stdin_fd, PollFlags::POLLIN),
                PollFd::new(&pty_fd, PollFlags::POLLIN),
            ];
            match poll(&mut fds, 100) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
            let ready = |fd: &PollFd| {
                fd.revents()
                    .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
            };
            (ready(&fds[0]), ready(&fds[1]))
        };

        if stdin_ready {
            let n = nix::unistd::read(io::stdin().as_raw_fd(), &mut stdin_buf)?;
            if n == 0 {
                tracing::debug!("stdin closed");
                break;
            }
            pty.write_all(&stdin_buf[..n])?;
        }

        if pty_ready {
            loop {
                let n = pty.read(&mut pty_buf)?;
                if n == 0 {
                    break;
                }
                let mut stdout = io::stdout().lock();
                stdout.write_all(&pty_buf[..n])?;
                stdout.flush()?;
                if let Some(terminal) = mirror.as_deref_mut() {
                    mirror_output(terminal, &pty_buf[..n]);
                }
            }
        }

        if let Some(terminal) = mirror.as_deref_mut() {
            terminal.tick(Instant::now());
        }
    }

    Ok(())
}

/// Feed shell output to the mirror; the real terminal already answered it,
/// so replies and events are dropped to keep the queues bounded
fn mirror_output(terminal: &mut Terminal, data: &[u8]) {
    terminal.write(data);
    terminal.take_replies();
    terminal.take_events();
}

/// Size of the controlling terminal, if stdout is one
fn terminal_size() -> Option<WindowSize> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ fills in a winsize
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(WindowSize::new(ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

/// RAII guard for raw terminal mode
struct RawModeGuard {
    original: Option<Termios>,
}

impl RawModeGuard {
    /// Switch stdin to raw mode; a no-op when stdin is not a terminal
    fn new() -> Result<Self, Errno> {
        let original = match termios::tcgetattr(io::stdin()) {
            Ok(original) => original,
            Err(Errno::ENOTTY) => return Ok(Self { original: None }),
            Err(e) => return Err(e),
        };

        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON);
        raw.local_flags.remove(LocalFlags::ECHO);
        raw.local_flags.remove(LocalFlags::ISIG);
        raw.local_flags.remove(LocalFlags::IEXTEN);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &raw)?;

        Ok(Self {
            original: Some(original),
        })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(original) = &self.original {
            let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, original);
        }
    }
}
