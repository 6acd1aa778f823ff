//! Unix PTY implementation
//!
//! Opens a pseudoterminal pair, forks, and execs the shell on the slave side
//! as a new session leader, so the shell's process group id equals its pid.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::BorrowedFd;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::sys::signal::{killpg, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, read, setsid, write, ForkResult, Pid};

use super::{PtyError, PtyResult, WindowSize};
use crate::config::ShellConfig;

/// A pseudoterminal with a spawned child process
pub struct Pty {
    master: PtyMaster,
    child_pid: Pid,
    child_alive: bool,
}

impl Pty {
    /// Spawn `program` with `args` on a new PTY, adding `env` to its environment
    pub fn spawn(
        program: &str,
        args: &[&str],
        env: &BTreeMap<String, String>,
        size: WindowSize,
    ) -> PtyResult<Self> {
        // Everything that can fail on bad input is checked before forking
        let program = c_string(program)?;
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.clone());
        for arg in args {
            argv.push(c_string(arg)?);
        }
        if let Some((key, _)) = env
            .iter()
            .find(|(key, value)| key.is_empty() || key.contains(['=', '\0']) || value.contains('\0'))
        {
            return Err(PtyError::InvalidArgument(key.clone()));
        }

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;
        grantpt(&master).map_err(PtyError::GrantPty)?;
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe; it is called before any other
        // thread could open a PTY through this process
        let slave_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;

        set_window_size(master.as_raw_fd(), size)?;

        // SAFETY: the child only sets up its stdio and environment before exec
        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Child => {
                drop(master);
                if let Err(e) = exec_child(&slave_name, &program, &argv, env) {
                    tracing::error!(error = %e, "failed to start shell");
                }
                // SAFETY: _exit skips the parent's atexit handlers and buffers
                unsafe { libc::_exit(127) }
            }
            ForkResult::Parent { child } => {
                let flags = fcntl(master.as_raw_fd(), FcntlArg::F_GETFL)
                    .map_err(PtyError::SetNonBlocking)?;
                let flags = OFlag::from_bits_truncate(flags);
                fcntl(
                    master.as_raw_fd(),
                    FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK),
                )
                .map_err(PtyError::SetNonBlocking)?;

                tracing::debug!(pid = child.as_raw(), "spawned child on PTY");
                Ok(Pty {
                    master,
                    child_pid: child,
                    child_alive: true,
                })
            }
        }
    }

    /// Spawn the configured interactive login shell
    pub fn spawn_login_shell(shell: &ShellConfig, size: WindowSize) -> PtyResult<Self> {
        let args: Vec<&str> = shell.args.iter().map(String::as_str).collect();
        Self::spawn(&shell.program, &args, &shell.env, size)
    }

    /// Get the raw file descriptor of the PTY master
    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Get the child process ID
    pub fn child_pid(&self) -> Pid {
        self.child_pid
    }

    /// Check if the child process is still running
    pub fn is_alive(&mut self) -> bool {
        if !self.child_alive {
            return false;
        }

        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(_) | Err(_) => {
                self.child_alive = false;
                false
            }
        }
    }

    /// Wait for the child process to exit
    pub fn wait(&mut self) -> PtyResult<i32> {
        if !self.child_alive {
            return Ok(0);
        }

        match waitpid(self.child_pid, None).map_err(PtyError::Wait)? {
            WaitStatus::Exited(_, code) => {
                self.child_alive = false;
                Ok(code)
            }
            WaitStatus::Signaled(_, signal, _) => {
                self.child_alive = false;
                Err(PtyError::ChildSignaled(signal as i32))
            }
            _ => Ok(0),
        }
    }

    /// Read from the PTY master (non-blocking)
    ///
    /// Returns 0 when no data is available. Once the child has exited and the
    /// slave side is closed, Linux reports EIO, which is also returned as 0.
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<usize> {
        match read(self.master.as_raw_fd(), buf) {
            Ok(n) => Ok(n),
            Err(nix::errno::Errno::EAGAIN) | Err(nix::errno::Errno::EIO) => Ok(0),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    /// Write to the PTY master, returning the number of bytes written
    pub fn write(&self, data: &[u8]) -> PtyResult<usize> {
        match write(self.master.as_raw_fd(), data) {
            Ok(n) => Ok(n),
            Err(nix::errno::Errno::EAGAIN) => Ok(0),
            Err(e) => Err(PtyError::Write(e)),
        }
    }

    /// Write all data to the PTY master
    pub fn write_all(&self, mut data: &[u8]) -> PtyResult<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                self.poll_write(100)?;
                continue;
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Poll for data available to read
    ///
    /// Returns true if data is available, false if the timeout expired.
    pub fn poll_read(&self, timeout_ms: i32) -> PtyResult<bool> {
        self.poll_for(PollFlags::POLLIN, timeout_ms)
    }

    fn poll_write(&self, timeout_ms: i32) -> PtyResult<bool> {
        self.poll_for(PollFlags::POLLOUT, timeout_ms)
    }

    fn poll_for(&self, events: PollFlags, timeout_ms: i32) -> PtyResult<bool> {
        // SAFETY: The master fd is valid for the lifetime of this Pty
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(self.master.as_raw_fd()) };
        let mut fds = [PollFd::new(&borrowed_fd, events)];
        let n = poll(&mut fds, timeout_ms).map_err(PtyError::Poll)?;
        Ok(n > 0 && fds[0].revents().is_some_and(|r| r.intersects(events)))
    }

    /// Resize the PTY
    pub fn resize(&self, size: WindowSize) -> PtyResult<()> {
        set_window_size(self.master.as_raw_fd(), size)
    }

    /// Send SIGINT to the child's process group
    pub fn interrupt(&self) -> PtyResult<()> {
        killpg(self.child_pid, Signal::SIGINT).map_err(PtyError::Signal)
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        if self.is_alive() {
            if let Err(e) = self.interrupt() {
                tracing::debug!(error = %e, "failed to interrupt shell");
            }
            let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
        }
    }
}

fn c_string(value: &str) -> PtyResult<CString> {
    CString::new(value).map_err(|_| PtyError::InvalidArgument(value.to_string()))
}

/// Child side of the fork: become a session leader on the slave and exec
fn exec_child(
    slave_name: &str,
    program: &CString,
    argv: &[CString],
    env: &BTreeMap<String, String>,
) -> PtyResult<Infallible> {
    setsid().map_err(PtyError::Setsid)?;

    let slave_fd = open(slave_name, OFlag::O_RDWR, Mode::empty()).map_err(PtyError::OpenSlave)?;

    // SAFETY: TIOCSCTTY is a valid ioctl for setting the controlling terminal
    unsafe {
        if libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0) < 0 {
            tracing::debug!("TIOCSCTTY failed (may be ok)");
        }
    }

    dup2(slave_fd, STDIN_FILENO).map_err(PtyError::Dup2)?;
    dup2(slave_fd, STDOUT_FILENO).map_err(PtyError::Dup2)?;
    dup2(slave_fd, STDERR_FILENO).map_err(PtyError::Dup2)?;
    if slave_fd > STDERR_FILENO {
        let _ = close(slave_fd);
    }

    for (key, value) in env {
        std::env::set_var(key, value);
    }

    execvp(program, argv).map_err(PtyError::Exec)
}

/// Set the window size on a PTY file descriptor
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: size.pixel_width,
        ws_ypixel: size.pixel_height,
    };

    // SAFETY: TIOCSWINSZ is a valid ioctl for setting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(nix::errno::Errno::last()))
    } else {
        Ok(())
    }
}

/// Get the window size from a PTY file descriptor
pub fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ is a valid ioctl for getting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(nix::errno::Errno::last()))
    } else {
        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            pixel_width: winsize.ws_xpixel,
            pixel_height: winsize.ws_ypixel,
        })
    }
}
