//! Terminal control for the interactive display
//!
//! Raw mode is held by a [`TerminalGuard`] and released either explicitly
//! through [`TerminalGuard::restore`] or when the guard is dropped, so an
//! early return or panic cannot leave the invoking shell in raw mode.

use crate::error::{Result, Tx2monError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, terminal, Command};
use log::{debug, warn};
use std::io::{self, IsTerminal};
#[cfg(unix)]
use std::os::fd::RawFd;
use std::time::Duration;

/// Escape sequences used by the interactive renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSeq {
    /// Clears the screen and homes the cursor; empty when not on a terminal.
    pub clear: String,
    /// Line terminator. Raw mode disables output post-processing, so `\r\n`.
    pub newline: &'static str,
}

impl TermSeq {
    /// Sequences for a raw-mode ANSI terminal.
    pub fn ansi() -> Self {
        let mut clear = String::new();
        // Writing into a String cannot fail
        let _ = terminal::Clear(terminal::ClearType::All).write_ansi(&mut clear);
        let _ = cursor::MoveTo(0, 0).write_ansi(&mut clear);
        Self {
            clear,
            newline: "\r\n",
        }
    }

    /// Sequences for output redirected to a file or pipe.
    pub fn plain() -> Self {
        Self {
            clear: String::new(),
            newline: "\n",
        }
    }
}

/// Holds the terminal in raw mode until restored or dropped.
#[derive(Debug)]
pub struct TerminalGuard {
    raw: bool,
    release: fn() -> io::Result<()>,
}

impl TerminalGuard {
    /// Take over the terminal if stdout is one.
    ///
    /// Returns the guard together with the escape sequences matching the
    /// mode that was actually entered. Failing to enter raw mode on a real
    /// terminal is an error; there is no silent fallback.
    pub fn acquire() -> Result<(Self, TermSeq)> {
        if !io::stdout().is_terminal() {
            let guard = Self::with_release(false, terminal::disable_raw_mode);
            return Ok((guard, TermSeq::plain()));
        }

        terminal::enable_raw_mode().map_err(Tx2monError::Terminal)?;
        let guard = Self::with_release(true, terminal::disable_raw_mode);
        Ok((guard, TermSeq::ansi()))
    }

    /// A guard that calls `release` once when restored, if `raw` is set.
    pub(crate) fn with_release(raw: bool, release: fn() -> io::Result<()>) -> Self {
        Self { raw, release }
    }

    /// Leave raw mode. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if self.raw {
            self.raw = false;
            (self.release)().map_err(Tx2monError::Terminal)?;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!("Failed to restore terminal mode: {err}");
        }
    }
}

/// A key press as seen by the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Quit request (`q`, or Ctrl-C while raw mode swallows the signal).
    Quit,
    /// End of input (Ctrl-D).
    EndOfInput,
    /// Anything else; forces an immediate refresh.
    Other,
}

impl Key {
    /// Whether this key ends the session.
    pub fn stops(self) -> bool {
        matches!(self, Key::Quit | Key::EndOfInput)
    }
}

impl Key {
    /// Map one byte read from a non-terminal input.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'q' | b'Q' | 0x03 => Key::Quit,
            0x04 => Key::EndOfInput,
            _ => Key::Other,
        }
    }
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => Key::Quit,
            KeyCode::Char('d') if ctrl => Key::EndOfInput,
            KeyCode::Char('q') | KeyCode::Char('Q') => Key::Quit,
            _ => Key::Other,
        }
    }
}

/// Non-blocking key availability check used while waiting for a tick.
pub trait KeySource {
    /// Wait at most `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}

/// Reads key presses from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(Key::from(key))),
            // Resizes, focus changes and key releases do not wake the loop
            _ => Ok(None),
        }
    }
}

/// Key source for sessions without keyboard input; it only waits.
#[derive(Debug, Default)]
pub struct NoKeys;

impl KeySource for NoKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

/// Reads single bytes from a descriptor that is not a terminal, such as a
/// pipe or `/dev/null` on stdin. A zero-length read is end of input.
#[cfg(unix)]
#[derive(Debug)]
pub struct ByteKeys {
    fd: RawFd,
}

#[cfg(unix)]
impl ByteKeys {
    pub fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }

    #[cfg(test)]
    fn from_fd(fd: RawFd) -> Self {
        Self { fd }
    }
}

#[cfg(unix)]
impl KeySource for ByteKeys {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ready < 0 {
            return interrupted_or(io::Error::last_os_error());
        }
        if ready == 0 {
            return Ok(None);
        }
        if pfd.revents & libc::POLLNVAL != 0 {
            return Ok(Some(Key::EndOfInput));
        }

        let mut byte = 0u8;
        // SAFETY: reads at most one byte into a live local.
        let n = unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast(), 1) };
        match n {
            0 => Ok(Some(Key::EndOfInput)),
            n if n < 0 => interrupted_or(io::Error::last_os_error()),
            _ => Ok(Some(Key::from_byte(byte))),
        }
    }
}

#[cfg(unix)]
fn interrupted_or(err: io::Error) -> Result<Option<Key>> {
    if err.kind() == io::ErrorKind::Interrupted {
        Ok(None)
    } else {
        Err(err.into())
    }
}

/// Pick the key source for an interactive session.
pub fn interactive_keys() -> Box<dyn KeySource> {
    if io::stdin().is_terminal() {
        return Box::new(TerminalKeys);
    }

    #[cfg(unix)]
    {
        debug!("stdin is not a terminal; reading keys byte by byte");
        Box::new(ByteKeys::stdin())
    }
    #[cfg(not(unix))]
    {
        warn!("stdin is not a terminal; keyboard input disabled");
        Box::new(NoKeys)
    }
}
