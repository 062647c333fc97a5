//! FIFO primitives: open/stat/watch/close, EOF re-arm (§4.B).
//!
//! Each reader thread owns exactly one [`PipeReactor`] and the [`Pipe`]
//! values registered into it; there is no shared event loop across threads
//! (Design Note: "a single cooperative event loop per thread, each owning
//! its FIFO handle and the stateful read buffer; no shared loop"). The
//! `mio::Token` a pipe is registered under is itself the "which FIFO does
//! this event belong to" association that the original's linked list of
//! pipes existed to provide.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use nix::sys::stat::{Mode, SFlag, fstat};
use nix::unistd::mkfifo;

use crate::error::{Error, Result};

/// Mode used when creating testrun FIFOs: `0666`.
const TESTRUN_FIFO_MODE: u32 = 0o666;

fn path_is_fifo(path: &Path) -> Result<bool> {
    let st = nix::sys::stat::stat(path).map_err(Error::Errno)?;
    Ok(SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT == SFlag::S_IFIFO)
}

/// Open `path` read-only, non-blocking. Distinguishes missing path from
/// "exists but is not a FIFO".
pub fn open_nonblocking(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(Error::MissingFifo(path.to_path_buf()));
    }
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)?;
    let st = fstat(file.as_raw_fd()).map_err(Error::Errno)?;
    if SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT != SFlag::S_IFIFO {
        return Err(Error::NotAFifo(path.to_path_buf()));
    }
    Ok(file)
}

/// For `--testrun` only: create the FIFO with mode 0666 if missing. A path
/// that already exists and is a FIFO is fine; a path that exists and is
/// *not* a FIFO is fatal.
pub fn ensure(path: &Path) -> Result<()> {
    if path.exists() {
        return if path_is_fifo(path)? {
            Ok(())
        } else {
            Err(Error::NotAFifo(path.to_path_buf()))
        };
    }
    mkfifo(path, Mode::from_bits_truncate(TESTRUN_FIFO_MODE)).map_err(Error::Errno)?;
    Ok(())
}

/// Unlink `path` only if it is currently a FIFO.
pub fn remove(path: &Path) -> Result<()> {
    if path.exists() && path_is_fifo(path)? {
        nix::unistd::unlink(path).map_err(Error::Errno)?;
    }
    Ok(())
}

/// An open FIFO, owned by exactly one reader thread.
pub struct Pipe {
    pub path: PathBuf,
    file: File,
}

impl Pipe {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_nonblocking(&path)?;
        Ok(Self { path, file })
    }

    /// Re-open after observing EOF (the last writer closed). The FIFO stays
    /// registered under the same reactor token; callers re-register after
    /// calling this.
    pub fn reopen(&mut self) -> Result<()> {
        self.file = open_nonblocking(&self.path)?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` both on a genuine
    /// zero-length read (EOF — caller must `reopen`) and on `EAGAIN`
    /// (nothing available yet); callers distinguish the two by calling
    /// `reopen` only after a readable event from the reactor fires and the
    /// fd keeps reporting eof.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl AsRawFd for Pipe {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Per-thread cooperative readiness reactor. Wraps [`mio::Poll`]; the only
/// interest this crate ever registers is level-triggered readable.
pub struct PipeReactor {
    poll: Poll,
    events: Events,
}

impl PipeReactor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(16),
        })
    }

    pub fn register(&mut self, fd: RawFd, token: Token) -> Result<()> {
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
        Ok(())
    }

    pub fn reregister(&mut self, fd: RawFd, token: Token) -> Result<()> {
        self.poll
            .registry()
            .reregister(&mut SourceFd(&fd), token, Interest::READABLE)?;
        Ok(())
    }

    pub fn deregister(&mut self, fd: RawFd) -> Result<()> {
        self.poll.registry().deregister(&mut SourceFd(&fd))?;
        Ok(())
    }

    /// Block until at least one registered source is readable (or the
    /// timeout elapses), then return the tokens that fired.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<Token>> {
        self.poll.poll(&mut self.events, timeout)?;
        Ok(self.events.iter().map(|e| e.token()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn ensure_creates_fifo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pipe");
        ensure(&path).unwrap();
        assert!(path_is_fifo(&path).unwrap());
        // calling again on an existing fifo is a no-op, not an error
        ensure(&path).unwrap();
    }

    #[test]
    fn ensure_rejects_non_fifo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_a_fifo");
        std::fs::write(&path, b"hi").unwrap();
        assert!(matches!(ensure(&path), Err(Error::NotAFifo(_))));
    }

    #[test]
    fn open_missing_is_missing_fifo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope");
        assert!(matches!(open_nonblocking(&path), Err(Error::MissingFifo(_))));
    }

    #[test]
    fn remove_unlinks_only_fifos() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pipe");
        ensure(&path).unwrap();
        remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn read_then_reopen_after_writer_closes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pipe");
        ensure(&path).unwrap();
        let mut pipe = Pipe::open(&path).unwrap();

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            let mut f = OpenOptions::new().write(true).open(&writer_path).unwrap();
            f.write_all(b"hello").unwrap();
        });
        writer.join().unwrap();

        let mut buf = [0u8; 16];
        // give the writer a moment to land its bytes before the writer-side
        // fd closes and produces EOF on the next read.
        std::thread::sleep(Duration::from_millis(20));
        let n = pipe.read_chunk(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");

        pipe.reopen().unwrap();
    }
}
