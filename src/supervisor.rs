//! Signal handling & supervisor loop (§4.J).
//!
//! Blocks `SIGINT, SIGTERM, SIGHUP, SIGCHLD, SIGPIPE` in the process before
//! any reader thread is spawned (new threads inherit the creator's signal
//! mask), then drives an asynchronous signal source bound to the main
//! thread's own `mio::Poll` — the same per-thread-reactor shape as the
//! pipe readers, just with a signal source instead of a FIFO.

use std::time::Duration;

use mio::{Events, Poll, Token};
use nix::sys::signal::{SigSet, Signal};
use signal_hook::consts::{SIGCHLD, SIGHUP, SIGINT, SIGPIPE, SIGTERM};
use signal_hook_mio::v1_0::Signals;

use crate::error::{Error, Result};

const SIGNAL_TOKEN: Token = Token(usize::MAX);

/// Outcome of a supervisor tick, so `main` knows whether to keep looping
/// or begin teardown.
pub enum Tick {
    Continue,
    Shutdown,
}

/// Block the signals §4.J names in the calling thread (and therefore every
/// thread spawned afterwards).
pub fn block_signals() -> Result<()> {
    let mut set = SigSet::empty();
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGCHLD, Signal::SIGPIPE] {
        set.add(sig);
    }
    set.thread_block().map_err(Error::Errno)?;
    Ok(())
}

/// The main-thread reactor: a signal source plus nothing else (main never
/// reads from pipes, §5).
pub struct Supervisor {
    poll: Poll,
    events: Events,
    signals: Signals,
}

impl Supervisor {
    pub fn new() -> Result<Self> {
        let poll = Poll::new()?;
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGCHLD, SIGPIPE]).map_err(Error::Io)?;
        poll.registry()
            .register(&mut signals, SIGNAL_TOKEN, mio::Interest::READABLE)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(8),
            signals,
        })
    }

    /// Block for up to `timeout` waiting for a signal, and act on it.
    /// Returns `Tick::Shutdown` once `SIGINT`/`SIGTERM` has been observed.
    pub fn tick(&mut self, timeout: Option<Duration>) -> Result<Tick> {
        self.poll.poll(&mut self.events, timeout)?;
        if self.events.is_empty() {
            return Ok(Tick::Continue);
        }
        for signal in self.signals.pending() {
            match signal {
                SIGINT | SIGTERM => {
                    tracing::info!(target: "supervisor", signal, "received shutdown signal");
                    return Ok(Tick::Shutdown);
                }
                SIGCHLD => reap_children(),
                SIGHUP => {
                    tracing::info!(target: "supervisor", "SIGHUP received, reinitialising logger");
                    crate::logging::reinit();
                }
                SIGPIPE => {
                    // Blocked at the process level; should never actually
                    // arrive here, but ignore defensively if it does.
                }
                other => tracing::debug!(target: "supervisor", signal = other, "unhandled signal"),
            }
        }
        Ok(Tick::Continue)
    }
}

fn reap_children() {
    use nix::sys::wait::{WaitPidFlag, waitpid};
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(nix::sys::wait::WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_signals_does_not_error() {
        block_signals().unwrap();
    }

    #[test]
    fn supervisor_can_be_constructed() {
        let _sup = Supervisor::new().unwrap();
    }
}
