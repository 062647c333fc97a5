//! Control surface: pause flag, staged metadata, thread lifecycle (§3
//! PauseFlag, §4.H).
//!
//! Design Note: rather than the original's global mutable statics, a
//! single [`Context`] is constructed once in `main` and handed to both
//! reader threads by `Arc`; each mutable cell (`PauseFlag`,
//! `StagedMetadata`, the `Queue`) is protected by its own `Mutex` so no
//! thread blocks on state it doesn't need.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::device::DeviceInfo;
use crate::error::Result;
use crate::metadata::StagedMetadata;
use crate::output::OutputModule;
use crate::player::Player;
use crate::queue::Queue;

/// `true` ⇒ the audio thread must not consume from the audio FIFO until
/// cleared.
#[derive(Debug, Default)]
pub struct PauseFlag(Mutex<bool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self(Mutex::new(false))
    }

    pub fn get(&self) -> bool {
        *self.0.lock().unwrap()
    }

    pub fn set(&self, value: bool) {
        *self.0.lock().unwrap() = value;
    }
}

/// Cross-thread read-only configuration plus the small set of mutable
/// cells every thread needs a handle to.
pub struct Context {
    pub device: Mutex<DeviceInfo>,
    pub queue: Mutex<Queue>,
    pub staged: Mutex<StagedMetadata>,
    pub pause: PauseFlag,
    pub output: Arc<dyn OutputModule>,
    pub player: Arc<dyn Player>,
}

impl Context {
    pub fn new(device: DeviceInfo, output: Arc<dyn OutputModule>, player: Arc<dyn Player>) -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(device),
            queue: Mutex::new(Queue::new()),
            staged: Mutex::new(StagedMetadata::new()),
            pause: PauseFlag::new(),
            output,
            player,
        })
    }
}

/// Handles to the two long-lived reader threads, returned by `init`.
pub struct Threads {
    pub audio: JoinHandle<()>,
    pub command: JoinHandle<()>,
    stop_audio: Arc<std::sync::atomic::AtomicBool>,
    stop_command: Arc<std::sync::atomic::AtomicBool>,
}

/// Spawn `mass_aud` and `mass_cmd` against `ctx`. Mirrors §4.H `init()`:
/// each thread builds its own reactor and arms its own watches.
pub fn init(
    ctx: Arc<Context>,
    audio_pipe: std::path::PathBuf,
    command_pipe: std::path::PathBuf,
    pkg_name: String,
) -> Result<Threads> {
    use std::sync::atomic::AtomicBool;

    let stop_audio = Arc::new(AtomicBool::new(false));
    let stop_command = Arc::new(AtomicBool::new(false));

    let audio = {
        let ctx = Arc::clone(&ctx);
        let stop = Arc::clone(&stop_audio);
        std::thread::Builder::new()
            .name("mass_aud".into())
            .spawn(move || crate::audio_reader::run(ctx, audio_pipe, stop))
            .map_err(crate::error::Error::Io)?
    };

    let command = {
        let ctx = Arc::clone(&ctx);
        let stop = Arc::clone(&stop_command);
        std::thread::Builder::new()
            .name("mass_cmd".into())
            .spawn(move || crate::command_reader::run(ctx, command_pipe, pkg_name, stop))
            .map_err(crate::error::Error::Io)?
    };

    Ok(Threads {
        audio,
        command,
        stop_audio,
        stop_command,
    })
}

/// Signal both reader loops to break and join them in reverse start order.
/// Frees any staged resources including the artwork tmpfile.
pub fn deinit(ctx: &Arc<Context>, threads: Threads) {
    threads.stop_command.store(true, std::sync::atomic::Ordering::SeqCst);
    threads.stop_audio.store(true, std::sync::atomic::Ordering::SeqCst);
    let _ = threads.command.join();
    let _ = threads.audio.join();

    let mut staged = ctx.staged.lock().unwrap();
    if let Some(path) = staged.artwork_tmpfile_path.take() {
        crate::metadata::artwork::remove_tmpfile(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_flag_defaults_false() {
        let flag = PauseFlag::new();
        assert!(!flag.get());
        flag.set(true);
        assert!(flag.get());
    }
}
