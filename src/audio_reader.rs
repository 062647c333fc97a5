//! Audio-pipe reader thread `mass_aud` (§4.F).
//!
//! Owns the audio FIFO, its own reactor, and the chunking buffer. Never
//! touches `StagedMetadata` for writing, never calls a state-changing
//! output method other than `write`/`start_by_id`/`stop` (§5).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::Token;

use crate::control::Context;
use crate::input_driver::InputDriver;
use crate::output::{OutputModule, Quality, WriteFlags};
use crate::pipe::{Pipe, PipeReactor};
use crate::player::{PlaybackStatus, Player};

const AUDIO_TOKEN: Token = Token(0);
const CHUNK_SIZE: usize = 64 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Default quality assumed for pipe input until a future build negotiates
/// it out of band; matches the §6 allow-list's lowest common denominator.
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BITS_PER_SAMPLE: u8 = 16;

pub fn run(ctx: Arc<Context>, audio_pipe: PathBuf, stop: Arc<AtomicBool>) {
    let mut pipe = match Pipe::open(&audio_pipe) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(target: "audio_reader", error = %e, "failed to open audio pipe, thread exiting");
            return;
        }
    };

    let mut reactor = match PipeReactor::new() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "audio_reader", error = %e, "failed to create reactor");
            return;
        }
    };

    if let Err(e) = reactor.register(std::os::fd::AsRawFd::as_raw_fd(&pipe), AUDIO_TOKEN) {
        tracing::error!(target: "audio_reader", error = %e, "failed to register audio pipe");
        return;
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut item_id: Option<u64> = None;
    let mut sync_sent = false;
    let quality = Quality {
        sample_rate: DEFAULT_SAMPLE_RATE,
        bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        channels: 2,
    };

    while !stop.load(Ordering::SeqCst) {
        let tokens = match reactor.poll(Some(POLL_INTERVAL)) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(target: "audio_reader", error = %e, "reactor poll failed");
                break;
            }
        };
        if tokens.is_empty() {
            continue;
        }

        if ctx.pause.get() {
            // Cooperative yield: return from this upcall without reading.
            continue;
        }

        let n = match pipe.read_chunk(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(target: "audio_reader", error = %e, "audio pipe read error");
                ctx.output.write(&[], quality, WriteFlags::ERROR);
                ctx.output.stop();
                break;
            }
        };

        if n == 0 {
            if item_id.is_some() {
                tracing::info!(target: "audio_reader", "audio pipe EOF, restarting w/o pause");
                ctx.output.write(&[], quality, WriteFlags::EOF);
                ctx.output.stop();
            }
            let old_fd = std::os::fd::AsRawFd::as_raw_fd(&pipe);
            let _ = reactor.deregister(old_fd);
            if let Err(e) = pipe.reopen() {
                tracing::warn!(target: "audio_reader", error = %e, "failed to reopen audio pipe after eof");
            }
            if let Err(e) = reactor.register(std::os::fd::AsRawFd::as_raw_fd(&pipe), AUDIO_TOKEN) {
                tracing::error!(target: "audio_reader", error = %e, "failed to re-register audio pipe after eof");
            }
            continue;
        }

        let id = *item_id.get_or_insert_with(|| {
            let mut queue = ctx.queue.lock().unwrap();
            let (id, _count) = queue.add_from_query(&audio_pipe, quality.sample_rate, quality.bits_per_sample);
            id
        });

        let snapshot = ctx.player.status();
        let already_playing_here = snapshot.status == PlaybackStatus::Playing && snapshot.id == id;
        if !already_playing_here {
            ctx.output.stop();
            ctx.output.start_by_id(id);
            ctx.player.start_by_id(id);
        }

        let mut flags = WriteFlags::empty();
        if ctx.staged.lock().unwrap().is_new {
            flags |= WriteFlags::METADATA;
            // metadata_get() hands the staged strings to the input-driver
            // caller and clears is_new; the audio path only needs the flag.
            let taken = ctx.metadata_get();
            tracing::debug!(
                target: "audio_reader",
                title = ?taken.title,
                artist = ?taken.artist,
                album = ?taken.album,
                "metadata_get"
            );
        }
        if !sync_sent {
            if ctx.ts_get().as_raw() != 0 {
                flags |= WriteFlags::SYNC;
            }
            sync_sent = true;
        }

        ctx.output.write(&buf[..n], quality, flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::ntp::NtpTimestamp;
    use crate::output::LoggingOutput;
    use crate::player::NullPlayer;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn test_context() -> Arc<Context> {
        let device = DeviceInfo::new(
            "cliap2".into(),
            "host".into(),
            "0.0.0.0".into(),
            7000,
            HashMap::new(),
            NtpTimestamp::from_raw(0),
            0,
            0,
            75,
            None,
            None,
        );
        Context::new(device, Arc::new(LoggingOutput), Arc::new(NullPlayer::default()))
    }

    #[test]
    fn reader_exits_cleanly_when_stop_requested_before_any_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.pipe");
        crate::pipe::ensure(&path).unwrap();

        let ctx = test_context();
        let stop = Arc::new(AtomicBool::new(true));
        // stop already requested: run() should return almost immediately
        run(ctx, path, stop);
    }

    #[test]
    fn pause_flag_prevents_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audio.pipe");
        crate::pipe::ensure(&path).unwrap();

        let ctx = test_context();
        ctx.pause.set(true);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let ctx_clone = Arc::clone(&ctx);
        let path_clone = path.clone();
        let handle = std::thread::spawn(move || run(ctx_clone, path_clone, stop_clone));

        // Write bytes while paused; reader must not consume them.
        std::thread::sleep(Duration::from_millis(50));
        {
            use std::io::Write as _;
            let mut f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
            f.write_all(&[0u8; 16]).unwrap();
        }
        std::thread::sleep(Duration::from_millis(50));

        stop.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
