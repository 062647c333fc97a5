//! Command-pipe reader thread `mass_cmd` (§4.G).
//!
//! Owns the command FIFO, its read buffer (hard cap 1 MiB), a periodic
//! 1-second status timer, `StagedMetadata`, and every call into the output
//! module that must not originate from the audio thread
//! (`flush`/`volume_set`/`speaker_authorize`).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::Token;

use crate::control::Context;
use crate::input_driver::InputDriver;
use crate::metadata::parser::{Message, extract_records, parse_records};
use crate::output::OutputModule;
use crate::pipe::{Pipe, PipeReactor};
use crate::player::{PlaybackStatus, Player};

const COMMAND_TOKEN: Token = Token(1);
const MAX_BUFFER: usize = 1024 * 1024;
const READ_CHUNK: usize = 4096;
const TICK: Duration = Duration::from_secs(1);

pub fn run(ctx: Arc<Context>, command_pipe: PathBuf, pkg_name: String, stop: Arc<AtomicBool>) {
    let mut reactor = match PipeReactor::new() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "command_reader", error = %e, "failed to create reactor");
            return;
        }
    };

    // A missing metadata pipe at start-up is only a warning (SPEC_FULL §3);
    // keep retrying the open lazily.
    let mut pipe = loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match Pipe::open(&command_pipe) {
            Ok(p) => break p,
            Err(e) => {
                tracing::warn!(target: "command_reader", error = %e, "command pipe not ready yet, retrying");
                std::thread::sleep(Duration::from_millis(500));
            }
        }
    };

    if let Err(e) = reactor.register(std::os::fd::AsRawFd::as_raw_fd(&pipe), COMMAND_TOKEN) {
        tracing::error!(target: "command_reader", error = %e, "failed to register command pipe");
        return;
    }

    let http_client = reqwest::Client::new();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(target: "command_reader", error = %e, "failed to build artwork fetch runtime");
            return;
        }
    };

    let mut read_buf = vec![0u8; READ_CHUNK];
    let mut pending = Vec::new();
    let mut last_tick = std::time::Instant::now();

    while !stop.load(Ordering::SeqCst) {
        let tokens = match reactor.poll(Some(TICK)) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(target: "command_reader", error = %e, "reactor poll failed");
                break;
            }
        };

        if tokens.iter().any(|t| *t == COMMAND_TOKEN) {
            match pipe.read_chunk(&mut read_buf) {
                Ok(0) => {
                    let old_fd = std::os::fd::AsRawFd::as_raw_fd(&pipe);
                    let _ = reactor.deregister(old_fd);
                    if let Err(e) = pipe.reopen() {
                        tracing::warn!(target: "command_reader", error = %e, "failed to reopen command pipe after eof");
                    }
                    if let Err(e) = reactor.register(std::os::fd::AsRawFd::as_raw_fd(&pipe), COMMAND_TOKEN) {
                        tracing::error!(target: "command_reader", error = %e, "failed to re-register command pipe after eof");
                    }
                }
                Ok(n) => {
                    pending.extend_from_slice(&read_buf[..n]);
                    if pending.len() > MAX_BUFFER {
                        tracing::warn!(target: "command_reader", dropped = pending.len(), "command buffer overflow, draining");
                        pending.clear();
                    } else {
                        let (records, tail) = extract_records(&pending);
                        pending = tail;
                        if !records.is_empty() {
                            handle_records(&ctx, &records, &pkg_name, &http_client, &runtime);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "command_reader", error = %e, "command pipe read error");
                }
            }
        }

        if last_tick.elapsed() >= TICK {
            last_tick = std::time::Instant::now();
            run_timer_tick(&ctx);
        }
    }
}

fn handle_records(
    ctx: &Arc<Context>,
    records: &[String],
    pkg_name: &str,
    http_client: &reqwest::Client,
    runtime: &tokio::runtime::Runtime,
) {
    let (bits, volume, pin, artwork_url) = {
        let mut staged = ctx.staged.lock().unwrap();
        let bits = parse_records(records, &mut staged);
        (bits, staged.volume, staged.pin.clone(), staged.pending_artwork_url.take())
    };

    if bits.intersects(Message::METADATA | Message::PICTURE) {
        ctx.staged.lock().unwrap().is_new = true;
    }

    if bits.contains(Message::VOLUME)
        && let Some(volume) = volume
    {
        ctx.output.volume_set(volume);
    }

    if bits.contains(Message::PIN)
        && let Some(pin) = pin
    {
        ctx.device.lock().unwrap().pin = Some(pin.clone());
        let speaker_id = ctx.device.lock().unwrap().name.clone();
        ctx.output.speaker_authorize(&speaker_id, &pin);
    }

    if bits.contains(Message::FLUSH) {
        ctx.output.flush();
    }

    let status = ctx.player.status().status;

    if bits.contains(Message::PAUSE) {
        if status == PlaybackStatus::Playing {
            ctx.pause.set(true);
            tracing::info!(target: "command_reader", pos_ms = ctx.player.status().pos_ms, "Pause at");
        } else {
            tracing::warn!(target: "command_reader", "PAUSE received while not playing");
        }
    }

    if bits.contains(Message::PLAY) {
        if status != PlaybackStatus::Playing {
            ctx.play();
            tracing::info!(target: "command_reader", pos_ms = ctx.player.status().pos_ms, "Restarted at");
        } else {
            tracing::warn!(target: "command_reader", "PLAY received while already playing");
        }
    }

    if bits.contains(Message::STOP) {
        if status == PlaybackStatus::Playing {
            ctx.stop();
        } else {
            tracing::warn!(target: "command_reader", "STOP received while not playing");
        }
    }

    if let Some(url) = artwork_url {
        fetch_and_install_artwork(ctx, &url, pkg_name, http_client, runtime);
    }
}

fn fetch_and_install_artwork(
    ctx: &Arc<Context>,
    url: &str,
    pkg_name: &str,
    http_client: &reqwest::Client,
    runtime: &tokio::runtime::Runtime,
) {
    let fetched = runtime.block_on(crate::metadata::artwork::fetch(http_client, url));
    match fetched {
        Ok(Some(bytes)) => match crate::metadata::artwork::write_tmpfile(pkg_name, &bytes) {
            Ok((fd, path)) => {
                let previous = {
                    let mut staged = ctx.staged.lock().unwrap();
                    staged.install_artwork(format!("file:{}", path.display()), fd, path)
                };
                if let Some(previous) = previous {
                    crate::metadata::artwork::remove_tmpfile(&previous);
                }
                ctx.staged.lock().unwrap().is_new = true;
            }
            Err(e) => tracing::warn!(target: "command_reader", error = %e, "failed to write artwork tmpfile"),
        },
        Ok(None) => tracing::debug!(target: "command_reader", url, "artwork not found (404), keeping previous"),
        Err(e) => tracing::warn!(target: "command_reader", error = %e, "artwork fetch failed, keeping previous"),
    }
}

fn run_timer_tick(ctx: &Arc<Context>) {
    let paused = ctx.pause.get();
    let snapshot = ctx.player.status();
    if paused {
        tracing::info!(target: "command_reader", pos_ms = snapshot.pos_ms, "paused");
    } else {
        tracing::trace!(target: "command_reader", pos_ms = snapshot.pos_ms, "status tick");
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
    fn pause_dispatch_requires_playing_status() {
        let ctx = test_context();
        // NullPlayer starts Stopped; PAUSE should warn, not set the flag.
        handle_records_no_artwork(&ctx, &["ACTION=PAUSE".to_string()]);
        assert!(!ctx.pause.get());

        ctx.player.start_by_id(1);
        handle_records_no_artwork(&ctx, &["ACTION=PAUSE".to_string()]);
        assert!(ctx.pause.get());
    }

    #[test]
    fn play_clears_pause_flag_when_not_already_playing() {
        let ctx = test_context();
        ctx.pause.set(true);
        handle_records_no_artwork(&ctx, &["ACTION=PLAY".to_string()]);
        assert!(!ctx.pause.get());
    }

    #[test]
    fn sendmeta_action_sets_is_new() {
        let ctx = test_context();
        handle_records_no_artwork(
            &ctx,
            &["ALBUM=Kind of Blue".to_string(), "ACTION=SENDMETA".to_string()],
        );
        assert!(ctx.staged.lock().unwrap().is_new);
        assert_eq!(ctx.staged.lock().unwrap().album.as_deref(), Some("Kind of Blue"));
    }

    fn handle_records_no_artwork(ctx: &Arc<Context>, records: &[String]) {
        let client = reqwest::Client::new();
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        handle_records(ctx, records, "cliap2", &client, &rt);
    }
}
