//! The "input module" capability set this core implements and exposes
//! (§6, Design Note 9: `{setup, play, stop, metadata_get, ts_get, init,
//! deinit}`). `init`/`deinit` are the thread-lifecycle functions in
//! `control.rs`; the remaining five are exposed here as a trait on
//! [`Context`] so a caller driving this core (directly, or via the
//! `--testrun` harness) has the same capability set the original
//! function-pointer table offered.

use crate::control::Context;
use crate::error::Result;
use crate::metadata::staged::TakenMetadata;
use crate::ntp::NtpTimestamp;

pub trait InputDriver {
    /// Reset any leftover session state before the reader threads start
    /// pulling from the FIFOs.
    fn setup(&self) -> Result<()>;
    /// Resume reads from the audio FIFO.
    fn play(&self);
    /// Stop playback of the current item and flush player position.
    fn stop(&self);
    /// Take the currently staged metadata strings, clearing them and the
    /// `is_new` flag. Each update is returned exactly once (§8 "Metadata
    /// visibility").
    fn metadata_get(&self) -> TakenMetadata;
    /// The session's negotiated start instant (§3 `DeviceInfo.start_ts`).
    fn ts_get(&self) -> NtpTimestamp;
}

impl InputDriver for Context {
    fn setup(&self) -> Result<()> {
        self.pause.set(false);
        *self.staged.lock().unwrap() = crate::metadata::StagedMetadata::new();
        Ok(())
    }

    fn play(&self) {
        self.pause.set(false);
    }

    fn stop(&self) {
        self.pause.set(true);
        self.player.playback_flush();
    }

    fn metadata_get(&self) -> TakenMetadata {
        let mut staged = self.staged.lock().unwrap();
        let taken = staged.take_metadata();
        staged.is_new = false;
        taken
    }

    fn ts_get(&self) -> NtpTimestamp {
        self.device.lock().unwrap().start_ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::output::LoggingOutput;
    use crate::player::NullPlayer;
    use std::collections::HashMap;
    use std::sync::Arc;

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
    fn metadata_get_is_consumed_exactly_once() {
        let ctx = test_context();
        ctx.staged.lock().unwrap().album = Some("Kind of Blue".to_string());
        ctx.staged.lock().unwrap().is_new = true;

        let taken = ctx.metadata_get();
        assert_eq!(taken.album.as_deref(), Some("Kind of Blue"));
        assert!(!ctx.staged.lock().unwrap().is_new);

        let second = ctx.metadata_get();
        assert!(second.album.is_none());
    }

    #[test]
    fn ts_get_returns_device_start_ts() {
        let ctx = test_context();
        let expected = ctx.device.lock().unwrap().start_ts;
        assert_eq!(ctx.ts_get(), expected);
    }

    #[test]
    fn play_clears_pause_flag() {
        let ctx = test_context();
        ctx.pause.set(true);
        ctx.play();
        assert!(!ctx.pause.get());
    }

    #[test]
    fn stop_sets_pause_flag() {
        let ctx = test_context();
        ctx.stop();
        assert!(ctx.pause.get());
    }
}
