//! The AirPlay 2 "output module" collaborator contract (§6).
//!
//! The protocol/crypto/RTP stack itself is explicitly out of scope (§1);
//! this module only defines the trait our core calls through and a
//! `LoggingOutput` reference implementation used by this crate's own tests
//! and a `--testrun`/dry-run harness. Grounded on the
//! `other_examples/jburnhams-airplay2-rs` `RtpSender` trait shape: a small
//! async-free trait describing the collaborator, with a no-op
//! implementation standing in for the real network stack.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WriteFlags: u8 {
        const METADATA = 1 << 0;
        const SYNC     = 1 << 1;
        const EOF      = 1 << 2;
        const ERROR    = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality {
    pub sample_rate: u32,
    pub bits_per_sample: u8,
    pub channels: u8,
}

/// Collaborator the audio and command readers call into. Implemented by
/// the (out-of-scope) AirPlay 2 session layer in a production build.
pub trait OutputModule: Send + Sync {
    fn start_by_id(&self, id: u64);
    fn stop(&self);
    fn flush(&self);
    fn volume_set(&self, volume: u8);
    fn speaker_authorize(&self, speaker_id: &str, pin: &str);
    fn write(&self, buf: &[u8], quality: Quality, flags: WriteFlags);
}

/// Reference implementation: logs every call instead of talking to a real
/// receiver. Used by integration tests and `--testrun`.
#[derive(Debug, Default)]
pub struct LoggingOutput;

impl OutputModule for LoggingOutput {
    fn start_by_id(&self, id: u64) {
        tracing::info!(target: "output", id, "start_by_id");
    }

    fn stop(&self) {
        tracing::info!(target: "output", "stop");
    }

    fn flush(&self) {
        tracing::info!(target: "output", "flush");
    }

    fn volume_set(&self, volume: u8) {
        tracing::info!(target: "output", volume, "volume_set");
    }

    fn speaker_authorize(&self, speaker_id: &str, pin: &str) {
        tracing::info!(target: "output", speaker_id, pin, "speaker_authorize");
    }

    fn write(&self, buf: &[u8], quality: Quality, flags: WriteFlags) {
        tracing::trace!(
            target: "output",
            bytes = buf.len(),
            sample_rate = quality.sample_rate,
            bits_per_sample = quality.bits_per_sample,
            flags = ?flags,
            "write"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_output_does_not_panic() {
        let out = LoggingOutput;
        out.start_by_id(1);
        out.volume_set(50);
        out.write(
            &[0u8; 4],
            Quality { sample_rate: 44100, bits_per_sample: 16, channels: 2 },
            WriteFlags::SYNC,
        );
        out.flush();
        out.stop();
    }
}
