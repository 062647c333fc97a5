//! The player/worker collaborator contract (§6).
//!
//! Like [`crate::output`], the real player thread is an external
//! collaborator (§1); this module only defines the trait our core reads
//! `status()` from and a `NullPlayer` reference implementation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub volume: u8,
    pub pos_ms: u64,
    pub id: u64,
}

pub trait Player: Send + Sync {
    fn status(&self) -> PlayerSnapshot;
    fn start_by_id(&self, id: u64);
    fn stop(&self);
    fn playback_flush(&self);
}

/// Reference implementation with no real playback: status is driven purely
/// by the calls our own reader threads make, useful for deterministic
/// tests of the dispatch tables in §4.F/§4.G.
#[derive(Debug)]
pub struct NullPlayer {
    state: std::sync::Mutex<PlayerSnapshot>,
}

impl Default for NullPlayer {
    fn default() -> Self {
        Self {
            state: std::sync::Mutex::new(PlayerSnapshot {
                status: PlaybackStatus::Stopped,
                volume: 0,
                pos_ms: 0,
                id: 0,
            }),
        }
    }
}

impl Player for NullPlayer {
    fn status(&self) -> PlayerSnapshot {
        *self.state.lock().unwrap()
    }

    fn start_by_id(&self, id: u64) {
        let mut s = self.state.lock().unwrap();
        s.status = PlaybackStatus::Playing;
        s.id = id;
    }

    fn stop(&self) {
        let mut s = self.state.lock().unwrap();
        s.status = PlaybackStatus::Stopped;
    }

    fn playback_flush(&self) {
        let mut s = self.state.lock().unwrap();
        s.pos_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_player_tracks_start_stop() {
        let p = NullPlayer::default();
        assert_eq!(p.status().status, PlaybackStatus::Stopped);
        p.start_by_id(7);
        let snap = p.status();
        assert_eq!(snap.status, PlaybackStatus::Playing);
        assert_eq!(snap.id, 7);
        p.stop();
        assert_eq!(p.status().status, PlaybackStatus::Stopped);
    }
}
