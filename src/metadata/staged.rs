//! The single staged-metadata record (§3 StagedMetadata).
//!
//! Owned by the command-pipe thread, wrapped in a `Mutex` by
//! [`crate::control::Context`]. Parsing writes into it; the audio thread
//! (or any other consumer) calls [`StagedMetadata::take_metadata`] to move
//! the owned strings out and zero the struct, exactly once per update.

use std::os::fd::RawFd;

/// Metadata fields moved out of [`StagedMetadata`] by `take_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TakenMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub artwork_url: Option<String>,
    pub song_length_ms: Option<u64>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Default)]
pub struct StagedMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub artwork_url: Option<String>,
    pub song_length_ms: Option<u64>,
    pub track: Option<u32>,
    pub disc: Option<u32>,
    pub year: Option<i32>,

    pub volume: Option<u8>,
    pub pin: Option<String>,

    /// Set by the parser when an `ARTWORK` record arrives; consumed by the
    /// command thread (outside the mutex) to perform the HTTP fetch, then
    /// cleared once [`Self::install_artwork`] stores the result.
    pub pending_artwork_url: Option<String>,
    pub artwork_tmpfile_fd: Option<RawFd>,
    pub artwork_tmpfile_path: Option<std::path::PathBuf>,

    /// Set by the parser, cleared by the audio path on the next outbound
    /// chunk (§4.F step 3).
    pub is_new: bool,
}

impl StagedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move all owned metadata strings out and zero the struct under the
    /// caller's lock. Does not touch `artwork_tmpfile_*` (those are
    /// replaced, not consumed, by `install_artwork`).
    pub fn take_metadata(&mut self) -> TakenMetadata {
        TakenMetadata {
            title: self.title.take(),
            artist: self.artist.take(),
            album: self.album.take(),
            album_artist: self.album_artist.take(),
            genre: self.genre.take(),
            composer: self.composer.take(),
            artwork_url: self.artwork_url.take(),
            song_length_ms: self.song_length_ms.take(),
            track: self.track.take(),
            disc: self.disc.take(),
            year: self.year.take(),
        }
    }

    /// Replace the staged artwork URL/tmpfile with a newly fetched one.
    /// Returns the previous tmpfile path, if any, so the caller can unlink
    /// it outside the mutex.
    pub fn install_artwork(
        &mut self,
        url: String,
        fd: RawFd,
        path: std::path::PathBuf,
    ) -> Option<std::path::PathBuf> {
        self.artwork_url = Some(url);
        let previous = self.artwork_tmpfile_path.replace(path);
        self.artwork_tmpfile_fd = Some(fd);
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_metadata_moves_and_zeros() {
        let mut staged = StagedMetadata::new();
        staged.title = Some("So What".to_string());
        staged.artist = Some("Miles Davis".to_string());

        let taken = staged.take_metadata();
        assert_eq!(taken.title.as_deref(), Some("So What"));
        assert_eq!(taken.artist.as_deref(), Some("Miles Davis"));
        assert!(staged.title.is_none());
        assert!(staged.artist.is_none());
    }

    #[test]
    fn take_metadata_twice_yields_none_second_time() {
        let mut staged = StagedMetadata::new();
        staged.album = Some("Album".to_string());
        let _ = staged.take_metadata();
        let second = staged.take_metadata();
        assert!(second.album.is_none());
    }

    #[test]
    fn install_artwork_returns_previous_path() {
        let mut staged = StagedMetadata::new();
        let first = staged.install_artwork("file:/tmp/a.jpg".into(), 3, "/tmp/a.jpg".into());
        assert!(first.is_none());
        let second = staged.install_artwork("file:/tmp/b.png".into(), 4, "/tmp/b.png".into());
        assert_eq!(second, Some(std::path::PathBuf::from("/tmp/a.jpg")));
        assert_eq!(staged.artwork_url.as_deref(), Some("file:/tmp/b.png"));
    }
}
