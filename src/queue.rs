//! In-memory queue: a single-element stand-in for what was once a
//! relational "play queue" table (§3 QueueItem, §4.C).
//!
//! This build only ever holds zero or one [`QueueItem`] at a time, created
//! on the first audio-pipe byte and destroyed at teardown. The CRUD shape
//! below exists so a future multi-track build has somewhere to grow into;
//! `fetch_next`/`fetch_prev`/`fetch_by_pos` are kept as real methods that
//! always return `None`.

use std::path::PathBuf;

/// One logical track derived from the pipe input.
#[derive(Debug, Clone, Default)]
pub struct QueueItem {
    pub id: u64,
    pub file_id: u64,
    pub pos: i64,
    pub shuffle_pos: i64,
    pub data_kind: DataKind,
    pub media_kind: MediaKind,
    pub path: PathBuf,
    pub sample_rate: u32,
    pub bits_per_sample: u8,
    pub channels: u8,

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataKind {
    #[default]
    Pipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Music,
}

/// Single-element in-memory queue.
#[derive(Debug, Default)]
pub struct Queue {
    item: Option<QueueItem>,
    next_id: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self {
            item: None,
            next_id: 1,
        }
    }

    /// Append a synthetic item for `audio_pipe`, `data_kind = PIPE`,
    /// `media_kind = MUSIC`. Returns `(new_item_id, count)`.
    pub fn add_from_query(
        &mut self,
        audio_pipe: impl Into<PathBuf>,
        sample_rate: u32,
        bits_per_sample: u8,
    ) -> (u64, usize) {
        let id = self.next_id;
        self.next_id += 1;
        self.item = Some(QueueItem {
            id,
            file_id: id,
            pos: -1,
            shuffle_pos: -1,
            data_kind: DataKind::Pipe,
            media_kind: MediaKind::Music,
            path: audio_pipe.into(),
            sample_rate,
            bits_per_sample,
            channels: 2,
            ..Default::default()
        });
        (id, 1)
    }

    pub fn fetch_by_id(&self, id: u64) -> Option<&QueueItem> {
        self.item.as_ref().filter(|it| it.id == id)
    }

    pub fn fetch_by_id_mut(&mut self, id: u64) -> Option<&mut QueueItem> {
        self.item.as_mut().filter(|it| it.id == id)
    }

    pub fn update(&mut self, item: QueueItem) {
        if self.item.as_ref().is_some_and(|it| it.id == item.id) {
            self.item = Some(item);
        }
    }

    pub fn delete_by_id(&mut self, id: u64) {
        if self.item.as_ref().is_some_and(|it| it.id == id) {
            self.item = None;
        }
    }

    pub fn clear(&mut self, keep_id: u64) {
        if self.item.as_ref().is_some_and(|it| it.id != keep_id) {
            self.item = None;
        }
    }

    /// Interface stub: this build is single-track, there is never a "next".
    pub fn fetch_next(&self, _id: u64) -> Option<&QueueItem> {
        None
    }

    /// Interface stub: this build is single-track, there is never a "prev".
    pub fn fetch_prev(&self, _id: u64) -> Option<&QueueItem> {
        None
    }

    /// Interface stub: this build is single-track, there is no position index.
    pub fn fetch_by_pos(&self, _pos: i64) -> Option<&QueueItem> {
        None
    }
}
