//! Line-oriented `KEY=VALUE` command/metadata decoder (§4.D).

use bitflags::bitflags;

use crate::metadata::staged::StagedMetadata;

bitflags! {
    /// Bitwise-OR of recognised events from one parse cycle (§3 Message bitmask).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Message: u16 {
        const METADATA          = 1 << 0;
        const PROGRESS          = 1 << 1;
        const VOLUME            = 1 << 2;
        const PICTURE           = 1 << 3;
        const FLUSH             = 1 << 4;
        const PARTIAL_METADATA  = 1 << 5;
        const STOP              = 1 << 6;
        const PAUSE             = 1 << 7;
        const PLAY              = 1 << 8;
        const PIN               = 1 << 9;
    }
}

/// Split a buffer of newline-delimited records into complete lines and the
/// leftover partial tail. Mirrors the original's `extract_item` framing.
pub fn extract_records(buf: &[u8]) -> (Vec<String>, Vec<u8>) {
    let mut records = Vec::new();
    let mut start = 0;
    for (i, &b) in buf.iter().enumerate() {
        if b == b'\n' {
            if let Ok(s) = std::str::from_utf8(&buf[start..i]) {
                records.push(s.to_string());
            }
            start = i + 1;
        }
    }
    (records, buf[start..].to_vec())
}

/// `KEY=VALUE`, only the first `=` is the delimiter.
fn extract_key_value(record: &str) -> Option<(&str, &str)> {
    record.split_once('=')
}

/// Parse all complete records currently buffered, applying each to
/// `staged` under its mutex, and return the union of emitted bits.
///
/// Unknown keys, malformed integers, missing `=`, or a PIN outside
/// `0..=9999` are logged and the record discarded; the cycle continues.
pub fn parse_records(records: &[String], staged: &mut StagedMetadata) -> Message {
    let mut bits = Message::empty();
    for record in records {
        match parse_one(record, staged) {
            Ok(bit) => bits |= bit,
            Err(reason) => {
                tracing::warn!(target: "metadata::parser", record = %record, reason, "discarding malformed record");
            }
        }
    }
    bits
}

fn parse_one(record: &str, staged: &mut StagedMetadata) -> Result<Message, &'static str> {
    let (key, value) = extract_key_value(record).ok_or("missing '='")?;
    match key {
        "ALBUM" => {
            staged.album = Some(value.to_string());
            Ok(Message::PARTIAL_METADATA)
        }
        "ARTIST" => {
            staged.artist = Some(value.to_string());
            Ok(Message::PARTIAL_METADATA)
        }
        "TITLE" => {
            staged.title = Some(value.to_string());
            Ok(Message::PARTIAL_METADATA)
        }
        "DURATION" => {
            let secs: i64 = value.parse().map_err(|_| "DURATION not an integer")?;
            if secs < 0 {
                return Err("DURATION negative");
            }
            staged.song_length_ms = Some(secs as u64 * 1000);
            Ok(Message::PARTIAL_METADATA)
        }
        "PROGRESS" => {
            // Parsed and logged only; deliberately no downstream effect
            // (Open Question: preserved to avoid silent regression).
            let secs: i64 = value.parse().map_err(|_| "PROGRESS not an integer")?;
            tracing::debug!(target: "metadata::parser", progress_secs = secs, "progress received (inert)");
            Ok(Message::PROGRESS)
        }
        "ARTWORK" => {
            if value.len() < 14 {
                return Err("ARTWORK url too short");
            }
            if value.len() > libc::PATH_MAX as usize {
                return Err("ARTWORK url too long");
            }
            staged.pending_artwork_url = Some(value.to_string());
            Ok(Message::PARTIAL_METADATA)
        }
        "VOLUME" => {
            let vol: i64 = value.parse().map_err(|_| "VOLUME not an integer")?;
            if !(0..=100).contains(&vol) {
                return Err("VOLUME out of range");
            }
            staged.volume = Some(vol as u8);
            Ok(Message::VOLUME)
        }
        "PIN" => {
            let pin: i64 = value.parse().map_err(|_| "PIN not an integer")?;
            if !(0..=9999).contains(&pin) {
                return Err("PIN out of range");
            }
            staged.pin = Some(format!("{pin:04}"));
            Ok(Message::PIN)
        }
        "ACTION" => match value {
            "SENDMETA" => Ok(Message::METADATA),
            "STOP" => Ok(Message::STOP),
            "PAUSE" => Ok(Message::PAUSE),
            "PLAY" => Ok(Message::PLAY),
            _ => Err("unknown ACTION value"),
        },
        _ => Err("unknown key"),
    }
}
