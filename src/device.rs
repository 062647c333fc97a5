//! Device endpoint info and the `--txt` grammar (§3 DeviceInfo, §4.I).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ntp::NtpTimestamp;

/// Endpoint and session parameters for the remote AirPlay receiver, set
/// once at start-up and immutable thereafter (aside from `pin`, which the
/// command-pipe thread may update after a `PIN` record, §4.G).
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub hostname: String,
    pub address: String,
    pub port: u16,
    pub txt: HashMap<String, String>,
    pub ntp_start: NtpTimestamp,
    pub wait_ms: u64,
    pub latency_ms: u64,
    pub volume: u8,
    pub pin: Option<String>,
    pub auth_key: Option<String>,
    /// `ntp_start + wait_ms` expressed in wall time, normalized so the
    /// nanosecond component never overflows a full second (Open Question:
    /// the original's `tv_nsec += wait % 1000 * 1e6` never normalized this).
    pub start_ts: NtpTimestamp,
}

impl DeviceInfo {
    pub fn new(
        name: String,
        hostname: String,
        address: String,
        port: u16,
        txt: HashMap<String, String>,
        ntp_start: NtpTimestamp,
        wait_ms: u64,
        latency_ms: u64,
        volume: u8,
        pin: Option<String>,
        auth_key: Option<String>,
    ) -> Self {
        let start_ts = ntp_start.add_ms(wait_ms);
        Self {
            name,
            hostname,
            address,
            port,
            txt,
            ntp_start,
            wait_ms,
            latency_ms,
            volume,
            pin,
            auth_key,
            start_ts,
        }
    }

}

/// Parse the `--txt` argument. Grammar (Open Question #1, resolved): the
/// argument is whitespace-separated tokens, each of the literal form
/// `"KEY=VALUE"` (including the surrounding double quotes). Any other form
/// is an error; this is deliberately narrower than the original's nested
/// `strtok_r` parse, whose interior-whitespace handling was ambiguous.
pub fn parse_txt(input: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    if input.trim().is_empty() {
        return Ok(map);
    }
    for token in input.split_whitespace() {
        let inner = token
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or_else(|| Error::parse(format!("txt token not quoted: {token}")))?;
        let (key, value) = inner
            .split_once('=')
            .ok_or_else(|| Error::parse(format!("txt token missing '=': {token}")))?;
        if key.is_empty() {
            return Err(Error::parse(format!("txt token has empty key: {token}")));
        }
        if value.contains('=') {
            return Err(Error::parse(format!("txt token has more than one '=': {token}")));
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Inverse of [`parse_txt`], used by the round-trip test and by `--ntp`-
/// adjacent diagnostics.
pub fn render_txt(map: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("\"{}={}\"", k, map[k]))
        .collect::<Vec<_>>()
        .join(" ")
}
