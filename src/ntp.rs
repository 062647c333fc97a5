//! NTP timestamp conversion (§3 NtpTimestamp, §4.A).
//!
//! The wire format is the classic 64-bit NTP short timestamp: the upper 32
//! bits are seconds since the NTP epoch (1900-01-01 UTC), the lower 32 bits
//! are a binary fraction of a second. The original C implementation this is
//! modeled on computed the fractional part with `f64` arithmetic, which
//! loses precision well before the 2^-32s bound the invariant requires.
//! Everything here instead uses a `u128` fixed-point intermediate.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const NTP_UNIX_EPOCH_DELTA: u64 = 2_208_988_800;

const NANOS_PER_SEC: u128 = 1_000_000_000;
const TWO_POW_32: u128 = 1u128 << 32;

/// A 64-bit NTP timestamp: upper 32 bits seconds, lower 32 bits fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NtpTimestamp(pub u64);

impl NtpTimestamp {
    pub const ZERO: NtpTimestamp = NtpTimestamp(0);

    pub fn from_raw(raw: u64) -> Self {
        NtpTimestamp(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn fraction(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Convert to (unix_seconds, nanoseconds) wall-clock pair.
    pub fn to_wall(self) -> (i64, u32) {
        let seconds = self.seconds() as i64 - NTP_UNIX_EPOCH_DELTA as i64;
        let nanoseconds = ((self.fraction() as u128 * NANOS_PER_SEC) / TWO_POW_32) as u32;
        (seconds, nanoseconds)
    }

    /// Inverse of [`to_wall`](Self::to_wall).
    pub fn from_wall(unix_seconds: i64, nanoseconds: u32) -> Self {
        let ntp_seconds = (unix_seconds + NTP_UNIX_EPOCH_DELTA as i64) as u64;
        let frac = ((nanoseconds as u128 * TWO_POW_32) / NANOS_PER_SEC) as u64;
        NtpTimestamp((ntp_seconds << 32) | frac)
    }

    /// Add a (possibly negative after normalization) millisecond offset.
    pub fn add_ms(self, ms: u64) -> Self {
        let (sec, nsec) = self.to_wall();
        let extra_nanos = (ms as u128) * 1_000_000;
        let total_nanos = nsec as u128 + extra_nanos;
        let carry_secs = (total_nanos / NANOS_PER_SEC) as i64;
        let nsec = (total_nanos % NANOS_PER_SEC) as u32;
        Self::from_wall(sec + carry_secs, nsec)
    }

    /// Offset corresponding to `n` samples at `sample_rate` Hz, added to `self`.
    pub fn add_samples(self, n: u64, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return self;
        }
        let nanos_per_sample = NANOS_PER_SEC / sample_rate as u128;
        let extra_nanos = n as u128 * nanos_per_sample;
        let (sec, nsec) = self.to_wall();
        let total_nanos = nsec as u128 + extra_nanos;
        let carry_secs = (total_nanos / NANOS_PER_SEC) as i64;
        let nsec = (total_nanos % NANOS_PER_SEC) as u32;
        Self::from_wall(sec + carry_secs, nsec)
    }
}

/// Current wall-clock time as an NTP timestamp.
///
/// Distinguishable from `NtpTimestamp::ZERO` on failure: returns
/// `Err(Error::Clock(..))` rather than silently producing `0`.
pub fn now_ntp() -> Result<NtpTimestamp> {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::clock(e.to_string()))?;
    Ok(NtpTimestamp::from_wall(
        since_epoch.as_secs() as i64,
        since_epoch.subsec_nanos(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_basic() {
        let t = NtpTimestamp::from_wall(1_700_000_000, 500_000_000);
        let (sec, nsec) = t.to_wall();
        assert_eq!(sec, 1_700_000_000);
        // allow up to 1 ulp of fixed-point rounding
        assert!((nsec as i64 - 500_000_000i64).unsigned_abs() <= 1);
    }

    #[test]
    fn seconds_field_matches_unix_delta() {
        let t = NtpTimestamp::from_wall(0, 0);
        assert_eq!(t.seconds() as u64, NTP_UNIX_EPOCH_DELTA);
    }

    #[test]
    fn add_ms_normalizes_overflowing_nanos() {
        // nsec close to 1e9, pushing the add over a full second boundary.
        let t = NtpTimestamp::from_wall(10, 900_000_000);
        let t2 = t.add_ms(250);
        let (sec, nsec) = t2.to_wall();
        assert_eq!(sec, 11);
        assert!(nsec < 200_000_000);
    }

    #[test]
    fn now_ntp_is_nonzero() {
        let t = now_ntp().unwrap();
        assert!(t.as_raw() > 0);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_property(secs in 0i64..4_000_000_000i64, nanos in 0u32..1_000_000_000u32) {
            let t = NtpTimestamp::from_wall(secs, nanos);
            let (sec2, nsec2) = t.to_wall();
            proptest::prop_assert_eq!(sec2, secs);
            // bounded by 2^-32s as the invariant requires
            let delta = (nsec2 as i64 - nanos as i64).unsigned_abs();
            proptest::prop_assert!(delta <= 1);
        }
    }
}
