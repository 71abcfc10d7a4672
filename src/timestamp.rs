//! TIME / NEG_TIME payload packing (spec §6): a millisecond timestamp and a
//! quarter-hour UTC offset are packed into one integer before being
//! varint-encoded by [`crate::element`].

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Local, TimeZone};

/// `UTC_OFFSET_SHIFT` biases the signed quarter-hour offset into an
/// unsigned 7-bit slot (range `-64..=63` quarter-hours, i.e. +/-16h).
const UTC_OFFSET_SHIFT: i64 = 64;
const OFFSET_BITS: i64 = 7;

/// A moment plus a UTC offset in whole 15-minute steps, the element's
/// decoded value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    pub millis_since_epoch: i64,
    pub utc_offset_seconds: i32,
}

impl Timestamp {
    pub fn from_datetime(dt: &DateTime<FixedOffset>) -> Self {
        Timestamp { millis_since_epoch: dt.timestamp_millis(), utc_offset_seconds: dt.offset().local_minus_utc() }
    }

    /// Interprets a naive, zone-less moment in the process-local timezone,
    /// per spec.md §6.
    pub fn from_naive_local(naive: chrono::NaiveDateTime) -> Result<Self> {
        let local = Local
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::TypeMismatch("ambiguous or nonexistent local datetime".into()))?;
        Ok(Timestamp {
            millis_since_epoch: local.timestamp_millis(),
            utc_offset_seconds: local.offset().local_minus_utc(),
        })
    }

    pub fn to_datetime(&self) -> Result<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds)
            .ok_or_else(|| Error::Corrupt("invalid utc offset".into()))?;
        offset.timestamp_millis_opt(self.millis_since_epoch).single().ok_or_else(|| Error::Corrupt("invalid timestamp".into()))
    }

    /// Packs into the single integer that gets varint-encoded, and whether
    /// that integer (and thus the element) is negative.
    pub fn pack(&self) -> Result<(u64, bool)> {
        let offset_steps = self.utc_offset_seconds as i64 / (15 * 60);
        let biased = offset_steps + UTC_OFFSET_SHIFT;
        if biased < 0 || biased >= (1 << OFFSET_BITS) {
            return Err(Error::TypeMismatch(format!("utc offset {} out of representable range", self.utc_offset_seconds)));
        }
        let packed = (self.millis_since_epoch << OFFSET_BITS) | biased;
        if packed < 0 {
            Ok((packed.unsigned_abs(), true))
        } else {
            Ok((packed as u64, false))
        }
    }

    pub fn unpack(magnitude: u64, negative: bool) -> Result<Self> {
        let packed: i64 = if negative {
            -(magnitude as i64)
        } else {
            i64::try_from(magnitude).map_err(|_| Error::Corrupt("timestamp magnitude overflow".into()))?
        };
        let biased = packed & ((1 << OFFSET_BITS) - 1);
        let millis_since_epoch = packed >> OFFSET_BITS;
        let utc_offset_seconds = ((biased - UTC_OFFSET_SHIFT) * 15 * 60) as i32;
        Ok(Timestamp { millis_since_epoch, utc_offset_seconds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip() {
        let ts = Timestamp { millis_since_epoch: 1_700_000_000_123, utc_offset_seconds: -5 * 3600 };
        let (mag, neg) = ts.pack().unwrap();
        assert!(!neg);
        let back = Timestamp::unpack(mag, neg).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn negative_epoch_roundtrip() {
        let ts = Timestamp { millis_since_epoch: -86_400_000, utc_offset_seconds: 3600 * 2 };
        let (mag, neg) = ts.pack().unwrap();
        let back = Timestamp::unpack(mag, neg).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn offset_out_of_range_rejected() {
        let ts = Timestamp { millis_since_epoch: 0, utc_offset_seconds: 20 * 3600 };
        assert!(ts.pack().is_err());
    }
}
