//! Avro `date` and `timestamp-millis` logical types.
//!
//! JSON inputs carry timestamps in one of three shapes. Integers are told
//! apart by magnitude: anything above [`EPOCH_MILLIS_THRESHOLD`] is epoch
//! milliseconds, anything at or below it is a count of days since the epoch.
//! Everything else must be an RFC 3339 string.

use super::union::{UnionValue, INT_DATE_TAG};
use super::Datum;
use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Integers strictly greater than this are epoch milliseconds.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// An integer timestamp after magnitude classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochValue {
    Millis(i64),
    Days(i64),
}

pub fn classify_epoch_value(value: i64) -> EpochValue {
    if value > EPOCH_MILLIS_THRESHOLD {
        EpochValue::Millis(value)
    } else {
        EpochValue::Days(value)
    }
}

impl EpochValue {
    pub fn to_datetime(self) -> Result<DateTime<Utc>> {
        match self {
            EpochValue::Millis(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                Error::Format(format!("{} milliseconds since epoch is out of range", ms))
            }),
            EpochValue::Days(days) => {
                Ok(date_from_epoch_days(days)?.and_time(NaiveTime::MIN).and_utc())
            }
        }
    }
}

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// Calendar date `days` after 1970-01-01 (negative counts go backwards).
pub fn date_from_epoch_days(days: i64) -> Result<NaiveDate> {
    let epoch = epoch_date();
    let shifted = if days >= 0 {
        epoch.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| Error::Format(format!("{} days since epoch is out of range", days)))
}

/// Days between 1970-01-01 and `date`, as stored by the Avro `date` type.
pub fn epoch_days(date: NaiveDate) -> i32 {
    // chrono's date range is well inside i32 days
    (date - epoch_date()).num_days() as i32
}

/// Wraps a day count as the `int.date` union branch.
///
/// Any `i32` is a valid Avro date; use [`date_from_epoch_days`] where a
/// calendar date is needed.
pub fn to_avro_date(days_since_epoch: i32) -> UnionValue {
    UnionValue::wrap(Some(Datum::Date(days_since_epoch)), INT_DATE_TAG)
}

/// UTC milliseconds since the epoch, as stored by `timestamp-millis`.
pub fn to_avro_timestamp(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// A metadata timestamp that accepts every JSON shape producers emit and
/// serializes back as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventTime(pub DateTime<Utc>);

impl EventTime {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(EventTime(classify_epoch_value(i).to_datetime()?)),
                None => Err(Error::Format(format!(
                    "timestamp {} is not an integer day or millisecond count",
                    n
                ))),
            },
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| EventTime(t.with_timezone(&Utc)))
                .map_err(|e| Error::Format(format!("invalid RFC 3339 timestamp '{}': {}", s, e))),
            other => Err(Error::Format(format!(
                "unsupported timestamp value: {}",
                other
            ))),
        }
    }

    pub fn timestamp_millis(&self) -> i64 {
        to_avro_timestamp(&self.0)
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(value: DateTime<Utc>) -> Self {
        EventTime(value)
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.timestamp_millis())
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        EventTime::from_json(&raw).map_err(serde::de::Error::custom)
    }
}
