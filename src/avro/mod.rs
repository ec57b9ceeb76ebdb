//! Avro value tree, union wrapping, logical dates and the Confluent wire header.
//!
//! Records cross the Avro boundary as a [`NestedMap`]: a tree keyed by the
//! schema's snake_case field names whose optional fields are always
//! [`UnionValue`]s. The codec resolves union branches by tag name, the same
//! naming a generic decode produces, so a decoded record re-encodes unchanged.

pub mod codec;
pub mod logical;
pub mod union;
pub mod wire;

use chrono::NaiveDate;
use std::collections::BTreeMap;

pub use codec::{decode_datum, encode_datum, AvroCodec};
pub use logical::{classify_epoch_value, to_avro_date, to_avro_timestamp, EpochValue, EventTime};
pub use union::{if_empty_none, UnionValue};
pub use wire::{decode_header, encode_header, FramedRecord, HEADER_LEN, MAGIC_BYTE};

/// Field map of one Avro record.
pub type NestedMap = BTreeMap<String, Datum>;

/// A single value inside a [`NestedMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(String),
    /// Avro `date`: days since the Unix epoch. Kept as the raw count so every
    /// wire value round-trips, including ones outside chrono's calendar.
    Date(i32),
    /// Milliseconds since the Unix epoch.
    TimestampMillis(i64),
    Array(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    Record(NestedMap),
    Union(UnionValue),
}

impl Datum {
    pub fn as_record(&self) -> Option<&NestedMap> {
        match self {
            Datum::Record(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut NestedMap> {
        match self {
            Datum::Record(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::String(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::String(value.to_string())
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Datum::Int(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Long(value)
    }
}

impl From<NaiveDate> for Datum {
    fn from(value: NaiveDate) -> Self {
        Datum::Date(logical::epoch_days(value))
    }
}

impl From<UnionValue> for Datum {
    fn from(value: UnionValue) -> Self {
        Datum::Union(value)
    }
}

impl From<NestedMap> for Datum {
    fn from(value: NestedMap) -> Self {
        Datum::Record(value)
    }
}
