//! PII masking of framed Avro records.
//!
//! Each input record moves through
//! `Received → Decoded → Evaluated → Encoded → Emitted`; a failure at any
//! step is a [`TransformError`] carrying the state reached, and the record is
//! dropped. Records are independent of one another.

pub mod runner;

pub use runner::run_transform;

use crate::avro::wire::extract_schema_id;
use crate::avro::{decode_datum, decode_header, AvroCodec, Datum, NestedMap, UnionValue, HEADER_LEN};
use crate::masking::{mask_with, MaskMode, MaskingPolicy};
use crate::registry::{SchemaCache, SchemaRegistry};
use crate::{Error, Result, TransformConfig, TransformError, TransformState};
use bytes::Bytes;
use tracing::{debug, instrument};

pub const MASK_CHAR: &str = "*";
pub const MASK_LENGTH: usize = 6;

const PAYLOAD_FIELD: &str = "payload";
const GIVEN_NAME_FIELD: &str = "given_name";
const LAST_NAME_FIELD: &str = "last_name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Bytes>,
}

/// A record as seen by the transform: key, framed value and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRecord {
    pub key: Option<Bytes>,
    pub value: Bytes,
    pub headers: Vec<RecordHeader>,
}

impl TransformRecord {
    pub fn new(key: Option<Bytes>, value: Bytes) -> Self {
        Self {
            key,
            value,
            headers: Vec::new(),
        }
    }
}

/// What the policy decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOutcome {
    /// No last name on the record; nothing to do.
    NoLastName,
    Unmasked,
    Masked,
}

/// Masks given and last name in `record` unless the customer is allow-listed.
///
/// `record` must hold a `payload` record; the names are string-or-null
/// unions inside it.
pub fn apply_policy(record: &mut NestedMap, policy: &MaskingPolicy) -> Result<MaskOutcome> {
    let payload = record
        .get_mut(PAYLOAD_FIELD)
        .and_then(Datum::as_record_mut)
        .ok_or_else(|| Error::Wire("decoded record has no payload record".to_string()))?;

    let Some(last_name) = union_str(payload, LAST_NAME_FIELD).map(str::to_owned) else {
        debug!("Last name not available");
        return Ok(MaskOutcome::NoLastName);
    };
    let given_name = union_str(payload, GIVEN_NAME_FIELD).unwrap_or_default().to_owned();

    if policy.is_unmasked(&given_name, &last_name) {
        debug!("Customer is on the unmasked list");
        return Ok(MaskOutcome::Unmasked);
    }

    for (field, value) in [(GIVEN_NAME_FIELD, &given_name), (LAST_NAME_FIELD, &last_name)] {
        let masked = mask_with(value, MASK_CHAR, MaskMode::Fixed, MASK_LENGTH);
        payload.insert(field.to_string(), UnionValue::string(masked).into());
    }
    Ok(MaskOutcome::Masked)
}

fn union_str<'a>(record: &'a NestedMap, field: &str) -> Option<&'a str> {
    match record.get(field)? {
        Datum::Union(value) => value.as_str(),
        Datum::String(value) => Some(value),
        _ => None,
    }
}

/// Record-at-a-time masking transform.
///
/// Inputs are decoded with whatever schema their header names; outputs are
/// always encoded with the destination schema fetched at construction.
pub struct MaskingTransform<R> {
    schemas: SchemaCache<R>,
    destination: AvroCodec,
    policy: MaskingPolicy,
}

impl<R: SchemaRegistry> MaskingTransform<R> {
    /// Fetches the destination schema once; failure here is fatal.
    pub async fn new(registry: R, destination_schema_id: u32, policy: MaskingPolicy) -> Result<Self> {
        let schemas = SchemaCache::new(registry);
        let destination = schemas.codec(destination_schema_id).await?;
        Ok(Self {
            schemas,
            destination,
            policy,
        })
    }

    pub async fn from_config(registry: R, config: &TransformConfig) -> Result<Self> {
        let policy = MaskingPolicy::from_json(&config.unmasked_customers)?;
        Self::new(registry, config.destination_schema_id, policy).await
    }

    pub fn destination(&self) -> &AvroCodec {
        &self.destination
    }

    pub fn policy(&self) -> &MaskingPolicy {
        &self.policy
    }

    /// Transforms one record, keeping its key and headers.
    #[instrument(skip_all)]
    pub async fn apply(
        &self,
        record: &TransformRecord,
    ) -> std::result::Result<TransformRecord, TransformError> {
        let mut datum = self
            .decode(&record.value)
            .await
            .map_err(|e| TransformError::new(TransformState::Received, e))?;

        let outcome = apply_policy(&mut datum, &self.policy)
            .map_err(|e| TransformError::new(TransformState::Decoded, e))?;
        debug!(?outcome, "Evaluated masking policy");

        let value = self
            .destination
            .encode_framed(&datum)
            .map_err(|e| TransformError::new(TransformState::Encoded, e))?;

        Ok(TransformRecord {
            key: record.key.clone(),
            value,
            headers: record.headers.clone(),
        })
    }

    async fn decode(&self, value: &[u8]) -> Result<NestedMap> {
        let schema_id = extract_schema_id(value)?;
        let schema = self.schemas.schema(schema_id).await?;
        decode_datum(decode_header(value, HEADER_LEN)?, &schema)
    }
}
