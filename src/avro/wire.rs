//! Confluent wire framing: `[0x00][schema id, 4 bytes big-endian][avro binary]`.

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

pub const MAGIC_BYTE: u8 = 0x00;

/// Length of the magic byte plus schema id.
pub const HEADER_LEN: usize = 5;

pub fn encode_header(schema_id: u32) -> [u8; HEADER_LEN] {
    let id = schema_id.to_be_bytes();
    [MAGIC_BYTE, id[0], id[1], id[2], id[3]]
}

/// Returns the payload following a header of `offset` bytes.
///
/// `offset` is [`HEADER_LEN`] for Confluent-framed data; other values
/// tolerate header variants.
pub fn decode_header(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..).ok_or_else(|| {
        Error::Wire(format!(
            "record of {} bytes is shorter than the {} byte header",
            data.len(),
            offset
        ))
    })
}

/// Reads the schema id from a Confluent header, checking the magic byte.
pub fn extract_schema_id(data: &[u8]) -> Result<u32> {
    if data.len() < HEADER_LEN {
        return Err(Error::Wire(format!(
            "record of {} bytes is too short for the wire header",
            data.len()
        )));
    }
    if data[0] != MAGIC_BYTE {
        return Err(Error::Wire(format!(
            "invalid magic byte: expected {}, got {}",
            MAGIC_BYTE, data[0]
        )));
    }
    Ok(u32::from_be_bytes([data[1], data[2], data[3], data[4]]))
}

/// An Avro payload tagged with the id of the schema that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedRecord {
    pub schema_id: u32,
    pub payload: Bytes,
}

impl FramedRecord {
    pub fn new(schema_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            schema_id,
            payload: payload.into(),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let schema_id = extract_schema_id(data)?;
        let payload = decode_header(data, HEADER_LEN)?;
        Ok(Self::new(schema_id, Bytes::copy_from_slice(payload)))
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&encode_header(self.schema_id));
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = encode_header(0x0102_0304);
        assert_eq!(header, [0x00, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(encode_header(7)[1..], 7u32.to_be_bytes());
    }

    #[test]
    fn test_header_only_leaves_empty_payload() {
        let header = encode_header(42);
        assert!(decode_header(&header, HEADER_LEN).unwrap().is_empty());
    }

    #[test]
    fn test_short_input_is_rejected() {
        assert!(matches!(decode_header(&[0, 0, 0], HEADER_LEN), Err(Error::Wire(_))));
        assert!(matches!(extract_schema_id(&[0, 0, 0, 1]), Err(Error::Wire(_))));
    }

    #[test]
    fn test_custom_offset() {
        let data = [9u8, 9, 9, 1, 2];
        assert_eq!(decode_header(&data, 3).unwrap(), &[1, 2]);
    }

    #[test]
    fn test_bad_magic_byte() {
        let err = extract_schema_id(&[1, 0, 0, 0, 1, 2]).unwrap_err();
        assert!(err.to_string().contains("magic byte"));
    }

    #[test]
    fn test_framed_record_parse() {
        let record = FramedRecord::new(13, vec![2u8, 4, 6]);
        let bytes = record.to_bytes();
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 13, 2, 4, 6]);

        let parsed = FramedRecord::parse(&bytes).unwrap();
        assert_eq!(parsed, record);
    }
}
