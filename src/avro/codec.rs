use super::union::UnionValue;
use super::wire::{encode_header, HEADER_LEN};
use super::{Datum, NestedMap};
use crate::{Error, Result};
use apache_avro::types::Value;
use apache_avro::Schema;
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::trace;

/// Encodes a record tree as Avro binary (no header).
pub fn encode_datum(record: &NestedMap, schema: &Schema) -> Result<Vec<u8>> {
    let names = Names::collect(schema);
    let value = record_to_value(record, names.resolve(schema)?, &names, "")?;
    apache_avro::to_avro_datum(schema, value).map_err(|e| Error::Wire(format!("avro encode: {}", e)))
}

/// Decodes Avro binary (no header) into a record tree with tagged unions.
pub fn decode_datum(data: &[u8], schema: &Schema) -> Result<NestedMap> {
    let names = Names::collect(schema);
    let mut reader = data;
    let value = apache_avro::from_avro_datum(schema, &mut reader, None)
        .map_err(|e| Error::Wire(format!("avro decode: {}", e)))?;
    match from_value(value, schema, &names, "")? {
        Datum::Record(map) => Ok(map),
        other => Err(Error::Wire(format!(
            "top-level avro value is not a record: {:?}",
            other
        ))),
    }
}

/// Destination schema plus the wire header announcing it.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema_id: u32,
    schema: Arc<Schema>,
    header: [u8; HEADER_LEN],
}

impl AvroCodec {
    pub fn new(schema_id: u32, schema: Arc<Schema>) -> Self {
        Self {
            schema_id,
            schema,
            header: encode_header(schema_id),
        }
    }

    pub fn parse(schema_id: u32, schema: &str) -> Result<Self> {
        let schema = Schema::parse_str(schema)
            .map_err(|e| Error::Registry(format!("failed to parse schema {}: {}", schema_id, e)))?;
        Ok(Self::new(schema_id, Arc::new(schema)))
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn header(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    /// Header followed by the Avro binary encoding of `record`.
    pub fn encode_framed(&self, record: &NestedMap) -> Result<Bytes> {
        let body = encode_datum(record, &self.schema)?;
        let mut buf = BytesMut::with_capacity(HEADER_LEN + body.len());
        buf.put_slice(&self.header);
        buf.put_slice(&body);
        Ok(buf.freeze())
    }
}

/// Named types of a schema, for resolving `Schema::Ref`.
struct Names<'a> {
    named: HashMap<String, &'a Schema>,
}

impl<'a> Names<'a> {
    fn collect(schema: &'a Schema) -> Self {
        let mut names = Names {
            named: HashMap::new(),
        };
        names.walk(schema);
        names
    }

    fn walk(&mut self, schema: &'a Schema) {
        match schema {
            Schema::Record(record) => {
                self.named.insert(record.name.fullname(None), schema);
                for field in &record.fields {
                    self.walk(&field.schema);
                }
            }
            Schema::Enum(e) => {
                self.named.insert(e.name.fullname(None), schema);
            }
            Schema::Fixed(f) => {
                self.named.insert(f.name.fullname(None), schema);
            }
            Schema::Array(array) => self.walk(&array.items),
            Schema::Map(map) => self.walk(&map.types),
            Schema::Union(union) => {
                for variant in union.variants() {
                    self.walk(variant);
                }
            }
            _ => {}
        }
    }

    fn resolve<'s>(&'s self, schema: &'s Schema) -> Result<&'s Schema> {
        match schema {
            Schema::Ref { name } => {
                let fullname = name.fullname(None);
                self.named
                    .get(&fullname)
                    .copied()
                    .ok_or_else(|| Error::Wire(format!("unknown named type '{}'", fullname)))
            }
            other => Ok(other),
        }
    }
}

/// Union branch name of a schema, in the `{"<tag>": value}` convention.
fn union_tag(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".to_string(),
        Schema::Boolean => "boolean".to_string(),
        Schema::Int => "int".to_string(),
        Schema::Long => "long".to_string(),
        Schema::Float => "float".to_string(),
        Schema::Double => "double".to_string(),
        Schema::Bytes => "bytes".to_string(),
        Schema::String => "string".to_string(),
        Schema::Date => "int.date".to_string(),
        Schema::TimeMillis => "int.time-millis".to_string(),
        Schema::TimestampMillis => "long.timestamp-millis".to_string(),
        Schema::TimestampMicros => "long.timestamp-micros".to_string(),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        Schema::Record(record) => record.name.fullname(None),
        Schema::Enum(e) => e.name.fullname(None),
        Schema::Fixed(f) => f.name.fullname(None),
        Schema::Ref { name } => name.fullname(None),
        other => format!("{:?}", other),
    }
}

fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn record_to_value(map: &NestedMap, schema: &Schema, names: &Names, path: &str) -> Result<Value> {
    let record = match schema {
        Schema::Record(record) => record,
        other => {
            return Err(Error::Wire(format!(
                "'{}' is a record but the schema expects {}",
                path,
                union_tag(other)
            )))
        }
    };

    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let child = field_path(path, &field.name);
        let value = match map.get(&field.name) {
            Some(datum) => to_value(datum, &field.schema, names, &child)?,
            None => missing_field_value(&field.schema, &child)?,
        };
        fields.push((field.name.clone(), value));
    }
    Ok(Value::Record(fields))
}

/// Absent optional fields encode as their null branch.
fn missing_field_value(schema: &Schema, path: &str) -> Result<Value> {
    if let Schema::Union(union) = schema {
        if let Some(idx) = union.variants().iter().position(|v| matches!(v, Schema::Null)) {
            return Ok(Value::Union(idx as u32, Box::new(Value::Null)));
        }
    }
    Err(Error::Wire(format!("missing required field '{}'", path)))
}

fn to_value(datum: &Datum, schema: &Schema, names: &Names, path: &str) -> Result<Value> {
    let schema = names.resolve(schema)?;
    let value = match (schema, datum) {
        (Schema::Union(union), Datum::Union(wrapped)) => {
            let (idx, variant) = union
                .variants()
                .iter()
                .enumerate()
                .find(|(_, v)| union_tag(v) == wrapped.tag())
                .ok_or_else(|| {
                    Error::Wire(format!(
                        "union branch '{}' is not part of the schema for '{}'",
                        wrapped.tag(),
                        path
                    ))
                })?;
            let inner = match wrapped {
                UnionValue::Null => Value::Null,
                UnionValue::Branch { value, .. } => to_value(value, variant, names, path)?,
                UnionValue::Array(items) => array_to_value(items, variant, names, path)?,
            };
            Value::Union(idx as u32, Box::new(inner))
        }
        (Schema::Union(_), other) => {
            return Err(Error::Wire(format!(
                "'{}' is a union field but got a bare value {:?}",
                path, other
            )))
        }
        (Schema::Boolean, Datum::Boolean(b)) => Value::Boolean(*b),
        (Schema::Int, Datum::Int(i)) => Value::Int(*i),
        (Schema::Long, Datum::Long(l)) | (Schema::Long, Datum::TimestampMillis(l)) => Value::Long(*l),
        (Schema::Long, Datum::Int(i)) => Value::Long(i64::from(*i)),
        (Schema::Float, Datum::Float(f)) => Value::Float(*f),
        (Schema::Double, Datum::Double(d)) => Value::Double(*d),
        (Schema::Double, Datum::Float(f)) => Value::Double(f64::from(*f)),
        (Schema::String, Datum::String(s)) => Value::String(s.clone()),
        (Schema::Bytes, Datum::Bytes(b)) => Value::Bytes(b.clone()),
        (Schema::Enum(e), Datum::Enum(symbol)) | (Schema::Enum(e), Datum::String(symbol)) => {
            let idx = e.symbols.iter().position(|s| s == symbol).ok_or_else(|| {
                Error::Wire(format!("'{}' is not a symbol of enum field '{}'", symbol, path))
            })?;
            Value::Enum(idx as u32, symbol.clone())
        }
        (Schema::Date, Datum::Date(days)) | (Schema::Date, Datum::Int(days)) => Value::Date(*days),
        (Schema::TimestampMillis, Datum::TimestampMillis(ms))
        | (Schema::TimestampMillis, Datum::Long(ms)) => Value::TimestampMillis(*ms),
        (Schema::Array(_), Datum::Array(items)) => array_to_value(items, schema, names, path)?,
        (Schema::Map(map_schema), Datum::Map(entries)) => {
            let mut out = HashMap::with_capacity(entries.len());
            for (key, entry) in entries {
                out.insert(
                    key.clone(),
                    to_value(entry, &map_schema.types, names, &field_path(path, key))?,
                );
            }
            Value::Map(out)
        }
        (Schema::Record(_), Datum::Record(map)) => record_to_value(map, schema, names, path)?,
        (schema, datum) => {
            return Err(Error::Wire(format!(
                "'{}' expects {} but got {:?}",
                path,
                union_tag(schema),
                datum
            )))
        }
    };
    Ok(value)
}

fn array_to_value(items: &[Datum], schema: &Schema, names: &Names, path: &str) -> Result<Value> {
    match names.resolve(schema)? {
        Schema::Array(array) => items
            .iter()
            .map(|item| to_value(item, &array.items, names, path))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(Error::Wire(format!(
            "'{}' is an array but the schema expects {}",
            path,
            union_tag(other)
        ))),
    }
}

fn from_value(value: Value, schema: &Schema, names: &Names, path: &str) -> Result<Datum> {
    let schema = names.resolve(schema)?;
    let datum = match (value, schema) {
        (Value::Union(idx, inner), Schema::Union(union)) => {
            let variant = union.variants().get(idx as usize).ok_or_else(|| {
                Error::Wire(format!("union index {} out of range for '{}'", idx, path))
            })?;
            let wrapped = match *inner {
                Value::Null => UnionValue::Null,
                Value::Array(items) => match from_value(Value::Array(items), variant, names, path)? {
                    Datum::Array(items) => UnionValue::Array(items),
                    other => UnionValue::Branch {
                        tag: union_tag(variant),
                        value: Box::new(other),
                    },
                },
                other => UnionValue::Branch {
                    tag: union_tag(variant),
                    value: Box::new(from_value(other, variant, names, path)?),
                },
            };
            Datum::Union(wrapped)
        }
        (Value::Boolean(b), _) => Datum::Boolean(b),
        (Value::Int(i), _) => Datum::Int(i),
        (Value::Long(l), _) => Datum::Long(l),
        (Value::Float(f), _) => Datum::Float(f),
        (Value::Double(d), _) => Datum::Double(d),
        (Value::String(s), _) => Datum::String(s),
        (Value::Bytes(b), _) => Datum::Bytes(b),
        (Value::Enum(_, symbol), _) => Datum::Enum(symbol),
        (Value::Date(days), _) => Datum::Date(days),
        (Value::TimestampMillis(ms), _) => Datum::TimestampMillis(ms),
        (Value::Array(items), Schema::Array(array)) => Datum::Array(
            items
                .into_iter()
                .map(|item| from_value(item, &array.items, names, path))
                .collect::<Result<Vec<_>>>()?,
        ),
        (Value::Map(entries), Schema::Map(map_schema)) => {
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                let child = field_path(path, &key);
                out.insert(key, from_value(entry, &map_schema.types, names, &child)?);
            }
            Datum::Map(out)
        }
        (Value::Record(fields), Schema::Record(record)) => {
            let mut out = NestedMap::new();
            for (name, field_value) in fields {
                let child = field_path(path, &name);
                let field = record
                    .fields
                    .iter()
                    .find(|f| f.name == name)
                    .ok_or_else(|| Error::Wire(format!("unexpected field '{}'", child)))?;
                out.insert(name, from_value(field_value, &field.schema, names, &child)?);
            }
            Datum::Record(out)
        }
        (other, schema) => {
            return Err(Error::Wire(format!(
                "unsupported avro value {:?} for '{}' ({})",
                other,
                path,
                union_tag(schema)
            )))
        }
    };
    trace!(path, "decoded avro field");
    Ok(datum)
}
