use super::Datum;
use tracing::trace;

pub const NULL_TAG: &str = "null";
pub const STRING_TAG: &str = "string";
pub const ARRAY_TAG: &str = "array";
pub const INT_DATE_TAG: &str = "int.date";
pub const LONG_TIMESTAMP_MILLIS_TAG: &str = "long.timestamp-millis";

/// Value of an Avro union field, tagged with the branch that is present.
#[derive(Debug, Clone, PartialEq)]
pub enum UnionValue {
    /// The `null` branch.
    Null,
    /// A non-null, non-array branch named by `tag` (`"string"`, `"int.date"`,
    /// a record's full name, ...).
    Branch { tag: String, value: Box<Datum> },
    /// The `array` branch. An empty vector is "present but empty".
    Array(Vec<Datum>),
}

impl UnionValue {
    /// Wraps an optional value as `{tag: value}`, or the null branch when absent.
    pub fn wrap<T: Into<Datum>>(value: Option<T>, tag: &str) -> Self {
        match value {
            None => {
                trace!(tag, "wrapping absent value as null union");
                UnionValue::Null
            }
            Some(value) => UnionValue::Branch {
                tag: tag.to_string(),
                value: Box::new(value.into()),
            },
        }
    }

    /// Wraps an optional sequence. An empty sequence stays distinguishable
    /// from an absent one.
    pub fn wrap_array<T: Into<Datum>>(values: Option<Vec<T>>) -> Self {
        match values {
            None => UnionValue::Null,
            Some(values) => UnionValue::Array(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        UnionValue::Branch {
            tag: STRING_TAG.to_string(),
            value: Box::new(Datum::String(value.into())),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            UnionValue::Null => NULL_TAG,
            UnionValue::Branch { tag, .. } => tag,
            UnionValue::Array(_) => ARRAY_TAG,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, UnionValue::Null)
    }

    /// The wrapped string when this is the `string` branch.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            UnionValue::Branch { tag, value } if tag == STRING_TAG => value.as_str(),
            _ => None,
        }
    }
}

/// Normalizes empty strings to absent values before wrapping.
pub fn if_empty_none<S: AsRef<str>>(value: Option<S>) -> Option<String> {
    value
        .map(|s| s.as_ref().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_value_wraps_to_null() {
        assert_eq!(UnionValue::wrap(None::<String>, STRING_TAG), UnionValue::Null);
        assert_eq!(UnionValue::wrap(None::<i32>, INT_DATE_TAG), UnionValue::Null);
    }

    #[test]
    fn test_present_value_wraps_with_tag() {
        let wrapped = UnionValue::wrap(Some("Jones"), STRING_TAG);
        assert_eq!(wrapped.tag(), "string");
        assert_eq!(wrapped.as_str(), Some("Jones"));
        assert_eq!(wrapped, UnionValue::string("Jones"));
    }

    #[test]
    fn test_empty_string_after_normalization_is_null() {
        let normalized = if_empty_none(Some(""));
        assert_eq!(UnionValue::wrap(normalized, STRING_TAG), UnionValue::Null);

        let kept = if_empty_none(Some("Tom"));
        assert_eq!(UnionValue::wrap(kept, STRING_TAG), UnionValue::string("Tom"));
    }

    #[test]
    fn test_array_wrapping() {
        assert_eq!(UnionValue::wrap_array(None::<Vec<String>>), UnionValue::Null);

        let empty = UnionValue::wrap_array(Some(Vec::<String>::new()));
        assert_eq!(empty, UnionValue::Array(vec![]));
        assert_eq!(empty.tag(), "array");
        assert!(!empty.is_null());

        let items = UnionValue::wrap_array(Some(vec!["123", "456"]));
        assert_eq!(
            items,
            UnionValue::Array(vec![Datum::from("123"), Datum::from("456")])
        );
    }

    #[test]
    fn test_as_str_only_for_string_branch() {
        let wrapped = UnionValue::wrap(Some(5), "int");
        assert_eq!(wrapped.as_str(), None);
        assert_eq!(UnionValue::Null.as_str(), None);
    }
}
