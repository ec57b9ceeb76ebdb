use crate::event::Event;
use crate::Error;
use bytes::Bytes;
use std::str::FromStr;

/// How the record key is derived from an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The event's `metadata.message_key`.
    #[default]
    MessageKey,
    Fixed(String),
    None,
}

impl KeyStrategy {
    pub fn extract_key(&self, event: &Event) -> Option<Bytes> {
        match self {
            KeyStrategy::MessageKey => {
                let key = &event.metadata.message_key;
                (!key.is_empty()).then(|| Bytes::copy_from_slice(key.as_bytes()))
            }
            KeyStrategy::Fixed(key) => Some(Bytes::copy_from_slice(key.as_bytes())),
            KeyStrategy::None => None,
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = Error;

    /// `message-key`, `none`, or `fixed:<key>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message-key" => Ok(KeyStrategy::MessageKey),
            "none" => Ok(KeyStrategy::None),
            other => match other.strip_prefix("fixed:") {
                Some(key) if !key.is_empty() => Ok(KeyStrategy::Fixed(key.to_string())),
                _ => Err(Error::Config(format!("unknown key strategy '{}'", other))),
            },
        }
    }
}
