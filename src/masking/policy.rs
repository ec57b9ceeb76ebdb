use crate::event::Customer;
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Customers whose names pass through the transform unmasked.
///
/// Entries are keyed by the lower-cased concatenation of given name and last
/// name; lookups are exact matches on that key.
#[derive(Debug, Clone, Default)]
pub struct MaskingPolicy {
    unmasked: HashSet<String>,
}

fn customer_key(given_name: &str, last_name: &str) -> String {
    format!("{}{}", given_name, last_name).to_lowercase()
}

impl MaskingPolicy {
    pub fn from_customers<'a>(customers: impl IntoIterator<Item = &'a Customer>) -> Self {
        let unmasked = customers
            .into_iter()
            .map(|c| customer_key(&c.given_name, &c.last_name))
            .collect();
        Self { unmasked }
    }

    /// Parses the JSON customer list held in `UNMASKED_CUSTOMERS`.
    pub fn from_json(json: &str) -> Result<Self> {
        let customers: Vec<Customer> = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid unmasked customer list: {}", e)))?;
        let policy = Self::from_customers(&customers);
        debug!(entries = policy.len(), "Loaded masking policy");
        Ok(policy)
    }

    pub fn is_unmasked(&self, given_name: &str, last_name: &str) -> bool {
        self.unmasked.contains(&customer_key(given_name, last_name))
    }

    pub fn len(&self) -> usize {
        self.unmasked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unmasked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let policy = MaskingPolicy::from_customers(&[Customer::new("Tom", "Jones")]);
        assert!(policy.is_unmasked("Tom", "Jones"));
        assert!(policy.is_unmasked("TOM", "jones"));
        assert!(!policy.is_unmasked("Tom", "Jone"));
        assert!(!policy.is_unmasked("", "Jones"));
    }

    #[test]
    fn test_from_json() {
        let policy = MaskingPolicy::from_json(
            r#"[
                {"given_name": "John", "last_name": "Doe", "national_identity_numbers": ["123456789"]},
                {"given_name": "Jane", "last_name": "Smith"}
            ]"#,
        )
        .unwrap();
        assert_eq!(policy.len(), 2);
        assert!(policy.is_unmasked("jane", "smith"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            MaskingPolicy::from_json("{\"given_name\": 1}"),
            Err(Error::Config(_))
        ));
    }
}
