//! Synthetic demo events for load testing.

use super::{Event, EventType, Metadata, Payload};
use crate::avro::logical::epoch_days;
use crate::avro::{if_empty_none, EventTime};
use chrono::{DateTime, Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A known customer, as listed in test fixtures and the unmasked allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub national_identity_numbers: Vec<String>,
}

impl Customer {
    pub fn new(given_name: &str, last_name: &str) -> Self {
        Self {
            given_name: given_name.to_string(),
            last_name: last_name.to_string(),
            national_identity_numbers: Vec::new(),
        }
    }
}

pub fn default_customers() -> Vec<Customer> {
    vec![
        Customer::new("John", "Doe"),
        Customer::new("Jane", "Smith"),
        Customer::new("Fred", "Blogs"),
        Customer::new("Amy", "Dune"),
        Customer::new("Michael", "Johnson"),
        Customer::new("Tom", "Jones"),
        Customer::new("", ""),
    ]
}

/// Generates `count` events, each for a customer picked at random.
pub fn generate_events<R: Rng + ?Sized>(rng: &mut R, customers: &[Customer], count: usize) -> Vec<Event> {
    let fallback = Customer::default();
    (0..count)
        .map(|_| {
            let customer = customers.choose(rng).unwrap_or(&fallback);
            generate_event(rng, customer)
        })
        .collect()
}

fn generate_event<R: Rng + ?Sized>(rng: &mut R, customer: &Customer) -> Event {
    let payload = Payload {
        id: format!("PK{}", random_string(rng, 6)),
        name_prefix: random_choice(rng, &["Mr", "Mrs", "Ms", ""]),
        preferred_name: if_empty_none(Some(&customer.given_name)),
        given_name: if_empty_none(Some(&customer.given_name)),
        last_name: if_empty_none(Some(&customer.last_name)),
        middle_name: random_choice(rng, &["A", "B", "C", ""]),
        date_of_birth: date_or_none(rng),
        date_of_death: None,
        gender: random_choice(rng, &["Male", "Female", ""]),
        place_of_birth: random_choice(rng, &["London", "New York", "Sydney", ""]),
        country_of_residence: random_choice(rng, &["UK", "USA", "Australia", ""]),
    };

    Event {
        metadata: generate_metadata(rng),
        payload,
    }
}

fn generate_metadata<R: Rng + ?Sized>(rng: &mut R) -> Metadata {
    Metadata {
        message_key: random_string(rng, 10),
        created_date: EventTime(random_date(rng)),
        updated_date: EventTime(random_date(rng)),
        outbox_published_date: EventTime(random_date(rng)),
        event_type: weighted_event_type(rng),
    }
}

pub(crate) fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    Alphanumeric.sample_string(rng, len)
}

fn random_choice<R: Rng + ?Sized>(rng: &mut R, choices: &[&str]) -> Option<String> {
    if_empty_none(choices.choose(rng))
}

/// A date of birth, absent one time in five.
fn date_or_none<R: Rng + ?Sized>(rng: &mut R) -> Option<i32> {
    if rng.random_bool(0.2) {
        return None;
    }
    Some(epoch_days(random_date(rng).date_naive()))
}

/// A moment within the last 50 years.
fn random_date<R: Rng + ?Sized>(rng: &mut R) -> DateTime<Utc> {
    let now = Utc::now();
    let span_ms = Duration::days(50 * 365).num_milliseconds();
    now - Duration::milliseconds(rng.random_range(0..span_ms))
}

/// INSERT 60%, UPDATE 20%, DELETE 20%.
fn weighted_event_type<R: Rng + ?Sized>(rng: &mut R) -> EventType {
    match rng.random_range(0..10) {
        0..=5 => EventType::Insert,
        6..=7 => EventType::Update,
        _ => EventType::Delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ToAvroRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generates_requested_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let events = generate_events(&mut rng, &default_customers(), 25);
        assert_eq!(events.len(), 25);
    }

    #[test]
    fn test_generated_events_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(42);
        let customers = vec![Customer::new("Tom", "Jones")];
        for event in generate_events(&mut rng, &customers, 50) {
            assert!(event.payload.id.starts_with("PK"));
            assert_eq!(event.payload.id.len(), 8);
            assert_eq!(event.metadata.message_key.len(), 10);
            assert_eq!(event.payload.given_name.as_deref(), Some("Tom"));
            assert_eq!(event.payload.last_name.as_deref(), Some("Jones"));
            assert_eq!(event.payload.date_of_death, None);
            assert_ne!(event.payload.name_prefix.as_deref(), Some(""));
            event.to_avro_record().unwrap();
        }
    }

    #[test]
    fn test_empty_customer_names_are_absent() {
        let mut rng = StdRng::seed_from_u64(1);
        let events = generate_events(&mut rng, &[Customer::new("", "")], 5);
        assert!(events.iter().all(|e| e.payload.given_name.is_none()));
        assert!(events.iter().all(|e| e.payload.last_name.is_none()));
    }

    #[test]
    fn test_generated_json_decodes() {
        let mut rng = StdRng::seed_from_u64(3);
        let events = generate_events(&mut rng, &default_customers(), 10);
        let json = serde_json::to_vec_pretty(&events).unwrap();
        let decoded = crate::event::decode_events("demoEvent", &json).unwrap();
        assert_eq!(decoded.len(), 10);
        assert_eq!(decoded[0].metadata.message_key, events[0].metadata.message_key);
    }

    #[test]
    fn test_customer_json_shape() {
        let customers: Vec<Customer> = serde_json::from_str(
            r#"[{"given_name": "Tom", "last_name": "Jones", "national_identity_numbers": ["987654321"]}]"#,
        )
        .unwrap();
        assert_eq!(customers[0].national_identity_numbers, vec!["987654321"]);
    }
}
