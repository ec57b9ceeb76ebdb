//! Schema registry access.
//!
//! Schemas are looked up by the numeric id carried in the wire header. The
//! [`SchemaRegistry`] trait is the only thing the codec side needs; the HTTP
//! client talks to a Confluent-compatible registry, the in-memory registry
//! serves fixed schemas.

use crate::avro::AvroCodec;
use crate::{Error, Result};
use apache_avro::Schema;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

const REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Returns the schema definition registered under `id`.
    async fn fetch_schema(&self, id: u32) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GetSchemaResponse {
    schema: String,
}

#[derive(Debug, Serialize)]
struct RegisterSchemaRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterSchemaResponse {
    id: u32,
}

/// Confluent-compatible registry client.
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Registers `schema` under `subject`, returning its id.
    #[instrument(skip(self, schema))]
    pub async fn register(&self, subject: &str, schema: &str) -> Result<u32> {
        let url = format!("{}/subjects/{}/versions", self.base_url, subject);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", REGISTRY_CONTENT_TYPE)
            .json(&RegisterSchemaRequest { schema })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Registry(format!(
                "registering subject '{}' failed with {}: {}",
                subject, status, body
            )));
        }

        let registered: RegisterSchemaResponse = response.json().await?;
        info!(subject, id = registered.id, "Registered schema");
        Ok(registered.id)
    }
}

#[async_trait]
impl SchemaRegistry for RegistryClient {
    async fn fetch_schema(&self, id: u32) -> Result<String> {
        let url = format!("{}/schemas/ids/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .header("Accept", REGISTRY_CONTENT_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Registry(format!(
                "unable to retrieve schema for id {}: {} {}",
                id, status, body
            )));
        }

        let fetched: GetSchemaResponse = response.json().await?;
        debug!(id, "Fetched schema from registry");
        Ok(fetched.schema)
    }
}

/// Fixed id → schema table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    schemas: HashMap<u32, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, id: u32, schema: impl Into<String>) -> Self {
        self.schemas.insert(id, schema.into());
        self
    }
}

#[async_trait]
impl SchemaRegistry for InMemoryRegistry {
    async fn fetch_schema(&self, id: u32) -> Result<String> {
        self.schemas
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Registry(format!("schema id {} is not registered", id)))
    }
}

/// Parsed schemas by id, fetched from the registry at most once each.
pub struct SchemaCache<R> {
    registry: R,
    parsed: RwLock<HashMap<u32, Arc<Schema>>>,
}

impl<R: SchemaRegistry> SchemaCache<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            parsed: RwLock::new(HashMap::new()),
        }
    }

    pub async fn schema(&self, id: u32) -> Result<Arc<Schema>> {
        if let Some(schema) = self.parsed.read().await.get(&id) {
            return Ok(Arc::clone(schema));
        }

        let raw = self.registry.fetch_schema(id).await?;
        let schema = Schema::parse_str(&raw)
            .map_err(|e| Error::Registry(format!("failed to parse schema {}: {}", id, e)))?;
        let schema = Arc::new(schema);

        self.parsed.write().await.insert(id, Arc::clone(&schema));
        debug!(id, "Cached schema");
        Ok(schema)
    }

    /// Codec that frames records with `id` and encodes with its schema.
    pub async fn codec(&self, id: u32) -> Result<AvroCodec> {
        Ok(AvroCodec::new(id, self.schema(id).await?))
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}
