use crate::error::ScoreError;
use crate::models::{BrokerExperience, OpportunityRequirement, PropertyListing};
use crate::services::normalize::{
    broker_experience_from_json, listing_from_json, requirement_from_json, NormalizeError,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading listings and opportunities
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<NormalizeError> for StoreError {
    fn from(err: NormalizeError) -> Self {
        StoreError::InvalidResponse(err.to_string())
    }
}

impl From<StoreError> for ScoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ScoreError::NotFound(what),
            StoreError::InvalidResponse(reason) => {
                ScoreError::Computation(format!("Malformed upstream record: {}", reason))
            }
            other => ScoreError::Computation(other.to_string()),
        }
    }
}

/// Read-only source of listings, opportunities and broker history
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn listing(&self, property_id: &str) -> Result<PropertyListing, StoreError>;

    async fn opportunity(&self, opportunity_id: &str) -> Result<OpportunityRequirement, StoreError>;

    /// Broker history is optional; `Ok(None)` when the broker has no profile
    async fn broker_experience(&self, broker_id: &str) -> Result<Option<BrokerExperience>, StoreError>;
}

/// Collection names in the document API
#[derive(Debug, Clone)]
pub struct StoreCollections {
    pub listings: String,
    pub opportunities: String,
    pub broker_profiles: String,
}

impl Default for StoreCollections {
    fn default() -> Self {
        Self {
            listings: "property_listings".to_string(),
            opportunities: "opportunities".to_string(),
            broker_profiles: "broker_profiles".to_string(),
        }
    }
}

/// Document API client
///
/// Fetches single documents by ID and runs them through the normalizer, so
/// any of the upstream field spellings are accepted.
pub struct RestRecordStore {
    base_url: String,
    api_key: String,
    client: Client,
    collections: StoreCollections,
}

impl RestRecordStore {
    pub fn new(
        base_url: String,
        api_key: String,
        timeout_secs: u64,
        collections: StoreCollections,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            collections,
        })
    }

    async fn fetch_document(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let url = format!(
            "{}/collections/{}/documents/{}",
            self.base_url.trim_end_matches('/'),
            collection,
            urlencoding::encode(id)
        );

        tracing::debug!("Fetching document from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound(format!("{} {}", collection, id)));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(StoreError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Failed to fetch {} {}: {} - {}", collection, id, status, body);
                return Err(StoreError::ApiError(format!("Failed to fetch {}: {}", collection, status)));
            }
            _ => {}
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse {} {}: {}", collection, id, e)))
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn listing(&self, property_id: &str) -> Result<PropertyListing, StoreError> {
        let document = self.fetch_document(&self.collections.listings, property_id).await?;
        Ok(listing_from_json(&document)?)
    }

    async fn opportunity(&self, opportunity_id: &str) -> Result<OpportunityRequirement, StoreError> {
        let document = self
            .fetch_document(&self.collections.opportunities, opportunity_id)
            .await?;
        Ok(requirement_from_json(&document)?)
    }

    async fn broker_experience(&self, broker_id: &str) -> Result<Option<BrokerExperience>, StoreError> {
        match self.fetch_document(&self.collections.broker_profiles, broker_id).await {
            Ok(document) => Ok(Some(broker_experience_from_json(&document)?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-process record store, used for tests, benches and seed-file deployments
#[derive(Default)]
pub struct InMemoryRecordStore {
    listings: RwLock<HashMap<String, PropertyListing>>,
    opportunities: RwLock<HashMap<String, OpportunityRequirement>>,
    brokers: RwLock<HashMap<String, BrokerExperience>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_listing(&self, listing: PropertyListing) {
        let mut listings = self.listings.write().unwrap_or_else(|e| e.into_inner());
        listings.insert(listing.id.clone(), listing);
    }

    pub fn insert_opportunity(&self, requirement: OpportunityRequirement) {
        let mut opportunities = self.opportunities.write().unwrap_or_else(|e| e.into_inner());
        opportunities.insert(requirement.id.clone(), requirement);
    }

    pub fn insert_broker(&self, experience: BrokerExperience) {
        let mut brokers = self.brokers.write().unwrap_or_else(|e| e.into_inner());
        brokers.insert(experience.broker_id.clone(), experience);
    }

    /// Build a store from a seed document with `listings`, `opportunities`
    /// and `brokers` arrays. Entries that fail to normalize are skipped.
    pub fn from_seed(seed: &Value) -> Result<Self, NormalizeError> {
        if !seed.is_object() {
            return Err(NormalizeError::NotAnObject);
        }

        fn section<'a>(seed: &'a Value, name: &str) -> &'a [Value] {
            seed.get(name)
                .and_then(Value::as_array)
                .map(|items| items.as_slice())
                .unwrap_or_default()
        }

        let store = Self::new();
        for (index, item) in section(seed, "listings").iter().enumerate() {
            match listing_from_json(item) {
                Ok(listing) => store.insert_listing(listing),
                Err(e) => tracing::warn!("Skipping seed listing at index {}: {}", index, e),
            }
        }
        for (index, item) in section(seed, "opportunities").iter().enumerate() {
            match requirement_from_json(item) {
                Ok(requirement) => store.insert_opportunity(requirement),
                Err(e) => tracing::warn!("Skipping seed opportunity at index {}: {}", index, e),
            }
        }
        for (index, item) in section(seed, "brokers").iter().enumerate() {
            match broker_experience_from_json(item) {
                Ok(experience) => store.insert_broker(experience),
                Err(e) => tracing::warn!("Skipping seed broker at index {}: {}", index, e),
            }
        }

        Ok(store)
    }

    /// Number of `(listings, opportunities)` held
    pub fn counts(&self) -> (usize, usize) {
        let listings = self.listings.read().unwrap_or_else(|e| e.into_inner()).len();
        let opportunities = self.opportunities.read().unwrap_or_else(|e| e.into_inner()).len();
        (listings, opportunities)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn listing(&self, property_id: &str) -> Result<PropertyListing, StoreError> {
        let listings = self.listings.read().unwrap_or_else(|e| e.into_inner());
        listings
            .get(property_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("listing {}", property_id)))
    }

    async fn opportunity(&self, opportunity_id: &str) -> Result<OpportunityRequirement, StoreError> {
        let opportunities = self.opportunities.read().unwrap_or_else(|e| e.into_inner());
        opportunities
            .get(opportunity_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("opportunity {}", opportunity_id)))
    }

    async fn broker_experience(&self, broker_id: &str) -> Result<Option<BrokerExperience>, StoreError> {
        let brokers = self.brokers.read().unwrap_or_else(|e| e.into_inner());
        Ok(brokers.get(broker_id).cloned())
    }
}
