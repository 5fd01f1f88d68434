//! Data-access layer: the `ChainSource` trait every view queries, plus the
//! HTTP GraphQL and in-memory implementations.

pub mod graphql;
pub mod memory;
mod types;

pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Query types
// ============================================================================

/// A single filter value sent to the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(u64),
    Text(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Filter name -> value. Absent fields are simply not present.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Opaque "continue from here" token returned by a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(pub String);

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    /// `None` once the end of the data is reached
    pub next_page: Option<PageKey>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("query failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("network `{0}` is not configured")]
    UnknownNetwork(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

// ============================================================================
// Live subscriptions
// ============================================================================

/// Callback invoked by a source for every new item matching a subscription.
pub type ItemCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle to a live new-item subscription.
///
/// The release action runs exactly once: on `unsubscribe`, or when the handle
/// is dropped without having been unsubscribed.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ============================================================================
// Source trait
// ============================================================================

/// Everything the explorer views need from a chain data provider.
///
/// Every call is scoped to a network identifier.
#[async_trait]
pub trait ChainSource: Send + Sync + 'static {
    async fn get_extrinsics(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Extrinsic>>;

    async fn subscribe_new_extrinsic(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Extrinsic>,
    ) -> SourceResult<Subscription>;

    async fn get_extrinsic(
        &self,
        network: &str,
        block_number: u64,
        extrinsic_idx: u32,
    ) -> SourceResult<Option<Extrinsic>>;

    async fn get_events(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Event>>;

    async fn subscribe_new_event(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Event>,
    ) -> SourceResult<Subscription>;

    async fn get_event(
        &self,
        network: &str,
        block_number: u64,
        event_idx: u32,
    ) -> SourceResult<Option<Event>>;

    async fn get_latest_runtime(&self, network: &str) -> SourceResult<Option<Runtime>>;

    async fn get_runtime_pallets(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimePallet>>;

    async fn get_runtime_calls(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeCall>>;

    async fn get_runtime_events(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscription_releases_once_on_unsubscribe() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_releases_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        {
            let _sub = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let mut filters = FieldMap::new();
        filters.insert("blockNumber".into(), 1000u64.into());
        filters.insert("callModule".into(), "Balances".into());
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, r#"{"blockNumber":1000,"callModule":"Balances"}"#);
    }
}
