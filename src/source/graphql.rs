//! Chain source backed by an explorer API speaking GraphQL over HTTP.
//!
//! One endpoint per network. New-item subscriptions are served by polling
//! the newest page and reporting records above a watermark.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::{
    ChainSource, Event, Extrinsic, FieldMap, ItemCallback, ItemKey, Keyed, ListResponse, PageKey,
    Runtime, RuntimeCall, RuntimeEvent, RuntimePallet, SourceError, SourceResult, Subscription,
};

/// Records fetched per poll of a subscription
const SUBSCRIPTION_PAGE_SIZE: u32 = 25;

const EXTRINSIC_FIELDS: &str = "blockNumber extrinsicIdx hash callModule callName signed \
     multiAddressAccountId callArguments blockDatetime specVersion";

const EVENT_FIELDS: &str = "blockNumber eventIdx extrinsicIdx eventModule eventName \
     attributes blockDatetime specVersion";

/// A record type with list and lookup queries
trait Record: DeserializeOwned + Keyed + Clone + Send + Sync + 'static {
    const LIST_FIELD: &'static str;
    const LOOKUP_FIELD: &'static str;
    const FIELDS: &'static str;
    /// Name of the intra-block index argument of the lookup query
    const INDEX_ARG: &'static str;
}

impl Record for Extrinsic {
    const LIST_FIELD: &'static str = "getExtrinsics";
    const LOOKUP_FIELD: &'static str = "getExtrinsic";
    const FIELDS: &'static str = EXTRINSIC_FIELDS;
    const INDEX_ARG: &'static str = "extrinsicIdx";
}

impl Record for Event {
    const LIST_FIELD: &'static str = "getEvents";
    const LOOKUP_FIELD: &'static str = "getEvent";
    const FIELDS: &'static str = EVENT_FIELDS;
    const INDEX_ARG: &'static str = "eventIdx";
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    page_next: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    objects: Vec<T>,
    #[serde(default)]
    page_info: PageInfo,
}

impl<T> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.objects,
            next_page: page.page_info.page_next.filter(|k| !k.is_empty()).map(PageKey),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// GraphQL chain source with retry logic for rate-limited endpoints
#[derive(Clone)]
pub struct GraphqlSource {
    client: Client,
    endpoints: Arc<HashMap<String, String>>,
    poll_interval: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl GraphqlSource {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoints: Arc::new(HashMap::new()),
            poll_interval: poll_interval.max(Duration::from_secs(1)),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Register the API endpoint of `network`
    pub fn with_endpoint(mut self, network: &str, api_url: &str) -> Self {
        Arc::make_mut(&mut self.endpoints).insert(network.to_string(), api_url.to_string());
        self
    }

    pub fn has_network(&self, network: &str) -> bool {
        self.endpoints.contains_key(network)
    }

    fn endpoint(&self, network: &str) -> SourceResult<&str> {
        self.endpoints
            .get(network)
            .map(String::as_str)
            .ok_or_else(|| SourceError::UnknownNetwork(network.to_string()))
    }

    /// Run `query` and decode `data.<field>` into `T`
    async fn query<T: DeserializeOwned>(
        &self,
        network: &str,
        field: &str,
        query: &str,
        variables: Value,
    ) -> SourceResult<T> {
        let url = self.endpoint(network)?;
        let request = GraphqlRequest { query, variables };

        let response = self
            .with_retry(|| async {
                let response = self.client.post(url).json(&request).send().await?;
                response.error_for_status()?.json::<GraphqlResponse>().await
            })
            .await
            .map_err(|e| SourceError::Transport(format!("{field}: {e}")))?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::Transport(format!("{field}: {}", messages.join("; "))));
        }

        let value = response
            .data
            .and_then(|mut data| data.remove(field))
            .ok_or_else(|| SourceError::InvalidResponse(format!("{field}: missing data")))?;
        serde_json::from_value(value)
            .map_err(|e| SourceError::InvalidResponse(format!("{field}: {e}")))
    }

    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    let delay = self.base_delay * 2_u32.pow(attempt);
                    debug!(attempt, ?delay, error = %e, "retrying explorer query");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list<T: Record>(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<T>> {
        let query = format!(
            "query($filters: JSON, $pageSize: Int, $pageKey: String) {{ \
               {field}(filters: $filters, pageSize: $pageSize, pageKey: $pageKey) {{ \
                 objects {{ {fields} }} pageInfo {{ pageSize pageNext }} \
               }} \
             }}",
            field = T::LIST_FIELD,
            fields = T::FIELDS,
        );
        let variables = json!({
            "filters": filters,
            "pageSize": page_size,
            "pageKey": page_key,
        });
        let page: Page<T> = self.query(network, T::LIST_FIELD, &query, variables).await?;
        Ok(page.into())
    }

    async fn lookup<T: Record>(
        &self,
        network: &str,
        block_number: u64,
        index: u32,
    ) -> SourceResult<Option<T>> {
        let query = format!(
            "query($blockNumber: Int!, $index: Int!) {{ \
               {field}(blockNumber: $blockNumber, {index_arg}: $index) {{ {fields} }} \
             }}",
            field = T::LOOKUP_FIELD,
            index_arg = T::INDEX_ARG,
            fields = T::FIELDS,
        );
        let variables = json!({ "blockNumber": block_number, "index": index });
        self.query(network, T::LOOKUP_FIELD, &query, variables).await
    }

    /// Report every record newer than the newest one seen at registration.
    /// The first poll runs here so that an unreachable endpoint fails the
    /// registration instead of a background task.
    async fn subscribe<T: Record>(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<T>,
    ) -> SourceResult<Subscription> {
        let newest: ListResponse<T> = self
            .list(network, filters, SUBSCRIPTION_PAGE_SIZE, None)
            .await?;
        let mut watermark = newest
            .items
            .iter()
            .map(Keyed::item_key)
            .max()
            .unwrap_or_default();

        let source = self.clone();
        let network = network.to_string();
        let filters = filters.clone();
        debug!(network, %watermark, "polling for new {}", T::LIST_FIELD);

        let task = tokio::spawn(async move {
            let mut ticker = interval(source.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let response: ListResponse<T> = match source
                    .list(&network, &filters, SUBSCRIPTION_PAGE_SIZE, None)
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(network, error = %e, "subscription poll failed");
                        continue;
                    }
                };

                let mut fresh: Vec<T> = response
                    .items
                    .into_iter()
                    .filter(|item| item.item_key() > watermark)
                    .collect();
                fresh.sort_by_key(Keyed::item_key);
                trace!(network, count = fresh.len(), "subscription poll");

                for item in fresh {
                    watermark = watermark.max(item.item_key());
                    on_item(item);
                }
            }
        });

        Ok(Subscription::new(move || task.abort()))
    }
}

fn is_retryable(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    matches!(
        error.status(),
        Some(StatusCode::TOO_MANY_REQUESTS)
            | Some(StatusCode::BAD_GATEWAY)
            | Some(StatusCode::SERVICE_UNAVAILABLE)
            | Some(StatusCode::GATEWAY_TIMEOUT)
    )
}

#[async_trait]
impl ChainSource for GraphqlSource {
    async fn get_extrinsics(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Extrinsic>> {
        self.list(network, filters, page_size, page_key).await
    }

    async fn subscribe_new_extrinsic(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Extrinsic>,
    ) -> SourceResult<Subscription> {
        self.subscribe(network, filters, on_item).await
    }

    async fn get_extrinsic(
        &self,
        network: &str,
        block_number: u64,
        extrinsic_idx: u32,
    ) -> SourceResult<Option<Extrinsic>> {
        self.lookup(network, block_number, extrinsic_idx).await
    }

    async fn get_events(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Event>> {
        self.list(network, filters, page_size, page_key).await
    }

    async fn subscribe_new_event(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Event>,
    ) -> SourceResult<Subscription> {
        self.subscribe(network, filters, on_item).await
    }

    async fn get_event(
        &self,
        network: &str,
        block_number: u64,
        event_idx: u32,
    ) -> SourceResult<Option<Event>> {
        self.lookup(network, block_number, event_idx).await
    }

    async fn get_latest_runtime(&self, network: &str) -> SourceResult<Option<Runtime>> {
        let query = "query { getLatestRuntime { specName specVersion } }";
        self.query(network, "getLatestRuntime", query, json!({})).await
    }

    async fn get_runtime_pallets(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimePallet>> {
        let query = "query($specVersion: Int!) { \
             getRuntimePallets(specVersion: $specVersion) { objects { pallet prefix } } }";
        let page: Page<RuntimePallet> = self
            .query(network, "getRuntimePallets", query, json!({ "specVersion": spec_version }))
            .await?;
        Ok(page.objects)
    }

    async fn get_runtime_calls(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeCall>> {
        let query = "query($specVersion: Int!) { \
             getRuntimeCalls(specVersion: $specVersion) { objects { pallet callName } } }";
        let page: Page<RuntimeCall> = self
            .query(network, "getRuntimeCalls", query, json!({ "specVersion": spec_version }))
            .await?;
        Ok(page.objects)
    }

    async fn get_runtime_events(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeEvent>> {
        let query = "query($specVersion: Int!) { \
             getRuntimeEvents(specVersion: $specVersion) { objects { pallet eventName } } }";
        let page: Page<RuntimeEvent> = self
            .query(network, "getRuntimeEvents", query, json!({ "specVersion": spec_version }))
            .await?;
        Ok(page.objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decodes_objects_and_cursor() {
        let raw = json!({
            "objects": [{
                "blockNumber": 1000,
                "extrinsicIdx": 2,
                "callModule": "Balances",
                "callName": "transfer_keep_alive",
                "signed": 1,
                "callArguments": "[]"
            }],
            "pageInfo": { "pageSize": 1, "pageNext": "1000-2" }
        });
        let page: Page<Extrinsic> = serde_json::from_value(raw).unwrap();
        let response: ListResponse<Extrinsic> = page.into();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].item_key(), ItemKey::new(1000, 2));
        assert!(response.items[0].is_signed());
        assert_eq!(response.next_page, Some(PageKey("1000-2".into())));
    }

    #[test]
    fn test_page_decodes_structured_arguments() {
        let raw = json!({
            "objects": [{
                "blockNumber": 1000,
                "eventIdx": 1,
                "extrinsicIdx": 2,
                "eventModule": "Balances",
                "eventName": "Transfer",
                "attributes": [
                    { "type": "AccountId", "value": "0xd435" },
                    { "type": "Balance", "value": 2500000000u64 }
                ]
            }],
            "pageInfo": { "pageNext": null }
        });
        let page: Page<Event> = serde_json::from_value(raw).unwrap();
        let response: ListResponse<Event> = page.into();

        let event = &response.items[0];
        assert!(event.attributes.as_ref().unwrap().is_array());
        assert_eq!(
            event.attributes_text(),
            r#"[{"type":"AccountId","value":"0xd435"},{"type":"Balance","value":2500000000}]"#
        );

        let raw = json!({
            "objects": [{
                "blockNumber": 1000,
                "extrinsicIdx": 2,
                "callModule": "Balances",
                "callName": "transfer",
                "callArguments": { "dest": "0x8eaf", "value": "1" }
            }],
            "pageInfo": { "pageNext": null }
        });
        let page: Page<Extrinsic> = serde_json::from_value(raw).unwrap();
        let response: ListResponse<Extrinsic> = page.into();
        assert_eq!(
            response.items[0].call_arguments_text(),
            r#"{"dest":"0x8eaf","value":"1"}"#
        );
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let raw = json!({ "objects": [], "pageInfo": { "pageNext": null } });
        let page: Page<Event> = serde_json::from_value(raw).unwrap();
        let response: ListResponse<Event> = page.into();
        assert!(response.items.is_empty());
        assert!(response.next_page.is_none());
    }

    #[test]
    fn test_graphql_errors_decode() {
        let raw = r#"{"data":null,"errors":[{"message":"bad filter"}]}"#;
        let response: GraphqlResponse = serde_json::from_str(raw).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "bad filter");
    }

    #[tokio::test]
    async fn test_unknown_network_is_rejected() {
        let source = GraphqlSource::new(Duration::from_secs(6))
            .with_endpoint("polkadot", "http://127.0.0.1:9/graphql");
        assert!(source.has_network("polkadot"));

        let err = source.get_latest_runtime("kusama").await.unwrap_err();
        assert_eq!(err, SourceError::UnknownNetwork("kusama".into()));
    }
}
