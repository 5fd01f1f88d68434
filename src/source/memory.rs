//! In-memory chain source.
//!
//! Holds extrinsics, events and runtime metadata per network, answers list
//! queries with cursor pagination and fans pushed records out to matching
//! subscribers. Latency and failures can be injected per network, which is
//! what the lifecycle tests rely on.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    ChainSource, Event, Extrinsic, FieldMap, FieldValue, ItemCallback, ItemKey, Keyed,
    ListResponse, PageKey, Runtime, RuntimeCall, RuntimeEvent, RuntimePallet, SourceError,
    SourceResult, Subscription,
};

/// Which record list a request was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Extrinsics,
    Events,
}

/// A recorded list query
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub network: String,
    pub kind: RecordKind,
    pub filters: FieldMap,
    pub page_key: Option<PageKey>,
}

#[derive(Default)]
struct ChainData {
    extrinsics: Vec<Extrinsic>,
    events: Vec<Event>,
    runtime: Option<Runtime>,
    pallets: HashMap<u32, Vec<RuntimePallet>>,
    calls: HashMap<u32, Vec<RuntimeCall>>,
    runtime_events: HashMap<u32, Vec<RuntimeEvent>>,
    latency: Duration,
    fail_lists: bool,
    fail_subscriptions: bool,
    fail_lookups: bool,
}

struct Subscriber<T> {
    id: u64,
    network: String,
    filters: FieldMap,
    on_item: ItemCallback<T>,
}

#[derive(Default)]
struct MemoryState {
    chains: HashMap<String, ChainData>,
    extrinsic_subscribers: Vec<Subscriber<Extrinsic>>,
    event_subscribers: Vec<Subscriber<Event>>,
    next_subscriber_id: u64,
    subscriptions_opened: usize,
    subscriptions_closed: usize,
    list_requests: Vec<ListRequest>,
    metadata_requests: usize,
}

impl MemoryState {
    fn chain(&self, network: &str) -> SourceResult<&ChainData> {
        self.chains
            .get(network)
            .ok_or_else(|| SourceError::UnknownNetwork(network.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_network(&self, network: &str) {
        self.state
            .lock()
            .chains
            .entry(network.to_string())
            .or_default();
    }

    /// Store extrinsics without notifying subscribers
    pub fn insert_extrinsics(&self, network: &str, extrinsics: impl IntoIterator<Item = Extrinsic>) {
        let mut state = self.state.lock();
        let chain = state.chains.entry(network.to_string()).or_default();
        chain.extrinsics.extend(extrinsics);
    }

    /// Store events without notifying subscribers
    pub fn insert_events(&self, network: &str, events: impl IntoIterator<Item = Event>) {
        let mut state = self.state.lock();
        let chain = state.chains.entry(network.to_string()).or_default();
        chain.events.extend(events);
    }

    /// Store a new extrinsic and deliver it to matching subscribers.
    /// Returns the number of deliveries.
    pub fn push_extrinsic(&self, network: &str, extrinsic: Extrinsic) -> usize {
        let callbacks: Vec<ItemCallback<Extrinsic>> = {
            let mut state = self.state.lock();
            state
                .chains
                .entry(network.to_string())
                .or_default()
                .extrinsics
                .push(extrinsic.clone());
            state
                .extrinsic_subscribers
                .iter()
                .filter(|s| s.network == network && matches_filters(&extrinsic, &s.filters))
                .map(|s| s.on_item.clone())
                .collect()
        };

        // Callbacks run outside the lock so they may call back into the source
        for callback in &callbacks {
            callback(extrinsic.clone());
        }
        callbacks.len()
    }

    /// Store a new event and deliver it to matching subscribers.
    /// Returns the number of deliveries.
    pub fn push_event(&self, network: &str, event: Event) -> usize {
        let callbacks: Vec<ItemCallback<Event>> = {
            let mut state = self.state.lock();
            state
                .chains
                .entry(network.to_string())
                .or_default()
                .events
                .push(event.clone());
            state
                .event_subscribers
                .iter()
                .filter(|s| s.network == network && matches_filters(&event, &s.filters))
                .map(|s| s.on_item.clone())
                .collect()
        };

        for callback in &callbacks {
            callback(event.clone());
        }
        callbacks.len()
    }

    pub fn set_runtime(&self, network: &str, runtime: Option<Runtime>) {
        let mut state = self.state.lock();
        state.chains.entry(network.to_string()).or_default().runtime = runtime;
    }

    pub fn set_metadata(
        &self,
        network: &str,
        spec_version: u32,
        pallets: Vec<RuntimePallet>,
        calls: Vec<RuntimeCall>,
        events: Vec<RuntimeEvent>,
    ) {
        let mut state = self.state.lock();
        let chain = state.chains.entry(network.to_string()).or_default();
        chain.pallets.insert(spec_version, pallets);
        chain.calls.insert(spec_version, calls);
        chain.runtime_events.insert(spec_version, events);
    }

    /// Delay every answer for `network` by `latency`
    pub fn set_latency(&self, network: &str, latency: Duration) {
        let mut state = self.state.lock();
        state.chains.entry(network.to_string()).or_default().latency = latency;
    }

    pub fn set_failing_lists(&self, network: &str, failing: bool) {
        let mut state = self.state.lock();
        state.chains.entry(network.to_string()).or_default().fail_lists = failing;
    }

    pub fn set_failing_subscriptions(&self, network: &str, failing: bool) {
        let mut state = self.state.lock();
        state
            .chains
            .entry(network.to_string())
            .or_default()
            .fail_subscriptions = failing;
    }

    pub fn set_failing_lookups(&self, network: &str, failing: bool) {
        let mut state = self.state.lock();
        state.chains.entry(network.to_string()).or_default().fail_lookups = failing;
    }

    pub fn subscriptions_opened(&self) -> usize {
        self.state.lock().subscriptions_opened
    }

    pub fn subscriptions_closed(&self) -> usize {
        self.state.lock().subscriptions_closed
    }

    pub fn active_subscriptions(&self) -> usize {
        let state = self.state.lock();
        state.extrinsic_subscribers.len() + state.event_subscribers.len()
    }

    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.state.lock().list_requests.clone()
    }

    pub fn metadata_requests(&self) -> usize {
        self.state.lock().metadata_requests
    }

    async fn delay(&self, network: &str) -> SourceResult<()> {
        let latency = self.state.lock().chain(network)?.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn release_handle(&self, id: u64) -> Subscription {
        let state = self.state.clone();
        Subscription::new(move || {
            let mut state = state.lock();
            state.extrinsic_subscribers.retain(|s| s.id != id);
            state.event_subscribers.retain(|s| s.id != id);
            state.subscriptions_closed += 1;
            debug!(id, "memory subscription released");
        })
    }

    fn record_list(&self, network: &str, kind: RecordKind, filters: &FieldMap, page_key: Option<&PageKey>) {
        self.state.lock().list_requests.push(ListRequest {
            network: network.to_string(),
            kind,
            filters: filters.clone(),
            page_key: page_key.cloned(),
        });
    }
}

// ============================================================================
// Filtering and pagination
// ============================================================================

/// Field lookup used to evaluate filters against stored records
trait FieldSource {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl FieldSource for Extrinsic {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "blockNumber" => Some(self.block_number.into()),
            "extrinsicIdx" => Some(self.extrinsic_idx.into()),
            "callModule" => Some(self.call_module.as_str().into()),
            "callName" => Some(self.call_name.as_str().into()),
            "signed" => Some(u64::from(self.signed).into()),
            "multiAddressAccountId" => self
                .multi_address_account_id
                .as_deref()
                .map(FieldValue::from),
            _ => None,
        }
    }
}

impl FieldSource for Event {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "blockNumber" => Some(self.block_number.into()),
            "eventIdx" => Some(self.event_idx.into()),
            "extrinsicIdx" => self.extrinsic_idx.map(FieldValue::from),
            "eventModule" => Some(self.event_module.as_str().into()),
            "eventName" => Some(self.event_name.as_str().into()),
            _ => None,
        }
    }
}

fn matches_filters<T: FieldSource>(item: &T, filters: &FieldMap) -> bool {
    filters
        .iter()
        .all(|(name, value)| item.field(name).as_ref() == Some(value))
}

fn paginate<T>(
    items: &[T],
    filters: &FieldMap,
    page_size: u32,
    page_key: Option<&PageKey>,
) -> SourceResult<ListResponse<T>>
where
    T: FieldSource + Keyed + Clone,
{
    let cursor = page_key
        .map(|key| {
            key.0
                .parse::<ItemKey>()
                .map_err(|e| SourceError::Transport(format!("bad page key: {e}")))
        })
        .transpose()?;

    let mut matching: Vec<&T> = items
        .iter()
        .filter(|item| matches_filters(*item, filters))
        .filter(|item| cursor.map_or(true, |c| item.item_key() < c))
        .collect();
    matching.sort_by_key(|item| std::cmp::Reverse(item.item_key()));

    let page_size = page_size as usize;
    let has_more = matching.len() > page_size;
    let items: Vec<T> = matching.into_iter().take(page_size).cloned().collect();
    let next_page = if has_more {
        items.last().map(|item| PageKey(item.item_key().to_string()))
    } else {
        None
    };

    Ok(ListResponse { items, next_page })
}

#[async_trait]
impl ChainSource for MemorySource {
    async fn get_extrinsics(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Extrinsic>> {
        self.record_list(network, RecordKind::Extrinsics, filters, page_key);
        self.delay(network).await?;

        let state = self.state.lock();
        let chain = state.chain(network)?;
        if chain.fail_lists {
            return Err(SourceError::Transport("extrinsic list unavailable".into()));
        }
        paginate(&chain.extrinsics, filters, page_size, page_key)
    }

    async fn subscribe_new_extrinsic(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Extrinsic>,
    ) -> SourceResult<Subscription> {
        self.delay(network).await?;

        let id = {
            let mut state = self.state.lock();
            if state.chain(network)?.fail_subscriptions {
                return Err(SourceError::Transport("subscription rejected".into()));
            }
            let id = state.next_subscriber_id;
            state.next_subscriber_id += 1;
            state.subscriptions_opened += 1;
            state.extrinsic_subscribers.push(Subscriber {
                id,
                network: network.to_string(),
                filters: filters.clone(),
                on_item,
            });
            id
        };

        Ok(self.release_handle(id))
    }

    async fn get_extrinsic(
        &self,
        network: &str,
        block_number: u64,
        extrinsic_idx: u32,
    ) -> SourceResult<Option<Extrinsic>> {
        self.delay(network).await?;

        let state = self.state.lock();
        let chain = state.chain(network)?;
        if chain.fail_lookups {
            return Err(SourceError::Transport("extrinsic lookup unavailable".into()));
        }
        Ok(chain
            .extrinsics
            .iter()
            .find(|e| e.block_number == block_number && e.extrinsic_idx == extrinsic_idx)
            .cloned())
    }

    async fn get_events(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Event>> {
        self.record_list(network, RecordKind::Events, filters, page_key);
        self.delay(network).await?;

        let state = self.state.lock();
        let chain = state.chain(network)?;
        if chain.fail_lists {
            return Err(SourceError::Transport("event list unavailable".into()));
        }
        paginate(&chain.events, filters, page_size, page_key)
    }

    async fn subscribe_new_event(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Event>,
    ) -> SourceResult<Subscription> {
        self.delay(network).await?;

        let id = {
            let mut state = self.state.lock();
            if state.chain(network)?.fail_subscriptions {
                return Err(SourceError::Transport("subscription rejected".into()));
            }
            let id = state.next_subscriber_id;
            state.next_subscriber_id += 1;
            state.subscriptions_opened += 1;
            state.event_subscribers.push(Subscriber {
                id,
                network: network.to_string(),
                filters: filters.clone(),
                on_item,
            });
            id
        };

        Ok(self.release_handle(id))
    }

    async fn get_event(
        &self,
        network: &str,
        block_number: u64,
        event_idx: u32,
    ) -> SourceResult<Option<Event>> {
        self.delay(network).await?;

        let state = self.state.lock();
        let chain = state.chain(network)?;
        if chain.fail_lookups {
            return Err(SourceError::Transport("event lookup unavailable".into()));
        }
        Ok(chain
            .events
            .iter()
            .find(|e| e.block_number == block_number && e.event_idx == event_idx)
            .cloned())
    }

    async fn get_latest_runtime(&self, network: &str) -> SourceResult<Option<Runtime>> {
        self.delay(network).await?;
        Ok(self.state.lock().chain(network)?.runtime.clone())
    }

    async fn get_runtime_pallets(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimePallet>> {
        self.delay(network).await?;

        let mut state = self.state.lock();
        state.metadata_requests += 1;
        let chain = state.chain(network)?;
        Ok(chain.pallets.get(&spec_version).cloned().unwrap_or_default())
    }

    async fn get_runtime_calls(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeCall>> {
        self.delay(network).await?;

        let mut state = self.state.lock();
        state.metadata_requests += 1;
        let chain = state.chain(network)?;
        Ok(chain.calls.get(&spec_version).cloned().unwrap_or_default())
    }

    async fn get_runtime_events(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeEvent>> {
        self.delay(network).await?;

        let mut state = self.state.lock();
        state.metadata_requests += 1;
        let chain = state.chain(network)?;
        Ok(chain
            .runtime_events
            .get(&spec_version)
            .cloned()
            .unwrap_or_default())
    }
}
