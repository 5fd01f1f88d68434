use async_trait::async_trait;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::forward_changes;
use crate::filters::{account_id_hex, FilterError, FilterField, FilterForm};
use crate::generation::Generation;
use crate::list::{EventFeed, ExtrinsicFeed, ItemFeed, PaginatedList};
use crate::navigation::Navigator;
use crate::network::NetworkService;
use crate::runtime::RuntimeService;
use crate::source::{ChainSource, FieldMap, Keyed, RuntimePallet, SourceResult};
use crate::status::FetchStatus;

/// Pallet name -> sorted member names (calls or events) of the current runtime
pub type PalletChoices = BTreeMap<String, Vec<String>>;

/// What distinguishes one filtered list page from another: the feed it
/// reads, its filter form, how the form becomes a query, and which runtime
/// metadata populates the filter choices.
#[async_trait]
pub trait ListKind<S: ChainSource>: Send + Sync + 'static {
    type Feed: ItemFeed;

    fn feed(source: Arc<S>) -> Self::Feed;

    fn form() -> FilterForm;

    /// The dependent field scoped by the pallet
    fn member_field() -> FilterField;

    fn field_map(form: &FilterForm) -> Result<FieldMap, FilterError>;

    async fn load_choices(
        runtime: &RuntimeService<S>,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<PalletChoices>;
}

pub struct Extrinsics;

#[async_trait]
impl<S: ChainSource> ListKind<S> for Extrinsics {
    type Feed = ExtrinsicFeed<S>;

    fn feed(source: Arc<S>) -> Self::Feed {
        ExtrinsicFeed(source)
    }

    fn form() -> FilterForm {
        FilterForm::new(&[FilterField::Pallet, FilterField::CallName, FilterField::Address])
            .with_dependent(FilterField::Pallet, FilterField::CallName)
    }

    fn member_field() -> FilterField {
        FilterField::CallName
    }

    fn field_map(form: &FilterForm) -> Result<FieldMap, FilterError> {
        let mut filters = FieldMap::new();

        let pallet = form.value(FilterField::Pallet);
        if !pallet.is_empty() {
            filters.insert("callModule".into(), pallet.into());
        }
        let call_name = form.value(FilterField::CallName);
        if !call_name.is_empty() {
            filters.insert("callName".into(), call_name.into());
        }
        let address = form.value(FilterField::Address);
        if !address.is_empty() {
            filters.insert("multiAddressAccountId".into(), account_id_hex(address)?.into());
        }

        Ok(filters)
    }

    async fn load_choices(
        runtime: &RuntimeService<S>,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<PalletChoices> {
        let (pallets, calls) = tokio::join!(
            runtime.get_runtime_pallets(network, spec_version),
            runtime.get_runtime_calls(network, spec_version),
        );
        let calls = calls?.into_iter().map(|c| (c.pallet, c.call_name));
        Ok(group_by_pallet(&pallets?, calls))
    }
}

pub struct Events;

#[async_trait]
impl<S: ChainSource> ListKind<S> for Events {
    type Feed = EventFeed<S>;

    fn feed(source: Arc<S>) -> Self::Feed {
        EventFeed(source)
    }

    fn form() -> FilterForm {
        FilterForm::new(&[FilterField::Pallet, FilterField::EventName])
            .with_dependent(FilterField::Pallet, FilterField::EventName)
    }

    fn member_field() -> FilterField {
        FilterField::EventName
    }

    fn field_map(form: &FilterForm) -> Result<FieldMap, FilterError> {
        let mut filters = FieldMap::new();

        let pallet = form.value(FilterField::Pallet);
        if !pallet.is_empty() {
            filters.insert("eventModule".into(), pallet.into());
        }
        let event_name = form.value(FilterField::EventName);
        if !event_name.is_empty() {
            filters.insert("eventName".into(), event_name.into());
        }

        Ok(filters)
    }

    async fn load_choices(
        runtime: &RuntimeService<S>,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<PalletChoices> {
        let (pallets, events) = tokio::join!(
            runtime.get_runtime_pallets(network, spec_version),
            runtime.get_runtime_events(network, spec_version),
        );
        let events = events?.into_iter().map(|e| (e.pallet, e.event_name));
        Ok(group_by_pallet(&pallets?, events))
    }
}

/// Group `(pallet, member)` pairs under each known pallet, members sorted
/// and unique. Pallets without members map to an empty list.
pub fn group_by_pallet(
    pallets: &[RuntimePallet],
    members: impl IntoIterator<Item = (String, String)>,
) -> PalletChoices {
    let mut choices: PalletChoices = pallets
        .iter()
        .map(|p| (p.pallet.clone(), Vec::new()))
        .collect();

    for (pallet, member) in members {
        if let Some(names) = choices.get_mut(&pallet) {
            names.push(member);
        }
    }
    for names in choices.values_mut() {
        names.sort();
        names.dedup();
    }
    choices
}

// ============================================================================
// List view
// ============================================================================

enum ViewMessage {
    NetworkChanged,
    QueryChanged,
    Choices {
        stamp: u64,
        result: SourceResult<PalletChoices>,
    },
}

/// A filtered, paginated list page bound to the current network and to the
/// page's query string.
pub struct ListView<S: ChainSource, K: ListKind<S>> {
    runtime: RuntimeService<S>,
    networks: NetworkService,
    navigator: Navigator,
    list: PaginatedList<K::Feed>,
    form: FilterForm,
    network: String,
    choices: PalletChoices,
    choices_status: Option<FetchStatus>,
    choices_generation: Generation,
    choices_task: Option<JoinHandle<()>>,
    watchers: Vec<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<ViewMessage>,
    rx: mpsc::UnboundedReceiver<ViewMessage>,
    initialized: bool,
    destroyed: bool,
    _kind: PhantomData<K>,
}

pub type ExtrinsicListView<S> = ListView<S, Extrinsics>;
pub type EventListView<S> = ListView<S, Events>;

impl<S: ChainSource, K: ListKind<S>> ListView<S, K> {
    pub fn new(
        source: Arc<S>,
        runtime: RuntimeService<S>,
        networks: NetworkService,
        navigator: Navigator,
        page_size: u32,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            networks,
            navigator,
            list: PaginatedList::new(Arc::new(K::feed(source)), page_size),
            form: K::form(),
            network: String::new(),
            choices: PalletChoices::new(),
            choices_status: None,
            choices_generation: Generation::new(),
            choices_task: None,
            watchers: Vec::new(),
            tx,
            rx,
            initialized: false,
            destroyed: false,
            _kind: PhantomData,
        }
    }

    /// Activate the view: take initial filters from the query string, start
    /// observing network and query changes, and run the first cycle.
    pub fn init(&mut self) {
        if self.initialized || self.destroyed {
            return;
        }
        self.initialized = true;

        let mut query_rx = self.navigator.query_params();
        let query = query_rx.borrow_and_update().clone();
        // Populating the form here does not start a cycle of its own
        self.form.patch_from_query(&query);
        self.watchers.push(forward_changes(query_rx, self.tx.clone(), || {
            ViewMessage::QueryChanged
        }));

        let mut network_rx = self.networks.current_network();
        let network = network_rx.borrow_and_update().clone();
        self.watchers.push(forward_changes(network_rx, self.tx.clone(), || {
            ViewMessage::NetworkChanged
        }));

        self.on_network_change(network);
    }

    // ==================== Accessors ====================

    pub fn items(&self) -> &[<K::Feed as ItemFeed>::Item] {
        self.list.items()
    }

    pub fn list(&self) -> &PaginatedList<K::Feed> {
        &self.list
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn filter_value(&self, field: FilterField) -> &str {
        self.form.value(field)
    }

    pub fn member_field(&self) -> FilterField {
        K::member_field()
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn choices(&self) -> &PalletChoices {
        &self.choices
    }

    pub fn pallets(&self) -> impl Iterator<Item = &str> {
        self.choices.keys().map(String::as_str)
    }

    /// Member names valid for the currently selected pallet
    pub fn members(&self) -> &[String] {
        self.choices
            .get(self.form.value(FilterField::Pallet))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn fetch_status(&self) -> Option<FetchStatus> {
        self.list.fetch_status()
    }

    pub fn subscription_status(&self) -> Option<FetchStatus> {
        self.list.subscription_status()
    }

    pub fn choices_status(&self) -> Option<FetchStatus> {
        self.choices_status
    }

    pub fn has_more(&self) -> bool {
        self.list.has_more()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Stable row key of a listed item
    pub fn row_key(item: &<K::Feed as ItemFeed>::Item) -> String {
        item.item_key().to_string()
    }

    // ==================== Operations ====================

    /// Set one filter field from user input. A changed value starts a new
    /// cycle and is reflected into the query string.
    pub fn set_filter(&mut self, field: FilterField, value: &str) -> bool {
        if self.destroyed || !self.form.set(field, value) {
            return false;
        }
        self.on_filters_changed();
        true
    }

    /// Clear every filter field
    pub fn clear_filters(&mut self) -> bool {
        if self.destroyed || !self.form.reset() {
            return false;
        }
        self.on_filters_changed();
        true
    }

    pub fn fetch_more(&mut self) -> bool {
        self.list.fetch_more()
    }

    /// Apply every queued message without waiting.
    /// Returns whether visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = self.list.poll();
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.apply(msg);
        }
        changed
    }

    /// Wait for and apply the next message.
    /// Returns whether visible state changed.
    pub async fn process_next(&mut self) -> bool {
        tokio::select! {
            Some(msg) = self.list.recv() => self.list.apply(msg),
            Some(msg) = self.rx.recv() => self.apply(msg),
            else => false,
        }
    }

    /// Release the subscription, stop observing changes and abandon any
    /// metadata refresh. Safe to call before `init` and repeatedly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.list.destroy();
        self.choices_generation.advance();
        if let Some(task) = self.choices_task.take() {
            task.abort();
        }
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
        self.rx.close();
    }

    // ==================== Lifecycle ====================

    fn apply(&mut self, msg: ViewMessage) -> bool {
        if self.destroyed {
            return false;
        }
        match msg {
            ViewMessage::NetworkChanged => {
                let network = self.networks.network();
                if network == self.network {
                    return false;
                }
                self.on_network_change(network);
                true
            }
            ViewMessage::QueryChanged => {
                let query = self.navigator.snapshot();
                if !self.form.patch_from_query(&query) {
                    return false;
                }
                debug!(?query, "filters changed through query params");
                self.reload();
                true
            }
            ViewMessage::Choices { stamp, result } => {
                if !self.choices_generation.is_current(stamp) {
                    return false;
                }
                match result {
                    Ok(choices) => {
                        self.choices = choices;
                        self.choices_status = None;
                    }
                    Err(e) => {
                        warn!(network = %self.network, error = %e, "failed to load filter choices");
                        self.choices_status = Some(FetchStatus::Error);
                    }
                }
                true
            }
        }
    }

    fn on_network_change(&mut self, network: String) {
        let previous = std::mem::replace(&mut self.network, network);
        debug!(network = %self.network, %previous, "network changed");

        if !previous.is_empty() {
            // Choices of the old network do not apply to the new one
            self.form.reset();
            self.navigator.merge(self.form.to_query());
        }

        self.choices.clear();
        self.choices_status = None;
        let stamp = self.choices_generation.advance();

        self.reload();

        if !self.network.is_empty() {
            self.refresh_choices(stamp);
        }
    }

    fn on_filters_changed(&mut self) {
        self.reload();
        self.navigator.merge(self.form.to_query());
    }

    fn reload(&mut self) {
        match K::field_map(&self.form) {
            Ok(filters) => self.list.load(&self.network, filters),
            Err(e) => {
                warn!(error = %e, "filters cannot be queried");
                self.list.fail();
            }
        }
    }

    /// Load the pallet -> member table for the network's current runtime.
    /// Results are dropped if the network changes or the view is torn down.
    /// If the runtime changes before the lookups complete, they start over
    /// for the new one. A missing runtime is an error.
    fn refresh_choices(&mut self, stamp: u64) {
        self.choices_status = Some(FetchStatus::Loading);

        let runtime = self.runtime.clone();
        let generation = self.choices_generation.clone();
        let network = self.network.clone();
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            let result = loop {
                let spec_version = match runtime.current_runtime(&network).await {
                    Ok(current) => current.spec_version,
                    Err(e) => break Err(e),
                };
                if !generation.is_current(stamp) {
                    return;
                }
                let runtime_rx = runtime.get_runtime(&network);

                let result = K::load_choices(&runtime, &network, spec_version).await;

                let latest = runtime_rx.borrow().as_ref().map(|r| r.spec_version);
                if latest == Some(spec_version) {
                    break result;
                }
                debug!(network, spec_version, ?latest, "runtime changed, reloading filter choices");
            };

            if !generation.is_current(stamp) {
                debug!(network, "abandoning filter choice refresh");
                return;
            }
            let _ = tx.send(ViewMessage::Choices { stamp, result });
        });

        // An earlier refresh keeps running but its result is stale
        self.choices_task = Some(task);
    }
}

impl<S: ChainSource, K: ListKind<S>> Drop for ListView<S, K> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemorySource;
    use crate::source::{FieldValue, RuntimeCall};

    fn pallet(name: &str) -> RuntimePallet {
        RuntimePallet {
            pallet: name.to_string(),
            prefix: None,
        }
    }

    #[test]
    fn test_group_by_pallet() {
        let calls = vec![
            RuntimeCall { pallet: "Balances".into(), call_name: "transfer_keep_alive".into() },
            RuntimeCall { pallet: "Balances".into(), call_name: "force_transfer".into() },
            RuntimeCall { pallet: "Unknown".into(), call_name: "noop".into() },
        ];
        let choices = group_by_pallet(
            &[pallet("Balances"), pallet("System")],
            calls.into_iter().map(|c| (c.pallet, c.call_name)),
        );

        assert_eq!(
            choices.get("Balances").unwrap(),
            &vec!["force_transfer".to_string(), "transfer_keep_alive".to_string()]
        );
        assert!(choices.get("System").unwrap().is_empty());
        assert!(!choices.contains_key("Unknown"));
    }

    #[test]
    fn test_extrinsic_field_map_omits_empty_fields() {
        let mut form = <Extrinsics as ListKind<MemorySource>>::form();
        form.set(FilterField::Pallet, "Staking");
        let filters = <Extrinsics as ListKind<MemorySource>>::field_map(&form).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get("callModule"), Some(&FieldValue::from("Staking")));
    }

    #[test]
    fn test_extrinsic_field_map_rejects_bad_address() {
        let mut form = <Extrinsics as ListKind<MemorySource>>::form();
        form.set(FilterField::Address, "nope");
        assert!(<Extrinsics as ListKind<MemorySource>>::field_map(&form).is_err());
    }
}
