//! Paginated list with live new-item subscription.
//!
//! `PaginatedList` holds the items matching one filter set on one network.
//! Fetches and subscription registrations run in spawned tasks and report
//! back through a channel; every message carries the generation stamp of the
//! cycle that produced it, and messages from superseded cycles are dropped.

mod feed;

pub use feed::{EventFeed, ExtrinsicFeed, ItemFeed};

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::generation::Generation;
use crate::source::{FieldMap, ItemCallback, Keyed, ListResponse, PageKey, SourceResult, Subscription};
use crate::status::FetchStatus;

/// Result of a spawned list operation, stamped with its cycle
pub enum ListMessage<T> {
    Page {
        stamp: u64,
        result: SourceResult<ListResponse<T>>,
    },
    Subscribed {
        stamp: u64,
        result: SourceResult<Subscription>,
    },
    Item {
        stamp: u64,
        item: T,
    },
}

pub struct PaginatedList<F: ItemFeed> {
    feed: Arc<F>,
    page_size: u32,
    network: String,
    filters: FieldMap,
    items: Vec<F::Item>,
    next_page: Option<PageKey>,
    fetch_status: Option<FetchStatus>,
    subscription_status: Option<FetchStatus>,
    subscription: Option<Subscription>,
    generation: Generation,
    tx: mpsc::UnboundedSender<ListMessage<F::Item>>,
    rx: mpsc::UnboundedReceiver<ListMessage<F::Item>>,
    destroyed: bool,
}

impl<F: ItemFeed> PaginatedList<F> {
    pub fn new(feed: Arc<F>, page_size: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            feed,
            page_size,
            network: String::new(),
            filters: FieldMap::new(),
            items: Vec::new(),
            next_page: None,
            fetch_status: None,
            subscription_status: None,
            subscription: None,
            generation: Generation::new(),
            tx,
            rx,
            destroyed: false,
        }
    }

    pub fn items(&self) -> &[F::Item] {
        &self.items
    }

    pub fn filters(&self) -> &FieldMap {
        &self.filters
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn next_page(&self) -> Option<&PageKey> {
        self.next_page.as_ref()
    }

    /// Whether another page can be requested
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn fetch_status(&self) -> Option<FetchStatus> {
        self.fetch_status
    }

    pub fn subscription_status(&self) -> Option<FetchStatus> {
        self.subscription_status
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Start a new cycle: drop held items and the live subscription, then
    /// fetch the first page and subscribe with `filters` on `network`.
    /// An empty network only clears the list.
    pub fn load(&mut self, network: &str, filters: FieldMap) {
        if self.destroyed {
            return;
        }
        self.invalidate();
        self.network = network.to_string();
        self.filters = filters;

        if self.network.is_empty() {
            return;
        }

        let stamp = self.generation.current();
        debug!(network, filters = ?self.filters, stamp, "loading list");
        self.subscribe(stamp);
        self.fetch(stamp, None);
    }

    /// Clear the list and flag it as errored, e.g. when the filters cannot
    /// be turned into a query.
    pub fn fail(&mut self) {
        if self.destroyed {
            return;
        }
        self.invalidate();
        self.fetch_status = Some(FetchStatus::Error);
    }

    /// Request the page after the last one received.
    /// Returns false when there is nothing to request.
    pub fn fetch_more(&mut self) -> bool {
        if self.destroyed || self.fetch_status == Some(FetchStatus::Loading) {
            return false;
        }
        let Some(page_key) = self.next_page.clone() else {
            return false;
        };

        let stamp = self.generation.current();
        debug!(page = %page_key, stamp, "fetching next page");
        self.fetch(stamp, Some(page_key));
        true
    }

    /// Apply one message. Returns whether visible state changed.
    pub fn apply(&mut self, msg: ListMessage<F::Item>) -> bool {
        match msg {
            ListMessage::Page { stamp, result } => {
                if self.destroyed || !self.generation.is_current(stamp) {
                    trace!(stamp, "discarding stale page");
                    return false;
                }
                match result {
                    Ok(response) => {
                        merge_items(&mut self.items, response.items);
                        self.next_page = response.next_page;
                        self.fetch_status = None;
                    }
                    Err(e) => {
                        warn!(network = %self.network, error = %e, "list fetch failed");
                        self.fetch_status = Some(FetchStatus::Error);
                    }
                }
                true
            }
            ListMessage::Subscribed { stamp, result } => {
                if self.destroyed || !self.generation.is_current(stamp) {
                    // Dropping a stale handle releases it
                    trace!(stamp, "discarding stale subscription");
                    return false;
                }
                match result {
                    Ok(subscription) => {
                        if let Some(previous) = self.subscription.replace(subscription) {
                            previous.unsubscribe();
                        }
                        self.subscription_status = None;
                    }
                    Err(e) => {
                        warn!(network = %self.network, error = %e, "subscription failed");
                        self.subscription_status = Some(FetchStatus::Error);
                    }
                }
                true
            }
            ListMessage::Item { stamp, item } => {
                if self.destroyed || !self.generation.is_current(stamp) {
                    return false;
                }
                merge_items(&mut self.items, [item]) > 0
            }
        }
    }

    /// Apply every queued message without waiting.
    /// Returns whether visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.apply(msg);
        }
        changed
    }

    /// Wait for the next message. Never resolves to `None` while the list is
    /// alive, since the list keeps a sender of its own.
    pub async fn recv(&mut self) -> Option<ListMessage<F::Item>> {
        self.rx.recv().await
    }

    /// Release the subscription and all held state. Safe to call repeatedly
    /// and before any cycle started.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.invalidate();
        self.destroyed = true;
        self.rx.close();
        // Queued messages may hold a subscription that was never applied
        while self.rx.try_recv().is_ok() {}
        debug!(network = %self.network, "list destroyed");
    }

    /// Supersede the current cycle. The live subscription is released here,
    /// before any new one is requested.
    fn invalidate(&mut self) {
        self.generation.advance();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.items.clear();
        self.next_page = None;
        self.fetch_status = None;
        self.subscription_status = None;
    }

    fn fetch(&mut self, stamp: u64, page_key: Option<PageKey>) {
        self.fetch_status = Some(FetchStatus::Loading);

        let feed = self.feed.clone();
        let tx = self.tx.clone();
        let network = self.network.clone();
        let filters = self.filters.clone();
        let page_size = self.page_size;

        tokio::spawn(async move {
            let result = feed
                .get_items(&network, &filters, page_size, page_key.as_ref())
                .await;
            let _ = tx.send(ListMessage::Page { stamp, result });
        });
    }

    fn subscribe(&mut self, stamp: u64) {
        self.subscription_status = Some(FetchStatus::Loading);

        let feed = self.feed.clone();
        let tx = self.tx.clone();
        let network = self.network.clone();
        let filters = self.filters.clone();
        let generation = self.generation.clone();

        let item_tx = self.tx.clone();
        let item_generation = self.generation.clone();
        let on_item: ItemCallback<F::Item> = Arc::new(move |item| {
            if item_generation.is_current(stamp) {
                let _ = item_tx.send(ListMessage::Item { stamp, item });
            }
        });

        tokio::spawn(async move {
            let result = feed.subscribe_new_item(&network, &filters, on_item).await;
            match result {
                Ok(subscription) if !generation.is_current(stamp) => {
                    // Superseded or torn down while registering
                    debug!(stamp, "releasing subscription of a superseded cycle");
                    subscription.unsubscribe();
                }
                result => {
                    // A failed send drops the message, which releases the handle
                    let _ = tx.send(ListMessage::Subscribed { stamp, result });
                }
            }
        });
    }
}

impl<F: ItemFeed> Drop for PaginatedList<F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Merge `incoming` into `held`, skipping items whose identity is already
/// held, and restore newest-first order (block number, then index, both
/// descending). Returns the number of items added.
pub fn merge_items<T: Keyed>(held: &mut Vec<T>, incoming: impl IntoIterator<Item = T>) -> usize {
    let mut keys: HashSet<_> = held.iter().map(Keyed::item_key).collect();
    let before = held.len();

    for item in incoming {
        if keys.insert(item.item_key()) {
            held.push(item);
        }
    }

    let added = held.len() - before;
    if added > 0 {
        held.sort_by_key(|item| std::cmp::Reverse(item.item_key()));
    }
    added
}
