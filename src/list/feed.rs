use async_trait::async_trait;
use std::sync::Arc;

use crate::source::{
    ChainSource, Event, Extrinsic, FieldMap, ItemCallback, Keyed, ListResponse, PageKey,
    SourceResult, Subscription,
};

/// One kind of chain record a paginated list can hold: how to fetch a page
/// and how to subscribe to new records.
#[async_trait]
pub trait ItemFeed: Send + Sync + 'static {
    type Item: Keyed + Clone + Send + Sync + 'static;

    async fn get_items(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Self::Item>>;

    async fn subscribe_new_item(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Self::Item>,
    ) -> SourceResult<Subscription>;
}

pub struct ExtrinsicFeed<S>(pub Arc<S>);

#[async_trait]
impl<S: ChainSource> ItemFeed for ExtrinsicFeed<S> {
    type Item = Extrinsic;

    async fn get_items(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Extrinsic>> {
        self.0
            .get_extrinsics(network, filters, page_size, page_key)
            .await
    }

    async fn subscribe_new_item(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Extrinsic>,
    ) -> SourceResult<Subscription> {
        self.0
            .subscribe_new_extrinsic(network, filters, on_item)
            .await
    }
}

pub struct EventFeed<S>(pub Arc<S>);

#[async_trait]
impl<S: ChainSource> ItemFeed for EventFeed<S> {
    type Item = Event;

    async fn get_items(
        &self,
        network: &str,
        filters: &FieldMap,
        page_size: u32,
        page_key: Option<&PageKey>,
    ) -> SourceResult<ListResponse<Event>> {
        self.0.get_events(network, filters, page_size, page_key).await
    }

    async fn subscribe_new_item(
        &self,
        network: &str,
        filters: &FieldMap,
        on_item: ItemCallback<Event>,
    ) -> SourceResult<Subscription> {
        self.0.subscribe_new_event(network, filters, on_item).await
    }
}
