use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::detail::{found, parse_id, selected_network, Lookup, LookupError};
use crate::navigation::RouteParams;
use crate::network::NetworkService;
use crate::source::{ChainSource, Event, ItemKey};
use crate::status::FetchStatus;

enum DetailMessage {
    Resolved { network: String, key: ItemKey },
    Event(Result<Event, LookupError>),
}

/// Detail page of one event, addressed by `"<block>-<event index>"`.
pub struct EventDetailView<S: ChainSource> {
    source: Arc<S>,
    networks: NetworkService,
    params: RouteParams,
    network: String,
    key: Option<ItemKey>,
    event: Lookup<Event>,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<DetailMessage>,
    rx: mpsc::UnboundedReceiver<DetailMessage>,
    destroyed: bool,
}

impl<S: ChainSource> EventDetailView<S> {
    pub fn new(source: Arc<S>, networks: NetworkService, params: RouteParams) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            networks,
            params,
            network: String::new(),
            key: None,
            event: Lookup::idle(),
            task: None,
            tx,
            rx,
            destroyed: false,
        }
    }

    pub fn init(&mut self) {
        if self.task.is_some() || self.destroyed {
            return;
        }
        self.event.begin();

        let source = self.source.clone();
        let networks = self.networks.clone();
        let params = self.params.clone();
        let tx = self.tx.clone();

        self.task = Some(tokio::spawn(async move {
            let Some(network) = selected_network(&networks).await else {
                return;
            };
            let key = match parse_id(&params) {
                Ok(key) => key,
                Err(e) => {
                    let _ = tx.send(DetailMessage::Event(Err(e)));
                    return;
                }
            };
            let _ = tx.send(DetailMessage::Resolved {
                network: network.clone(),
                key,
            });

            let result = source
                .get_event(&network, key.block_number, key.index)
                .await
                .map_err(LookupError::from)
                .and_then(|value| found(value, format!("event {key}")));
            let _ = tx.send(DetailMessage::Event(result));
        }));
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn key(&self) -> Option<ItemKey> {
        self.key
    }

    pub fn event(&self) -> &Lookup<Event> {
        &self.event
    }

    pub fn event_status(&self) -> Option<FetchStatus> {
        self.event.status()
    }

    /// Event attributes, empty until the event is loaded
    pub fn attributes(&self) -> String {
        self.event
            .value()
            .map(Event::attributes_text)
            .unwrap_or_default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.apply(msg);
        }
        changed
    }

    pub async fn process_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(msg) => self.apply(msg),
            None => false,
        }
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }

    fn apply(&mut self, msg: DetailMessage) -> bool {
        if self.destroyed {
            return false;
        }
        match msg {
            DetailMessage::Resolved { network, key } => {
                debug!(network, %key, "resolved event detail");
                self.network = network;
                self.key = Some(key);
            }
            DetailMessage::Event(result) => {
                if let Err(e) = &result {
                    warn!(network = %self.network, error = %e, "event lookup failed");
                }
                self.event.resolve(result);
            }
        }
        true
    }
}

impl<S: ChainSource> Drop for EventDetailView<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}
