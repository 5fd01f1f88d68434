use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::detail::{found, parse_id, selected_network, Lookup, LookupError};
use crate::navigation::RouteParams;
use crate::network::NetworkService;
use crate::source::{ChainSource, Event, Extrinsic, FieldMap, ItemKey};
use crate::status::FetchStatus;

/// Events emitted by one extrinsic fit in a single page
const EXTRINSIC_EVENTS_PAGE_SIZE: u32 = 100;

enum DetailMessage {
    Resolved { network: String, key: ItemKey },
    Extrinsic(Result<Extrinsic, LookupError>),
    Events(Result<Vec<Event>, LookupError>),
}

/// Detail page of one extrinsic, addressed by an `id` route parameter of the
/// form `"<block>-<index>"`, plus the events it emitted.
pub struct ExtrinsicDetailView<S: ChainSource> {
    source: Arc<S>,
    networks: NetworkService,
    params: RouteParams,
    network: String,
    key: Option<ItemKey>,
    extrinsic: Lookup<Extrinsic>,
    events: Lookup<Vec<Event>>,
    task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<DetailMessage>,
    rx: mpsc::UnboundedReceiver<DetailMessage>,
    destroyed: bool,
}

impl<S: ChainSource> ExtrinsicDetailView<S> {
    pub fn new(source: Arc<S>, networks: NetworkService, params: RouteParams) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            networks,
            params,
            network: String::new(),
            key: None,
            extrinsic: Lookup::idle(),
            events: Lookup::idle(),
            task: None,
            tx,
            rx,
            destroyed: false,
        }
    }

    /// Resolve the route parameters once a network is selected, then run
    /// the extrinsic lookup and the lookup of its events side by side.
    pub fn init(&mut self) {
        if self.task.is_some() || self.destroyed {
            return;
        }
        self.extrinsic.begin();
        self.events.begin();

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
                    let _ = tx.send(DetailMessage::Extrinsic(Err(e.clone())));
                    let _ = tx.send(DetailMessage::Events(Err(e)));
                    return;
                }
            };
            let _ = tx.send(DetailMessage::Resolved {
                network: network.clone(),
                key,
            });

            let extrinsic = async {
                let result = source
                    .get_extrinsic(&network, key.block_number, key.index)
                    .await
                    .map_err(LookupError::from)
                    .and_then(|value| found(value, format!("extrinsic {key}")));
                let _ = tx.send(DetailMessage::Extrinsic(result));
            };

            let events = async {
                let mut filters = FieldMap::new();
                filters.insert("blockNumber".into(), key.block_number.into());
                filters.insert("extrinsicIdx".into(), key.index.into());
                let result = source
                    .get_events(&network, &filters, EXTRINSIC_EVENTS_PAGE_SIZE, None)
                    .await
                    .map(|response| response.items)
                    .map_err(LookupError::from);
                let _ = tx.send(DetailMessage::Events(result));
            };

            tokio::join!(extrinsic, events);
        }));
    }

    // ==================== Accessors ====================

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn key(&self) -> Option<ItemKey> {
        self.key
    }

    pub fn extrinsic(&self) -> &Lookup<Extrinsic> {
        &self.extrinsic
    }

    pub fn events(&self) -> &Lookup<Vec<Event>> {
        &self.events
    }

    pub fn extrinsic_status(&self) -> Option<FetchStatus> {
        self.extrinsic.status()
    }

    pub fn events_status(&self) -> Option<FetchStatus> {
        self.events.status()
    }

    /// Call arguments of the extrinsic, empty until it is loaded
    pub fn call_arguments(&self) -> String {
        self.extrinsic
            .value()
            .map(Extrinsic::call_arguments_text)
            .unwrap_or_default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ==================== Lifecycle ====================

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

    /// Abandon in-flight lookups. Nothing changes afterwards.
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
                debug!(network, %key, "resolved extrinsic detail");
                self.network = network;
                self.key = Some(key);
            }
            DetailMessage::Extrinsic(result) => {
                if let Err(e) = &result {
                    warn!(network = %self.network, error = %e, "extrinsic lookup failed");
                }
                self.extrinsic.resolve(result);
            }
            DetailMessage::Events(result) => {
                if let Err(e) = &result {
                    warn!(network = %self.network, error = %e, "extrinsic events lookup failed");
                }
                self.events.resolve(result);
            }
        }
        true
    }
}

impl<S: ChainSource> Drop for ExtrinsicDetailView<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}
