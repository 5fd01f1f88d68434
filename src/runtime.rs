use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::source::{
    ChainSource, Runtime, RuntimeCall, RuntimeEvent, RuntimePallet, SourceError, SourceResult,
};

type MetadataKey = (String, u32);

struct RuntimeCache {
    runtimes: HashMap<String, watch::Sender<Option<Runtime>>>,
    pallets: HashMap<MetadataKey, Vec<RuntimePallet>>,
    calls: HashMap<MetadataKey, Vec<RuntimeCall>>,
    events: HashMap<MetadataKey, Vec<RuntimeEvent>>,
}

/// Latest runtime per network plus cached metadata lookups.
pub struct RuntimeService<S> {
    source: Arc<S>,
    cache: Arc<Mutex<RuntimeCache>>,
}

impl<S> Clone for RuntimeService<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: ChainSource> RuntimeService<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            cache: Arc::new(Mutex::new(RuntimeCache {
                runtimes: HashMap::new(),
                pallets: HashMap::new(),
                calls: HashMap::new(),
                events: HashMap::new(),
            })),
        }
    }

    /// Observe the current runtime of `network`.
    ///
    /// The first observer of a network triggers a fetch of its latest runtime;
    /// until that completes the channel holds `None`. The channel closes if
    /// the network turns out to have no runtime.
    pub fn get_runtime(&self, network: &str) -> watch::Receiver<Option<Runtime>> {
        let (rx, created) = {
            let mut cache = self.cache.lock();
            match cache.runtimes.get(network) {
                Some(tx) => (tx.subscribe(), false),
                None => {
                    let (tx, rx) = watch::channel(None);
                    cache.runtimes.insert(network.to_string(), tx);
                    (rx, true)
                }
            }
        };

        if created {
            let service = self.clone();
            let network = network.to_string();
            tokio::spawn(async move {
                if let Err(e) = service.refresh_runtime(&network).await {
                    warn!(network, error = %e, "failed to fetch latest runtime");
                }
            });
        }

        rx
    }

    /// The runtime of `network`, fetched if none is known yet.
    ///
    /// A network without a runtime is reported as not found.
    pub async fn current_runtime(&self, network: &str) -> SourceResult<Runtime> {
        let known = self
            .cache
            .lock()
            .runtimes
            .get(network)
            .and_then(|tx| tx.borrow().clone());
        if let Some(runtime) = known {
            return Ok(runtime);
        }

        self.refresh_runtime(network)
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("runtime of `{network}`")))
    }

    /// Fetch the latest runtime of `network` and publish it to observers.
    ///
    /// A network left without a known runtime is evicted, so the next
    /// observer fetches again.
    pub async fn refresh_runtime(&self, network: &str) -> SourceResult<Option<Runtime>> {
        let result = self.source.get_latest_runtime(network).await;

        let mut cache = self.cache.lock();
        if let Ok(runtime) = &result {
            debug!(network, ?runtime, "latest runtime");
            let tx = cache
                .runtimes
                .entry(network.to_string())
                .or_insert_with(|| watch::channel(None).0);
            tx.send_if_modified(|current| {
                if *current == *runtime {
                    false
                } else {
                    *current = runtime.clone();
                    true
                }
            });
        }
        let unknown = cache
            .runtimes
            .get(network)
            .is_some_and(|tx| tx.borrow().is_none());
        if unknown {
            cache.runtimes.remove(network);
        }
        result
    }

    pub async fn get_runtime_pallets(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimePallet>> {
        let key = (network.to_string(), spec_version);
        let cached = self.cache.lock().pallets.get(&key).cloned();
        if let Some(pallets) = cached {
            return Ok(pallets);
        }

        let pallets = self.source.get_runtime_pallets(network, spec_version).await?;
        self.cache.lock().pallets.insert(key, pallets.clone());
        Ok(pallets)
    }

    pub async fn get_runtime_calls(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeCall>> {
        let key = (network.to_string(), spec_version);
        let cached = self.cache.lock().calls.get(&key).cloned();
        if let Some(calls) = cached {
            return Ok(calls);
        }

        let calls = self.source.get_runtime_calls(network, spec_version).await?;
        self.cache.lock().calls.insert(key, calls.clone());
        Ok(calls)
    }

    pub async fn get_runtime_events(
        &self,
        network: &str,
        spec_version: u32,
    ) -> SourceResult<Vec<RuntimeEvent>> {
        let key = (network.to_string(), spec_version);
        let cached = self.cache.lock().events.get(&key).cloned();
        if let Some(events) = cached {
            return Ok(events);
        }

        let events = self.source.get_runtime_events(network, spec_version).await?;
        self.cache.lock().events.insert(key, events.clone());
        Ok(events)
    }
}
