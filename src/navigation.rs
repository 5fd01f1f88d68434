use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::debug;

pub type QueryParams = BTreeMap<String, String>;

/// Query-string state of one routed view.
///
/// Readers observe it through a `watch` channel; writers merge updates into
/// the existing parameters instead of replacing them.
#[derive(Debug, Clone)]
pub struct Navigator {
    query: watch::Sender<QueryParams>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::with_query(QueryParams::new())
    }

    pub fn with_query(query: QueryParams) -> Self {
        let (query, _) = watch::channel(query);
        Self { query }
    }

    pub fn query_params(&self) -> watch::Receiver<QueryParams> {
        self.query.subscribe()
    }

    pub fn snapshot(&self) -> QueryParams {
        self.query.borrow().clone()
    }

    /// Merge `updates` into the current parameters. An empty value removes
    /// the key. Observers are only notified if something changed.
    pub fn merge<K, V>(&self, updates: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let updates: Vec<(String, String)> = updates
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        self.query.send_if_modified(|query| {
            let before = query.clone();
            for (key, value) in &updates {
                if value.is_empty() {
                    query.remove(key);
                } else {
                    query.insert(key.clone(), value.clone());
                }
            }
            let changed = *query != before;
            if changed {
                debug!(?query, "query params updated");
            }
            changed
        });
    }
}

/// Path parameters of a detail route, e.g. `id` for `/extrinsic/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}
