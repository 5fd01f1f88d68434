//! Shared pieces of the detail pages: per-lookup state, lookup errors and
//! route parameter resolution.

use std::fmt;
use thiserror::Error;

use crate::navigation::RouteParams;
use crate::network::NetworkService;
use crate::source::{IdParseError, ItemKey, SourceError};
use crate::status::FetchStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    InvalidId(#[from] IdParseError),
    #[error("{0} not found")]
    NotFound(String),
}

/// State of one lookup of a detail page: `idle -> loading -> (success | error)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    status: Option<FetchStatus>,
    value: Option<T>,
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> Lookup<T> {
    pub fn idle() -> Self {
        Self {
            status: None,
            value: None,
        }
    }

    pub fn begin(&mut self) {
        self.status = Some(FetchStatus::Loading);
        self.value = None;
    }

    /// Settle the lookup. A failure leaves no value behind.
    pub fn resolve(&mut self, result: Result<T, LookupError>) {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.status = None;
            }
            Err(_) => {
                self.value = None;
                self.status = Some(FetchStatus::Error);
            }
        }
    }

    pub fn status(&self) -> Option<FetchStatus> {
        self.status
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == Some(FetchStatus::Loading)
    }
}

/// Turn a source's `None` into a not-found error
pub fn found<T>(value: Option<T>, what: impl fmt::Display) -> Result<T, LookupError> {
    value.ok_or_else(|| LookupError::NotFound(what.to_string()))
}

/// Parse the `id` route parameter (`"<block>-<index>"`)
pub fn parse_id(params: &RouteParams) -> Result<ItemKey, LookupError> {
    let id = params.get("id").unwrap_or("");
    Ok(id.parse::<ItemKey>()?)
}

/// Wait once for a network to be selected. `None` if the network service
/// went away first.
pub(super) async fn selected_network(networks: &NetworkService) -> Option<String> {
    let mut rx = networks.current_network();
    let network = rx.wait_for(|n| !n.is_empty()).await.ok()?.clone();
    Some(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_transitions() {
        let mut lookup: Lookup<u32> = Lookup::idle();
        assert_eq!(lookup.status(), None);
        assert!(lookup.value().is_none());

        lookup.begin();
        assert!(lookup.is_loading());

        lookup.resolve(Ok(7));
        assert_eq!(lookup.status(), None);
        assert_eq!(lookup.value(), Some(&7));
    }

    #[test]
    fn test_failed_lookup_is_error_without_value() {
        let mut lookup: Lookup<u32> = Lookup::idle();
        lookup.begin();
        lookup.resolve(found(None, "extrinsic 1000-2"));
        assert_eq!(lookup.status(), Some(FetchStatus::Error));
        assert!(lookup.value().is_none());
    }

    #[test]
    fn test_parse_id() {
        let params = RouteParams::new().with("id", "1000-2");
        assert_eq!(parse_id(&params).unwrap(), ItemKey::new(1000, 2));

        let params = RouteParams::new().with("id", "1000");
        assert!(matches!(parse_id(&params), Err(LookupError::InvalidId(_))));
        assert!(parse_id(&RouteParams::new()).is_err());
    }
}
