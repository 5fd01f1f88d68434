//! subex - Terminal Explorer for Substrate chains
//!
//! Paginated, filterable extrinsic and event lists with live updates, and
//! detail pages, on top of an explorer API.

pub mod app;
pub mod config;
pub mod filters;
pub mod generation;
pub mod list;
pub mod logging;
pub mod navigation;
pub mod network;
pub mod runtime;
pub mod source;
pub mod status;
pub mod ui;
pub mod views;

// Re-export commonly used types
pub use app::{App, Focus, Route, Screen};
pub use config::{Config, NetworkConfig};
pub use source::{ChainSource, SourceError};
pub use status::FetchStatus;
