use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Item identity
// ============================================================================

/// Composite identity of a listed chain record: (block number, index within block).
///
/// The derived ordering compares block number first, then index, so sorting
/// in reverse yields the newest-first order used by every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemKey {
    pub block_number: u64,
    pub index: u32,
}

impl ItemKey {
    pub fn new(block_number: u64, index: u32) -> Self {
        Self {
            block_number,
            index,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.block_number, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("identifier `{0}` is not of the form <block>-<index>")]
    Malformed(String),
    #[error("invalid number `{part}` in identifier `{id}`")]
    InvalidNumber { id: String, part: String },
}

impl FromStr for ItemKey {
    type Err = IdParseError;

    /// Parse a `"<block>-<index>"` identifier, e.g. `"1000-2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (block, index) = trimmed
            .split_once('-')
            .ok_or_else(|| IdParseError::Malformed(trimmed.to_string()))?;

        let invalid = |part: &str| IdParseError::InvalidNumber {
            id: trimmed.to_string(),
            part: part.to_string(),
        };

        Ok(Self {
            block_number: block.parse().map_err(|_| invalid(block))?,
            index: index.parse().map_err(|_| invalid(index))?,
        })
    }
}

/// Records that can be held in a paginated list.
pub trait Keyed {
    fn item_key(&self) -> ItemKey;
}

// ============================================================================
// Chain records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Extrinsic {
    pub block_number: u64,
    pub extrinsic_idx: u32,
    #[serde(default)]
    pub hash: Option<String>,
    pub call_module: String,
    pub call_name: String,
    /// 1 for signed extrinsics, 0 for inherents
    #[serde(default)]
    pub signed: u8,
    #[serde(default)]
    pub multi_address_account_id: Option<String>,
    #[serde(default)]
    pub call_arguments: Option<Value>,
    #[serde(default)]
    pub block_datetime: Option<String>,
    #[serde(default)]
    pub spec_version: Option<u32>,
}

impl Extrinsic {
    pub fn is_signed(&self) -> bool {
        self.signed != 0
    }

    /// Call arguments as display text, empty when absent
    pub fn call_arguments_text(&self) -> String {
        json_text(self.call_arguments.as_ref())
    }
}

impl Keyed for Extrinsic {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(self.block_number, self.extrinsic_idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub block_number: u64,
    pub event_idx: u32,
    #[serde(default)]
    pub extrinsic_idx: Option<u32>,
    pub event_module: String,
    pub event_name: String,
    #[serde(default)]
    pub attributes: Option<Value>,
    #[serde(default)]
    pub block_datetime: Option<String>,
    #[serde(default)]
    pub spec_version: Option<u32>,
}

impl Event {
    /// Attributes as display text, empty when absent
    pub fn attributes_text(&self) -> String {
        json_text(self.attributes.as_ref())
    }
}

/// A JSON string is shown as is, anything else as compact JSON
fn json_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

impl Keyed for Event {
    fn item_key(&self) -> ItemKey {
        ItemKey::new(self.block_number, self.event_idx)
    }
}

// ============================================================================
// Runtime metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    pub spec_name: String,
    pub spec_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimePallet {
    pub pallet: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCall {
    pub pallet: String,
    pub call_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub pallet: String,
    pub event_name: String,
}

/// Display properties of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProperties {
    pub name: String,
    pub ss58_format: u16,
    pub token_symbol: String,
    pub token_decimals: u8,
}
